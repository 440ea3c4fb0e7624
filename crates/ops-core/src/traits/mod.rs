//! Port traits implemented by infrastructure crates

mod backends;

pub use backends::{
    BackendResult, DatabaseInspector, EnvironmentSource, LiveBucket, MigrationPullRequest,
    MigrationRunner, PlanRecord, PlanStore, PullRequest, StorageBackend, VcsHost,
};
