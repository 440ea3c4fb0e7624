//! Control plane services
//!
//! Loader, scope auditors, planner, migration generator and apply
//! orchestrator, fronted by `OpsService`.

pub mod apply;
pub mod audit;
pub mod context;
pub mod error;
pub mod loader;
pub mod migration;
pub mod ops;
pub mod planner;

pub use apply::{ApplyOptions, ApplyOrchestrator};
pub use context::{OpsSettings, ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use loader::{load_documents, Documents};
pub use migration::MigrationScript;
pub use ops::OpsService;
pub use planner::{plan_changes, Plan, PlanSummary};
