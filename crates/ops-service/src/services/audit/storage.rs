//! Storage scope auditor
//!
//! Bucket changes carry the database scope; the orchestrator routes them to
//! the storage group by type.

use std::collections::BTreeMap;

use ops_core::{
    BackendResult, Change, ChangeAction, ChangeType, LiveBucket, Scope, Severity, StorageBackend,
    StorageSpec,
};
use serde_json::json;

/// Compare declared buckets with the provider's bucket list
pub async fn audit(spec: &StorageSpec, backend: &dyn StorageBackend) -> BackendResult<Vec<Change>> {
    let live: BTreeMap<String, LiveBucket> = backend
        .list_buckets()
        .await?
        .into_iter()
        .map(|bucket| (bucket.name.clone(), bucket))
        .collect();

    let mut changes = Vec::new();
    for bucket in &spec.buckets {
        match live.get(&bucket.name) {
            None => changes.push(
                Change::new(
                    Scope::Database,
                    ChangeType::CreateBucket,
                    &bucket.name,
                    Severity::Medium,
                    ChangeAction::Create,
                    format!("Storage bucket {} does not exist", bucket.name),
                )
                .with_desired(json!(bucket)),
            ),
            Some(current) if current.public != bucket.public => changes.push(
                Change::new(
                    Scope::Database,
                    ChangeType::UpdateBucket,
                    &bucket.name,
                    Severity::Low,
                    ChangeAction::Update,
                    format!(
                        "Storage bucket {} should be {}",
                        bucket.name,
                        if bucket.public { "public" } else { "private" }
                    ),
                )
                .with_desired(json!(bucket))
                .with_current(json!(current)),
            ),
            Some(_) => {}
        }
    }

    Ok(changes)
}
