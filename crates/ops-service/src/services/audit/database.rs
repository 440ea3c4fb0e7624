//! Database scope auditor

use ops_core::{
    BackendResult, Change, ChangeAction, ChangeType, DatabaseInspector, DatabaseSpec, Scope,
    Severity, TableSpec,
};
use serde_json::json;
use tracing::debug;

/// Compare declared tables with the live schema
pub async fn audit(
    spec: &DatabaseSpec,
    inspector: &dyn DatabaseInspector,
) -> BackendResult<Vec<Change>> {
    let mut changes = Vec::new();

    for table in &spec.tables {
        if inspector.table_exists(&table.name).await? {
            audit_existing(table, inspector, &mut changes).await?;
        } else if table.optional {
            debug!(table = %table.name, "Optional table absent; skipping");
        } else {
            missing_table(table, &mut changes);
        }
    }

    Ok(changes)
}

fn missing_table(table: &TableSpec, changes: &mut Vec<Change>) {
    changes.push(
        Change::new(
            Scope::Database,
            ChangeType::CreateTable,
            &table.name,
            Severity::High,
            ChangeAction::Create,
            format!("Required table {} does not exist", table.name),
        )
        .with_desired(json!(table)),
    );

    // The generated CREATE TABLE carries the declared indexes.
    verify_indexes(table, changes);
}

async fn audit_existing(
    table: &TableSpec,
    inspector: &dyn DatabaseInspector,
    changes: &mut Vec<Change>,
) -> BackendResult<()> {
    if !table.required_columns.is_empty() {
        let live = inspector.table_columns(&table.name).await?;
        for column in table
            .required_columns
            .iter()
            .filter(|c| !live.contains(&c.name))
        {
            changes.push(
                Change::new(
                    Scope::Database,
                    ChangeType::AddColumn,
                    &format!("{}.{}", table.name, column.name),
                    Severity::Medium,
                    ChangeAction::Update,
                    format!("Column {} is missing on {}", column.name, table.name),
                )
                .with_desired(json!({ "table": table.name, "column": column }))
                .with_current(json!({ "columns": live })),
            );
        }
    }

    if table.rls_enabled && !inspector.rls_enabled(&table.name).await? {
        changes.push(
            Change::new(
                Scope::Database,
                ChangeType::EnableRls,
                &table.name,
                Severity::High,
                ChangeAction::Update,
                format!("Row-level security is disabled on {}", table.name),
            )
            .with_desired(json!({ "table": table.name, "rls_enabled": true }))
            .with_current(json!({ "rls_enabled": false })),
        );
    }

    if !table.policies.is_empty() {
        let live = inspector.table_policies(&table.name).await?;
        for policy in table.policies.iter().filter(|p| !live.contains(&p.name)) {
            changes.push(
                Change::new(
                    Scope::Database,
                    ChangeType::CreatePolicy,
                    &format!("{}.{}", table.name, policy.name),
                    Severity::Medium,
                    ChangeAction::Create,
                    format!("Policy {:?} is missing on {}", policy.name, table.name),
                )
                .with_desired(json!({ "table": table.name, "policy": policy })),
            );
        }
    }

    verify_indexes(table, changes);

    Ok(())
}

/// Index presence is not asserted; each declared index is flagged for review.
fn verify_indexes(table: &TableSpec, changes: &mut Vec<Change>) {
    for index in &table.indexes {
        changes.push(
            Change::new(
                Scope::Database,
                ChangeType::VerifyIndex,
                &format!("{}.{}", table.name, index.name),
                Severity::Low,
                ChangeAction::Verify,
                format!("Verify index {} on {}", index.name, table.name),
            )
            .with_desired(json!({ "table": table.name, "index": index })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::fakes::{FakeDatabase, FakeTable};
    use super::*;
    use ops_core::DesiredState;

    fn spec() -> DatabaseSpec {
        let desired: DesiredState = serde_json::from_value(json!({
            "database": {
                "tables": [
                    {
                        "name": "campaigns",
                        "rls_enabled": true,
                        "required_columns": [
                            {"name": "title", "type": "text", "nullable": false},
                            {"name": "budget", "type": "numeric"}
                        ],
                        "indexes": [{"name": "campaigns_title_idx", "columns": ["title"]}],
                        "policies": [{"name": "owners read", "command": "select", "using": "true"}]
                    },
                    {"name": "audit_log", "optional": true}
                ]
            }
        }))
        .unwrap();
        desired.database
    }

    fn ids(changes: &[Change]) -> Vec<&str> {
        changes.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_missing_required_table() {
        let changes = audit(&spec(), &FakeDatabase::default()).await.unwrap();

        assert_eq!(
            ids(&changes),
            vec![
                "database.create_table.campaigns",
                "database.verify_index.campaigns.campaigns_title_idx",
            ]
        );
        assert_eq!(changes[0].severity, Severity::High);
        assert!(changes[0].current.is_none());
        assert_eq!(changes[0].desired["name"], "campaigns");
        assert_eq!(changes[1].severity, Severity::Low);
        assert_eq!(changes[1].action, ChangeAction::Verify);
    }

    #[tokio::test]
    async fn test_existing_table_drift() {
        let db = FakeDatabase::default().with_table(
            "campaigns",
            FakeTable {
                columns: vec!["id".to_string(), "title".to_string()],
                rls_enabled: false,
                policies: Vec::new(),
            },
        );

        let changes = audit(&spec(), &db).await.unwrap();
        assert_eq!(
            ids(&changes),
            vec![
                "database.add_column.campaigns.budget",
                "database.enable_rls.campaigns",
                "database.create_policy.campaigns.owners read",
                "database.verify_index.campaigns.campaigns_title_idx",
            ]
        );
        assert_eq!(changes[1].severity, Severity::High);
        assert_eq!(changes[3].severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_converged_table_only_verifies_indexes() {
        let db = FakeDatabase::default().with_table(
            "campaigns",
            FakeTable {
                columns: vec!["title".to_string(), "budget".to_string()],
                rls_enabled: true,
                policies: vec!["owners read".to_string()],
            },
        );

        let changes = audit(&spec(), &db).await.unwrap();
        assert_eq!(
            ids(&changes),
            vec!["database.verify_index.campaigns.campaigns_title_idx"]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let db = FakeDatabase {
            fail: true,
            ..Default::default()
        };
        assert!(audit(&spec(), &db).await.is_err());
    }
}
