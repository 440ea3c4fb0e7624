//! Environment scope auditor

use std::collections::BTreeSet;

use ops_core::{
    Change, ChangeAction, ChangeType, EnvironmentSource, EnvironmentSpec, Scope, Severity,
};
use serde_json::json;

use super::is_set;

/// Report declared variables that are unset or empty.
///
/// Required variables are checked before optional ones, so a name declared
/// in both is reported once, as required.
pub fn audit(spec: &EnvironmentSpec, env: &dyn EnvironmentSource) -> Vec<Change> {
    let mut seen = BTreeSet::new();
    let mut changes = Vec::new();

    let declared = spec
        .required
        .iter()
        .map(|entry| (entry, true))
        .chain(spec.optional.iter().map(|entry| (entry, false)));

    for ((category, names), required) in declared {
        for name in names {
            if !seen.insert(name.as_str()) || is_set(env.var(name).as_deref()) {
                continue;
            }

            let (severity, description) = if required {
                (
                    Severity::High,
                    format!("Required environment variable {name} ({category}) is not set"),
                )
            } else {
                (
                    Severity::Low,
                    format!("Optional environment variable {name} ({category}) is not set"),
                )
            };

            changes.push(
                Change::new(
                    Scope::Environment,
                    ChangeType::SetEnvVar,
                    name,
                    severity,
                    ChangeAction::Manual,
                    description,
                )
                .with_desired(json!({
                    "name": name,
                    "category": category,
                    "required": required,
                })),
            );
        }
    }

    changes
}
