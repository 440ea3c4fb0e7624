//! Change planner - policy annotation and plan summary

use std::collections::BTreeMap;

use ops_core::{Change, ChangePolicy, PlanMode, PlannedChange};
use serde::{Deserialize, Serialize};

/// Counts over a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_risk: BTreeMap<String, usize>,
}

/// Annotated changes plus summary
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
    pub summary: PlanSummary,
    /// True if any planned change requires approval
    pub requires_approval: bool,
}

/// Annotate each change with its policy rule, keeping input order.
///
/// Pairs missing from the policy get unknown risk and require approval.
pub fn plan_changes(
    changes: Vec<Change>,
    policy: &ChangePolicy,
    mode: PlanMode,
    direct_apply_enabled: bool,
) -> Plan {
    let changes: Vec<PlannedChange> = changes
        .into_iter()
        .map(|change| {
            let rule = policy.lookup(change.scope, change.change_type);
            PlannedChange::new(change, rule, mode, direct_apply_enabled)
        })
        .collect();

    let mut summary = PlanSummary {
        total: changes.len(),
        ..Default::default()
    };
    for planned in &changes {
        *summary
            .by_type
            .entry(planned.change.change_type.as_str().to_string())
            .or_default() += 1;
        *summary
            .by_risk
            .entry(planned.risk_level.as_str().to_string())
            .or_default() += 1;
    }

    let requires_approval = changes.iter().any(|c| c.requires_approval);

    Plan {
        changes,
        summary,
        requires_approval,
    }
}
