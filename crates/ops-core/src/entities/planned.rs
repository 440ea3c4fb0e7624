//! Planned change - a detected change annotated with policy

use serde::{Deserialize, Serialize};

use crate::documents::{PolicyAction, PolicyRule, RiskLevel};

use super::change::Change;

/// Whether the plan was produced for review only or ahead of an apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    #[default]
    Plan,
    Apply,
}

/// Change with policy annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
    #[serde(flatten)]
    pub change: Change,
    pub mode: PlanMode,
    pub requires_approval: bool,
    pub risk_level: RiskLevel,
    pub recommended_action: PolicyAction,
    pub can_auto_apply: bool,
}

impl PlannedChange {
    /// Annotate a change with the matching policy rule.
    ///
    /// A missing rule is treated as unknown risk that requires approval.
    #[must_use]
    pub fn new(
        change: Change,
        rule: Option<&PolicyRule>,
        mode: PlanMode,
        direct_apply_enabled: bool,
    ) -> Self {
        let rule = rule.copied().unwrap_or_else(PolicyRule::unknown);
        let can_auto_apply = mode == PlanMode::Apply
            && direct_apply_enabled
            && rule.action == PolicyAction::AutoApply
            && !rule.requires_approval;

        Self {
            change,
            mode,
            requires_approval: rule.requires_approval,
            risk_level: rule.risk_level,
            recommended_action: rule.action,
            can_auto_apply,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.change.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ChangeAction, ChangeType, Scope, Severity};

    fn sample_change() -> Change {
        Change::new(
            Scope::Database,
            ChangeType::CreateBucket,
            "avatars",
            Severity::Medium,
            ChangeAction::Create,
            "Create bucket avatars",
        )
    }

    fn auto_rule(requires_approval: bool) -> PolicyRule {
        PolicyRule {
            requires_approval,
            risk_level: RiskLevel::Low,
            action: PolicyAction::AutoApply,
        }
    }

    #[test]
    fn test_can_auto_apply_requires_every_condition() {
        let rule = auto_rule(false);
        assert!(PlannedChange::new(sample_change(), Some(&rule), PlanMode::Apply, true).can_auto_apply);
        assert!(!PlannedChange::new(sample_change(), Some(&rule), PlanMode::Plan, true).can_auto_apply);
        assert!(!PlannedChange::new(sample_change(), Some(&rule), PlanMode::Apply, false).can_auto_apply);

        let pr_rule = PolicyRule {
            action: PolicyAction::GeneratePr,
            ..rule
        };
        assert!(!PlannedChange::new(sample_change(), Some(&pr_rule), PlanMode::Apply, true).can_auto_apply);
    }

    #[test]
    fn test_approval_blocks_auto_apply() {
        let rule = auto_rule(true);
        for direct in [true, false] {
            for mode in [PlanMode::Plan, PlanMode::Apply] {
                let planned = PlannedChange::new(sample_change(), Some(&rule), mode, direct);
                assert!(!planned.can_auto_apply);
            }
        }
    }

    #[test]
    fn test_missing_rule_is_fail_safe() {
        let planned = PlannedChange::new(sample_change(), None, PlanMode::Apply, true);
        assert!(planned.requires_approval);
        assert_eq!(planned.risk_level, RiskLevel::Unknown);
        assert!(!planned.can_auto_apply);
    }

    #[test]
    fn test_flattened_serialization() {
        let planned = PlannedChange::new(sample_change(), None, PlanMode::Plan, false);
        let value = serde_json::to_value(&planned).unwrap();
        assert_eq!(value["id"], "database.create_bucket.avatars");
        assert_eq!(value["type"], "create_bucket");
        assert_eq!(value["risk_level"], "unknown");
        assert_eq!(value["recommended_action"], "manual");
    }
}
