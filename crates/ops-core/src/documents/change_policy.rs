//! Change-policy document - approval and risk rules per scope and change type

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{ChangeType, Scope};

/// Risk level assigned by policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    /// Assigned when no rule matches
    Unknown,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action a policy recommends for a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    AutoApply,
    GeneratePr,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    pub requires_approval: bool,
    pub risk_level: RiskLevel,
    pub action: PolicyAction,
}

impl PolicyRule {
    /// Rule used for `(scope, type)` pairs the policy does not mention
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            requires_approval: true,
            risk_level: RiskLevel::Unknown,
            action: PolicyAction::Manual,
        }
    }
}

type RawPolicy = BTreeMap<String, BTreeMap<ChangeType, PolicyRule>>;

/// Policy map keyed by scope, then change type.
///
/// A `storage` section is accepted and merged into the database scope,
/// where bucket changes live.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawPolicy")]
pub struct ChangePolicy {
    rules: BTreeMap<Scope, BTreeMap<ChangeType, PolicyRule>>,
}

impl ChangePolicy {
    /// Look up the rule for a scope and change type
    #[must_use]
    pub fn lookup(&self, scope: Scope, change_type: ChangeType) -> Option<&PolicyRule> {
        self.rules.get(&scope).and_then(|rules| rules.get(&change_type))
    }

    /// Insert or replace a rule
    pub fn insert(&mut self, scope: Scope, change_type: ChangeType, rule: PolicyRule) {
        self.rules.entry(scope).or_default().insert(change_type, rule);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.values().all(BTreeMap::is_empty)
    }
}

impl TryFrom<RawPolicy> for ChangePolicy {
    type Error = String;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        let mut policy = ChangePolicy::default();
        for (scope_name, rules) in raw {
            let scope = match scope_name.as_str() {
                "database" | "storage" => Scope::Database,
                "environment" => Scope::Environment,
                "payment" => Scope::Payment,
                other => return Err(format!("unknown policy scope `{other}`")),
            };
            for (change_type, rule) in rules {
                if policy.lookup(scope, change_type).is_some() {
                    return Err(format!(
                        "rule for `{change_type}` declared twice in scope `{scope}`"
                    ));
                }
                policy.insert(scope, change_type, rule);
            }
        }
        Ok(policy)
    }
}
