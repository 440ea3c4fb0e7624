//! Domain entities - changes, planned changes and apply outcomes

mod change;
mod outcome;
mod planned;

pub use change::{AuditScope, Change, ChangeAction, ChangeType, Scope, Severity};
pub use outcome::{ApplyEntry, ApplyGroup, ApplyMethod, ApplyOutcome};
pub use planned::{PlanMode, PlannedChange};
