//! Database models with SQLx `FromRow` derives

mod plan;

pub use plan::PlanModel;
