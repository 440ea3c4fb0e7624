//! # ops-service
//!
//! Application layer: document loading, scope auditors, the change planner,
//! the migration-text generator, the apply orchestrator, and DTOs.

pub mod dto;
pub mod services;

pub use services::{OpsService, OpsSettings, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult};
