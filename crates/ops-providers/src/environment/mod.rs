//! Environment variable sources

mod sources;

pub use sources::{ProcessEnvironment, StaticEnvironment};
