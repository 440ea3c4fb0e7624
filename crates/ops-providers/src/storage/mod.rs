//! Storage provider bucket API

mod client;

pub use client::{StorageApiClient, StorageClientConfig};
