//! GitHub REST adapter for migration pull requests

mod client;

pub use client::{GitHubClient, GitHubClientConfig};
