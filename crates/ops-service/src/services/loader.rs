//! Desired-state and policy document loader
//!
//! Each document is looked up as `<stem>.json`, `<stem>.yaml` or `<stem>.yml`
//! in the config directory; the first one present wins and its extension
//! picks the parser. Any failure is fatal for the run.

use std::path::{Path, PathBuf};

use ops_core::{ChangePolicy, DesiredState, DocumentError};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

const DESIRED_STATE: &str = "desired-state";
const CHANGE_POLICY: &str = "change-policy";
const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Both documents, parsed and validated
#[derive(Debug, Clone)]
pub struct Documents {
    pub desired: DesiredState,
    pub policy: ChangePolicy,
}

/// Load the desired-state and change-policy documents from `dir`
#[instrument]
pub async fn load_documents(dir: &Path) -> Result<Documents, DocumentError> {
    let desired: DesiredState = load(dir, DESIRED_STATE).await?;
    desired.validate()?;
    let policy: ChangePolicy = load(dir, CHANGE_POLICY).await?;

    debug!(
        tables = desired.database.tables.len(),
        buckets = desired.storage.buckets.len(),
        "Loaded ops documents"
    );

    Ok(Documents { desired, policy })
}

async fn locate(dir: &Path, stem: &'static str) -> Result<PathBuf, DocumentError> {
    for extension in EXTENSIONS {
        let path = dir.join(format!("{stem}.{extension}"));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }
    }

    Err(DocumentError::Missing {
        document: stem,
        dir: dir.display().to_string(),
    })
}

async fn load<T: DeserializeOwned>(dir: &Path, stem: &'static str) -> Result<T, DocumentError> {
    let path = locate(dir, stem).await?;
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let parse_error = |message: String| DocumentError::Parse {
        path: path.display().to_string(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string())),
        _ => serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string())),
    }
}
