//! Destinations that queued documents are pushed to on sync.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use todox_container::integrity::sha256_hex;
use todox_model::TodoDocument;
use tracing::debug;

/// Where a sync sends queued documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    /// POST the batch as a JSON array.
    Http { endpoint: String, timeout: Duration },
    /// Write one JSON file per document into a directory.
    Outbox(PathBuf),
}

impl SyncTarget {
    /// Push `documents`; an error leaves the queue untouched.
    pub fn push(&self, documents: &[TodoDocument]) -> Result<()> {
        match self {
            Self::Http { endpoint, timeout } => push_http(endpoint, *timeout, documents),
            Self::Outbox(dir) => push_outbox(dir, documents),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Http { endpoint, .. } => endpoint.clone(),
            Self::Outbox(dir) => dir.display().to_string(),
        }
    }
}

fn push_http(endpoint: &str, timeout: Duration, documents: &[TodoDocument]) -> Result<()> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .context("build HTTP client")?;

    debug!(endpoint, count = documents.len(), "posting queued documents");
    let response = client
        .post(endpoint)
        .header(USER_AGENT, format!("todox/{}", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "application/json")
        .json(documents)
        .send()
        .with_context(|| format!("send to {endpoint}"))?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        bail!("{endpoint} answered {status}: {message}");
    }
    Ok(())
}

/// Write each document to its [`outbox_path`]. Rewriting an id replaces its
/// file, so repeated pushes of the same batch are harmless.
fn push_outbox(dir: &Path, documents: &[TodoDocument]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create outbox {}", dir.display()))?;
    for document in documents {
        let path = outbox_path(dir, document);
        let json = serde_json::to_string_pretty(document)
            .with_context(|| format!("serialize document {}", document.id))?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        debug!(id = %document.id, path = %path.display(), "wrote outbox entry");
    }
    Ok(())
}

/// `dir/<sha256 of id>.json`: one file per distinct id, whatever characters
/// the id holds.
pub fn outbox_path(dir: &Path, document: &TodoDocument) -> PathBuf {
    dir.join(format!("{}.json", sha256_hex(document.id.as_bytes())))
}
