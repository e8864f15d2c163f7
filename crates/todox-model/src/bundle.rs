use serde::{Deserialize, Serialize};

use crate::envelope::SignedEnvelope;

/// `manifest.json` stored alongside the containers of a multi-document bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub export_date: String,
    pub app_version: String,
    pub documents: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Archive entry name of the container.
    pub name: String,
    pub item_count: usize,
}

impl BundleManifest {
    pub fn total_items(&self) -> usize {
        self.documents.iter().map(|entry| entry.item_count).sum()
    }
}

/// One failed file in a batch import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub filename: String,
    pub error: String,
}

/// Result of importing several containers; failures never abort the batch.
#[derive(Debug, Clone, Default)]
pub struct BatchImport {
    pub documents: Vec<SignedEnvelope>,
    pub reports: Vec<ImportReport>,
}

impl BatchImport {
    pub fn is_clean(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn record_success(&mut self, envelope: SignedEnvelope) {
        self.documents.push(envelope);
    }

    pub fn record_failure(&mut self, filename: impl Into<String>, error: impl ToString) {
        self.reports.push(ImportReport {
            filename: filename.into(),
            error: error.to_string(),
        });
    }
}
