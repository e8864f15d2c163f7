use chrono::{DateTime, Utc};
use todox_model::DEFAULT_APP_IDENTIFIER;

use crate::header::{CURRENT_MINOR, DEFAULT_APP_ID, HeaderFlags};

/// Settings for building a container.
///
/// The defaults produce the same header and metadata values as every
/// previously exported `.todolistx` file. Pinning the `Option` fields makes
/// an export reproducible.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub app_identifier: String,
    pub app_version: String,
    pub app_id: [u8; 4],
    pub version_minor: u8,
    pub flags: HeaderFlags,
    pub created_at: Option<DateTime<Utc>>,
    pub user_fingerprint: Option<String>,
    pub export_id: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            app_identifier: DEFAULT_APP_IDENTIFIER.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            app_id: DEFAULT_APP_ID,
            version_minor: CURRENT_MINOR,
            flags: HeaderFlags::default(),
            created_at: None,
            user_fingerprint: None,
            export_id: None,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_app_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.app_identifier = identifier.into();
        self
    }

    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    #[must_use]
    pub fn with_app_id(mut self, app_id: [u8; 4]) -> Self {
        self.app_id = app_id;
        self
    }

    #[must_use]
    pub fn with_version_minor(mut self, minor: u8) -> Self {
        self.version_minor = minor;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: HeaderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Pin the creation time used in both header and metadata.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    #[must_use]
    pub fn with_user_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.user_fingerprint = Some(fingerprint.into());
        self
    }

    #[must_use]
    pub fn with_export_id(mut self, export_id: impl Into<String>) -> Self {
        self.export_id = Some(export_id.into());
        self
    }

    /// Creation time for this export, `now` unless pinned.
    pub fn resolve_created_at(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_else(Utc::now)
    }
}
