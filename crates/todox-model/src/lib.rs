//! Todo document model and the export envelope wrapped by `.todolistx` containers.

pub mod bundle;
pub mod document;
pub mod envelope;
pub mod error;

pub use bundle::{BatchImport, BundleEntry, BundleManifest, ImportReport};
pub use document::{TodoDocument, TodoItem, TodoStatus};
pub use envelope::{
    DEFAULT_APP_IDENTIFIER, ENVELOPE_VERSION, EnvelopeMetadata, ExportEnvelope, FORMAT_SIGNATURE,
    SignedEnvelope, SignedEnvelopeMetadata, UnsignedEnvelope,
};
pub use error::{ModelError, Result};
