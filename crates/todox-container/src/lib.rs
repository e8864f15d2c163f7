//! Reader and writer for `.todolistx` containers.
//!
//! A container is a fixed 32-byte header followed by a payload:
//!
//! ```text
//! document -> envelope JSON (+ content checksum) -> zlib -> keyed transform -> payload
//! header(magic, version, flags, length, created-at, app id, header checksum) + payload
//! ```
//!
//! Import reverses the pipeline and rejects the container at the first check
//! that fails; see [`codec`] for the order.
//!
//! # Example
//!
//! ```
//! use todox_container::{ExportOptions, export_document, import_document};
//! use todox_model::TodoDocument;
//!
//! let doc = TodoDocument::new("1", "Groceries");
//! let bytes = export_document(&doc, &ExportOptions::default()).unwrap();
//! let envelope = import_document(&bytes).unwrap();
//! assert_eq!(envelope.document, doc);
//! ```

pub mod bundle;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod header;
pub mod integrity;
pub mod io;
pub mod options;
pub mod transform;

pub use bundle::{
    MANIFEST_NAME, bundle_file_name, export_bundle, import_bundle, import_files,
    read_bundle_manifest,
};
pub use codec::{ImportStage, ParsedContainer, export_document, import_document, parse_container};
pub use error::{ContainerError, Result};
pub use header::{ContainerHeader, HEADER_LEN, HeaderBuilder, HeaderFlags};
pub use io::{
    FILE_EXTENSION, MEDIA_TYPE, container_file_name, export_to_dir, export_to_dir_async,
    import_file, import_file_async, read_container, sanitize_file_name, write_container,
};
pub use options::ExportOptions;
