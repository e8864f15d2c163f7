//! Import stage events as seen by a subscriber.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use todox_container::{ExportOptions, ImportStage, export_document, import_document};
use todox_model::TodoDocument;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_import(bytes: &[u8]) -> String {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let _ = import_document(bytes);
    });
    captured.text()
}

#[test]
fn test_every_stage_is_logged_in_order() {
    let bytes = export_document(&TodoDocument::new("1", "Chores"), &ExportOptions::default())
        .unwrap();
    let logs = capture_import(&bytes);

    let positions: Vec<usize> = [
        ImportStage::SizeChecked,
        ImportStage::MagicChecked,
        ImportStage::VersionChecked,
        ImportStage::HeaderVerified,
        ImportStage::Decoded,
        ImportStage::ContentVerified,
    ]
    .iter()
    .map(|stage| {
        logs.find(&format!("stage={stage}"))
            .unwrap_or_else(|| panic!("no {stage} event in:\n{logs}"))
    })
    .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_rejection_logs_last_stage_passed() {
    let mut bytes =
        export_document(&TodoDocument::new("1", "Chores"), &ExportOptions::default()).unwrap();
    bytes[4] = 9;
    let logs = capture_import(&bytes);

    assert!(logs.contains("stage=magic-checked"));
    assert!(!logs.contains("stage=version-checked"));
    assert!(logs.contains("container rejected"));
}
