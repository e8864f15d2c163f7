//! Terminal tables for command results.

use std::path::Path;

use chrono::{DateTime, SecondsFormat};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use todox_container::header::MAGIC;
use todox_container::{ContainerError, ContainerHeader};
use todox_model::{ImportReport, SignedEnvelope, TodoDocument};

/// Checksum characters shown in tables.
const CHECKSUM_PREVIEW: usize = 12;

pub fn document_table(envelopes: &[SignedEnvelope]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Title"),
        header_cell("Items"),
        header_cell("Done"),
        header_cell("Exported"),
        header_cell("Checksum"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for envelope in envelopes {
        let document = &envelope.document;
        table.add_row(vec![
            Cell::new(&document.id),
            title_cell(&document.title),
            Cell::new(document.item_count()),
            done_cell(document),
            Cell::new(&envelope.metadata.base.created_at),
            dim_cell(preview(envelope.content_checksum())),
        ]);
    }
    table
}

pub fn failure_table(reports: &[ImportReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("File"), header_cell("Error")]);
    apply_table_style(&mut table);
    for report in reports {
        table.add_row(vec![
            Cell::new(&report.filename),
            Cell::new(&report.error).fg(Color::Red),
        ]);
    }
    table
}

/// Header fields of a container plus the outcome of a full import.
pub fn inspection_table(
    header: &ContainerHeader,
    verification: &Result<SignedEnvelope, ContainerError>,
) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);
    apply_table_style(&mut table);

    let created_at = header.created_at().map_or_else(
        || header.created_at_ms().to_string(),
        |at| at.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    let rows = [
        ("Magic", String::from_utf8_lossy(&MAGIC).into_owned()),
        (
            "Version",
            format!("{}.{}", header.version_major(), header.version_minor()),
        ),
        ("Flags", header.flags().to_string()),
        ("Payload", format!("{} bytes", header.content_length())),
        ("Created", created_at),
        ("App ID", header.app_id_str()),
        ("Header checksum", header.checksum_hex()),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }

    let status = match verification {
        Ok(envelope) => Cell::new(format!(
            "verified: {} ({} items)",
            envelope.document.title,
            envelope.document.item_count()
        ))
        .fg(Color::Green)
        .add_attribute(Attribute::Bold),
        Err(err) => Cell::new(err.to_string()).fg(Color::Red),
    };
    table.add_row(vec![Cell::new("Content"), status]);
    table
}

pub fn queue_table(documents: &[TodoDocument]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Title"),
        header_cell("Items"),
        header_cell("Done"),
        header_cell("Updated"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for document in documents {
        table.add_row(vec![
            Cell::new(&document.id),
            title_cell(&document.title),
            Cell::new(document.item_count()),
            done_cell(document),
            updated_cell(document.time_stamp),
        ]);
    }
    table
}

pub fn print_import(envelopes: &[SignedEnvelope], reports: &[ImportReport]) {
    if !envelopes.is_empty() {
        println!("{}", document_table(envelopes));
    }
    if !reports.is_empty() {
        println!();
        println!("Failed:");
        println!("{}", failure_table(reports));
    }
    println!(
        "Imported {} of {} file(s).",
        envelopes.len(),
        envelopes.len() + reports.len()
    );
}

pub fn print_inspection(
    path: &Path,
    header: &ContainerHeader,
    verification: &Result<SignedEnvelope, ContainerError>,
) {
    println!("File: {}", path.display());
    println!("{}", inspection_table(header, verification));
}

pub fn print_queue(path: &Path, documents: &[TodoDocument]) {
    println!("Queue: {}", path.display());
    if documents.is_empty() {
        println!("No pending documents.");
        return;
    }
    println!("{}", queue_table(documents));
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn title_cell(title: &str) -> Cell {
    Cell::new(title)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn done_cell(document: &TodoDocument) -> Cell {
    let done = document.completed_count();
    if done > 0 && done == document.item_count() {
        Cell::new(done).fg(Color::Green)
    } else {
        Cell::new(done)
    }
}

fn updated_cell(time_stamp: i64) -> Cell {
    match DateTime::from_timestamp_millis(time_stamp) {
        Some(at) if time_stamp > 0 => Cell::new(at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        _ => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn preview(checksum: &str) -> &str {
    checksum.get(..CHECKSUM_PREVIEW).unwrap_or(checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_checksum() {
        assert_eq!(preview("abc"), "abc");
        assert_eq!(preview("0123456789abcdef"), "0123456789ab");
    }

    #[test]
    fn test_queue_table_rows() {
        let docs = vec![
            TodoDocument::new("a", "Groceries").with_time_stamp(1_710_513_000_000),
            TodoDocument::new("b", "Chores"),
        ];
        let mut table = queue_table(&docs);
        table.force_no_tty();
        let rendered = table.to_string();
        assert!(rendered.contains("Groceries"));
        assert!(rendered.contains("2024-03-15T14:30:00Z"));
        assert_eq!(table.row_count(), 2);
    }
}
