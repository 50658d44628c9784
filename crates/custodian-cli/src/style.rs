//! Terminal styling for human-readable output.

use std::sync::atomic::{AtomicBool, Ordering};

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use owo_colors::{OwoColorize, Stream};

static NO_COLOR: AtomicBool = AtomicBool::new(false);

pub fn set_no_color(value: bool) {
    NO_COLOR.store(value, Ordering::SeqCst);
}

pub fn no_color() -> bool {
    NO_COLOR.load(Ordering::SeqCst)
}

/// Prints an error message with an X mark to stderr.
pub fn print_error(msg: &str) {
    if no_color() {
        eprintln!("✗ {msg}");
    } else {
        eprintln!(
            "{} {msg}",
            "✗".if_supports_color(Stream::Stderr, |s| s.red().bold().to_string())
        );
    }
}

/// Builds a table with a bold header row.
pub fn table(columns: &[&str], rows: &[Vec<String>]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = columns
        .iter()
        .map(|col| {
            if no_color() {
                Cell::new(col)
            } else {
                Cell::new(col).add_attribute(Attribute::Bold).fg(Color::Cyan)
            }
        })
        .collect();
    table.set_header(header);

    for row in rows {
        table.add_row(row);
    }
    table
}
