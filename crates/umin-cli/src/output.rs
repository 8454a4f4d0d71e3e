use serde::Serialize;
use umin_core::action::Notice;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        println!("[{}] {}", notice.level, notice.message);
    }
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    for line in table_lines(headers, &rows) {
        println!("{line}");
    }
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
fn table_lines(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(&widths, headers.iter().copied()));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(format_row(&widths, row.iter().map(String::as_str)));
    }
    lines
}

fn format_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:w$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
