use crate::rows::Tabular;
use crate::table::Table;

/// Renders a table as aligned plain text for a terminal.
pub fn render_table<R: Tabular>(table: &Table<R>) -> String {
    let columns = table.columns();
    let records: Vec<Vec<String>> = table.records().collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for record in &records {
        for (width, cell) in widths.iter_mut().zip(record) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, columns.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for record in &records {
        push_line(&mut out, record.iter().map(String::as_str), &widths);
    }

    if records.is_empty() {
        out.push_str("(no rows)\n");
    }

    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}
