use crate::ledger::{LedgerRow, COLUMNS};

/// Renders the rows added during this run as an aligned table. Pure
/// formatting; the caller decides where it goes.
pub fn render_table(rows: &[LedgerRow]) -> String {
    if rows.is_empty() {
        return "(no rows were added during this run)\n".to_string();
    }

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();
    for row in rows {
        for (width, field) in widths.iter_mut().zip(row.fields()) {
            *width = (*width).max(field.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &COLUMNS, &widths);
    for row in rows {
        push_line(&mut out, &row.fields(), &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[&str], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
