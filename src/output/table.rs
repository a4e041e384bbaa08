// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::borrow::Cow;

use comfy_table::{Table, presets::NOTHING};

use super::Rows;

/// Maximum width for the LABELS column
const MAX_LABELS_WIDTH: usize = 60;

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(rows: &Rows, no_headers: bool) -> String {
        if rows.rows.is_empty() {
            return "No resources found.".to_string();
        }

        let mut table = Table::new();
        // Borderless, like kubectl get
        table.load_preset(NOTHING);

        let labels_col = rows.columns.iter().position(|c| c == "LABELS");

        if !no_headers {
            table.set_header(&rows.columns);
        }

        for row in &rows.rows {
            let cells: Vec<Cow<'_, str>> = row
                .iter()
                .enumerate()
                .map(|(idx, val)| {
                    if Some(idx) == labels_col {
                        truncate_value(val, MAX_LABELS_WIDTH)
                    } else {
                        Cow::Borrowed(val.as_str())
                    }
                })
                .collect();
            table.add_row(cells);
        }

        let output = table.to_string();
        match rows.total {
            Some(total) if total > rows.rows.len() => {
                format!("{}\n({} of {} items)", output, rows.rows.len(), total)
            }
            _ => output,
        }
    }
}
