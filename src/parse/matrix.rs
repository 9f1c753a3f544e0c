// src/parse/matrix.rs
use scraper::{ElementRef, Selector};

use super::ParseError;

/// Upper bound on a single colspan/rowspan. Anything past this is not a
/// layout quirk but a broken table, and fails the page.
const MAX_SPAN: u32 = 256;

/// One active rowspan: the carried text and how many more rows it covers.
#[derive(Debug, Clone)]
struct Carry {
    text: String,
    remaining: u32,
}

/// Flatten a `<table>` element into a rectangular matrix of cell texts.
///
/// A `rowspan=k` cell registers a carry that re-fills its column for the
/// next `k-1` rows; carries are consumed from the cursor onward before any
/// real cell is placed, so a late-arriving cell can never overwrite an
/// active carry. A `colspan=n` cell repeats its text across `n` columns.
/// Trailing empty cells are stripped per row, then every row is padded to
/// the widest row of the table. Zero rows is a valid result.
pub fn extract_matrix(table: ElementRef) -> Result<Vec<Vec<String>>, ParseError> {
    let row_sel = Selector::parse("tr").expect("invalid tr selector");
    let cell_sel = Selector::parse("th, td").expect("invalid cell selector");

    let mut carries: Vec<Option<Carry>> = Vec::new();
    let mut matrix: Vec<Vec<String>> = Vec::new();

    for tr in table.select(&row_sel) {
        let mut row: Vec<String> = Vec::new();
        let mut col = consume_carries(&mut row, &mut carries, 0);

        for cell in tr.select(&cell_sel) {
            let text = cell_text(cell);
            let colspan = span_attr(cell, "colspan")?;
            let rowspan = span_attr(cell, "rowspan")?;

            let end = col + colspan as usize;
            if row.len() < end {
                row.resize(end, String::new());
            }
            for slot in &mut row[col..end] {
                slot.clone_from(&text);
            }
            if rowspan > 1 {
                if carries.len() < end {
                    carries.resize(end, None);
                }
                for carry in &mut carries[col..end] {
                    *carry = Some(Carry {
                        text: text.clone(),
                        remaining: rowspan - 1,
                    });
                }
            }

            col = consume_carries(&mut row, &mut carries, end);
        }

        while row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
        }
        matrix.push(row);
    }

    let width = matrix.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut matrix {
        row.resize(width, String::new());
    }
    Ok(matrix)
}

/// Fill consecutive carried cells starting at `col`, decrementing each
/// carry and expiring it at zero. Stops at the first carry-free column.
fn consume_carries(row: &mut Vec<String>, carries: &mut [Option<Carry>], mut col: usize) -> usize {
    loop {
        let Some(slot) = carries.get_mut(col) else {
            return col;
        };
        let Some(carry) = slot else {
            return col;
        };
        if row.len() <= col {
            row.resize(col + 1, String::new());
        }
        row[col].clone_from(&carry.text);
        carry.remaining -= 1;
        if carry.remaining == 0 {
            *slot = None;
        }
        col += 1;
    }
}

/// Cell text: fragments trimmed and joined with single spaces, so inline
/// markup (`<a>`, `<font>`) collapses the way the portal renders it.
fn cell_text(cell: ElementRef) -> String {
    let mut out = String::new();
    for fragment in cell.text() {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(fragment);
    }
    out
}

/// colspan/rowspan with the HTML default: absent or non-numeric means 1.
fn span_attr(cell: ElementRef, name: &str) -> Result<u32, ParseError> {
    let span = cell
        .value()
        .attr(name)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1);
    if span > MAX_SPAN {
        return Err(ParseError::Structure(format!(
            "{} of {} exceeds the {} limit",
            name, span, MAX_SPAN
        )));
    }
    Ok(span)
}
