// src/parse/select.rs
use scraper::{Html, Selector};
use tracing::debug;

use super::matrix::extract_matrix;
use super::text::{looks_like_code, norm};
use super::ParseError;

/// Keyword bonus for a table whose text mentions both identity columns.
const KEYWORD_BONUS: usize = 10;

/// Pick the content table among the page's decoys (layout scaffolding,
/// navigation, legends).
///
/// Each table scores `KEYWORD_BONUS` when its normalized text contains
/// both a "codigo" and a "descricao" token, plus one point per row whose
/// first cell is a bounded numeric code. The best score wins; ties keep
/// the first table encountered. No positive score means the page has no
/// data for this query, which is a valid empty result.
pub fn select_table(doc: &Html) -> Result<Option<Vec<Vec<String>>>, ParseError> {
    let table_sel = Selector::parse("table").expect("invalid table selector");

    let mut best: Option<(usize, Vec<Vec<String>>)> = None;
    for table in doc.select(&table_sel) {
        let matrix = extract_matrix(table)?;

        let mut score = 0;
        let full_text = norm(
            &matrix
                .iter()
                .flat_map(|row| row.iter())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        );
        if full_text.contains("codigo") && full_text.contains("descricao") {
            score += KEYWORD_BONUS;
        }
        score += matrix
            .iter()
            .filter(|row| row.first().is_some_and(|c| looks_like_code(c)))
            .count();

        if best.as_ref().map_or(true, |(top, _)| score > *top) {
            best = Some((score, matrix));
        }
    }

    match best {
        Some((score, matrix)) if score > 0 => {
            debug!(score, rows = matrix.len(), "selected content table");
            Ok(Some(matrix))
        }
        _ => Ok(None),
    }
}
