// src/parse/mod.rs
//
// The parsing core: spanned HTML tables in, normalized records out. Pure
// and synchronous; fetching and persistence live elsewhere.

pub mod classify;
pub mod headers;
pub mod matrix;
pub mod select;
pub mod text;

use scraper::Html;
use thiserror::Error;

pub use headers::{DatasetKind, DatasetSpec};

/// Per-unit parse failures. `NoTableFound` is deliberately absent: a page
/// without a qualifying table is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Identity columns (code/description) did not resolve from a header
    /// row; the fetch unit is unusable.
    #[error("identity columns unresolved: {columns:?}")]
    Schema { columns: Vec<String> },

    /// Table geometry too broken to rectangularize; fatal for the page.
    #[error("table structure unusable: {0}")]
    Structure(String),
}

/// One data row as it left the classifier: raw strings, document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Section label inherited from the closest preceding group row.
    pub group: Option<String>,
    /// Item code; mandatory, 1–4 digits.
    pub code: String,
    pub description: Option<String>,
    /// (metric name, raw cell text), in column order.
    pub metrics: Vec<(String, String)>,
}

/// Parse one fetched page for `spec`.
///
/// `Ok(None)` means no qualifying table (or a qualifying one with no data
/// rows) — the caller treats it like an empty fetch. Errors are scoped to
/// this fetch unit.
pub fn parse_page(spec: &DatasetSpec, html: &str) -> Result<Option<Vec<RawRecord>>, ParseError> {
    let doc = Html::parse_document(html);
    let Some(matrix) = select::select_table(&doc)? else {
        return Ok(None);
    };
    let records = classify::classify_rows(spec, &matrix)?;
    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(records))
}

#[cfg(test)]
mod tests {
    use super::headers::{EXISTING, SUS};
    use super::*;

    const BED_PAGE: &str = "<html><body>\
        <table><tr><td>CNES - Consulta</td></tr></table>\
        <table>\
          <tr><td>Codigo</td><td>Descricao</td><td>Existente</td><td>SUS</td></tr>\
          <tr><td colspan=\"4\">CIRURGICO</td></tr>\
          <tr><td>1</td><td>Cirurgia Geral</td><td>10</td><td>8</td></tr>\
          <tr><td>2</td><td>Ortopedia</td><td>4</td><td>4</td></tr>\
          <tr><td>TOTAL</td><td></td><td>14</td><td>12</td></tr>\
        </table>\
        </body></html>";

    #[test]
    fn full_page_parses_to_records() {
        let spec = DatasetKind::BedType.spec();
        let records = parse_page(spec, BED_PAGE).unwrap().expect("page has data");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].group.as_deref(), Some("CIRURGICO"));
        assert_eq!(records[0].code, "1");
        assert_eq!(
            records[0].metrics,
            vec![
                (EXISTING.to_string(), "10".to_string()),
                (SUS.to_string(), "8".to_string())
            ]
        );
        assert_eq!(records[1].code, "2");
    }

    #[test]
    fn page_without_data_is_none() {
        let spec = DatasetKind::BedType.spec();
        let html = "<html><body><p>Sem dados para a competencia</p></body></html>";
        assert!(parse_page(spec, html).unwrap().is_none());
    }

    #[test]
    fn rowspan_group_cell_does_not_break_data_rows() {
        let spec = DatasetKind::FacilityType.spec();
        let html = "<html><body><table>\
            <tr><td>Codigo</td><td>Descricao</td><td>Estabelecimentos</td><td>SUS</td></tr>\
            <tr><td rowspan=\"2\">99</td><td>Posto de Saude</td><td>3</td><td>3</td></tr>\
            <tr><td>Centro de Saude</td><td>2</td><td>1</td></tr>\
            </table></body></html>";
        let records = parse_page(spec, html).unwrap().unwrap();
        // the carried code reattaches to the continuation row
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "99");
        assert_eq!(records[1].code, "99");
        assert_eq!(records[1].description.as_deref(), Some("Centro de Saude"));
    }
}
