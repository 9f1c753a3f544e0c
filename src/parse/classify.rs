// src/parse/classify.rs
use tracing::trace;

use super::headers::{is_header_row, normalize_headers, DatasetSpec};
use super::text::{looks_like_code, norm};
use super::{ParseError, RawRecord};

/// Walk matrix rows in document order, tracking the current group label
/// and header mapping, and emit one `RawRecord` per data row.
///
/// Check order matters: the purely textual shapes (group label, total
/// marker, header) run before the numeric data-row test so a section
/// label is never mistaken for data. Rows matching nothing are dropped.
pub fn classify_rows(
    spec: &DatasetSpec,
    matrix: &[Vec<String>],
) -> Result<Vec<RawRecord>, ParseError> {
    let mut records = Vec::new();
    let mut current_group: Option<String> = None;
    let mut header_mapping: Option<Vec<String>> = None;

    for row in matrix {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }

        // Group label: one distinct non-empty text starting at the first
        // column (a colspan label repeats across the expanded row) with
        // no digits in it.
        if is_single_label(row) {
            let label = &row[0];
            if !is_total_marker(&norm(label)) {
                current_group = Some(label.clone());
            }
            continue;
        }

        // Total/summary rows carry aggregates we must never emit.
        if row.iter().take(2).any(|c| is_total_marker(&norm(c))) {
            continue;
        }

        if is_header_row(row) {
            header_mapping = Some(normalize_headers(spec, row)?);
            continue;
        }

        if looks_like_code(&row[0]) {
            let description = row.get(1).filter(|d| !d.is_empty()).cloned();
            let metric_cells = if row.len() > 2 { &row[2..] } else { &[][..] };
            let names = match &header_mapping {
                Some(mapping) => mapping.clone(),
                None => spec.fallback_names(metric_cells.len()),
            };
            let metrics: Vec<(String, String)> = names
                .into_iter()
                .zip(metric_cells.iter().cloned())
                .collect();
            records.push(RawRecord {
                group: current_group.clone(),
                code: row[0].clone(),
                description,
                metrics,
            });
            continue;
        }

        trace!(first = %row[0], "dropping unclassified row");
    }

    Ok(records)
}

fn is_single_label(row: &[String]) -> bool {
    let first = &row[0];
    if first.is_empty() || first.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    row.iter().skip(1).all(|c| c.is_empty() || c == first)
}

fn is_total_marker(normed: &str) -> bool {
    normed.starts_with("total") || normed.contains("sumario")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::headers::{DatasetKind, EXISTING, IN_USE, LICENSED, SUS};

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        let width = raw.iter().map(|r| r.len()).max().unwrap_or(0);
        raw.iter()
            .map(|r| {
                let mut row: Vec<String> = r.iter().map(|c| c.to_string()).collect();
                row.resize(width, String::new());
                row
            })
            .collect()
    }

    #[test]
    fn data_row_with_headers_emits_named_metrics() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[
            &["Codigo", "Descricao", "Existente", "SUS"],
            &["12", "Leito A", "10", "3"],
        ]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].code, "12");
        assert_eq!(recs[0].description.as_deref(), Some("Leito A"));
        assert_eq!(
            recs[0].metrics,
            vec![
                (EXISTING.to_string(), "10".to_string()),
                (SUS.to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn group_labels_are_inherited_not_emitted() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[
            &["Codigo", "Descricao", "Existente", "SUS"],
            &["CIRURGICO", "", "", ""],
            &["1", "Leito X", "5", "2"],
            &["CLINICO", "", "", ""],
            &["2", "Leito Y", "7", "1"],
        ]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].group.as_deref(), Some("CIRURGICO"));
        assert_eq!(recs[1].group.as_deref(), Some("CLINICO"));
    }

    #[test]
    fn colspan_expanded_group_label_is_recognized() {
        let spec = DatasetKind::BedType.spec();
        // a colspan label arrives from the matrix as repeated text
        let matrix = rows(&[
            &["OBSTETRICO", "OBSTETRICO", "OBSTETRICO", "OBSTETRICO"],
            &["3", "Leito Z", "4", "4"],
        ]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs[0].group.as_deref(), Some("OBSTETRICO"));
    }

    #[test]
    fn total_rows_never_reach_the_output() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[
            &["Codigo", "Descricao", "Existente", "SUS"],
            &["1", "Leito X", "5", "2"],
            &["TOTAL", "", "120", "45"],
            &["Total Geral", "", "9", "9"],
        ]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].code, "1");
    }

    #[test]
    fn total_label_alone_does_not_become_a_group() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[
            &["Sumário", "", ""],
            &["GRUPO A", "", ""],
            &["7", "Leito W", "2"],
        ]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs[0].group.as_deref(), Some("GRUPO A"));
    }

    #[test]
    fn header_refresh_mid_table_renames_following_metrics() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[
            &["Codigo", "Descricao", "Existente", "SUS"],
            &["1", "Leito X", "5", "2"],
            &["Codigo", "Descricao", "Existente", "Habilitados"],
            &["2", "Leito Y", "7", "1"],
        ]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs[0].metrics[1].0, SUS);
        assert_eq!(recs[1].metrics[1].0, LICENSED);
    }

    #[test]
    fn headerless_rows_use_the_positional_fallback() {
        let spec = DatasetKind::Equipment.spec();
        let matrix = rows(&[&["21", "Tomografo", "4", "3", "2", "1"]]);
        let recs = classify_rows(spec, &matrix).unwrap();
        assert_eq!(recs[0].metrics[0].0, EXISTING);
        assert_eq!(recs[0].metrics[1].0, IN_USE);
        assert_eq!(recs[0].metrics.len(), 4);
    }

    #[test]
    fn five_digit_leading_cell_is_not_data() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[&["12345", "whatever", "1", "1"]]);
        assert!(classify_rows(spec, &matrix).unwrap().is_empty());
    }

    #[test]
    fn malformed_header_row_fails_the_unit() {
        let spec = DatasetKind::BedType.spec();
        let matrix = rows(&[
            &["Codigo", "Nome", "Existente"],
            &["1", "Leito X", "5"],
        ]);
        let err = classify_rows(spec, &matrix).unwrap_err();
        assert!(matches!(err, ParseError::Schema { .. }));
    }
}
