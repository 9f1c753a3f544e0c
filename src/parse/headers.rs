// src/parse/headers.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{norm, pretty};
use super::ParseError;

// Canonical metric names. Everything downstream (aggregation, dedupe,
// the JSONB metrics column) keys on these.
pub const EXISTING: &str = "Existing";
pub const IN_USE: &str = "InUse";
pub const SUS: &str = "SUS";
pub const LICENSED: &str = "Licensed";
pub const TOTAL: &str = "Total";
pub const EXISTING_SUS: &str = "Existing-SUS";
pub const IN_USE_SUS: &str = "InUse-SUS";

/// The three CNES indicator modules this scraper covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    BedType,
    Equipment,
    FacilityType,
}

/// Everything that varies between the indicator modules. The parsing
/// algorithm itself does not; it is parametrized by one of these.
#[derive(Debug)]
pub struct DatasetSpec {
    pub kind: DatasetKind,
    /// Page name on the CNES host.
    pub page: &'static str,
    /// `dim_item.kind` value for identity resolution.
    pub item_kind: &'static str,
    /// Normalized header token → canonical metric name.
    synonyms: &'static [(&'static str, &'static str)],
    /// Metrics a header row must yield for this kind; if any is missing,
    /// the positional fallback is considered.
    mandatory: &'static [&'static str],
    /// Fixed column order used when the source exposes only unlabeled
    /// placeholder columns of exactly this arity.
    positional: &'static [&'static str],
}

static BED_TYPE: DatasetSpec = DatasetSpec {
    kind: DatasetKind::BedType,
    page: "Mod_Ind_Tipo_Leito.asp",
    item_kind: "leito",
    synonyms: &[
        ("existente", EXISTING),
        ("existentes", EXISTING),
        ("qtd existente", EXISTING),
        ("qtd existentes", EXISTING),
        ("sus", SUS),
        ("leitos sus", SUS),
        ("quantidade sus", SUS),
        ("habilitado", LICENSED),
        ("habilitados", LICENSED),
        ("leitos habilitados", LICENSED),
        ("qtd habilitados", LICENSED),
        ("total", TOTAL),
        // canonical names normalize back to themselves
        ("existing", EXISTING),
        ("licensed", LICENSED),
    ],
    mandatory: &[EXISTING],
    positional: &[EXISTING, SUS, LICENSED],
};

static EQUIPMENT: DatasetSpec = DatasetSpec {
    kind: DatasetKind::Equipment,
    page: "Mod_Ind_Equipamento.asp",
    item_kind: "equipamento",
    synonyms: &[
        ("existente", EXISTING),
        ("existentes", EXISTING),
        ("em uso", IN_USE),
        ("existente sus", EXISTING_SUS),
        ("existentes sus", EXISTING_SUS),
        ("em uso sus", IN_USE_SUS),
        ("total", TOTAL),
        // canonical names normalize back to themselves
        ("existing", EXISTING),
        ("inuse", IN_USE),
        ("existing sus", EXISTING_SUS),
        ("inuse sus", IN_USE_SUS),
    ],
    mandatory: &[EXISTING, IN_USE],
    positional: &[EXISTING, IN_USE, EXISTING_SUS, IN_USE_SUS],
};

static FACILITY_TYPE: DatasetSpec = DatasetSpec {
    kind: DatasetKind::FacilityType,
    page: "Mod_Ind_Unidade.asp",
    item_kind: "tipo_unidade",
    synonyms: &[
        ("estabelecimento", EXISTING),
        ("estabelecimentos", EXISTING),
        ("existente", EXISTING),
        ("existentes", EXISTING),
        ("sus", SUS),
        ("total", TOTAL),
        // canonical names normalize back to themselves
        ("existing", EXISTING),
    ],
    mandatory: &[EXISTING],
    positional: &[EXISTING, SUS],
};

impl DatasetKind {
    pub fn spec(self) -> &'static DatasetSpec {
        match self {
            DatasetKind::BedType => &BED_TYPE,
            DatasetKind::Equipment => &EQUIPMENT,
            DatasetKind::FacilityType => &FACILITY_TYPE,
        }
    }

    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::BedType,
        DatasetKind::Equipment,
        DatasetKind::FacilityType,
    ];
}

impl DatasetSpec {
    /// Canonical names for the known-numeric metrics of this kind.
    pub fn is_numeric_metric(&self, name: &str) -> bool {
        name == TOTAL
            || self.synonyms.iter().any(|(_, canon)| *canon == name)
            || self.positional.contains(&name)
    }

    /// Metric names for a data row seen with no header context: the fixed
    /// per-kind order when the arity matches exactly, otherwise opaque
    /// placeholder names.
    pub fn fallback_names(&self, arity: usize) -> Vec<String> {
        if arity == self.positional.len() {
            self.positional.iter().map(|s| s.to_string()).collect()
        } else {
            (1..=arity).map(|i| format!("Valor{}", i)).collect()
        }
    }
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^valor ?\d+$").unwrap());

// Header token comparison folds "_" and "-" into spaces on top of the
// usual normalization, so "Qtd_Existentes" and "qtd existentes" agree.
fn norm_header(s: &str) -> String {
    norm(&s.replace(['_', '-'], " "))
}

fn is_code_header(n: &str) -> bool {
    matches!(n, "codigo" | "cod" | "cod.")
}

fn is_description_header(n: &str) -> bool {
    n.starts_with("descricao")
}

/// True when a row's leading cells look like header tokens at all. The
/// classifier uses this loose test; `normalize_headers` then insists both
/// identity columns actually resolve.
pub fn is_header_row(cells: &[String]) -> bool {
    let code = cells.first().map(|c| is_code_header(&norm_header(c)));
    let description = cells.get(1).map(|c| is_description_header(&norm_header(c)));
    code == Some(true) || description == Some(true)
}

/// Map a header row's cells to canonical metric names for the columns
/// after code/description.
///
/// Recognized tokens go through the kind's synonym table; unrecognized
/// ones pass through title-cased, keeping the metric set open-ended. When
/// the mandatory metrics are still missing and every metric column is an
/// unlabeled placeholder of exactly the expected arity, the per-kind
/// positional order applies instead. Unresolvable identity columns are a
/// `ParseError::Schema` naming the offenders.
pub fn normalize_headers(spec: &DatasetSpec, cells: &[String]) -> Result<Vec<String>, ParseError> {
    if cells.len() < 2 {
        return Err(ParseError::Schema {
            columns: cells.to_vec(),
        });
    }
    let code = norm_header(&cells[0]);
    let description = norm_header(&cells[1]);
    if !is_code_header(&code) || !is_description_header(&description) {
        let mut columns = Vec::new();
        if !is_code_header(&code) {
            columns.push(cells[0].clone());
        }
        if !is_description_header(&description) {
            columns.push(cells[1].clone());
        }
        return Err(ParseError::Schema { columns });
    }

    let metric_cells = &cells[2..];
    let normed: Vec<String> = metric_cells.iter().map(|c| norm_header(c)).collect();

    let mut names: Vec<String> = Vec::with_capacity(metric_cells.len());
    for (raw, n) in metric_cells.iter().zip(&normed) {
        match spec.synonyms.iter().find(|(token, _)| *token == n.as_str()) {
            Some((_, canon)) => names.push(canon.to_string()),
            None => names.push(pretty(raw)),
        }
    }

    let mandatory_missing = spec
        .mandatory
        .iter()
        .any(|m| !names.iter().any(|n| n.as_str() == *m));
    let all_placeholders = !normed.is_empty()
        && normed
            .iter()
            .all(|n| n.is_empty() || PLACEHOLDER.is_match(n));
    if mandatory_missing && all_placeholders && normed.len() == spec.positional.len() {
        return Ok(spec.positional.iter().map(|s| s.to_string()).collect());
    }

    Ok(names)
}
