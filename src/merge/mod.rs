// src/merge/mod.rs
//
// Two folding passes: RecordAggregator collapses one fetch unit's raw
// records onto their natural key, DedupeMerger collapses a whole period's
// batch onto the resolved composite fact key before the upsert.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::parse::{DatasetSpec, RawRecord};
use crate::parse::text::coerce_count;

/// A metric value after coercion. Counts sum; text survives verbatim with
/// last-seen-wins semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(i64),
    Text(String),
}

/// One item's aggregated metrics within a single fetch unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub group: Option<String>,
    pub code: String,
    pub description: Option<String>,
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Resolved composite identity of one fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactKey {
    pub period_id: i32,
    pub municipality_id: i32,
    pub item_id: i64,
}

/// A canonical record tagged with its resolved fact key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRecord {
    pub key: FactKey,
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Collapse one fetch unit's raw records onto (code, group, description),
/// summing counts.
///
/// Known-numeric metrics that fail coercion are zero-filled — the portal's
/// historical behavior — but each fallback is logged so genuine zeros stay
/// distinguishable. Pass-through metrics keep unparseable values as text,
/// last seen wins. Input order does not affect the sums.
pub fn aggregate(spec: &DatasetSpec, records: Vec<RawRecord>) -> Vec<CanonicalRecord> {
    let mut grouped: BTreeMap<(String, Option<String>, Option<String>), CanonicalRecord> =
        BTreeMap::new();

    for record in records {
        let key = (
            record.code.clone(),
            record.group.clone(),
            record.description.clone(),
        );
        let entry = grouped.entry(key).or_insert_with(|| CanonicalRecord {
            group: record.group.clone(),
            code: record.code.clone(),
            description: record.description.clone(),
            metrics: BTreeMap::new(),
        });

        for (name, raw) in record.metrics {
            let value = match coerce_count(&raw) {
                Some(n) => MetricValue::Count(n),
                None if spec.is_numeric_metric(&name) => {
                    warn!(metric = %name, raw = %raw, code = %record.code,
                          "unparseable count coerced to zero");
                    MetricValue::Count(0)
                }
                None => MetricValue::Text(raw),
            };
            merge_metric(&mut entry.metrics, name, value);
        }
    }

    grouped.into_values().collect()
}

/// Collapse a period batch onto the composite fact key so the upsert never
/// sees the same key twice. Fragments of one logical fact (same item, rows
/// differing only in textual decoration upstream) sum their counts here.
pub fn dedupe(batch: Vec<FactRecord>) -> Vec<FactRecord> {
    let mut merged: BTreeMap<FactKey, FactRecord> = BTreeMap::new();
    for record in batch {
        match merged.entry(record.key) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let dst = slot.get_mut();
                for (name, value) in record.metrics {
                    merge_metric(&mut dst.metrics, name, value);
                }
            }
        }
    }
    merged.into_values().collect()
}

/// Fold one metric into an accumulator map: counts add (checked), any
/// type mismatch or overflow resolves to the newest value with a warning.
fn merge_metric(metrics: &mut BTreeMap<String, MetricValue>, name: String, value: MetricValue) {
    match metrics.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => {
            let folded = match (slot.get(), &value) {
                (MetricValue::Count(a), MetricValue::Count(b)) => match a.checked_add(*b) {
                    Some(sum) => Ok(MetricValue::Count(sum)),
                    None => Err("count overflow"),
                },
                _ => Err("metric type mismatch"),
            };
            match folded {
                Ok(sum) => *slot.get_mut() = sum,
                Err(reason) => {
                    warn!(metric = %slot.key(), reason, "keeping newest value");
                    *slot.get_mut() = value;
                }
            }
        }
    }
}
