use super::{Cell, Table};
use crate::extract::SummaryRow;
use std::collections::{BTreeMap, BTreeSet};

/// Joins extractor summaries on query name: one warm-runtime column per
/// summary, queries in name order. Queries absent from a summary get `-1`.
pub fn join_summaries(named: &[(String, Vec<SummaryRow>)]) -> Table {
    let mut table = Table::new(
        std::iter::once("QUERY".to_string()).chain(named.iter().map(|(name, _)| name.clone())),
    );

    let lookups: Vec<BTreeMap<&str, Option<f64>>> = named
        .iter()
        .map(|(_, rows)| {
            rows.iter()
                .map(|r| (r.query.as_str(), r.avg_warm_runtime))
                .collect()
        })
        .collect();
    let queries: BTreeSet<&str> = lookups.iter().flat_map(|m| m.keys().copied()).collect();

    for q in queries {
        let mut row = vec![Cell::text(q)];
        row.extend(
            lookups
                .iter()
                .map(|m| Cell::Num(m.get(q).copied().flatten())),
        );
        table.push(row);
    }
    table
}

/// Column label for a summary file: its stem, or the parent directory for
/// generic names such as `summary.tsv`.
pub fn summary_label(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.is_empty() || stem == "summary" {
        if let Some(parent) = path.parent().and_then(|p| p.file_name()) {
            return parent.to_string_lossy().into_owned();
        }
    }
    stem
}
