//! Run-to-run comparison of extractor summaries on average warm runtime.

use crate::extract::SummaryRow;
use crate::report::{Cell, Table};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Relative slowdown tolerated before a query counts as a regression.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuntimeChange {
    pub query: String,
    pub baseline_ms: f64,
    pub candidate_ms: f64,
    /// `(candidate - baseline) / baseline`; positive means slower.
    pub relative: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SummaryDiff {
    pub tolerance: f64,
    pub regressions: Vec<RuntimeChange>,
    pub improvements: Vec<RuntimeChange>,
    pub new_queries: Vec<String>,
    pub missing_queries: Vec<String>,
    /// Present on both sides but without a warm runtime on at least one.
    pub unmeasured: Vec<String>,
}

impl SummaryDiff {
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    pub fn to_table(&self) -> Table {
        let mut t = Table::new(["query", "change", "baseline_ms", "candidate_ms", "relative"]);
        let mut push = |kind: &str, c: &RuntimeChange| {
            t.push(vec![
                Cell::text(&c.query),
                Cell::text(kind),
                Cell::Num(Some(c.baseline_ms)),
                Cell::Num(Some(c.candidate_ms)),
                Cell::Num(Some(c.relative)),
            ])
        };
        for c in &self.regressions {
            push("regression", c);
        }
        for c in &self.improvements {
            push("improvement", c);
        }
        for (kind, names) in [
            ("new", &self.new_queries),
            ("missing", &self.missing_queries),
            ("unmeasured", &self.unmeasured),
        ] {
            for q in names {
                t.push(vec![
                    Cell::text(q),
                    Cell::text(kind),
                    Cell::Num(None),
                    Cell::Num(None),
                    Cell::Num(None),
                ]);
            }
        }
        t
    }
}

pub fn compare(baseline: &[SummaryRow], candidate: &[SummaryRow], tolerance: f64) -> SummaryDiff {
    let mut diff = SummaryDiff {
        tolerance,
        ..Default::default()
    };

    let base: HashMap<&str, Option<f64>> = baseline
        .iter()
        .map(|r| (r.query.as_str(), r.avg_warm_runtime))
        .collect();
    let mut seen = HashSet::new();

    for row in candidate {
        seen.insert(row.query.as_str());
        let Some(base_ms) = base.get(row.query.as_str()) else {
            diff.new_queries.push(row.query.clone());
            continue;
        };
        let (Some(base_ms), Some(cand_ms)) = (*base_ms, row.avg_warm_runtime) else {
            diff.unmeasured.push(row.query.clone());
            continue;
        };
        let relative = if base_ms > 0.0 {
            (cand_ms - base_ms) / base_ms
        } else if cand_ms > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        let change = RuntimeChange {
            query: row.query.clone(),
            baseline_ms: base_ms,
            candidate_ms: cand_ms,
            relative,
        };
        if relative > tolerance {
            diff.regressions.push(change);
        } else if relative < -tolerance {
            diff.improvements.push(change);
        }
    }

    for q in base.keys() {
        if !seen.contains(q) {
            diff.missing_queries.push(q.to_string());
        }
    }

    diff.regressions.sort_by(|a, b| a.query.cmp(&b.query));
    diff.improvements.sort_by(|a, b| a.query.cmp(&b.query));
    diff.new_queries.sort();
    diff.missing_queries.sort();
    diff.unmeasured.sort();
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(q: &str, warm: Option<f64>) -> SummaryRow {
        SummaryRow {
            query: q.into(),
            avg_warm_runtime: warm,
            ..Default::default()
        }
    }

    #[test]
    fn classifies_changes_beyond_tolerance() {
        let base = vec![
            row("q1", Some(100.0)),
            row("q2", Some(100.0)),
            row("q3", Some(100.0)),
            row("q4", Some(50.0)),
            row("gone", Some(1.0)),
        ];
        let cand = vec![
            row("q3", Some(104.0)),
            row("q2", Some(80.0)),
            row("q1", Some(120.0)),
            row("q4", None),
            row("fresh", Some(1.0)),
        ];
        let diff = compare(&base, &cand, 0.05);
        assert_eq!(diff.regressions.len(), 1);
        assert_eq!(diff.regressions[0].query, "q1");
        assert!((diff.regressions[0].relative - 0.2).abs() < 1e-9);
        assert_eq!(diff.improvements[0].query, "q2");
        assert_eq!(diff.new_queries, vec!["fresh"]);
        assert_eq!(diff.missing_queries, vec!["gone"]);
        assert_eq!(diff.unmeasured, vec!["q4"]);
        assert!(diff.has_regressions());
    }

    #[test]
    fn output_order_does_not_depend_on_input_order() {
        let base = vec![row("b", Some(1.0)), row("a", Some(1.0)), row("c", Some(1.0))];
        let mut cand = vec![row("a", Some(2.0)), row("c", Some(2.0)), row("b", Some(2.0))];
        let first = compare(&base, &cand, 0.05);
        cand.reverse();
        assert_eq!(compare(&base, &cand, 0.05), first);
        let names: Vec<&str> = first.regressions.iter().map(|c| c.query.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn table_lists_every_entry() {
        let diff = compare(&[row("q1", Some(10.0))], &[row("q1", Some(20.0)), row("q9", None)], 0.1);
        let t = diff.to_table();
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0][1], Cell::text("regression"));
        assert_eq!(t.rows[1][0], Cell::text("q9"));
    }
}
