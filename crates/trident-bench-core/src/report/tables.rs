//! Tables for the scan (1), SPARQL (2) and analytics (4) experiments.

use super::{Cell, Table};
use crate::extract::value::{mean, time_between};
use crate::orchestrator::list_visible;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub const TEST1_PERMS: std::ops::Range<i64> = 0..6;
pub const TEST1_TYPES: std::ops::Range<i64> = 0..5;

/// Datasets of the SPARQL table with their query counts.
pub const TEST2_DATASETS: &[(&str, usize)] = &[("lubm1b", 14), ("btc2012", 5)];

pub const TEST4_DATASETS: &[(&str, &str)] = &[("astro", "a"), ("web", "w"), ("twitter", "t")];

/// Analytics tasks and the label the SNAP test program prints for each.
/// Lines are matched against the labels in this order.
pub const SNAP_LABELS: &[(&str, &str)] = &[
    ("hits", "Hits"),
    ("pagerank", "PR"),
    ("clustcoef", "ClusterCoeff"),
    ("triangles", "Triangles"),
    ("diameter", "Diameter"),
    ("maxwcc", "MaxWcc"),
    ("maxscc", "MaxScc"),
    ("rw", "RandomWalk"),
    ("bfs", "BFS"),
    ("mod", "Mod"),
    ("betcentr", "BetCentr"),
];

/// The results directory of one experiment: `results` if present, else the
/// most recent `results-*` directory the launcher created.
pub fn latest_results_dir(test_dir: &Path) -> anyhow::Result<PathBuf> {
    let plain = test_dir.join("results");
    if plain.is_dir() {
        return Ok(plain);
    }
    let mut best: Option<(std::time::SystemTime, String)> = None;
    for name in list_visible(test_dir)? {
        if !name.starts_with("results-") {
            continue;
        }
        let meta = std::fs::metadata(test_dir.join(&name))?;
        if !meta.is_dir() {
            continue;
        }
        let key = (meta.modified()?, name);
        if best.as_ref().map_or(true, |b| key > *b) {
            best = Some(key);
        }
    }
    best.map(|(_, name)| test_dir.join(name))
        .with_context(|| format!("no results directory under {}", test_dir.display()))
}

/// Warm scan runtimes per permutation and scan type, one column per storage layout.
pub fn test1_table(results: &Path) -> anyhow::Result<Table> {
    let mut values: HashMap<(i64, i64, String), f64> = HashMap::new();
    let mut confs = BTreeSet::new();

    for file in list_visible(results)? {
        let conf = match file.find('_') {
            Some(pos) => file[pos + 1..].to_string(),
            None => file.clone(),
        };
        let path = results.join(&file);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for line in text.lines() {
            if line.starts_with("PERM") {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            let parsed = (
                tokens.first().and_then(|t| t.trim().parse::<i64>().ok()),
                tokens.get(1).and_then(|t| t.trim().parse::<i64>().ok()),
                tokens.get(5).and_then(|t| t.trim().parse::<f64>().ok()),
            );
            match parsed {
                (Some(perm), Some(typ), Some(warm)) => {
                    values.entry((perm, typ, conf.clone())).or_insert(warm);
                }
                _ => tracing::debug!(file = %file, line, "skipping scan line"),
            }
        }
        confs.insert(conf);
    }

    let mut table = Table::new(
        ["perm".to_string(), "type".to_string()]
            .into_iter()
            .chain(confs.iter().cloned()),
    );
    for perm in TEST1_PERMS {
        for typ in TEST1_TYPES {
            let mut row = vec![Cell::Int(perm), Cell::Int(typ)];
            for conf in &confs {
                row.push(Cell::Num(values.get(&(perm, typ, conf.clone())).copied()));
            }
            table.push(row);
        }
    }
    Ok(table)
}

/// Splits a query log name around the index `n - 1` to recover the naming
/// scheme of the whole batch, e.g. `logs_q13.sparql` -> (`logs_q`, `.sparql`).
pub fn infer_query_pattern(names: &[String], n: usize) -> Option<(String, String)> {
    let needle = n.saturating_sub(1).to_string();
    names
        .iter()
        .filter(|f| !f.ends_with("results") && !f.ends_with(".gz") && !f.starts_with("results_"))
        .find_map(|f| {
            let pos = f.find(&needle)?;
            Some((f[..pos].to_string(), f[pos + needle.len()..].to_string()))
        })
}

/// Mean optimizer time per query index, first run excluded.
fn optimizer_times(dir: &Path, n: usize, marker: &str) -> anyhow::Result<BTreeMap<usize, Option<f64>>> {
    let mut out = BTreeMap::new();
    if !dir.is_dir() {
        tracing::warn!("missing results directory {}", dir.display());
        return Ok(out);
    }
    let names = list_visible(dir)?;
    let Some((prefix, suffix)) = infer_query_pattern(&names, n) else {
        tracing::warn!("no query logs recognised in {}", dir.display());
        return Ok(out);
    };
    for j in 0..=n {
        let path = dir.join(format!("{}{}{}", prefix, j, suffix));
        if !path.is_file() {
            continue;
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let runtimes: Vec<f64> = text
            .lines()
            .filter(|l| l.contains(marker))
            .filter_map(|l| time_between(l, ": ", "ms."))
            .collect();
        let warm = runtimes.get(1..).unwrap_or(&[]);
        out.insert(j, mean(warm));
    }
    Ok(out)
}

/// Optimizer time of the engine (both query paths) against the baseline store.
pub fn test2_table(results: &Path) -> anyhow::Result<Table> {
    let mut table = Table::new(["Queries", "Trident-ISO", "Trident-RDF3X", "RDF3X"]);
    for (ds, n) in TEST2_DATASETS {
        let native = optimizer_times(&results.join(format!("{}-native", ds)), *n, "Runtime queryopti")?;
        let sparql = optimizer_times(&results.join(ds), *n, "Runtime queryopti")?;
        let baseline = optimizer_times(&results.join(format!("{}-rdf3x", ds)), *n, "Time optimizer")?;

        let indices: BTreeSet<usize> = native
            .keys()
            .chain(sparql.keys())
            .chain(baseline.keys())
            .copied()
            .collect();
        for j in indices {
            let get = |m: &BTreeMap<usize, Option<f64>>| Cell::Num(m.get(&j).copied().flatten());
            table.push(vec![
                Cell::text(format!("{}-{}", ds, j)),
                get(&native),
                get(&sparql),
                get(&baseline),
            ]);
        }
    }
    Ok(table)
}

fn find_file(dir: &Path, pred: impl Fn(&str) -> bool) -> anyhow::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    Ok(list_visible(dir)?
        .into_iter()
        .find(|f| pred(f))
        .map(|f| dir.join(f)))
}

fn snap_runtimes(path: &Path) -> anyhow::Result<HashMap<&'static str, f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut out = HashMap::new();
    for line in text.lines() {
        let Some((task, _)) = SNAP_LABELS.iter().find(|(_, label)| line.contains(label)) else {
            continue;
        };
        if let Some(ms) = time_between(line, ": ", " ms.") {
            out.insert(*task, ms);
        }
    }
    Ok(out)
}

fn engine_runtime(path: &Path) -> anyhow::Result<Option<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .filter(|l| l.contains("Runtime"))
        .filter_map(|l| time_between(l, ": ", " ms."))
        .last())
}

/// SNAP against the engine for every analytics task, reading `<test4>/snap`
/// and `<test4>/trident`.
pub fn test4_table(test_dir: &Path) -> anyhow::Result<Table> {
    let snap_dir = test_dir.join("snap");
    let engine_dir = test_dir.join("trident");

    let mut columns = vec!["task".to_string()];
    let mut per_dataset = Vec::new();
    for (ds, short) in TEST4_DATASETS {
        columns.push(format!("snap({})", short));
        columns.push(format!("trident({})", short));

        let snap = match find_file(&snap_dir, |f| f.ends_with(ds))? {
            Some(p) => snap_runtimes(&p)?,
            None => HashMap::new(),
        };
        let mut engine = HashMap::new();
        for (task, _) in SNAP_LABELS {
            if let Some(p) = find_file(&engine_dir, |f| f.starts_with(ds) && f.ends_with(task))? {
                if let Some(ms) = engine_runtime(&p)? {
                    engine.insert(*task, ms);
                }
            }
        }
        per_dataset.push((snap, engine));
    }

    let mut table = Table::new(columns);
    for (task, _) in SNAP_LABELS {
        let mut row = vec![Cell::text(*task)];
        for (snap, engine) in &per_dataset {
            row.push(Cell::Num(snap.get(task).copied()));
            row.push(Cell::Num(engine.get(task).copied()));
        }
        table.push(row);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_split_around_last_index() {
        let names: Vec<String> = ["logs_q1.sparql", "logs_q13.sparql", "results_q13.sparql"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            infer_query_pattern(&names, 14),
            Some(("logs_q".to_string(), ".sparql".to_string()))
        );
        assert_eq!(infer_query_pattern(&names, 30), None);
    }

    #[test]
    fn test1_reads_warm_column_per_configuration() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test_row"),
            "PERM\tTYPE\tA\tB\tCOLD\tWARM\n0\t0\tx\tx\t9\t1.5\n0\t0\tx\tx\t9\t99\n5\t4\tx\tx\t9\t2\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("test_column"), "0\t1\tx\tx\t9\t3\n").unwrap();

        let t = test1_table(dir.path()).unwrap();
        assert_eq!(t.columns, vec!["perm", "type", "column", "row"]);
        assert_eq!(t.rows.len(), 30);
        assert_eq!(t.rows[0][3], Cell::Num(Some(1.5)));
        assert_eq!(t.rows[0][2], Cell::Num(None));
        assert_eq!(t.rows[1][2], Cell::Num(Some(3.0)));
        assert_eq!(t.rows[29][3], Cell::Num(Some(2.0)));
    }

    #[test]
    fn latest_results_prefers_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("results-01-01-20-10:00:00")).unwrap();
        assert_eq!(
            latest_results_dir(dir.path()).unwrap(),
            dir.path().join("results-01-01-20-10:00:00")
        );
        std::fs::create_dir(dir.path().join("results")).unwrap();
        assert_eq!(latest_results_dir(dir.path()).unwrap(), dir.path().join("results"));
        assert!(latest_results_dir(&dir.path().join("nope")).is_err());
    }
}
