//! Turns per-query log files into one summary row per query.
//!
//! The first occurrence of a runtime marker is the cold run; every later one
//! is a warm run. Single-shot markers (memory, I/O, rows) keep their first value.

pub mod profile;
pub mod rows;
pub mod value;

pub use profile::LogProfile;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use value::{mean, value_after};

pub const SUMMARY_HEADER: &str =
    "QUERY\tCOLD_RUNTIME\tAVG_WARM_RUNTIME\tCOLD_Q_RUNTIME\tAVG_WARM_Q_RUNTIME\tROWS\tMAXMEM_MB\tIO_BYTES";

/// Sentinel written for a value the log never reported.
pub const MISSING: &str = "-1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub cold: Option<f64>,
    pub warm: Vec<f64>,
}

impl Timing {
    fn record(&mut self, v: f64) {
        if self.cold.is_none() {
            self.cold = Some(v);
        } else {
            self.warm.push(v);
        }
    }

    pub fn warm_mean(&self) -> Option<f64> {
        mean(&self.warm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub query: String,
    pub total: Timing,
    pub query_time: Timing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<Timing>,
    pub rows: Option<u64>,
    pub max_mem_mb: Option<f64>,
    pub io_bytes: Option<f64>,
}

/// One line of a summary file: what survives after averaging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub query: String,
    pub cold_runtime: Option<f64>,
    pub avg_warm_runtime: Option<f64>,
    pub cold_q_runtime: Option<f64>,
    pub avg_warm_q_runtime: Option<f64>,
    pub rows: Option<u64>,
    pub max_mem_mb: Option<f64>,
    pub io_bytes: Option<f64>,
}

impl QueryRow {
    pub fn summary(&self) -> SummaryRow {
        SummaryRow {
            query: self.query.clone(),
            cold_runtime: self.total.cold,
            avg_warm_runtime: self.total.warm_mean(),
            cold_q_runtime: self.query_time.cold,
            avg_warm_q_runtime: self.query_time.warm_mean(),
            rows: self.rows,
            max_mem_mb: self.max_mem_mb,
            io_bytes: self.io_bytes,
        }
    }
}

fn take_first(slot: &mut Option<f64>, line: &str, marker: &str) {
    if slot.is_none() {
        *slot = parse_marker(line, marker);
    }
}

fn parse_marker(line: &str, marker: &str) -> Option<f64> {
    let v = value_after(line, marker);
    if v.is_none() {
        tracing::debug!(marker, line, "marker without a readable value");
    }
    v
}

fn record(timing: &mut Timing, line: &str, marker: &str) {
    if let Some(v) = parse_marker(line, marker) {
        timing.record(v);
    }
}

/// Scans one log. The result count is only filled in when the log states it.
pub fn extract_from_reader<R: BufRead>(
    profile: &LogProfile,
    query: &str,
    reader: R,
) -> std::io::Result<QueryRow> {
    let mut row = QueryRow {
        query: query.to_string(),
        optimizer: profile.optimizer.map(|_| Timing::default()),
        ..Default::default()
    };

    for line in reader.lines() {
        let line = line?;
        if line.contains(profile.total) {
            record(&mut row.total, &line, profile.total);
        }
        if line.contains(profile.query) {
            record(&mut row.query_time, &line, profile.query);
        }
        if let (Some(marker), Some(t)) = (profile.optimizer, row.optimizer.as_mut()) {
            if line.contains(marker) {
                record(t, &line, marker);
            }
        }
        if line.contains(profile.memory) {
            take_first(&mut row.max_mem_mb, &line, profile.memory);
        }
        if let Some(marker) = profile.rows_marker {
            if row.rows.is_none() && line.contains(marker) {
                row.rows = parse_marker(&line, marker).map(|v| v as u64);
            }
        }
        if row.io_bytes.is_none() && line.contains(profile.io) {
            row.io_bytes = parse_marker(&line, profile.io);
            // The results pass is over; the cold run is the next one.
            if profile.io_resets_cold {
                row.total.cold = None;
                row.query_time.cold = None;
                if let Some(t) = row.optimizer.as_mut() {
                    t.cold = None;
                }
            }
        }
    }
    Ok(row)
}

/// Extracts every candidate log of `dir`, sorted by query name.
pub fn extract_dir(dir: &Path, profile: &LogProfile) -> anyhow::Result<Vec<QueryRow>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if profile.candidates.accepts(&name) {
            names.push(name);
        }
    }
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        let file = std::fs::File::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let query = profile.query_name(&name);
        let mut row = extract_from_reader(profile, query, BufReader::new(file))
            .with_context(|| format!("failed to read {}", path.display()))?;

        if row.rows.is_none() {
            let results = dir.join(profile.rows.file_name(query));
            let count = rows::count_result_rows(&results, profile.rows.skip)?;
            row.rows = Some(count.ok_or_else(|| {
                anyhow::anyhow!(
                    "no row count in {} and no results file {} (or .gz)",
                    path.display(),
                    results.display()
                )
            })?);
        }
        out.push(row);
    }
    out.sort_by(|a, b| a.query.cmp(&b.query));
    Ok(out)
}

pub fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| MISSING.to_string())
}

pub fn write_summary<W: Write>(mut w: W, rows: &[SummaryRow]) -> std::io::Result<()> {
    writeln!(w, "{}", SUMMARY_HEADER)?;
    for r in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.query,
            fmt_opt(r.cold_runtime),
            fmt_opt(r.avg_warm_runtime),
            fmt_opt(r.cold_q_runtime),
            fmt_opt(r.avg_warm_q_runtime),
            r.rows.map(|n| n.to_string()).unwrap_or_else(|| MISSING.to_string()),
            fmt_opt(r.max_mem_mb),
            fmt_opt(r.io_bytes),
        )?;
    }
    Ok(())
}

pub fn write_json<W: Write>(w: W, rows: &[QueryRow]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(w, rows).context("failed to serialize rows")
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell == MISSING || cell.eq_ignore_ascii_case("nan") || cell.is_empty() {
        return None;
    }
    cell.parse().ok()
}

/// Parses summary text written by [`write_summary`] (or the JSON rows of
/// [`write_json`]).
pub fn parse_summary(text: &str) -> anyhow::Result<Vec<SummaryRow>> {
    if text.trim_start().starts_with('[') {
        let rows: Vec<QueryRow> = serde_json::from_str(text).context("invalid JSON summary")?;
        return Ok(rows.iter().map(QueryRow::summary).collect());
    }

    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("QUERY\t") {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() < 8 {
            anyhow::bail!(
                "line {}: expected 8 tab-separated fields, found {}",
                i + 1,
                cells.len()
            );
        }
        out.push(SummaryRow {
            query: cells[0].to_string(),
            cold_runtime: parse_cell(cells[1]),
            avg_warm_runtime: parse_cell(cells[2]),
            cold_q_runtime: parse_cell(cells[3]),
            avg_warm_q_runtime: parse_cell(cells[4]),
            rows: parse_cell(cells[5]).map(|v| v as u64),
            max_mem_mb: parse_cell(cells[6]),
            io_bytes: parse_cell(cells[7]),
        });
    }
    Ok(out)
}

pub fn read_summary(path: &Path) -> anyhow::Result<Vec<SummaryRow>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read summary {}", path.display()))?;
    parse_summary(&text).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE_LOG: &str = "\
CMD: trident query -i db -q q1 -l debug
[0x1 2020-01-01 10:00:00.000] DEBUG Runtime queryopti: 3ms.
[0x1 2020-01-01 10:00:00.000] INFO Runtime queryexec: 9ms.
[0x1 2020-01-01 10:00:00.000] INFO Runtime total: 12ms.
[0x1 2020-01-01 10:00:00.000] INFO # rows = 42
[0x1 2020-01-01 10:00:00.000] INFO Process IO Read bytes = 4096
CMD: trident query -i db -q q1 -l info -r 6 --decodeoutput false
[0x1 2020-01-01 10:00:01.000] DEBUG Runtime queryopti: 2ms.
[0x1 2020-01-01 10:00:01.000] INFO Runtime queryexec: 7ms.
[0x1 2020-01-01 10:00:01.000] INFO Runtime total: 10ms.
[0x1 2020-01-01 10:00:01.000] INFO Runtime total: 4ms.
[0x1 2020-01-01 10:00:01.000] INFO Runtime total: 6ms.
[0x1 2020-01-01 10:00:01.000] INFO Max memory: 512MB
[0x1 2020-01-01 10:00:01.000] INFO Process IO Read bytes = 8192
";

    #[test]
    fn io_line_restarts_cold_measurement() {
        let row = extract_from_reader(&LogProfile::engine(), "q1", ENGINE_LOG.as_bytes()).unwrap();
        assert_eq!(row.total.cold, Some(10.0));
        assert_eq!(row.total.warm, vec![4.0, 6.0]);
        assert_eq!(row.total.warm_mean(), Some(5.0));
        assert_eq!(row.query_time.cold, Some(7.0));
        assert_eq!(row.query_time.warm_mean(), None);
        assert_eq!(row.optimizer.as_ref().unwrap().cold, Some(2.0));
        assert_eq!(row.rows, Some(42));
        assert_eq!(row.max_mem_mb, Some(512.0));
        assert_eq!(row.io_bytes, Some(4096.0));
    }

    #[test]
    fn cold_value_is_the_first_and_warm_mean_the_rest() {
        let log = "Time total: 100 ms\nTime total: 10 ms\nTime total: 20 ms\nTime query: 5 ms\n";
        let row = extract_from_reader(&LogProfile::baseline(), "q", log.as_bytes()).unwrap();
        assert_eq!(row.total.cold, Some(100.0));
        assert_eq!(row.total.warm_mean(), Some(15.0));
        assert_eq!(row.query_time.cold, Some(5.0));
        assert!(row.optimizer.is_none());
    }

    #[test]
    fn missing_markers_render_as_sentinel() {
        let row = extract_from_reader(&LogProfile::engine(), "empty", "nothing here\n".as_bytes())
            .unwrap();
        let mut buf = Vec::new();
        write_summary(&mut buf, &[row.summary()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("empty\t-1\t-1\t-1\t-1\t-1\t-1\t-1"));
    }

    #[test]
    fn summary_text_parses_back() {
        let rows = vec![SummaryRow {
            query: "q2".into(),
            cold_runtime: Some(12.5),
            avg_warm_runtime: Some(3.25),
            cold_q_runtime: None,
            avg_warm_q_runtime: Some(1.0),
            rows: Some(7),
            max_mem_mb: None,
            io_bytes: Some(1024.0),
        }];
        let mut buf = Vec::new();
        write_summary(&mut buf, &rows).unwrap();
        let parsed = parse_summary(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn parse_summary_rejects_short_lines() {
        let err = parse_summary("QUERY\tX\nq1\t1\t2\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn numpy_nan_is_missing() {
        let parsed = parse_summary("q1\t5.0\tnan\t-1\tnan\t3\t-1\t-1\n").unwrap();
        assert_eq!(parsed[0].cold_runtime, Some(5.0));
        assert_eq!(parsed[0].avg_warm_runtime, None);
        assert_eq!(parsed[0].rows, Some(3));
    }
}
