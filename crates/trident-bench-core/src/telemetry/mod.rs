//! Resource-monitor logs: CPU, memory and disk samples plus phase events,
//! rendered as SVG charts with a short textual timeline.

pub mod svg;

use anyhow::Context;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_SAMPLE: f64 = 0.01;
/// Label of the implicit first phase, drawn at minute 0.
pub const FIRST_PHASE: &str = "Encoding";

/// A substring that announces a phase, and the label it is shown under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRule {
    pub needle: String,
    pub label: String,
}

impl EventRule {
    pub fn new(needle: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            label: label.into(),
        }
    }
}

impl FromStr for EventRule {
    type Err = String;

    /// `substring=Label`; the last `=` separates the two.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('=') {
            Some((needle, label)) if !needle.is_empty() && !label.trim().is_empty() => {
                Ok(EventRule::new(needle, label.trim()))
            }
            _ => Err(format!("invalid event '{}' (expected substring=Label)", s)),
        }
    }
}

pub fn default_events() -> Vec<EventRule> {
    vec![
        EventRule::new("Starting the loading", "Sorting"),
        EventRule::new("Start creating the tree...", "NODEMGR"),
        EventRule::new("Start inserting...", "Binary Tables"),
        EventRule::new("Start process generating new permutation", "New Perm"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSample {
    pub timestamp: Option<NaiveDateTime>,
    /// Minutes since the first sample, derived from the sampling interval.
    pub minutes: f64,
    pub cpu: f64,
    pub mem: f64,
    pub read: f64,
    pub write: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseEvent {
    /// Whole minutes since the start of the log (floor).
    pub minutes: i64,
    pub label: String,
    pub elapsed_secs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorTimeline {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub samples: Vec<ResourceSample>,
    pub events: Vec<PhaseEvent>,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub interval_secs: u64,
    pub events: Vec<EventRule>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            events: default_events(),
        }
    }
}

/// Finite value of a `label=value` token; `inf` and `NaN` are rejected.
fn label_value(token: &str) -> Option<f64> {
    let (_, value) = token.split_once('=')?;
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Sample fields: memory, cpu, disk-read counter, disk-write counter.
fn parse_stats(line: &str) -> Option<(f64, f64, f64, f64)> {
    let tokens: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    Some((
        label_value(tokens.get(1)?)?,
        label_value(tokens.get(2)?)?,
        label_value(tokens.get(5)?)?,
        label_value(tokens.get(6)?)?,
    ))
}

pub fn parse_monitor_log<R: BufRead>(
    reader: R,
    opts: &ParseOptions,
) -> anyhow::Result<MonitorTimeline> {
    let ts_re = Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}")?;
    let mut tl = MonitorTimeline::default();
    let mut seen = vec![false; opts.events.len()];
    let mut raw_events: Vec<(NaiveDateTime, usize)> = Vec::new();
    let mut prev_counters: Option<(f64, f64)> = None;
    let mut k: u64 = 0;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", lineno + 1))?;
        let ts = ts_re
            .find(&line)
            .and_then(|m| NaiveDateTime::parse_from_str(m.as_str(), TIMESTAMP_FORMAT).ok());
        if let Some(ts) = ts {
            if tl.start.is_none() {
                tl.start = Some(ts);
            }
            tl.end = Some(ts);
        }

        if !line.contains("STATS") {
            for (i, rule) in opts.events.iter().enumerate() {
                if seen[i] || !line.contains(&rule.needle) {
                    continue;
                }
                match ts {
                    Some(ts) => {
                        seen[i] = true;
                        raw_events.push((ts, i));
                    }
                    None => tracing::warn!(line = lineno + 1, "event '{}' without timestamp", rule.label),
                }
            }
            continue;
        }

        let Some((mem, cpu, read_total, write_total)) = parse_stats(&line) else {
            tracing::debug!(line = lineno + 1, "unreadable STATS line");
            continue;
        };
        // counters may restart when the monitored process does
        let (read, write) = match prev_counters {
            Some((r, w)) => ((read_total - r).max(0.0), (write_total - w).max(0.0)),
            None => (0.0, 0.0),
        };
        prev_counters = Some((read_total, write_total));
        tl.samples.push(ResourceSample {
            timestamp: ts,
            minutes: (k * opts.interval_secs) as f64 / 60.0,
            cpu,
            mem,
            read,
            write,
        });
        k += 1;
    }

    if let Some(start) = tl.start {
        tl.events = raw_events
            .into_iter()
            .map(|(ts, i)| {
                let elapsed = (ts - start).num_seconds();
                PhaseEvent {
                    minutes: elapsed.div_euclid(60),
                    label: opts.events[i].label.clone(),
                    elapsed_secs: elapsed,
                }
            })
            .collect();
    }
    Ok(tl)
}

pub fn read_monitor_log(path: &Path, opts: &ParseOptions) -> anyhow::Result<MonitorTimeline> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open monitor log {}", path.display()))?;
    parse_monitor_log(std::io::BufReader::new(file), opts)
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Memory axis limit: 4, doubled while the peak exceeds 1.3 times the limit.
pub fn mem_limit(max_mem: f64) -> f64 {
    let mut limit = 4.0;
    while max_mem > 1.3 * limit {
        limit *= 2.0;
    }
    limit
}

/// Keeps every `floor(1 / fraction)`-th sample, starting with the first.
pub fn downsample(samples: &[ResourceSample], fraction: f64) -> Vec<ResourceSample> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return samples.to_vec();
    }
    let step = ((1.0 / fraction).floor() as usize).max(1);
    samples.iter().step_by(step).cloned().collect()
}

fn fmt_duration(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!("{}{}:{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60, secs % 60)
}

impl MonitorTimeline {
    pub fn max_mem(&self) -> f64 {
        self.samples.iter().map(|s| s.mem).fold(0.0, f64::max)
    }

    /// Phase boundaries drawn on the charts, starting with the implicit first phase.
    pub fn markers(&self) -> Vec<(f64, String)> {
        std::iter::once((0.0, FIRST_PHASE.to_string()))
            .chain(self.events.iter().map(|e| (e.minutes as f64, e.label.clone())))
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                out.push_str(&format!(
                    "Start time: {} End time: {} Duration: {}\n",
                    start.format(TIMESTAMP_FORMAT),
                    end.format(TIMESTAMP_FORMAT),
                    fmt_duration((end - start).num_seconds())
                ));
            }
            _ => out.push_str("Start time: - End time: - Duration: -\n"),
        }
        for e in &self.events {
            out.push_str(&format!("{} => {}\n", e.label, e.minutes));
        }
        out
    }
}

/// Writes `<prefix>-usage.svg` and `<prefix>-io.svg`.
pub fn write_charts(
    tl: &MonitorTimeline,
    prefix: &Path,
    sample: f64,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let samples = downsample(&tl.samples, sample);
    let markers = tl.markers();
    let limit = mem_limit(tl.max_mem());

    let with_suffix = |suffix: &str| {
        let mut s = prefix.as_os_str().to_os_string();
        s.push(suffix);
        PathBuf::from(s)
    };
    let usage = with_suffix("-usage.svg");
    let io = with_suffix("-io.svg");
    if let Some(parent) = usage.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    std::fs::write(&usage, svg::render_usage(&samples, &markers, limit))
        .with_context(|| format!("failed to write {}", usage.display()))?;
    std::fs::write(&io, svg::render_io(&samples, &markers))
        .with_context(|| format!("failed to write {}", io.display()))?;
    Ok((usage, io))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(ts: &str, mem: u64, cpu: u64, r: u64, w: u64) -> String {
        format!(
            "[0x1 12] INFO      {}  STATS\tmem={}\tcpu={}\tx=0\ty=0\tdiskr={}\tdiskw={}\n",
            ts, mem, cpu, r, w
        )
    }

    #[test]
    fn io_deltas_are_counter_differences() {
        let log = stats("2020-05-01 10:00:00", 2, 50, 1000, 400)
            + &stats("2020-05-01 10:00:10", 3, 90, 1600, 700);
        let tl = parse_monitor_log(log.as_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!(tl.samples.len(), 2);
        assert_eq!((tl.samples[0].read, tl.samples[0].write), (0.0, 0.0));
        assert_eq!((tl.samples[1].read, tl.samples[1].write), (600.0, 300.0));
        assert_eq!(tl.samples[1].cpu, 90.0);
        assert_eq!(tl.samples[1].mem, 3.0);
        assert!((tl.samples[1].minutes - 10.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_stats_are_skipped() {
        let log = stats("2020-05-01 10:00:00", 2, 50, 1000, 400)
            + "[0x1 12] INFO      2020-05-01 10:00:10  STATS\tmem=inf\tcpu=1\tx=0\ty=0\tdiskr=1\tdiskw=1\n"
            + "[0x1 12] INFO      2020-05-01 10:00:20  STATS\tmem=1\tcpu=NaN\tx=0\ty=0\tdiskr=1\tdiskw=1\n"
            + &stats("2020-05-01 10:00:30", 6, 60, 1100, 500);
        let tl = parse_monitor_log(log.as_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!(tl.samples.len(), 2);
        assert_eq!(tl.samples[1].mem, 6.0);
        assert_eq!((tl.samples[1].read, tl.samples[1].write), (100.0, 100.0));
        assert_eq!(mem_limit(6.0), 8.0);
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        let log = stats("2020-05-01 10:00:00", 1, 1, 5000, 5000)
            + &stats("2020-05-01 10:00:10", 1, 1, 10, 20);
        let tl = parse_monitor_log(log.as_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!((tl.samples[1].read, tl.samples[1].write), (0.0, 0.0));
    }

    #[test]
    fn event_minutes_are_floored_and_recorded_once() {
        let log = "\
[0x1 12] INFO      2020-05-01 10:00:00  Starting the loading
[0x1 12] INFO      2020-05-01 10:03:59  Start creating the tree...
[0x1 12] INFO      2020-05-01 10:05:00  Start creating the tree...
[0x1 12] INFO      2020-05-01 11:00:30  done
";
        let tl = parse_monitor_log(log.as_bytes(), &ParseOptions::default()).unwrap();
        let got: Vec<(&str, i64)> = tl.events.iter().map(|e| (e.label.as_str(), e.minutes)).collect();
        assert_eq!(got, vec![("Sorting", 0), ("NODEMGR", 3)]);
        assert_eq!(tl.events[1].elapsed_secs, 239);
        assert_eq!(
            tl.summary(),
            "Start time: 2020-05-01 10:00:00 End time: 2020-05-01 11:00:30 Duration: 1:00:30\n\
             Sorting => 0\nNODEMGR => 3\n"
        );
    }

    #[test]
    fn custom_event_rules() {
        let rule: EventRule = "Merging=Merge".parse().unwrap();
        assert_eq!(rule, EventRule::new("Merging", "Merge"));
        assert!("nolabel".parse::<EventRule>().is_err());

        let opts = ParseOptions {
            interval_secs: 5,
            events: vec![rule],
        };
        let log = "2020-05-01 10:00:00 boot\n2020-05-01 10:02:00 Merging parts\n";
        let tl = parse_monitor_log(log.as_bytes(), &opts).unwrap();
        assert_eq!(tl.events[0].label, "Merge");
        assert_eq!(tl.events[0].minutes, 2);
        assert_eq!(tl.markers()[0], (0.0, FIRST_PHASE.to_string()));
    }

    #[test]
    fn memory_limit_doubles() {
        assert_eq!(mem_limit(0.0), 4.0);
        assert_eq!(mem_limit(5.2), 4.0);
        assert_eq!(mem_limit(5.3), 8.0);
        assert_eq!(mem_limit(40.0), 32.0);
    }

    #[test]
    fn downsampling_keeps_every_nth() {
        let samples: Vec<ResourceSample> = (0..10)
            .map(|i| ResourceSample {
                timestamp: None,
                minutes: i as f64,
                cpu: 0.0,
                mem: 0.0,
                read: 0.0,
                write: 0.0,
            })
            .collect();
        let kept: Vec<f64> = downsample(&samples, 0.25).iter().map(|s| s.minutes).collect();
        assert_eq!(kept, vec![0.0, 4.0, 8.0]);
        assert_eq!(downsample(&samples, 1.0).len(), 10);
    }

    #[test]
    fn writes_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let log = stats("2020-05-01 10:00:00", 2, 50, 0, 0) + &stats("2020-05-01 10:00:10", 2, 60, 10, 10);
        let tl = parse_monitor_log(log.as_bytes(), &ParseOptions::default()).unwrap();
        let (usage, io) = write_charts(&tl, &dir.path().join("output"), 1.0).unwrap();
        assert!(usage.ends_with("output-usage.svg"));
        assert!(std::fs::read_to_string(&usage).unwrap().starts_with("<svg"));
        assert!(std::fs::read_to_string(io).unwrap().contains("stroke-dasharray"));
    }
}
