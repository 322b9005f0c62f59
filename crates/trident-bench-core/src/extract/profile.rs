use std::fmt;
use std::str::FromStr;

/// Which files in a results directory are query logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFilter {
    Prefix(&'static str),
    NotSuffix(&'static str),
}

impl FileFilter {
    pub fn accepts(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }
        match self {
            FileFilter::Prefix(p) => name.starts_with(p),
            FileFilter::NotSuffix(s) => !name.ends_with(s),
        }
    }
}

/// Where the result cardinality comes from when the log does not state it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSource {
    pub prefix: &'static str,
    pub suffix: &'static str,
    /// Lines containing this text are metadata, not result rows.
    pub skip: Option<&'static str>,
}

impl RowSource {
    pub fn file_name(&self, query: &str) -> String {
        format!("{}{}{}", self.prefix, query, self.suffix)
    }
}

/// Naming convention and marker set of one system's query logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogProfile {
    pub name: &'static str,
    pub candidates: FileFilter,
    pub total: &'static str,
    pub query: &'static str,
    pub optimizer: Option<&'static str>,
    pub memory: &'static str,
    pub io: &'static str,
    /// The I/O line ends the results pass: cold values seen so far are discarded.
    pub io_resets_cold: bool,
    pub rows_marker: Option<&'static str>,
    pub rows: RowSource,
}

pub const LOG_PREFIX: &str = "logs_";

impl LogProfile {
    pub fn engine() -> Self {
        Self {
            name: "engine",
            candidates: FileFilter::Prefix(LOG_PREFIX),
            total: "Runtime total",
            query: "Runtime queryexec:",
            optimizer: Some("Runtime queryopti:"),
            memory: "Max memory",
            io: "Process IO Read bytes",
            io_resets_cold: true,
            rows_marker: Some("# rows"),
            rows: RowSource {
                prefix: "results_",
                suffix: "",
                skip: Some("<empty result"),
            },
        }
    }

    pub fn baseline() -> Self {
        Self {
            name: "baseline",
            candidates: FileFilter::Prefix(LOG_PREFIX),
            total: "Time total",
            query: "Time query:",
            optimizer: None,
            memory: "Max mem",
            io: "IO Read bytes",
            io_resets_cold: false,
            rows_marker: None,
            rows: RowSource {
                prefix: "results_",
                suffix: "",
                skip: Some(" cardinality"),
            },
        }
    }

    /// Older engine builds: one log per query next to a `logs_<q>_results` file.
    pub fn legacy() -> Self {
        Self {
            name: "legacy",
            candidates: FileFilter::NotSuffix("results"),
            total: "Runtime totalexec:",
            query: "Runtime queryexec:",
            optimizer: None,
            memory: "Max memory",
            io: "Process IO Read bytes",
            io_resets_cold: false,
            rows_marker: None,
            rows: RowSource {
                prefix: LOG_PREFIX,
                suffix: "_results",
                skip: None,
            },
        }
    }

    /// Query name for a log file: the file name without its `logs_` prefix.
    pub fn query_name<'a>(&self, file_name: &'a str) -> &'a str {
        file_name.strip_prefix(LOG_PREFIX).unwrap_or(file_name)
    }
}

impl FromStr for LogProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "engine" | "trident" => Ok(Self::engine()),
            "baseline" | "rdf3x" => Ok(Self::baseline()),
            "legacy" => Ok(Self::legacy()),
            other => Err(format!(
                "unknown profile '{}' (expected engine, baseline or legacy)",
                other
            )),
        }
    }
}

impl fmt::Display for LogProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
