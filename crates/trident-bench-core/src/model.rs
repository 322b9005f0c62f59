use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Flush command used on the cluster the experiments were designed for.
pub const SAMPLE_FLUSH_CACHE: &str = "sudo /cm/shared/package/utils/bin/drop_caches";

pub const DEFAULT_STATS_REPEATS: u32 = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Directory holding the raw datasets (`lubm1b`, `yago2s`, `snap-orig`, ...).
    pub input: PathBuf,
    /// Directory holding one sub-directory of query files per dataset.
    pub queries: PathBuf,
    /// Root under which every test writes its databases and results.
    pub output: PathBuf,
    /// Extra flags appended to every engine invocation.
    #[serde(default)]
    pub extraopts: String,
    /// Engine executable.
    pub trident: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdf3xload: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdf3xquery: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdf3xtest: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testsnap: Option<PathBuf>,
    #[serde(default)]
    pub test5_extraopts: String,
    #[serde(default)]
    pub test6_extraopts: String,
    #[serde(default, skip_serializing_if = "is_default_settings")]
    pub settings: Settings,
}

fn is_default_settings(s: &Settings) -> bool {
    s == &Settings::default()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Command line that drops the OS page cache. Unset or empty disables flushing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_cache: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdf3x_import_script: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdf3x_query_script: Option<PathBuf>,
    /// Repetitions requested from the engine for the statistics run of each query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_repeats: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    /// Adopt database directories that exist without a completion marker
    /// instead of rebuilding them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adopt_unmarked_dirs: Option<bool>,
}

impl BenchConfig {
    pub fn flush_cache_command(&self) -> Option<&str> {
        self.settings
            .flush_cache
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn stats_repeats(&self) -> u32 {
        self.settings.stats_repeats.unwrap_or(DEFAULT_STATS_REPEATS)
    }

    pub fn adopt_unmarked_dirs(&self) -> bool {
        self.settings.adopt_unmarked_dirs.unwrap_or(false)
    }

    pub fn rdf3x_import_script(&self) -> PathBuf {
        self.settings
            .rdf3x_import_script
            .clone()
            .unwrap_or_else(|| PathBuf::from("current/importdata_rdf3x.sh"))
    }

    pub fn rdf3x_query_script(&self) -> PathBuf {
        self.settings
            .rdf3x_query_script
            .clone()
            .unwrap_or_else(|| PathBuf::from("current/query_rdf3x.sh"))
    }
}

/// Splits an option string from the config into separate arguments.
pub fn split_opts(opts: &str) -> Vec<String> {
    opts.split_whitespace().map(str::to_string).collect()
}
