use crate::errors::ConfigError;
use crate::model::BenchConfig;
use std::path::Path;

pub mod resolve;

pub fn load_config(path: &Path) -> Result<BenchConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    // serde_ignored wrapper to capture unknown fields
    let mut cfg: BenchConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    // Anchors and extension keys are allowed to float around.
    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !meaningful_unknowns.is_empty() {
        tracing::warn!(
            file = %path.display(),
            "ignored unknown config fields: {:?}",
            meaningful_unknowns
        );
    }

    validate(&cfg, path)?;

    let base_dir = path.parent().unwrap_or(Path::new("."));
    resolve::resolve_paths(&mut cfg, base_dir);

    Ok(cfg)
}

fn validate(cfg: &BenchConfig, path: &Path) -> Result<(), ConfigError> {
    let required = [
        ("input", &cfg.input),
        ("queries", &cfg.queries),
        ("output", &cfg.output),
        ("trident", &cfg.trident),
    ];
    for (key, value) in required {
        if value.as_os_str().is_empty() {
            return Err(ConfigError(format!(
                "'{}' must not be empty (file: {})",
                key,
                path.display()
            )));
        }
    }

    if cfg.settings.stats_repeats == Some(0) {
        return Err(ConfigError("settings.stats_repeats must be at least 1".into()));
    }
    if cfg.settings.command_timeout_secs == Some(0) {
        return Err(ConfigError(
            "settings.command_timeout_secs must be positive (omit it to wait forever)".into(),
        ));
    }

    Ok(())
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        format!(
            r#"input: /var/scratch/datasets
queries: /var/scratch/queries
output: /var/scratch/results
extraopts: ""
trident: /opt/trident/build/trident
rdf3xload: /opt/rdf3x/bin/rdf3xload
rdf3xquery: /opt/rdf3x/bin/rdf3xquery
rdf3xtest: /opt/rdf3x/bin/rdf3xtest
testsnap: /opt/snap/testsnap
test5_extraopts: "--skipTables 1"
test6_extraopts: "--skipTables 1"
settings:
  flush_cache: "{}"
  stats_repeats: 6
"#,
            crate::model::SAMPLE_FLUSH_CACHE
        ),
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
