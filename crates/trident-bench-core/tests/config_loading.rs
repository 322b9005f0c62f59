use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use trident_bench_core::config::{load_config, write_sample_config};

#[test]
fn relative_paths_resolve_against_config_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bench.yaml");
    std::fs::write(
        &path,
        r#"
input: data
queries: /abs/queries
output: out
trident: bin/trident
rdf3xquery: rdf3xquery
settings:
  stats_repeats: 3
  adopt_unmarked_dirs: true
"#,
    )?;

    let cfg = load_config(&path)?;
    assert_eq!(cfg.input, dir.path().join("data"));
    assert_eq!(cfg.queries, Path::new("/abs/queries"));
    assert_eq!(cfg.output, dir.path().join("out"));
    assert_eq!(cfg.trident, dir.path().join("bin/trident"));
    // bare program names are looked up on PATH
    assert_eq!(cfg.rdf3xquery.as_deref(), Some(Path::new("rdf3xquery")));
    assert_eq!(cfg.stats_repeats(), 3);
    assert!(cfg.adopt_unmarked_dirs());
    assert!(cfg.flush_cache_command().is_none());
    Ok(())
}

#[test]
fn missing_required_key_is_a_config_error() -> anyhow::Result<()> {
    let mut tmp = NamedTempFile::new()?;
    writeln!(tmp, "input: a\nqueries: b\noutput: c\n")?;
    let err = load_config(tmp.path()).unwrap_err();
    assert!(err.to_string().starts_with("config error:"));
    assert!(err.to_string().contains("trident"));
    Ok(())
}

#[test]
fn zero_repeats_rejected() -> anyhow::Result<()> {
    let mut tmp = NamedTempFile::new()?;
    writeln!(
        tmp,
        "input: a\nqueries: b\noutput: c\ntrident: t\nsettings:\n  stats_repeats: 0\n"
    )?;
    let err = load_config(tmp.path()).unwrap_err();
    assert!(err.0.contains("stats_repeats"));
    Ok(())
}

#[test]
fn unknown_keys_are_tolerated() -> anyhow::Result<()> {
    let mut tmp = NamedTempFile::new()?;
    writeln!(
        tmp,
        "input: a\nqueries: b\noutput: c\ntrident: t\nrdf3xlaod: typo\nx-note: fine\n"
    )?;
    let cfg = load_config(tmp.path())?;
    assert!(cfg.rdf3xload.is_none());
    Ok(())
}

#[test]
fn sample_config_loads() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bench.yaml");
    write_sample_config(&path)?;
    let cfg = load_config(&path)?;
    assert_eq!(cfg.test5_extraopts, "--skipTables 1");
    assert!(cfg.flush_cache_command().is_some());
    assert_eq!(cfg.stats_repeats(), 6);
    Ok(())
}
