use super::exit_codes;
use crate::cli::args::ExtractArgs;
use anyhow::Context;
use std::io::Write;
use trident_bench_core::extract::{extract_dir, write_json, write_summary, QueryRow};

pub fn run(args: ExtractArgs) -> anyhow::Result<i32> {
    let rows = extract_dir(&args.dir, &args.profile)?;
    tracing::debug!(profile = %args.profile, "extracted {} queries", rows.len());

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    match args.format.as_str() {
        "json" => write_json(&mut out, &rows)?,
        "tsv" => {
            let summary: Vec<_> = rows.iter().map(QueryRow::summary).collect();
            write_summary(&mut out, &summary)?;
        }
        other => anyhow::bail!("unknown format '{}' (expected tsv or json)", other),
    }
    out.flush()?;

    if let Some(path) = &args.out {
        eprintln!("wrote {}", path.display());
    }
    Ok(exit_codes::OK)
}
