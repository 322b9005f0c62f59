use super::exit_codes;
use crate::cli::args::{JoinArgs, ReportArgs};
use trident_bench_core::extract::read_summary;
use trident_bench_core::report::join::{join_summaries, summary_label};
use trident_bench_core::report::tables::{latest_results_dir, test1_table, test2_table, test4_table};
use trident_bench_core::report::Table;

const REPORTED: &[&str] = &["1", "2", "4"];

pub fn run(args: ReportArgs) -> anyhow::Result<i32> {
    let selected: Vec<&str> = match args.tests.as_str() {
        "all" => REPORTED.to_vec(),
        t if REPORTED.contains(&t) => vec![t],
        other => anyhow::bail!("no report for test '{}' (expected 1, 2, 4 or all)", other),
    };

    let mut first = true;
    for test in selected {
        let test_dir = args.dir.join(format!("test{}", test));
        if !test_dir.is_dir() {
            if args.tests == "all" {
                tracing::warn!("skipping test {}: {} not found", test, test_dir.display());
                continue;
            }
            anyhow::bail!("{} not found", test_dir.display());
        }

        let table: Table = match test {
            "1" => test1_table(&latest_results_dir(&test_dir)?)?,
            "2" => test2_table(&latest_results_dir(&test_dir)?)?,
            _ => test4_table(&test_dir)?,
        };
        if !first {
            println!();
        }
        first = false;
        print!("{}", table.render(args.format)?);
    }
    Ok(exit_codes::OK)
}

pub fn join(args: JoinArgs) -> anyhow::Result<i32> {
    let mut named = Vec::with_capacity(args.summaries.len());
    for path in &args.summaries {
        named.push((summary_label(path), read_summary(path)?));
    }
    print!("{}", join_summaries(&named).render(args.format)?);
    Ok(exit_codes::OK)
}
