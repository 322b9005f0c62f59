use super::exit_codes;
use crate::cli::args::CompareArgs;
use trident_bench_core::baseline::compare;
use trident_bench_core::extract::read_summary;
use trident_bench_core::report::console::print_compare_summary;
use trident_bench_core::report::TableFormat;

pub fn run(args: CompareArgs) -> anyhow::Result<i32> {
    if !(args.tolerance >= 0.0) {
        anyhow::bail!("tolerance must be a non-negative fraction, got {}", args.tolerance);
    }
    let baseline = read_summary(&args.baseline)?;
    let candidate = read_summary(&args.candidate)?;
    let diff = compare(&baseline, &candidate, args.tolerance);

    match args.format.as_str() {
        "text" => print_compare_summary(&diff),
        "json" => println!("{}", serde_json::to_string_pretty(&diff)?),
        other => {
            let format: TableFormat = other.parse().map_err(anyhow::Error::msg)?;
            print!("{}", diff.to_table().render(format)?);
        }
    }

    if diff.has_regressions() {
        Ok(exit_codes::REGRESSION)
    } else {
        Ok(exit_codes::OK)
    }
}
