use super::exit_codes;
use crate::cli::args::PlotArgs;
use trident_bench_core::telemetry::{default_events, read_monitor_log, write_charts, ParseOptions};

pub fn run(args: PlotArgs) -> anyhow::Result<i32> {
    if args.interval_secs == 0 {
        anyhow::bail!("--interval-secs must be positive");
    }
    let opts = ParseOptions {
        interval_secs: args.interval_secs,
        events: if args.events.is_empty() {
            default_events()
        } else {
            args.events
        },
    };

    let timeline = read_monitor_log(&args.log, &opts)?;
    if timeline.samples.is_empty() {
        tracing::warn!("no STATS samples in {}", args.log.display());
    }
    let (usage, io) = write_charts(&timeline, &args.out, args.sample)?;
    eprintln!("wrote {}", usage.display());
    eprintln!("wrote {}", io.display());

    print!("{}", timeline.summary());
    Ok(exit_codes::OK)
}
