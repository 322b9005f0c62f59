use super::exit_codes;
use crate::cli::args::LaunchArgs;
use std::sync::Arc;
use trident_bench_core::config::load_config;
use trident_bench_core::orchestrator::exec::{CommandRunner, DryRunRunner, ProcessRunner};
use trident_bench_core::orchestrator::Orchestrator;

pub async fn run(args: LaunchArgs) -> anyhow::Result<i32> {
    let cfg = load_config(&args.config)?;
    let timeout = args.timeout_secs.or(cfg.settings.command_timeout_secs);

    let runner: Arc<dyn CommandRunner> = if args.dry_run {
        Arc::new(DryRunRunner::new())
    } else {
        Arc::new(ProcessRunner::new(timeout))
    };

    tracing::info!(
        config = %args.config.display(),
        output = %cfg.output.display(),
        "launching {:?}",
        args.tests
    );
    Orchestrator::new(cfg, runner)
        .with_dry_run(args.dry_run)
        .run(args.tests)
        .await?;
    Ok(exit_codes::OK)
}
