pub mod compare;
pub mod extract;
pub mod launch;
pub mod plot;
pub mod report;

use super::args::{Cli, Command, InitArgs};
use trident_bench_core::errors::{as_config_error, ConfigError};

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const REGRESSION: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let result = match cli.cmd {
        Command::Launch(args) => launch::run(args).await,
        Command::Extract(args) => extract::run(args),
        Command::Report(args) => report::run(args),
        Command::Join(args) => report::join(args),
        Command::Compare(args) => compare::run(args),
        Command::Plot(args) => plot::run(args),
        Command::Init(args) => cmd_init(args),
        Command::Version => {
            println!("trident-bench {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    };

    match result {
        Err(e) => match as_config_error(&e) {
            Some(cfg) => {
                eprintln!("{}", cfg);
                Ok(exit_codes::CONFIG_ERROR)
            }
            None => Err(e),
        },
        ok => ok,
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() && !args.force {
        return Err(ConfigError(format!(
            "{} already exists (use --force to overwrite)",
            args.config.display()
        ))
        .into());
    }
    trident_bench_core::config::write_sample_config(&args.config)?;
    eprintln!("wrote {}", args.config.display());
    Ok(exit_codes::OK)
}
