use anyhow::Result;
use clap::Parser;
use log::{error, info};
use nesc::cli::{Args, Command};
use nesc::engine;
use nesc::output::OutputManager;
use std::process;

const BANNER: &str = r#"
  _ __   ___  ___  ___
 | '_ \ / _ \/ __|/ __|
 | | | |  __/\__ \ (__
 |_| |_|\___||___/\___|

   Active DNS Subdomain Enumeration
"#;

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.silent {
        log::LevelFilter::Error
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    match &args.command {
        Command::Dns(dns) => {
            let options = dns.options()?;
            let output = OutputManager::new(dns.output_format());

            match engine::run(options, output).await {
                Ok(stats) => {
                    info!(
                        "Enumeration completed: {} of {} candidates resolved in {:.2}s",
                        stats.resolved,
                        stats.attempted,
                        stats.duration.as_secs_f64()
                    );
                }
                Err(e) if e.is_cancelled() => {
                    error!("{}", e);
                    process::exit(EXIT_INTERRUPTED);
                }
                Err(e) => {
                    error!("{}", e);
                    process::exit(EXIT_FAILURE);
                }
            }
        }
    }

    Ok(())
}
