use crate::config;
use crate::error::Result;
use crate::types::{Options, OutputFormat, ResolverSettings, DEFAULT_WORKERS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nesc",
    version,
    long_version = LONG_VERSION,
    about = "Active subdomain enumeration over DNS",
    long_about = "nesc resolves <word>.<domain> for every word of a wordlist against a single DNS resolver,\nusing a bounded pool of concurrent workers, and prints the names that resolve."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose mode (log failed lookups)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Silent mode (only output results)
    #[arg(long = "silent", global = true)]
    pub silent: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search for subdomains based on a domain and a wordlist
    Dns(DnsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct DnsArgs {
    /// Target domain
    #[arg(value_name = "DOMAIN")]
    pub args: Vec<String>,

    /// Path to the wordlist file containing subdomains
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'c', long = "concurrency", default_value_t = DEFAULT_WORKERS)]
    pub concurrency: usize,

    /// Network protocol to use for DNS lookup (udp/tcp)
    #[arg(short = 'p', long = "protocol", default_value = "udp")]
    pub protocol: String,

    /// Resolver address (ip:port)
    #[arg(short = 'r', long = "resolver", value_name = "ADDR")]
    pub resolver: Option<String>,

    /// Resolver connect timeout in seconds
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Output in JSON lines format
    #[arg(long = "json")]
    pub json: bool,
}

impl DnsArgs {
    /// Builds engine options, layering config file, environment and flags.
    pub fn options(&self) -> Result<Options> {
        let mut resolver = match &self.config_path {
            Some(path) => config::load_settings(path)?,
            None => {
                let mut settings = ResolverSettings::default();
                config::apply_env_overrides(&mut settings);
                settings
            }
        };
        if let Some(nameserver) = &self.resolver {
            resolver.nameserver = nameserver.clone();
        }
        if let Some(timeout) = self.timeout {
            resolver.connect_timeout_secs = timeout;
        }

        Ok(Options {
            args: self.args.clone(),
            wordlist: self.wordlist.clone().unwrap_or_default(),
            workers: self.concurrency,
            protocol: self.protocol.clone(),
            resolver,
        })
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}
