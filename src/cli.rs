//! Command-line interface.
//!
//! Flags are accepted in single-dash form (`-route spec`) as well as clap's `--route spec`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::loader::process_env;
use crate::config::{apply_env, load_config, ConfigError, RedirectorConfig, RouteEntry, RouteSource, WrapConfig};

/// Long flags that may be spelled with a single dash.
const LONG_FLAGS: &[(&str, bool)] = &[
    ("route", true),
    ("config", true),
    ("log-level", true),
    ("metrics-addr", true),
    ("port", true),
    ("help", false),
    ("version", false),
];

#[derive(Debug, Parser)]
#[command(name = "redirector", version, about = "Pattern-based HTTP redirect router")]
pub struct Cli {
    /// Route spec: `<pattern> <destination> [path] [query] [code=<status>]`. Repeatable.
    #[arg(long = "route", value_name = "SPEC")]
    pub routes: Vec<String>,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Serve Prometheus metrics on this address.
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a command and forward requests matching no route to it.
    Wrap(WrapArgs),
}

#[derive(Debug, Args)]
pub struct WrapArgs {
    /// Port the command listens on, passed to it as `PORT`.
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Command to run, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Build the effective configuration: file, then environment, then these flags.
    pub fn into_config(self) -> Result<RedirectorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RedirectorConfig::default(),
        };
        apply_env(&mut config, process_env())?;
        self.apply(&mut config);
        Ok(config)
    }

    /// Overlay command-line settings onto `config`.
    pub fn apply(self, config: &mut RedirectorConfig) {
        config.routes.extend(
            self.routes
                .into_iter()
                .enumerate()
                .map(|(i, spec)| RouteEntry::new(RouteSource::Flag(i), spec)),
        );
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(addr) = self.metrics_addr {
            config.observability.metrics_address = Some(addr);
        }
        if let Some(Command::Wrap(wrap)) = self.command {
            config.wrap = Some(WrapConfig {
                port: wrap.port,
                command: wrap.command,
            });
        }
    }
}

/// Rewrite single-dash long flags (`-route`, `-port=8000`) to their `--` form.
///
/// Rewriting stops at `--` and at the first positional argument after `wrap`, so the
/// wrapped command's own flags pass through untouched.
pub fn normalize_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let mut out: Vec<String> = iter.next().into_iter().collect();
    let mut expect_value = false;
    let mut in_wrap = false;

    while let Some(arg) = iter.next() {
        if arg == "--" {
            out.push(arg);
            break;
        }
        if expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }

        let dashes = arg.bytes().take_while(|&b| b == b'-').count();
        if dashes == 1 || dashes == 2 {
            let (name, inline_value) = match arg[dashes..].split_once('=') {
                Some((name, _)) => (name, true),
                None => (&arg[dashes..], false),
            };
            if let Some(&(_, takes_value)) = LONG_FLAGS.iter().find(|(flag, _)| *flag == name) {
                expect_value = takes_value && !inline_value;
                out.push(if dashes == 1 { format!("-{arg}") } else { arg });
                continue;
            }
            out.push(arg);
            continue;
        }

        if arg == "wrap" && !in_wrap {
            in_wrap = true;
            out.push(arg);
            continue;
        }

        out.push(arg);
        break;
    }

    out.extend(iter);
    out
}
