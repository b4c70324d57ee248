use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};

/// Default level is `error`; `--verbose` raises it to `info`. An explicit
/// `RUST_LOG` always wins.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Opens `path` for writing, creating it if missing and truncating any
/// previous content. On unix the file is created with mode 0600.
pub fn open_clean(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(path)
        .with_context(|| format!("opening {} for writing", path.display()))
}

pub fn format_number(num: u64) -> String {
    num.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_args(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Words(args) => {
            if let Some(workers) = args.workers {
                if workers == 0 {
                    anyhow::bail!("--workers must be greater than 0");
                }
            }
        }
        Commands::Frequency(args) => {
            if let Some(top) = args.top {
                if top == 0 {
                    anyhow::bail!("--top must be greater than 0");
                }
            }
            if let Some(workers) = args.workers {
                if workers == 0 {
                    anyhow::bail!("--workers must be greater than 0");
                }
            }
        }
        Commands::Healthcheck(args) => {
            if args.timeout == 0 {
                anyhow::bail!("--timeout must be greater than 0");
            }
        }
        Commands::Serve(_) => {}
    }

    Ok(())
}
