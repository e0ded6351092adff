use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use blueprint::Database;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema", version, about = "Create or drop a database and apply its schema")]
struct Cli {
    /// Directory containing the `create` and `schema` migration sets
    #[arg(short, long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Schema environment to use
    #[arg(short, long, global = true, default_value = "development")]
    env: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the database and apply the schema migrations
    Build,
    /// Revert the create migrations, dropping the database
    Destroy,
}

/// Rewrites Go-style single-dash long flags (`-dir`, `-env=x`) to `--dir`, `--env=x`.
fn normalize_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(s) = arg.to_str() else {
                return arg;
            };
            for flag in ["-dir", "-env"] {
                if s == flag || s.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')) {
                    return OsString::from(format!("-{s}"));
                }
            }
            arg
        })
        .collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let db = Database::open(&cli.dir, &cli.env)?;
    match cli.cmd {
        Cmd::Build => db.build()?,
        Cmd::Destroy => db.destroy()?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_flags(std::env::args_os()));
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
