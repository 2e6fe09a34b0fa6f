mod cmd_generate;
mod cmd_init;
mod cmd_list;
mod cmd_period;
mod cmd_show;

use std::path::PathBuf;

use cadence_core::Fidelity;
use cadence_store::CadencePaths;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Hierarchical work summaries, from daily digests up to the year"
)]
struct Cli {
    /// Workspace root (default: nearest ancestor with .cadence/, else the per-user data dir)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create .cadence/ and a default config.yaml
    Init,
    /// Build (or fetch) the summary for a period
    Generate {
        /// daily, weekly, monthly, quarterly, h1-h2 or yearly
        fidelity: Fidelity,
        /// Period id, e.g. 2025-01-15, 2025-W03, 2025-01, 2025-Q1, 2025-H1, 2025 (default: current)
        period: Option<String>,
        /// Regenerate even if the summary exists
        #[arg(long)]
        force: bool,
        /// Build missing lower-level summaries first
        #[arg(long)]
        deps: bool,
        /// Build without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Override the range start (YYYY-MM-DD); requires --end
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// Override the range end (YYYY-MM-DD); requires --start
        #[arg(long, requires = "start")]
        end: Option<String>,
        /// Print the generation report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a period's range, neighbours and source periods
    Period {
        fidelity: Fidelity,
        /// Period id (default: the period containing --date, or today)
        #[arg(conflicts_with = "date")]
        period: Option<String>,
        /// Date (YYYY-MM-DD) to locate
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stored summary
    Show {
        fidelity: Fidelity,
        period: String,
        /// Output the raw document as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored periods for a fidelity
    List { fidelity: Fidelity },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `--root`, else the nearest initialized ancestor of cwd, else the per-user root.
fn resolve_root(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    let cwd = std::env::current_dir()?;
    Ok(CadencePaths::find_root(&cwd).unwrap_or_else(CadencePaths::default_root))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Init => {
            let root = match cli.root {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            cmd_init::execute(&root)
        }
        Command::Generate {
            fidelity,
            period,
            force,
            deps,
            dry_run,
            start,
            end,
            json,
        } => {
            let root = resolve_root(cli.root)?;
            cmd_generate::execute(&cmd_generate::GenerateParams {
                root: &root,
                fidelity,
                period: period.as_deref(),
                force,
                deps,
                dry_run,
                start: start.as_deref(),
                end: end.as_deref(),
                json,
            })
        }
        Command::Period {
            fidelity,
            period,
            date,
            json,
        } => cmd_period::execute(fidelity, period.as_deref(), date.as_deref(), json),
        Command::Show {
            fidelity,
            period,
            json,
        } => cmd_show::execute(&resolve_root(cli.root)?, fidelity, &period, json),
        Command::List { fidelity } => cmd_list::execute(&resolve_root(cli.root)?, fidelity),
    }
}
