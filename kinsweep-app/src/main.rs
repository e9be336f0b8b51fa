use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod plotting;
mod workflow;

use config::{ConcentrationArgs, ParameterArgs, TernaryArgs};

const DEFAULT_LOG_FILTER: &str = "kinsweep=info,kinsweep_core=info";

#[derive(Parser, Debug)]
#[command(name = "kinsweep")]
#[command(about = "Parameter sweeps over deterministic biochemical time courses")]
struct Cli {
    /// Log filter, e.g. `debug` or `kinsweep_core=debug` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep the initial concentration of one species
    Concentration(ConcentrationArgs),
    /// Sweep one reaction parameter with an input species preset
    Parameter(ParameterArgs),
    /// Cross low, middle and high levels of two inputs
    Ternary(TernaryArgs),
    /// Run a sweep described by a YAML request file
    Run {
        request: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Keep the table rows whose tag contains STATE, e.g. `A1` or `A1B2`
    Filter {
        table: PathBuf,
        state: String,
        output: Option<PathBuf>,
    },
    /// Line chart of one table column
    PlotLine {
        table: PathBuf,
        y: String,
        /// Column for the x axis; the lead column when absent
        #[arg(long)]
        x: Option<String>,
        #[arg(long)]
        log_x: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Bar chart of every state of one sweep iteration
    PlotBar {
        table: PathBuf,
        iteration: usize,
        /// Column to chart; the last column when absent
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Concentration(args) => {
            workflow::run_sweep(&config::concentration_plan(&args)?)?;
        }
        Command::Parameter(args) => {
            workflow::run_sweep(&config::parameter_plan(&args)?)?;
        }
        Command::Ternary(args) => {
            workflow::run_sweep(&config::ternary_plan(&args)?)?;
        }
        Command::Run {
            request,
            output_dir,
        } => {
            let plan = config::request_plan(&request, output_dir.as_deref())?;
            workflow::run_sweep(&plan)?;
            println!("\nResults are in '{}'", plan.paths.dir.display());
        }
        Command::Filter {
            table,
            state,
            output,
        } => {
            workflow::filter_table(&table, &state, output.as_deref())?;
        }
        Command::PlotLine {
            table,
            y,
            x,
            log_x,
            out,
        } => {
            let chart =
                workflow::plot_table_line(&table, &y, x.as_deref(), log_x, out.as_deref())?;
            println!("Chart saved to '{}'", chart.display());
        }
        Command::PlotBar {
            table,
            iteration,
            column,
            out,
        } => {
            let chart =
                workflow::plot_table_bars(&table, iteration, column.as_deref(), out.as_deref())?;
            println!("Chart saved to '{}'", chart.display());
        }
    }

    Ok(())
}
