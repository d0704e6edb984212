//! tigeropt - command-line driver for the Tiger CFG optimizer
//!
//! Reads programs in the JSON interchange form, runs the analysis and
//! optimization pipeline, evaluates programs and exports flow graphs.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tiger_cfg::PassKind;

use commands::opt::Emit;
use output::{resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "tigeropt")]
#[command(about = "Dataflow analyses and optimizations over the Tiger CFG IR", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every pass and solver step to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Colored status output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a program and emit the result
    Opt {
        /// Program in JSON form
        file: PathBuf,
        /// Optimizer configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Disable a pass (repeatable), e.g. `dead-code` or `cfg.constProp`
        #[arg(long = "skip", value_name = "PASS")]
        skip: Vec<PassKind>,
        /// Reaching-definitions/propagation rounds
        #[arg(long)]
        rounds: Option<usize>,
        /// Repeat propagation until a round rewrites nothing
        #[arg(long)]
        until_stable: bool,
        /// Output form
        #[arg(long, value_enum, default_value = "ir")]
        emit: Emit,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a program and print its output
    Run {
        /// Program in JSON form
        file: PathBuf,
        /// Optimize before running
        #[arg(long)]
        optimize: bool,
        /// Optimizer configuration (TOML), implies --optimize
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print a Graphviz digraph for every method
    Dot {
        /// Program in JSON form
        file: PathBuf,
    },

    /// Validate an optimizer configuration file
    CheckConfig {
        /// Configuration file (TOML)
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        simple_logger::init_with_level(log::Level::Trace)?;
    }
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    match cli.command {
        Commands::Opt {
            file,
            config,
            skip,
            rounds,
            until_stable,
            emit,
            output,
        } => {
            let args = commands::opt::OptArgs {
                file,
                config,
                skip,
                rounds,
                until_stable,
                emit,
                output,
            };
            commands::opt::execute(args, &mut out)?;
        }

        Commands::Run {
            file,
            optimize,
            config,
        } => {
            commands::run::execute(&file, optimize || config.is_some(), config.as_deref())?;
        }

        Commands::Dot { file } => {
            commands::dot::execute(&file)?;
        }

        Commands::CheckConfig { file } => {
            commands::check_config::execute(&file, &mut out)?;
        }
    }

    Ok(())
}
