//! `tigeropt opt` - run the optimization pipeline and emit the result

use anyhow::Context;
use clap::ValueEnum;
use std::path::PathBuf;
use tiger_cfg::dot::program_to_dot;
use tiger_cfg::{Optimizer, PassKind, PrettyPrint};

use crate::output::StyledOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// Pretty-printed blocks
    Ir,
    /// Graphviz digraphs
    Dot,
    /// JSON program, loadable by every subcommand
    Json,
}

pub struct OptArgs {
    pub file: PathBuf,
    pub config: Option<PathBuf>,
    pub skip: Vec<PassKind>,
    pub rounds: Option<usize>,
    pub until_stable: bool,
    pub emit: Emit,
    pub output: Option<PathBuf>,
}

pub fn execute(args: OptArgs, out: &mut StyledOutput) -> anyhow::Result<()> {
    let program = super::load_program(&args.file)?;

    let mut config = super::load_config(args.config.as_deref())?;
    for pass in &args.skip {
        config.set(*pass, false);
    }
    if let Some(rounds) = args.rounds {
        config = config.with_rounds(rounds);
    }
    if args.until_stable {
        config = config.until_stable(true);
    }

    let optimizer = Optimizer::new(config).context("invalid optimizer configuration")?;
    let optimized = optimizer
        .optimize(&program)
        .with_context(|| format!("failed to optimize {}", args.file.display()))?;

    let rendered = match args.emit {
        Emit::Ir => optimized.program.pretty_print(),
        Emit::Dot => program_to_dot(&optimized.program),
        Emit::Json => serde_json::to_string_pretty(&optimized.program)?,
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            out.info("Wrote", &path.display().to_string());
        }
        None => print!("{}", rendered),
    }

    let stats = &optimized.stats;
    out.success(
        "Optimized",
        &format!(
            "{}: {} dead statements removed, {} uses rewritten in {} rounds",
            args.file.display(),
            stats.dead_removed,
            stats.uses_rewritten,
            stats.propagation_rounds
        ),
    );
    Ok(())
}
