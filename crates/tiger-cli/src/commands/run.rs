//! `tigeropt run` - evaluate a program, optionally after optimizing it

use anyhow::Context;
use std::path::Path;
use tiger_cfg::{Interpreter, Optimizer};

pub fn execute(file: &Path, optimize: bool, config: Option<&Path>) -> anyhow::Result<()> {
    let mut program = super::load_program(file)?;

    if optimize {
        let optimizer = Optimizer::new(super::load_config(config)?)
            .context("invalid optimizer configuration")?;
        program = optimizer.optimize(&program)?.program;
    }

    let output = Interpreter::new(&program)
        .and_then(|interpreter| interpreter.run())
        .with_context(|| format!("failed to run {}", file.display()))?;
    for line in output {
        println!("{}", line);
    }
    Ok(())
}
