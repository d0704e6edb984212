//! `tigeropt dot` - Graphviz export of every method's flow graph

use std::path::Path;
use tiger_cfg::dot::program_to_dot;

pub fn execute(file: &Path) -> anyhow::Result<()> {
    let program = super::load_program(file)?;
    print!("{}", program_to_dot(&program));
    Ok(())
}
