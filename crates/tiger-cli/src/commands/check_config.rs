//! `tigeropt check-config` - load and validate an optimizer configuration

use std::path::Path;

use crate::output::StyledOutput;

pub fn execute(file: &Path, out: &mut StyledOutput) -> anyhow::Result<()> {
    let config = super::load_config(Some(file))?;

    let passes: Vec<&str> = config.enabled_passes().into_iter().map(|p| p.name()).collect();
    let rounds = if config.propagation.until_stable {
        "until stable".to_string()
    } else {
        config.propagation.rounds.to_string()
    };
    out.success("Valid", &file.display().to_string());
    out.info(
        "Passes",
        &if passes.is_empty() { "none".to_string() } else { passes.join(", ") },
    );
    out.info("Rounds", &rounds);
    Ok(())
}
