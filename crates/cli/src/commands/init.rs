use anyhow::{bail, Context, Result};
use std::fs;

use crate::args::InitArgs;
use crate::printing::print_parameters;
use crate::utils::{apply_overrides, default_configuration};

pub fn init_configuration(args: &InitArgs) -> Result<()> {
    let output = &args.output;
    if output.exists() && !args.force {
        bail!(
            "{} already exists, use --force to overwrite it",
            output.display()
        );
    }

    println!("🧬 PhyloSim - Sequence Evolution Simulator");
    println!("============================================\n");

    let mut config = default_configuration()?;
    apply_overrides(&mut config, &args.settings)?;
    print_parameters(&config);

    let json = config.to_json()?;
    fs::write(output, json + "\n")
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Configuration written: {}", output.display());
    println!(
        "\n💡 Use 'phylosim simulate --tree TREE --config {}' to generate alignments",
        output.display()
    );
    Ok(())
}
