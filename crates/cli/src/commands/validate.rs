use anyhow::{Context, Result};
use phylosim_sim::simulation::Simulator;

use crate::args::ValidateArgs;
use crate::printing::{print_parameters, print_tree_summary};
use crate::utils::{apply_overrides, load_configuration, read_tree};

pub fn validate_setup(args: &ValidateArgs) -> Result<()> {
    println!("🔍 Validating simulation setup");

    let mut config = load_configuration(args.config.as_deref())?;
    apply_overrides(&mut config, &args.settings)?;
    println!("✓ Configuration: OK");

    let tree = read_tree(&args.tree)?;
    println!("✓ Tree: OK");

    let mut sim = Simulator::from_config(&config).context("Invalid model settings")?;
    println!("✓ Models: OK");

    sim.check_tree(&tree)
        .context("Tree does not match the configuration")?;
    sim.ancestral_sequence()
        .context("Invalid root sequence")?;
    println!("✓ Tree and configuration are compatible");

    print_parameters(&config);
    print_tree_summary(&args.tree, &tree);
    println!("\n✓ Ready to simulate");
    Ok(())
}
