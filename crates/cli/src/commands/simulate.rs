use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use phylosim_sim::output::AlignmentFile;
use phylosim_sim::simulation::{Configuration, SimulationStats, Simulator};
use phylosim_sim::tree::PhyloTree;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::args::SimulateArgs;
use crate::printing::{print_dataset, print_parameters, print_tree_summary};
use crate::utils::{apply_overrides, load_configuration, read_tree};

pub fn run_simulation(args: &SimulateArgs) -> Result<()> {
    println!("🧬 PhyloSim - Simulating Alignments");
    println!("============================================\n");

    let mut config = load_configuration(args.config.as_deref())?;
    apply_overrides(&mut config, &args.settings)?;
    let tree = read_tree(&args.tree)?;
    print_tree_summary(&args.tree, &tree);
    print_parameters(&config);

    // Fail before any file is created if the tree and models do not fit.
    let preflight = Simulator::from_config(&config).context("Invalid model settings")?;
    preflight
        .check_tree(&tree)
        .context("Tree does not match the configuration")?;

    let datasets = config.execution.num_datasets;
    println!("Simulating {datasets} dataset(s)...");

    let pb = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new(datasets as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {per_sec}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let results = (0..datasets)
        .into_par_iter()
        .map(|index| {
            let result = simulate_dataset(&config, &tree, &args.output, index);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            result
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    println!();
    for (path, stats) in &results {
        print_dataset(path, stats);
    }
    println!("\n✓ Simulation complete!");
    Ok(())
}

/// Simulate dataset `index` into its own file. The file only appears once the
/// whole alignment was written.
fn simulate_dataset(
    config: &Configuration,
    tree: &PhyloTree,
    prefix: &Path,
    index: usize,
) -> Result<(PathBuf, SimulationStats)> {
    let mut sim = Simulator::from_config(config)?;
    if let Some(seed) = config.execution.seed {
        sim.reseed(seed.wrapping_add(index as u64));
    }

    let numbered = (config.execution.num_datasets > 1).then_some(index);
    let path = AlignmentFile::output_path(
        prefix,
        numbered,
        config.output.format,
        config.output.compression,
    );
    let mut file = AlignmentFile::create(
        &path,
        config.output.format,
        config.evolution.sequence_type,
        config.output.compression,
    )
    .with_context(|| format!("Failed to create {}", path.display()))?;

    let stats = sim
        .run(tree, &mut file)
        .with_context(|| format!("Dataset {index} failed"))?;
    let path = file
        .commit()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(dataset = index, path = %path.display(), "dataset written");
    Ok((path, stats))
}
