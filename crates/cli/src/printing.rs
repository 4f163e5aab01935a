use phylosim_sim::simulation::{AncestralConfig, Configuration, SimulationStats};
use phylosim_sim::tree::PhyloTree;
use std::path::Path;

use crate::utils::site_count;

pub fn print_parameters(config: &Configuration) {
    let execution = &config.execution;
    let evolution = &config.evolution;
    println!("\n📋 Simulation Configuration");
    println!(
        "  • Sequence Length: {} [-L, --length]",
        execution.sequence_length
    );
    println!("  • Datasets: {} [-n, --datasets]", execution.num_datasets);
    if let Some(seed) = execution.seed {
        println!("  • Random Seed: {seed} [--seed]");
    } else {
        println!("  • Random Seed: Random [--seed]");
    }

    println!("\n🧬 Evolution");
    println!(
        "  • Sequence Type: {} [--seqtype]",
        evolution.sequence_type
    );
    println!("  • Model: {} [-m, --model]", evolution.model);
    println!(
        "  • Branch Scale: {} [--branch-scale]",
        evolution.branch_scale
    );
    if evolution.branch_models.is_empty() {
        println!("  • Branch Models: None [--branch-model]");
    } else {
        println!("  • Branch Models:");
        for (name, model) in &evolution.branch_models {
            println!("    - {name}: {model}");
        }
    }
    match &evolution.fundi {
        Some(fundi) => println!(
            "  • FunDi: {} taxa, proportion {} [--fundi-taxa, --fundi-proportion]",
            fundi.taxa.len(),
            fundi.proportion
        ),
        None => println!("  • FunDi: Disabled"),
    }
    match &config.initialization.ancestral {
        AncestralConfig::Random => println!("  • Root Sequence: Random [--ancestral]"),
        AncestralConfig::Sequence(seq) => println!(
            "  • Root Sequence: Fixed, {} sites [--ancestral]",
            site_count(seq)
        ),
    }

    println!("\n💾 Output");
    println!("  • Format: {} [-f, --format]", config.output.format);
    println!(
        "  • Compression: {} [--compression]",
        config.output.compression
    );
    let streaming = if config.output.streaming {
        "Yes"
    } else {
        "No [--no-streaming]"
    };
    println!("  • Streaming: {streaming}");
    println!();
}

pub fn print_tree_summary(path: &Path, tree: &PhyloTree) {
    println!("🌳 Tree: {}", path.display());
    println!("  • Leaves: {}", tree.num_leaves());
    println!("  • Nodes: {}", tree.len());
    println!("  • Depth: {} edges", tree.depth());
    println!("  • Total Branch Length: {:.4}", tree.total_length());
}

pub fn print_dataset(path: &Path, stats: &SimulationStats) {
    println!(
        "✓ {} ({} taxa × {} sites)",
        path.display(),
        stats.leaves_written,
        stats.sequence_length
    );
    if stats.invariant_sites > 0 {
        println!("    - Invariant sites: {}", stats.invariant_sites);
    }
    if stats.fundi_swapped_sites > 0 {
        println!("    - FunDi swapped sites: {}", stats.fundi_swapped_sites);
    }
    if stats.sampling_fallbacks > 0 {
        println!("    ⚠️  Sampling fallbacks: {}", stats.sampling_fallbacks);
    }
}
