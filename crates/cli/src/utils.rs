use anyhow::{bail, Context, Result};
use phylosim_sim::simulation::{AncestralConfig, Configuration, FunDiConfig};
use phylosim_sim::tree::PhyloTree;
use std::fs;
use std::path::Path;

use crate::args::ConfigOverrides;
use crate::defaults;

/// Configuration with the built-in defaults.
pub fn default_configuration() -> Result<Configuration> {
    let mut config = Configuration::new(defaults::SEQUENCE_LENGTH, defaults::MODEL);
    config.execution.num_datasets = defaults::NUM_DATASETS;
    config.evolution.sequence_type = defaults::SEQUENCE_TYPE.parse()?;
    config.evolution.branch_scale = defaults::BRANCH_SCALE;
    config.output.format = defaults::FORMAT.parse()?;
    config.output.compression = defaults::COMPRESSION.parse()?;
    Ok(config)
}

/// Read a JSON configuration, or fall back to the defaults.
pub fn load_configuration(path: Option<&Path>) -> Result<Configuration> {
    let Some(path) = path else {
        return default_configuration();
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    Configuration::from_json(&text)
        .with_context(|| format!("Invalid configuration {}", path.display()))
}

pub fn read_tree(path: &Path) -> Result<PhyloTree> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree {}", path.display()))?;
    PhyloTree::from_newick(&text)
        .with_context(|| format!("Invalid tree {}", path.display()))
}

/// Apply command line settings on top of `config` and validate the result.
pub fn apply_overrides(config: &mut Configuration, settings: &ConfigOverrides) -> Result<()> {
    if let Some(length) = settings.length {
        config.execution.sequence_length = length;
    }
    if let Some(model) = &settings.model {
        config.evolution.model = model.clone();
    }
    if let Some(seq_type) = settings.sequence_type {
        config.evolution.sequence_type = seq_type;
    }
    if let Some(datasets) = settings.datasets {
        config.execution.num_datasets = datasets;
    }
    if let Some(seed) = settings.seed {
        config.execution.seed = Some(seed);
    }
    if let Some(scale) = settings.branch_scale {
        config.evolution.branch_scale = scale;
    }
    for entry in &settings.branch_models {
        let Some((name, model)) = entry.split_once('=') else {
            bail!("Branch model '{entry}' must be given as NAME=MODEL");
        };
        config
            .evolution
            .branch_models
            .insert(name.trim().to_string(), model.trim().to_string());
    }
    if let Some(proportion) = settings.fundi_proportion {
        config.evolution.fundi = Some(FunDiConfig::new(settings.fundi_taxa.clone(), proportion));
    }
    if let Some(ancestral) = &settings.ancestral {
        config.initialization.ancestral = AncestralConfig::Sequence(ancestral.clone());
        if settings.length.is_none() {
            config.execution.sequence_length = site_count(ancestral);
        }
    }
    if let Some(format) = settings.format {
        config.output.format = format;
    }
    if let Some(compression) = settings.compression {
        config.output.compression = compression;
    }
    if settings.no_streaming {
        config.output.streaming = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// Number of sites in a sequence given as symbols, ignoring whitespace.
pub fn site_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
