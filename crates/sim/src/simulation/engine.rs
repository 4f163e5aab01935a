//! Tree-walking simulation engine.
//!
//! Starting from the root sequence, every edge is simulated parent to child
//! in depth-first order with an explicit work stack. A node is fully computed
//! before any of its children, and its buffer is recycled as soon as its last
//! reader (child edge, leaf output, FunDi swap) is done with it.

use super::ancestral::{ancestral_from_text, random_ancestral, AncestralConfig};
use super::fundi::{swap_sites, FunDiConfig, FunDiPairs};
use super::mode::{EdgeKernel, EdgeRule, SimulationMode};
use super::store::SequenceStore;
use super::{Configuration, SimulationBuilder};
use crate::base::{Sequence, SequenceType};
use crate::errors::{ConfigError, SimulationError};
use crate::evolution::{ModelDefinition, SiteRateAssignment};
use crate::output::{LeafSink, MemorySink};
use crate::sampling::ProbabilitySampler;
use crate::tree::{NodeId, PhyloTree};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// With ascertainment correction a random root is this many times longer
/// than the requested alignment, leaving room to drop constant sites.
pub const ASC_LENGTH_RATIO: usize = 2;

/// Counters collected during one call to [`Simulator::simulate_sequences`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    /// Sites per written sequence
    pub sequence_length: usize,
    /// Non-root nodes simulated
    pub nodes_simulated: usize,
    /// Leaves passed to the sink
    pub leaves_written: usize,
    /// Most node sequences held at once
    pub peak_live_sequences: usize,
    /// Draws resolved by the max-probability fallback
    pub sampling_fallbacks: u64,
    /// Sites exchanged by FunDi, summed over pairs
    pub fundi_swapped_sites: usize,
    /// Simulated sites that were invariant for the whole run
    pub invariant_sites: usize,
}

/// Simulates sequences along a tree.
///
/// # Examples
///
/// ```
/// use phylosim_sim::output::MemorySink;
/// use phylosim_sim::simulation::SimulationBuilder;
/// use phylosim_sim::tree::PhyloTree;
///
/// let tree = PhyloTree::from_newick("((A:0.1,B:0.1):0.05,C:0.2);").unwrap();
/// let mut sim = SimulationBuilder::new()
///     .model("HKY{2.0}+G4{0.5}")
///     .sequence_length(100)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// let mut sink = MemorySink::new();
/// let stats = sim.run(&tree, &mut sink).unwrap();
/// assert_eq!(stats.leaves_written, 3);
/// assert_eq!(sink.get("A").unwrap().len(), 100);
/// ```
#[derive(Debug)]
pub struct Simulator {
    seq_type: SequenceType,
    model: ModelDefinition,
    branch_models: BTreeMap<String, ModelDefinition>,
    fundi: Option<FunDiConfig>,
    branch_scale: f64,
    streaming: bool,
    sequence_length: Option<usize>,
    ancestral: AncestralConfig,
    rng: Xoshiro256PlusPlus,
}

/// Mutable state of one run.
struct RunContext<'r> {
    kernel: EdgeKernel<'r>,
    store: SequenceStore,
    fundi: Option<FunDiPairs>,
    stats: SimulationStats,
}

impl Simulator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        seq_type: SequenceType,
        model: ModelDefinition,
        branch_models: BTreeMap<String, ModelDefinition>,
        fundi: Option<FunDiConfig>,
        branch_scale: f64,
        streaming: bool,
        sequence_length: Option<usize>,
        ancestral: AncestralConfig,
        seed: Option<u64>,
    ) -> Self {
        Self {
            seq_type,
            model,
            branch_models,
            fundi,
            branch_scale,
            streaming,
            sequence_length,
            ancestral,
            rng: make_rng(seed),
        }
    }

    /// Build a simulator from a configuration.
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut builder = SimulationBuilder::new()
            .sequence_type(config.evolution.sequence_type)
            .model(config.evolution.model.clone())
            .branch_scale(config.evolution.branch_scale)
            .streaming(config.output.streaming)
            .ancestral(config.initialization.ancestral.clone());
        if config.execution.sequence_length > 0 {
            builder = builder.sequence_length(config.execution.sequence_length);
        }
        if let Some(seed) = config.execution.seed {
            builder = builder.seed(seed);
        }
        for (name, model) in &config.evolution.branch_models {
            builder = builder.branch_model(name.clone(), model.clone());
        }
        if let Some(fundi) = &config.evolution.fundi {
            builder = builder.fundi(fundi.taxa.clone(), fundi.proportion);
        }
        builder.build()
    }

    /// Restart the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.seq_type
    }

    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Check that the tree can be simulated with this configuration: leaves
    /// are valid, every branch model exists, and FunDi taxa are leaves.
    ///
    /// The root edge is never simulated, so its model annotation is ignored.
    pub fn check_tree(&self, tree: &PhyloTree) -> Result<(), ConfigError> {
        tree.validate()?;
        for node in (0..tree.len()).filter(|&n| n != tree.root()) {
            let Some(name) = tree.edge(node).and_then(|e| e.model.as_deref()) else {
                continue;
            };
            if !self.branch_models.contains_key(name) {
                return Err(ConfigError::MissingBranchModel {
                    node: tree
                        .name(node)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("#{node}")),
                    model: name.to_string(),
                });
            }
        }
        if let Some(fundi) = &self.fundi {
            let length = self.sequence_length.unwrap_or(0);
            FunDiPairs::resolve(fundi, tree, length)?;
        }
        Ok(())
    }

    /// Produce the root sequence configured for this simulator.
    ///
    /// With ascertainment correction a random root is
    /// [`ASC_LENGTH_RATIO`] times the configured length.
    pub fn ancestral_sequence(&mut self) -> Result<Sequence, ConfigError> {
        match &self.ancestral {
            AncestralConfig::Sequence(text) => {
                ancestral_from_text(text, self.seq_type, self.sequence_length)
            }
            AncestralConfig::Random => {
                let length = self.sequence_length.filter(|&l| l > 0).ok_or_else(|| {
                    ConfigError::InvalidParameter(
                        "a sequence length is needed for a random root sequence".into(),
                    )
                })?;
                let length = if self.model.ascertainment() {
                    length * ASC_LENGTH_RATIO
                } else {
                    length
                };
                // Fallbacks here only arise from rounding of the frequencies.
                let mut sampler = ProbabilitySampler::new();
                Ok(random_ancestral(
                    self.model.substitution().as_ref(),
                    length,
                    &mut sampler,
                    &mut self.rng,
                ))
            }
        }
    }

    /// Draw the rate class of every site from this simulator's random
    /// stream. A run makes the same draw right after the root sequence.
    pub fn site_rates(&mut self, length: usize) -> Result<SiteRateAssignment, ConfigError> {
        let mut sampler = ProbabilitySampler::new();
        self.model
            .rates()
            .assign_sites(length, &mut sampler, &mut self.rng)
    }

    /// Generate the root sequence and simulate the whole tree into `sink`.
    pub fn run<S: LeafSink + ?Sized>(
        &mut self,
        tree: &PhyloTree,
        sink: &mut S,
    ) -> Result<SimulationStats, SimulationError> {
        let ancestral = self.ancestral_sequence()?;
        self.simulate_sequences(tree, &ancestral, sink)
    }

    /// Simulate every node of `tree` from `ancestral` at the root and hand
    /// the leaves to `sink`.
    ///
    /// The sequence length is the length of `ancestral`. Configuration
    /// problems are reported before anything is written.
    ///
    /// With ascertainment correction the leaves are held back until the
    /// walk is done, and only the first `L` columns that are not constant
    /// across the leaves are written. `L` is the configured sequence length,
    /// or the root length divided by [`ASC_LENGTH_RATIO`] when none is set.
    pub fn simulate_sequences<S: LeafSink + ?Sized>(
        &mut self,
        tree: &PhyloTree,
        ancestral: &Sequence,
        sink: &mut S,
    ) -> Result<SimulationStats, SimulationError> {
        if !self.model.ascertainment() {
            return self.walk(tree, ancestral, sink);
        }
        let target = self
            .sequence_length
            .filter(|&l| l > 0)
            .unwrap_or(ancestral.len() / ASC_LENGTH_RATIO)
            .max(1);

        let mut buffer = MemorySink::new();
        let mut stats = self.walk(tree, ancestral, &mut buffer)?;
        let columns = variable_columns(buffer.leaves(), target);
        if columns.len() < target {
            return Err(SimulationError::TooFewVariableSites {
                needed: target,
                found: columns.len(),
            });
        }

        let names: Vec<&str> = buffer.taxa().iter().map(String::as_str).collect();
        sink.begin(&names, target)?;
        for (name, seq) in buffer.leaves() {
            let kept = columns.iter().filter_map(|&c| seq.get(c)).collect();
            sink.write_leaf(name, &Sequence::from_states(kept))?;
        }
        sink.finish()?;

        debug!(
            simulated = ancestral.len(),
            kept = target,
            "dropped constant sites"
        );
        stats.sequence_length = target;
        Ok(stats)
    }

    /// Walk the tree from `ancestral` and write every leaf to `sink`.
    fn walk<S: LeafSink + ?Sized>(
        &mut self,
        tree: &PhyloTree,
        ancestral: &Sequence,
        sink: &mut S,
    ) -> Result<SimulationStats, SimulationError> {
        self.check_tree(tree)?;
        let length = ancestral.len();
        if length == 0 {
            return Err(ConfigError::InvalidAncestral("sequence is empty".into()).into());
        }
        let num_states = self.seq_type.num_states();
        if let Some(state) = ancestral.max_state().filter(|&s| s as usize >= num_states) {
            return Err(ConfigError::InvalidAncestral(format!(
                "state {state} is outside the {} alphabet",
                self.seq_type
            ))
            .into());
        }

        let fundi = match &self.fundi {
            Some(config) => Some(FunDiPairs::resolve(config, tree, length)?),
            None => None,
        };

        let mut kernel = EdgeKernel::new(&mut self.rng, num_states);
        let assignment =
            self.model
                .rates()
                .assign_sites(length, &mut kernel.sampler, &mut *kernel.rng)?;
        let invariant_sites = assignment.invariant_sites();
        let mode = SimulationMode::from_assignment(assignment);
        debug!(
            model = self.model.text(),
            mode = mode.name(),
            length,
            nodes = tree.len(),
            invariant_sites,
            "starting simulation"
        );

        let mut ctx = RunContext {
            kernel,
            store: SequenceStore::new(tree.len()),
            fundi,
            stats: SimulationStats {
                sequence_length: length,
                invariant_sites,
                ..SimulationStats::default()
            },
        };
        for node in 0..tree.len() {
            let mut readers = tree.children(node).len();
            if tree.is_leaf(node) {
                readers += 1;
            }
            if ctx.fundi.as_ref().is_some_and(|f| f.is_paired(node)) {
                readers += 1;
            }
            ctx.store.set_readers(node, readers);
        }

        let leaves = tree.leaves();
        let names: Vec<&str> = leaves
            .iter()
            .map(|&leaf| tree.name(leaf).unwrap_or_default())
            .collect();
        sink.begin(&names, length)?;

        let root = tree.root();
        let mut root_seq = ctx.store.allocate(length);
        root_seq.as_mut_slice().copy_from_slice(ancestral.as_slice());
        ctx.store.insert(root, root_seq);
        if tree.is_leaf(root) {
            complete_leaf(&mut ctx, tree, root, self.streaming, sink)?;
        }

        let mut stack: Vec<NodeId> = tree.children(root).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let Some(parent) = tree.parent(node) else {
                continue;
            };
            let Some(edge) = tree.edge(node) else {
                continue;
            };
            let rule = match edge.model.as_deref() {
                Some(name) => match self.branch_models.get(name) {
                    Some(definition) => EdgeRule::Override(definition),
                    None => {
                        return Err(ConfigError::MissingBranchModel {
                            node: tree.name(node).unwrap_or_default().to_string(),
                            model: name.to_string(),
                        }
                        .into())
                    }
                },
                None => EdgeRule::Default(self.model.substitution().as_ref(), &mode),
            };
            let time = self.branch_scale * edge.length;

            let mut child = ctx.store.allocate(length);
            match ctx.store.get(parent) {
                Some(parent_seq) => ctx.kernel.evolve(rule, time, parent_seq, &mut child)?,
                None => {
                    return Err(SimulationError::ReleasedTooEarly {
                        parent,
                        child: node,
                    })
                }
            }
            ctx.store.insert(node, child);
            ctx.store.release(parent);
            ctx.stats.nodes_simulated += 1;

            if tree.is_leaf(node) {
                complete_leaf(&mut ctx, tree, node, self.streaming, sink)?;
            } else {
                stack.extend(tree.children(node).iter().rev());
            }
        }

        if !self.streaming {
            for &leaf in &leaves {
                emit_leaf(&mut ctx, tree, leaf, sink)?;
            }
        }
        sink.finish()?;

        let mut stats = ctx.stats;
        stats.peak_live_sequences = ctx.store.peak();
        stats.sampling_fallbacks = ctx.kernel.sampler.fallbacks();
        if stats.sampling_fallbacks > 0 {
            warn!(
                fallbacks = stats.sampling_fallbacks,
                "some draws fell beyond the cumulative probabilities and used the most likely state"
            );
        }
        debug!(
            nodes = stats.nodes_simulated,
            leaves = stats.leaves_written,
            peak_live = stats.peak_live_sequences,
            fundi_sites = stats.fundi_swapped_sites,
            "simulation finished"
        );
        Ok(stats)
    }
}

/// A leaf has been simulated: run any pending FunDi swap, then write it
/// out when streaming.
fn complete_leaf<S: LeafSink + ?Sized>(
    ctx: &mut RunContext<'_>,
    tree: &PhyloTree,
    leaf: NodeId,
    streaming: bool,
    sink: &mut S,
) -> Result<(), SimulationError> {
    let Some(fundi) = ctx.fundi.as_mut().filter(|f| f.is_paired(leaf)) else {
        if streaming {
            emit_leaf(ctx, tree, leaf, sink)?;
        }
        return Ok(());
    };
    let Some(partner) = fundi.mark_ready(leaf) else {
        return Ok(());
    };
    let count = fundi.sites_per_pair();
    if let Some((a, b)) = ctx.store.pair_mut(leaf, partner) {
        ctx.stats.fundi_swapped_sites += swap_sites(a, b, count, &mut *ctx.kernel.rng);
    }
    ctx.store.release(leaf);
    ctx.store.release(partner);
    if streaming {
        emit_leaf(ctx, tree, partner, sink)?;
        emit_leaf(ctx, tree, leaf, sink)?;
    }
    Ok(())
}

fn emit_leaf<S: LeafSink + ?Sized>(
    ctx: &mut RunContext<'_>,
    tree: &PhyloTree,
    leaf: NodeId,
    sink: &mut S,
) -> Result<(), SimulationError> {
    let name = tree.name(leaf).unwrap_or_default();
    if let Some(seq) = ctx.store.get(leaf) {
        sink.write_leaf(name, seq)?;
        ctx.stats.leaves_written += 1;
    }
    ctx.store.release(leaf);
    Ok(())
}

/// Indices of the first `limit` columns on which the leaves do not all agree.
fn variable_columns(leaves: &[(String, Sequence)], limit: usize) -> Vec<usize> {
    let Some(((_, first), rest)) = leaves.split_first() else {
        return Vec::new();
    };
    (0..first.len())
        .filter(|&c| rest.iter().any(|(_, seq)| seq.get(c) != first.get(c)))
        .take(limit)
        .collect()
}

fn make_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => {
            use rand::Rng;
            Xoshiro256PlusPlus::from_seed(rand::rng().random())
        }
    }
}
