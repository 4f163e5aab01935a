//! FunDi site swapping between paired taxa.
//!
//! Taxa are paired in the order given (`taxa[0]/taxa[1]`, `taxa[2]/taxa[3]`,
//! ...). Once both leaves of a pair are simulated, `round(proportion × L)`
//! distinct sites are drawn and their states exchanged.

use crate::base::Sequence;
use crate::errors::ConfigError;
use crate::tree::{NodeId, PhyloTree};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunDiConfig {
    /// Leaf names, read as consecutive pairs.
    pub taxa: Vec<String>,
    /// Fraction of sites swapped within each pair.
    pub proportion: f64,
}

impl FunDiConfig {
    pub fn new(taxa: Vec<String>, proportion: f64) -> Self {
        Self { taxa, proportion }
    }

    /// Checks that do not need the tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.proportion) {
            return Err(ConfigError::InvalidFunDi(format!(
                "proportion must lie in [0, 1], got {}",
                self.proportion
            )));
        }
        if self.taxa.len() % 2 != 0 {
            return Err(ConfigError::InvalidFunDi(format!(
                "taxa must come in pairs, got {}",
                self.taxa.len()
            )));
        }
        let mut seen = HashSet::new();
        for taxon in &self.taxa {
            if !seen.insert(taxon.as_str()) {
                return Err(ConfigError::InvalidFunDi(format!(
                    "taxon '{taxon}' is listed twice"
                )));
            }
        }
        Ok(())
    }

    /// Number of sites swapped per pair for sequences of `length` sites.
    pub fn sites_per_pair(&self, length: usize) -> usize {
        ((self.proportion * length as f64).round() as usize).min(length)
    }
}

/// Per-run pairing state, indexed by node.
#[derive(Debug)]
pub(crate) struct FunDiPairs {
    partner: Vec<Option<NodeId>>,
    ready: Vec<bool>,
    sites_per_pair: usize,
}

impl FunDiPairs {
    pub(crate) fn resolve(
        config: &FunDiConfig,
        tree: &PhyloTree,
        length: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut partner = vec![None; tree.len()];
        for pair in config.taxa.chunks_exact(2) {
            let a = resolve_leaf(tree, &pair[0])?;
            let b = resolve_leaf(tree, &pair[1])?;
            partner[a] = Some(b);
            partner[b] = Some(a);
        }
        Ok(Self {
            partner,
            ready: vec![false; tree.len()],
            sites_per_pair: config.sites_per_pair(length),
        })
    }

    #[inline]
    pub(crate) fn is_paired(&self, node: NodeId) -> bool {
        self.partner[node].is_some()
    }

    /// Record that `node` is simulated. Returns its partner once both are.
    pub(crate) fn mark_ready(&mut self, node: NodeId) -> Option<NodeId> {
        let partner = self.partner[node]?;
        self.ready[node] = true;
        self.ready[partner].then_some(partner)
    }

    pub(crate) fn sites_per_pair(&self) -> usize {
        self.sites_per_pair
    }
}

fn resolve_leaf(tree: &PhyloTree, name: &str) -> Result<NodeId, ConfigError> {
    if let Some(id) = tree.leaf_by_name(name) {
        return Ok(id);
    }
    let reason = match tree.node_by_name(name) {
        Some(_) => format!("'{name}' is an internal node, not a leaf"),
        None => format!("taxon '{name}' is not in the tree"),
    };
    Err(ConfigError::InvalidFunDi(reason))
}

/// Exchange the states of `count` distinct random sites between `a` and `b`.
///
/// Returns the number of sites selected.
pub fn swap_sites<R: Rng + ?Sized>(
    a: &mut Sequence,
    b: &mut Sequence,
    count: usize,
    rng: &mut R,
) -> usize {
    let len = a.len().min(b.len());
    let count = count.min(len);
    if count == 0 {
        return 0;
    }
    let (a, b) = (a.as_mut_slice(), b.as_mut_slice());
    for site in rand::seq::index::sample(rng, len, count).iter() {
        std::mem::swap(&mut a[site], &mut b[site]);
    }
    count
}
