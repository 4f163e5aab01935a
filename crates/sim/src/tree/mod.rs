//! Rooted phylogenetic trees and a Newick reader.

mod newick;
mod phylo_tree;

pub use phylo_tree::{Edge, Node, NodeId, PhyloTree};
