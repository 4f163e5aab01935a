use crate::errors::TreeError;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// Index of a node in a [`PhyloTree`].
pub type NodeId = usize;

/// The branch above a non-root node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Edge {
    /// Branch length in expected substitutions per site.
    pub length: f64,
    /// Name of a branch-specific model, from a `[&model=NAME]` annotation.
    pub model: Option<String>,
    /// Remaining annotations of the branch.
    pub attributes: BTreeMap<String, String>,
}

impl Edge {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    edge: Option<Edge>,
}

impl Node {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The edge to the parent; `None` for the root.
    pub fn edge(&self) -> Option<&Edge> {
        self.edge.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Rooted phylogenetic tree stored as a node arena.
///
/// Nodes are addressed by [`NodeId`]; the root has no parent and no edge,
/// every other node has exactly one parent and one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PhyloTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl PhyloTree {
    /// Create a tree with a single root node.
    pub fn with_root(name: Option<String>) -> Self {
        Self {
            nodes: vec![Node {
                name,
                parent: None,
                children: Vec::new(),
                edge: None,
            }],
            root: 0,
        }
    }

    /// Parse a Newick string and validate the result.
    pub fn from_newick(text: &str) -> Result<Self, TreeError> {
        let tree = super::newick::parse(text)?;
        tree.validate()?;
        Ok(tree)
    }

    /// Attach a new child below `parent`.
    ///
    /// # Panics
    /// If `parent` is not a node of this tree.
    pub fn add_child(&mut self, parent: NodeId, name: Option<String>, edge: Edge) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name,
            parent: Some(parent),
            children: Vec::new(),
            edge: Some(edge),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub(crate) fn set_name(&mut self, node: NodeId, name: Option<String>) {
        self.nodes[node].name = name;
    }

    pub(crate) fn set_edge(&mut self, node: NodeId, edge: Edge) {
        if self.nodes[node].parent.is_some() {
            self.nodes[node].edge = Some(edge);
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    #[inline]
    pub fn edge(&self, id: NodeId) -> Option<&Edge> {
        self.nodes[id].edge.as_ref()
    }

    #[inline]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].name()
    }

    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].is_leaf()
    }

    /// Nodes in pre-order, children left to right.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Leaves in pre-order. This is the row order of written alignments.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.is_leaf(id))
            .collect()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Leaf with the given name.
    pub fn leaf_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.is_leaf() && n.name() == Some(name))
    }

    /// Any node with the given name.
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name() == Some(name))
    }

    /// Largest number of edges from the root to a leaf.
    pub fn depth(&self) -> usize {
        let mut depth = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for id in self.preorder() {
            if let Some(p) = self.nodes[id].parent {
                depth[id] = depth[p] + 1;
                max = max.max(depth[id]);
            }
        }
        max
    }

    /// Sum of all branch lengths.
    pub fn total_length(&self) -> f64 {
        self.nodes
            .iter()
            .filter_map(|n| n.edge.as_ref())
            .map(|e| e.length)
            .sum()
    }

    /// Check that every leaf is named, leaf names are unique, and branch
    /// lengths are finite and non-negative.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(edge) = &node.edge {
                if !edge.length.is_finite() || edge.length < 0.0 {
                    return Err(TreeError::InvalidBranchLength {
                        node: id,
                        length: edge.length,
                    });
                }
            }
            if node.is_leaf() {
                let name = node.name().ok_or(TreeError::UnnamedLeaf(id))?;
                if !seen.insert(name) {
                    return Err(TreeError::DuplicateLeaf(name.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Write the tree as Newick, including model annotations.
    pub fn to_newick(&self) -> String {
        enum Step {
            Enter(NodeId),
            Exit(NodeId),
            Comma,
        }

        let mut out = String::new();
        let mut stack = vec![Step::Enter(self.root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Comma => out.push(','),
                Step::Enter(id) if self.is_leaf(id) => self.write_label(id, &mut out),
                Step::Enter(id) => {
                    out.push('(');
                    stack.push(Step::Exit(id));
                    for (i, &child) in self.children(id).iter().enumerate().rev() {
                        stack.push(Step::Enter(child));
                        if i > 0 {
                            stack.push(Step::Comma);
                        }
                    }
                }
                Step::Exit(id) => {
                    out.push(')');
                    self.write_label(id, &mut out);
                }
            }
        }
        out.push(';');
        out
    }

    fn write_label(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        if let Some(name) = node.name() {
            if name.bytes().any(|b| b"(),:;[]' \t".contains(&b)) {
                let _ = write!(out, "'{}'", name.replace('\'', "''"));
            } else {
                out.push_str(name);
            }
        }
        if let Some(edge) = &node.edge {
            let annotations: Vec<String> = edge
                .model
                .iter()
                .map(|m| format!("model={m}"))
                .chain(edge.attributes.iter().map(|(k, v)| format!("{k}={v}")))
                .collect();
            if !annotations.is_empty() {
                let _ = write!(out, "[&{}]", annotations.join(","));
            }
            let _ = write!(out, ":{}", edge.length);
        }
    }
}
