//! Newick reader.
//!
//! Supports multifurcations, quoted labels (`'a b'`, `''` for a quote),
//! `[...]` comments and `[&key=value,...]` branch annotations, which may come
//! before or after the branch length. The `model` key names a branch model.
//!
//! The parser keeps its own stack, so arbitrarily deep trees are fine.

use super::phylo_tree::{Edge, PhyloTree};
use crate::errors::TreeError;
use std::collections::BTreeMap;

/// Characters that end an unquoted label.
const LABEL_DELIMITERS: &[u8] = b"(),:;[]";

pub(crate) fn parse(text: &str) -> Result<PhyloTree, TreeError> {
    let mut p = Cursor::new(text.as_bytes());
    p.skip_comments_and_whitespace()?;

    let mut tree;
    if p.consume(b'(') {
        tree = PhyloTree::with_root(None);
        let mut stack = vec![tree.root()];
        let mut expect_child = true;

        while let Some(&parent) = stack.last() {
            p.skip_comments_and_whitespace()?;
            if expect_child {
                if p.consume(b'(') {
                    let id = tree.add_child(parent, None, Edge::default());
                    stack.push(id);
                    continue;
                }
                let name = p.parse_label()?;
                let edge = p.parse_branch()?;
                tree.add_child(parent, name, edge);
                expect_child = false;
                continue;
            }

            match p.next_byte() {
                Some(b',') => expect_child = true,
                Some(b')') => {
                    stack.pop();
                    p.skip_comments_and_whitespace()?;
                    let name = p.parse_label()?;
                    let edge = p.parse_branch()?;
                    tree.set_name(parent, name);
                    // A root branch length is accepted and ignored.
                    tree.set_edge(parent, edge);
                }
                Some(b) => {
                    return Err(TreeError::parse(
                        p.pos - 1,
                        format!("expected ',' or ')' but found '{}'", b as char),
                    ))
                }
                None => return Err(TreeError::parse(p.pos, "unexpected end of input")),
            }
        }
    } else {
        let name = p.parse_label()?;
        p.parse_branch()?;
        tree = PhyloTree::with_root(name);
    }

    p.skip_comments_and_whitespace()?;
    if !p.consume(b';') {
        return Err(TreeError::parse(p.pos, "expected ';' at end of tree"));
    }
    p.skip_comments_and_whitespace()?;
    if !p.is_eof() {
        return Err(TreeError::parse(p.pos, "unexpected content after ';'"));
    }
    Ok(tree)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn consume(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn at_annotation(&self) -> bool {
        self.bytes[self.pos..].starts_with(b"[&")
    }

    /// Skip whitespace and plain `[...]` comments, stopping at `[&`.
    fn skip_comments_and_whitespace(&mut self) -> Result<(), TreeError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'[') if !self.at_annotation() => {
                    let start = self.pos;
                    let end = self.bytes[start..]
                        .iter()
                        .position(|&b| b == b']')
                        .ok_or_else(|| TreeError::parse(start, "unterminated comment"))?;
                    self.pos = start + end + 1;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Parse an optional quoted or unquoted label.
    fn parse_label(&mut self) -> Result<Option<String>, TreeError> {
        if self.consume(b'\'') {
            let start = self.pos - 1;
            let mut label = Vec::new();
            loop {
                match self.next_byte() {
                    Some(b'\'') if self.peek() == Some(b'\'') => {
                        self.pos += 1;
                        label.push(b'\'');
                    }
                    Some(b'\'') => break,
                    Some(b) => label.push(b),
                    None => return Err(TreeError::parse(start, "unterminated quoted label")),
                }
            }
            return String::from_utf8(label)
                .map(Some)
                .map_err(|_| TreeError::parse(start, "label is not valid UTF-8"));
        }

        let start = self.pos;
        while let Some(b) = self.peek() {
            if LABEL_DELIMITERS.contains(&b) || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(None);
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .map(|s| Some(s.to_string()))
            .map_err(|_| TreeError::parse(start, "label is not valid UTF-8"))
    }

    /// Parse the annotations and the optional `:length` following a label.
    fn parse_branch(&mut self) -> Result<Edge, TreeError> {
        let mut edge = Edge::default();
        let mut has_length = false;
        loop {
            self.skip_comments_and_whitespace()?;
            if self.at_annotation() {
                self.parse_annotations(&mut edge.attributes)?;
            } else if !has_length && self.consume(b':') {
                self.skip_comments_and_whitespace()?;
                edge.length = self.parse_length()?;
                has_length = true;
            } else {
                break;
            }
        }
        edge.model = edge.attributes.remove("model");
        Ok(edge)
    }

    fn parse_length(&mut self) -> Result<f64, TreeError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        text.parse::<f64>()
            .map_err(|_| TreeError::parse(start, format!("invalid branch length '{text}'")))
    }

    /// Parse `[&key=value,...]` into `attributes`.
    fn parse_annotations(
        &mut self,
        attributes: &mut BTreeMap<String, String>,
    ) -> Result<(), TreeError> {
        let start = self.pos;
        self.pos += 2;
        loop {
            let key = self.read_until(b"=,]").trim().to_string();
            if key.is_empty() || !self.consume(b'=') {
                return Err(TreeError::parse(self.pos, "expected 'key=value' in annotation"));
            }
            let value = self.read_until(b",]").trim().trim_matches('"').to_string();
            if value.is_empty() {
                return Err(TreeError::parse(
                    self.pos,
                    format!("empty annotation value for key '{key}'"),
                ));
            }
            attributes.insert(key, value);
            match self.next_byte() {
                Some(b',') => continue,
                Some(b']') => return Ok(()),
                _ => return Err(TreeError::parse(start, "unterminated annotation")),
            }
        }
    }

    fn read_until(&mut self, stops: &[u8]) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tree() {
        let tree = parse("((A:0.1,B:0.1):0.05,C:0.2);").unwrap();
        assert_eq!(tree.len(), 5);
        let c = tree.leaf_by_name("C").unwrap();
        assert_eq!(tree.edge(c).unwrap().length, 0.2);
        let a = tree.leaf_by_name("A").unwrap();
        let ab = tree.parent(a).unwrap();
        assert_eq!(tree.edge(ab).unwrap().length, 0.05);
        assert_eq!(tree.parent(ab), Some(tree.root()));
    }

    #[test]
    fn test_parse_multifurcation_and_internal_names() {
        let tree = parse("(A:1,B:2,(C:1,D:1)CD:0.5)root;").unwrap();
        assert_eq!(tree.children(tree.root()).len(), 3);
        assert_eq!(tree.name(tree.root()), Some("root"));
        assert!(tree.node_by_name("CD").is_some());
        assert_eq!(tree.num_leaves(), 4);
    }

    #[test]
    fn test_parse_annotations_and_comments() {
        let text = "(A[&model=FAST,color=red]:0.1, [a comment] B:0.2[&model=SLOW], 'C d''e':0.3);";
        let tree = parse(text).unwrap();
        let a = tree.leaf_by_name("A").unwrap();
        let edge = tree.edge(a).unwrap();
        assert_eq!(edge.model.as_deref(), Some("FAST"));
        assert_eq!(edge.attributes.get("color").map(String::as_str), Some("red"));
        assert!(!edge.attributes.contains_key("model"));

        let b = tree.leaf_by_name("B").unwrap();
        assert_eq!(tree.edge(b).unwrap().model.as_deref(), Some("SLOW"));
        assert!(tree.leaf_by_name("C d'e").is_some());
    }

    #[test]
    fn test_parse_scientific_lengths_and_root_edge() {
        let tree = parse("(A:1e-3,B:2.5E+1):0.7;").unwrap();
        let a = tree.leaf_by_name("A").unwrap();
        assert_eq!(tree.edge(a).unwrap().length, 1e-3);
        assert!(tree.edge(tree.root()).is_none());
    }

    #[test]
    fn test_parse_single_node() {
        let tree = parse("A;").unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_leaf(tree.root()));
    }

    #[test]
    fn test_parse_deep_caterpillar() {
        let depth = 5000;
        let mut text = String::new();
        for _ in 0..depth {
            text.push('(');
        }
        text.push_str("L0:1");
        for i in 1..=depth {
            text.push_str(&format!(",L{i}:1):1"));
        }
        text.push(';');
        let tree = parse(&text).unwrap();
        assert_eq!(tree.num_leaves(), depth + 1);
        assert_eq!(tree.depth(), depth);
    }

    #[test]
    fn test_parse_errors() {
        for (bad, pos) in [
            ("(A:0.1,B:0.2)", 13),
            ("(A:0.1,B:0.2;", 12),
            ("(A:x,B:1);", 3),
            ("(A:1,B:1); extra", 11),
            ("(A[&model]:1,B:1);", 9),
            ("(A:1,B:1)[unterminated;", 9),
        ] {
            match parse(bad) {
                Err(TreeError::Parse { position, .. }) => assert_eq!(position, pos, "{bad}"),
                other => panic!("{bad}: expected parse error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_round_trip_through_writer() {
        let text = "((A:0.1,B[&model=FAST]:0.1):0.05,C:0.2);";
        let tree = parse(text).unwrap();
        assert_eq!(tree.to_newick(), text);
    }
}
