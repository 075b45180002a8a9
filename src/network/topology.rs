//! Static neighbour graph, one line per node:
//!
//! ```text
//! # comment
//! 127.0.0.1:5001 -> 127.0.0.1:5002, 127.0.0.1:5003
//! ```
//!
//! An empty topology means "no restriction": every peer the tracker lists is a neighbour.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use crate::utils::{Result, VoteChainError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl Topology {
    pub fn parse(text: &str) -> Result<Self> {
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (node, rest) = line.split_once("->").ok_or_else(|| {
                VoteChainError::Config(format!("topology line {}: expected `node -> neighbour, ...`", lineno + 1))
            })?;
            let node = node.trim();
            if node.is_empty() {
                return Err(VoteChainError::Config(format!("topology line {}: missing node", lineno + 1)));
            }
            let neighbours = edges.entry(node.to_string()).or_default();
            for n in rest.split(',').map(str::trim).filter(|n| !n.is_empty() && *n != node) {
                neighbours.insert(n.to_string());
            }
        }
        Ok(Self { edges })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Neighbours of `node`; `None` when the topology places no restriction on it.
    pub fn neighbours(&self, node: &str) -> Option<BTreeSet<String>> {
        if self.is_empty() {
            return None;
        }
        Some(self.edges.get(node).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edges_and_skips_comments() {
        let topo = Topology::parse(
            "# ring\n a:1 -> b:2, c:3\n\nb:2 -> a:1 # back edge\nc:3 ->\n",
        )
        .unwrap();
        let a = topo.neighbours("a:1").unwrap();
        assert_eq!(a.into_iter().collect::<Vec<_>>(), vec!["b:2", "c:3"]);
        assert_eq!(topo.neighbours("c:3").unwrap().len(), 0);
        assert_eq!(topo.neighbours("unlisted").unwrap().len(), 0);
    }

    #[test]
    fn empty_topology_is_unrestricted() {
        let topo = Topology::parse("\n# nothing\n").unwrap();
        assert!(topo.is_empty());
        assert!(topo.neighbours("a").is_none());
    }

    #[test]
    fn malformed_line_is_a_config_error() {
        assert!(matches!(Topology::parse("a b c"), Err(VoteChainError::Config(_))));
    }
}
