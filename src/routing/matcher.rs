//! Pattern matching over `host/path` keys.
//!
//! # Responsibilities
//! - Store patterns in a segment trie (host first, then path segments)
//! - Reject duplicate and malformed patterns at insertion
//! - Resolve the most specific pattern for a request key
//!
//! # Design Decisions
//! - Nodes live in an arena (`Vec<Node>`) and link to children by index
//! - Host matching is case-insensitive, path matching is case-sensitive
//! - A wildcard may only terminate a pattern and consumes the rest of the key
//! - Exact segments win over wildcards at the same depth; among wildcards the
//!   longest literal prefix wins
//! - Written once at startup, read-only afterwards (no locking)

use std::collections::HashMap;

/// Marker ending a wildcard segment.
pub const WILDCARD: char = '*';

/// Error type for trie insertion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrieError {
    #[error("route {pattern:?} already exists")]
    Duplicate { pattern: String },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Wildcard {
    prefix: Box<str>,
    slot: usize,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<Box<str>, NodeId>,
    /// Sorted by descending prefix length.
    wildcards: Vec<Wildcard>,
    exact: Option<usize>,
}

/// Trie of `host/path` patterns mapping to values of type `T`.
#[derive(Debug)]
pub struct PatternTrie<T> {
    nodes: Vec<Node>,
    values: Vec<T>,
}

impl<T> Default for PatternTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PatternTrie<T> {
    const ROOT: NodeId = NodeId(0);

    /// Create an empty trie.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            values: Vec::new(),
        }
    }

    /// Number of stored patterns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate stored values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Insert a pattern.
    ///
    /// Fails without modifying the trie if the pattern is malformed or already present.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), TrieError> {
        let canonical = canonical_key(pattern);
        let invalid = |reason| TrieError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if split_host(&canonical).0.is_empty() {
            return Err(invalid("missing host"));
        }
        if let Some(pos) = canonical.find(WILDCARD) {
            if pos != canonical.len() - 1 {
                return Err(invalid("wildcard must be the last character"));
            }
        }

        let segments: Vec<&str> = canonical.split('/').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(invalid("empty pattern"));
        };

        // Check for duplicates before creating any node.
        let existing = self.walk(parents);
        let taken = match last.strip_suffix(WILDCARD) {
            Some(prefix) => existing
                .is_some_and(|id| self.nodes[id.0].wildcards.iter().any(|w| &*w.prefix == prefix)),
            None => existing
                .and_then(|id| self.nodes[id.0].children.get(*last).copied())
                .is_some_and(|id| self.nodes[id.0].exact.is_some()),
        };
        if taken {
            return Err(TrieError::Duplicate {
                pattern: pattern.to_string(),
            });
        }

        let slot = self.values.len();
        self.values.push(value);

        let parent = parents
            .iter()
            .fold(Self::ROOT, |node, segment| self.child_or_insert(node, segment));
        match last.strip_suffix(WILDCARD) {
            Some(prefix) => {
                let wildcards = &mut self.nodes[parent.0].wildcards;
                let at = wildcards
                    .iter()
                    .position(|w| w.prefix.len() < prefix.len())
                    .unwrap_or(wildcards.len());
                wildcards.insert(
                    at,
                    Wildcard {
                        prefix: prefix.into(),
                        slot,
                    },
                );
            }
            None => {
                let node = self.child_or_insert(parent, last);
                self.nodes[node.0].exact = Some(slot);
            }
        }

        Ok(())
    }

    /// Find the most specific pattern matching `key`.
    pub fn lookup(&self, key: &str) -> Option<&T> {
        let canonical = canonical_key(key);
        self.find(Self::ROOT, Some(&canonical))
            .map(|slot| &self.values[slot])
    }

    fn find(&self, id: NodeId, rest: Option<&str>) -> Option<usize> {
        let node = &self.nodes[id.0];

        match rest {
            None => {
                if node.exact.is_some() {
                    return node.exact;
                }
            }
            Some(rest) => {
                let (segment, tail) = match rest.split_once('/') {
                    Some((segment, tail)) => (segment, Some(tail)),
                    None => (rest, None),
                };
                if let Some(&child) = node.children.get(segment) {
                    if let Some(slot) = self.find(child, tail) {
                        return Some(slot);
                    }
                }
            }
        }

        let remainder = rest.unwrap_or("");
        node.wildcards
            .iter()
            .find(|w| remainder.starts_with(&*w.prefix))
            .map(|w| w.slot)
    }

    /// Follow existing nodes for `segments`, without creating any.
    fn walk(&self, segments: &[&str]) -> Option<NodeId> {
        segments.iter().try_fold(Self::ROOT, |id, segment| {
            self.nodes[id.0].children.get(*segment).copied()
        })
    }

    fn child_or_insert(&mut self, parent: NodeId, segment: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent.0].children.get(segment) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::default());
        self.nodes[parent.0].children.insert(segment.into(), id);
        id
    }
}

/// Build the lookup key for a request: `host/path` with the path's outer slashes removed.
pub fn route_key(host: &str, path: &str) -> String {
    format!("{}/{}", host.to_ascii_lowercase(), path.trim_matches('/'))
}

/// Canonical trie form of a pattern or key: lowercase host, then the trimmed path.
/// An empty path leaves just the host, so a key always splits into its exact segments.
fn canonical_key(key: &str) -> String {
    let (host, path) = split_host(key);
    let path = path.trim_matches('/');
    let host = host.to_ascii_lowercase();
    if path.is_empty() {
        host
    } else {
        format!("{host}/{path}")
    }
}

fn split_host(key: &str) -> (&str, &str) {
    key.split_once('/').unwrap_or((key, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(patterns: &[&'static str]) -> PatternTrie<&'static str> {
        let mut trie = PatternTrie::new();
        for pattern in patterns {
            trie.insert(pattern, *pattern).unwrap();
        }
        trie
    }

    #[test]
    fn test_exact_lookup() {
        let trie = trie(&["a.com/x", "a.com/x/y", "b.com/"]);
        assert_eq!(trie.lookup("a.com/x"), Some(&"a.com/x"));
        assert_eq!(trie.lookup("a.com/x/y"), Some(&"a.com/x/y"));
        assert_eq!(trie.lookup("b.com/"), Some(&"b.com/"));
        assert_eq!(trie.lookup("a.com/z"), None);
        assert_eq!(trie.lookup("a.com/"), None);
    }

    #[test]
    fn test_slashes_normalized() {
        let trie = trie(&["a.com/x/y/"]);
        assert_eq!(trie.lookup("a.com//x/y/"), Some(&"a.com/x/y/"));
        assert_eq!(trie.lookup("a.com/x//y"), None);
        assert_eq!(trie.lookup("a.com/x/y"), Some(&"a.com/x/y/"));
        assert_eq!(trie.lookup(&route_key("a.com", "/x/y/")), Some(&"a.com/x/y/"));
    }

    #[test]
    fn test_host_case_insensitive() {
        let trie = trie(&["Example.COM/Path"]);
        assert_eq!(trie.lookup("example.com/Path"), Some(&"Example.COM/Path"));
        assert_eq!(trie.lookup("example.com/path"), None);
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let trie = trie(&["a.com/*", "a.com/x"]);
        assert_eq!(trie.lookup("a.com/x"), Some(&"a.com/x"));
        assert_eq!(trie.lookup("a.com/y"), Some(&"a.com/*"));
    }

    #[test]
    fn test_wildcard_consumes_remainder() {
        let trie = trie(&["a.com/*"]);
        assert_eq!(trie.lookup("a.com/anything/nested"), Some(&"a.com/*"));
        assert_eq!(trie.lookup("a.com/"), Some(&"a.com/*"));
        assert_eq!(trie.lookup("b.com/anything"), None);
    }

    #[test]
    fn test_deeper_wildcard_wins() {
        let trie = trie(&["a.com/*", "a.com/x/*"]);
        assert_eq!(trie.lookup("a.com/x/y"), Some(&"a.com/x/*"));
        assert_eq!(trie.lookup("a.com/x"), Some(&"a.com/x/*"));
        assert_eq!(trie.lookup("a.com/z/y"), Some(&"a.com/*"));
    }

    #[test]
    fn test_longer_literal_prefix_wins() {
        let trie = trie(&["a.com/a*", "a.com/ab*"]);
        assert_eq!(trie.lookup("a.com/abc/d"), Some(&"a.com/ab*"));
        assert_eq!(trie.lookup("a.com/acd"), Some(&"a.com/a*"));
        assert_eq!(trie.lookup("a.com/b"), None);
    }

    #[test]
    fn test_exact_dead_end_backtracks() {
        let trie = trie(&["a.com/*", "a.com/x/y"]);
        assert_eq!(trie.lookup("a.com/x/z"), Some(&"a.com/*"));
        assert_eq!(trie.lookup("a.com/x"), Some(&"a.com/*"));
    }

    #[test]
    fn test_host_wildcard() {
        let trie = trie(&["*", "a.com/*"]);
        assert_eq!(trie.lookup("a.com/x"), Some(&"a.com/*"));
        assert_eq!(trie.lookup("other.com/x"), Some(&"*"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut trie = PatternTrie::new();
        trie.insert("a.com/x", 1).unwrap();
        trie.insert("a.com/*", 2).unwrap();

        assert!(matches!(trie.insert("a.com/x", 3), Err(TrieError::Duplicate { .. })));
        assert!(matches!(trie.insert("a.com/x/", 3), Err(TrieError::Duplicate { .. })));
        assert!(matches!(trie.insert("a.com/*", 3), Err(TrieError::Duplicate { .. })));

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.lookup("a.com/x"), Some(&1));
        assert_eq!(trie.lookup("a.com/q"), Some(&2));
    }

    #[test]
    fn test_wildcard_overlap_allowed() {
        let mut trie = PatternTrie::new();
        trie.insert("a.com/*", 1).unwrap();
        trie.insert("a.com/x*", 2).unwrap();
        trie.insert("a.com/x/*", 3).unwrap();
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_invalid_patterns() {
        let mut trie = PatternTrie::new();
        assert!(matches!(trie.insert("a.com/*/x", 1), Err(TrieError::InvalidPattern { .. })));
        assert!(matches!(trie.insert("a.com/x**", 1), Err(TrieError::InvalidPattern { .. })));
        assert!(matches!(trie.insert("/x", 1), Err(TrieError::InvalidPattern { .. })));
        assert!(trie.is_empty());
    }
}
