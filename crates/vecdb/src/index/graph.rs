//! Graph storage and search-queue primitives for the HNSW index.
//!
//! The graph is cyclic, so nodes live in an arena indexed by store slot and
//! all cross-node references are plain slot indices. A node's level is
//! implicit: `links.len() - 1`, with an empty `links` meaning "absent from
//! the graph".

use std::cmp::Ordering;

/// Per-node neighbor lists. `links[level]` holds the neighbor slot indices
/// at that level.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeLinks {
    pub links: Vec<Vec<usize>>,
}

impl NodeLinks {
    /// The node's level, or -1 if it was never inserted.
    #[inline]
    pub fn level(&self) -> i32 {
        self.links.len() as i32 - 1
    }
}

/// A candidate during graph search: slot index plus distance to the query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub index: usize,
    pub distance: f32,
}

impl PartialEq for Candidate {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.index == other.index
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap (smallest distance first).
        // NaN distances are treated as equal to keep the ordering total.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Max-heap wrapper used for the bounded result set: the *worst* candidate
/// sits on top so it can be evicted when a closer one arrives.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MaxCandidate(pub Candidate);

impl PartialEq for MaxCandidate {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MaxCandidate {}

impl PartialOrd for MaxCandidate {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MaxCandidate {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .distance
            .partial_cmp(&other.0.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Persistence view of one graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportNode {
    /// Node level; -1 means "absent from the graph".
    pub level: i32,
    /// `links[l]` holds the neighbor slot indices at level `l`.
    pub links: Vec<Vec<usize>>,
}

impl Default for ExportNode {
    fn default() -> Self {
        Self {
            level: -1,
            links: Vec::new(),
        }
    }
}

/// Persistence view of the whole graph.
///
/// Contains exactly one entry per store slot, so slot indices on disk line
/// up with the store files written alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphExport {
    pub entry_point: usize,
    pub has_entry: bool,
    pub max_level: i32,
    pub nodes: Vec<ExportNode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_node_level() {
        let mut node = NodeLinks::default();
        assert_eq!(node.level(), -1);
        node.links = vec![Vec::new(); 3];
        assert_eq!(node.level(), 2);
    }

    #[test]
    fn test_candidate_min_heap_order() {
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
        heap.push(Candidate {
            index: 1,
            distance: 1.0,
        });
        heap.push(Candidate {
            index: 2,
            distance: 2.0,
        });
        heap.push(Candidate {
            index: 3,
            distance: 0.5,
        });

        assert_eq!(heap.pop().unwrap().index, 3);
        assert_eq!(heap.pop().unwrap().index, 1);
        assert_eq!(heap.pop().unwrap().index, 2);
    }

    #[test]
    fn test_max_candidate_keeps_worst_on_top() {
        let mut heap: BinaryHeap<MaxCandidate> = BinaryHeap::new();
        for (index, distance) in [(1, 1.0), (2, 3.0), (3, 2.0)] {
            heap.push(MaxCandidate(Candidate { index, distance }));
        }
        assert_eq!(heap.pop().unwrap().0.index, 2);
    }
}
