//! Releasing all nodes of a tree, including partially built trees

use log::{debug, warn};

use super::arena::{NodeRef, Tree, ValueId};
use super::cursor::{Walk, WalkEvent};

/// Summary of a teardown
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct TeardownStats {
    /// Number of member and value nodes which were released
    pub released_nodes: usize,
    /// Number of member name and string value bytes which were released
    pub released_payload_bytes: usize,
}

impl TeardownStats {
    fn record(&mut self, released: Option<usize>) {
        if let Some(payload_len) = released {
            self.released_nodes += 1;
            self.released_payload_bytes += payload_len;
        }
    }
}

/// Releases every node reachable from `root`, then every other node still live
///
/// Reachable nodes are released the moment the walk pops them. Nodes which are not
/// reachable (for example when parsing failed before they were linked) are released
/// by a sweep afterwards. Each node is released exactly once.
pub(crate) fn teardown(tree: &mut Tree, root: Option<ValueId>) -> TeardownStats {
    let mut stats = TeardownStats::default();

    if let Some(root) = root {
        let mut walk = Walk::new(NodeRef::Value(root));
        loop {
            match walk.next_event(tree) {
                Ok(Some(WalkEvent::Pop(node))) => stats.record(tree.release(node)),
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    // Remaining nodes are released by the sweep below
                    warn!("teardown: walk aborted ({e}), falling back to sweep");
                    break;
                }
            }
        }
    }

    let unreachable: Vec<NodeRef> = tree.live_nodes().collect();
    if !unreachable.is_empty() {
        debug!("teardown: sweeping {} unreachable nodes", unreachable.len());
        for node in unreachable {
            stats.record(tree.release(node));
        }
    }

    debug_assert_eq!(0, tree.audit().live_nodes, "nodes outstanding after teardown");
    debug!(
        "teardown: released {} nodes, {} payload bytes",
        stats.released_nodes, stats.released_payload_bytes
    );
    stats
}
