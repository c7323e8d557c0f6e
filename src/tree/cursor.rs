//! Reified root-to-current path used in place of the call stack
//!
//! The persistent tree carries no parent pointers, so every traversal (building,
//! writing, releasing) keeps the path to the current node in a [`CursorStack`].
//! Entering a sibling pushes a new position on top of the previous sibling, so
//! the stack holds the full path including the sibling chain walked so far.

use log::trace;

use thiserror::Error;

use super::arena::{AllocError, NodeKind, NodeRef, Tree, ValueData, ValueId};

/// How a position was reached from the position below it
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub(crate) enum Link {
    /// Member value, first object member or first array element
    Child,
    /// Following member or following array element
    Sibling,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) struct Position {
    pub(crate) node: NodeRef,
    /// `None` for the bottom position
    pub(crate) via: Option<Link>,
    pub(crate) down_visited: bool,
    pub(crate) across_visited: bool,
    /// For a value: it is an array element, or it holds an array
    pub(crate) is_array: bool,
}

impl Position {
    fn new(node: NodeRef, via: Option<Link>, is_array: bool) -> Self {
        Position {
            node,
            via,
            down_visited: false,
            across_visited: false,
            is_array,
        }
    }
}

#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum CursorError {
    #[error("allocation failure")]
    Allocation,
    /// The requested link is not allowed by the grammar, or the link slot is
    /// already occupied
    #[error("invalid link")]
    InvalidLink,
    /// The top position does not hold the expected kind of node
    #[error("unexpected node kind")]
    UnexpectedKind,
    /// The stack has no position to operate on
    #[error("empty cursor stack")]
    Empty,
}

impl From<AllocError> for CursorError {
    fn from(_: AllocError) -> Self {
        CursorError::Allocation
    }
}

/// Result of a successful pop
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum Popped {
    /// The popped position had a parent, which is now the top
    Parent,
    /// The popped position was the last one
    Bottom,
}

#[derive(Debug)]
pub(crate) struct CursorStack {
    positions: Vec<Position>,
}

// Implementation with inspection methods
impl CursorStack {
    pub(crate) fn new() -> Self {
        CursorStack {
            positions: Vec::with_capacity(16),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn top(&self) -> Option<&Position> {
        self.positions.last()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut Position> {
        self.positions.last_mut()
    }

    /// Position directly below the top
    pub(crate) fn below_top(&self) -> Option<&Position> {
        let len = self.positions.len();
        if len < 2 {
            None
        } else {
            self.positions.get(len - 2)
        }
    }

    fn push(&mut self, position: Position) -> Result<(), AllocError> {
        self.positions.try_reserve(1)?;
        self.positions.push(position);
        Ok(())
    }

    /// Places an existing node as bottom position
    pub(crate) fn push_root(&mut self, node: NodeRef, is_array: bool) -> Result<(), CursorError> {
        if !self.positions.is_empty() {
            return Err(CursorError::InvalidLink);
        }
        self.push(Position::new(node, None, is_array))?;
        Ok(())
    }
}

// Implementation with construction
impl CursorStack {
    /// Creates a node of the given kind, links it to the top node and pushes it
    ///
    /// The link is validated before anything is created, so on error the tree
    /// is unchanged.
    pub(crate) fn push_child(
        &mut self,
        tree: &mut Tree,
        kind: NodeKind,
        link: Link,
    ) -> Result<NodeRef, CursorError> {
        let top = *self.top().ok_or(CursorError::Empty)?;
        self.check_link(tree, &top, kind, link)?;
        // Reserve stack space first so that a created node is never left unlinked
        self.positions.try_reserve(1).map_err(AllocError::from)?;

        let node = match kind {
            NodeKind::Member => NodeRef::Member(tree.alloc_member()?),
            NodeKind::Value => NodeRef::Value(tree.alloc_value(ValueData::Uninitialized)?),
        };

        let mut new_is_array = false;
        match (top.node, node, link) {
            (NodeRef::Member(parent), NodeRef::Value(child), Link::Child) => {
                tree.set_member_value(parent, Some(child));
            }
            (NodeRef::Member(prev), NodeRef::Member(next), Link::Sibling) => {
                tree.set_member_next(prev, Some(next));
            }
            (NodeRef::Value(parent), NodeRef::Member(first), Link::Child) => {
                tree.set_value_data(parent, ValueData::Object(Some(first)));
            }
            (NodeRef::Value(parent), NodeRef::Value(first), Link::Child) => {
                tree.set_value_data(parent, ValueData::Array(Some(first)));
                new_is_array = true;
                if let Some(top) = self.top_mut() {
                    top.is_array = true;
                }
            }
            (NodeRef::Value(prev), NodeRef::Value(next), Link::Sibling) => {
                tree.set_value_next(prev, Some(next));
                new_is_array = true;
            }
            _ => unreachable!("link was validated"),
        }

        trace!("cursor: pushed {kind} via {link} at depth {}", self.depth());
        // Cannot fail, space was reserved above
        self.positions.push(Position::new(node, Some(link), new_is_array));
        Ok(node)
    }

    fn check_link(
        &self,
        tree: &Tree,
        top: &Position,
        kind: NodeKind,
        link: Link,
    ) -> Result<(), CursorError> {
        let is_valid = match (top.node, kind, link) {
            (NodeRef::Member(id), NodeKind::Value, Link::Child) => {
                tree.member(id).map_or(false, |m| m.value.is_none())
            }
            (NodeRef::Member(id), NodeKind::Member, Link::Sibling) => {
                tree.member(id).map_or(false, |m| m.next.is_none())
            }
            (NodeRef::Value(id), NodeKind::Member, Link::Child) => {
                tree.value(id).map_or(false, |v| {
                    matches!(v.data, ValueData::Uninitialized | ValueData::Object(None))
                })
            }
            (NodeRef::Value(id), NodeKind::Value, Link::Child) => {
                tree.value(id).map_or(false, |v| {
                    matches!(v.data, ValueData::Uninitialized | ValueData::Array(None))
                })
            }
            (NodeRef::Value(id), NodeKind::Value, Link::Sibling) => {
                top.is_array && tree.value(id).map_or(false, |v| v.next.is_none())
            }
            // Member as child of a member, member following a value, value following a member
            _ => false,
        };
        if is_valid {
            Ok(())
        } else {
            Err(CursorError::InvalidLink)
        }
    }
}

// Implementation with traversal of already linked nodes
impl CursorStack {
    /// Moves to the already linked child or sibling of the top node
    ///
    /// Each edge is traversed at most once; returns `None` if there is no such node
    /// or if the edge has already been visited.
    pub(crate) fn advance(
        &mut self,
        tree: &Tree,
        link: Link,
    ) -> Result<Option<NodeRef>, AllocError> {
        let Some(top) = self.top_mut() else {
            return Ok(None);
        };
        let visited = match link {
            Link::Child => &mut top.down_visited,
            Link::Sibling => &mut top.across_visited,
        };
        if *visited {
            return Ok(None);
        }
        *visited = true;

        let top = *top;
        let target = match (top.node, link) {
            (NodeRef::Member(id), Link::Child) => {
                tree.member(id).and_then(|m| m.value).map(NodeRef::Value)
            }
            (NodeRef::Member(id), Link::Sibling) => {
                tree.member(id).and_then(|m| m.next).map(NodeRef::Member)
            }
            (NodeRef::Value(id), Link::Child) => tree.value(id).and_then(|v| match v.data {
                ValueData::Object(first) => first.map(NodeRef::Member),
                ValueData::Array(first) => first.map(NodeRef::Value),
                _ => None,
            }),
            (NodeRef::Value(id), Link::Sibling) => {
                tree.value(id).and_then(|v| v.next).map(NodeRef::Value)
            }
        };

        if let Some(node) = target {
            let is_array = match link {
                Link::Sibling => top.is_array,
                Link::Child => holds_array(tree, top.node),
            };
            self.push(Position::new(node, Some(link), is_array))?;
        }
        Ok(target)
    }

    /// Removes the top position
    ///
    /// If `expected` is given, the top must hold a node of that kind.
    pub(crate) fn pop(&mut self, expected: Option<NodeKind>) -> Result<Popped, CursorError> {
        let top = self.top().ok_or(CursorError::Empty)?;
        if let Some(expected) = expected {
            if top.node.kind() != expected {
                return Err(CursorError::UnexpectedKind);
            }
        }
        self.positions.pop();
        Ok(if self.positions.is_empty() {
            Popped::Bottom
        } else {
            Popped::Parent
        })
    }

    /// Removes the top position and releases its node
    ///
    /// The link from the parent to the node is cleared so that no stale link
    /// remains. The node must not have linked children or siblings.
    pub(crate) fn pop_destroy(
        &mut self,
        tree: &mut Tree,
        expected: Option<NodeKind>,
    ) -> Result<Popped, CursorError> {
        let top = *self.top().ok_or(CursorError::Empty)?;
        if let Some(parent) = self.below_top() {
            match (parent.node, top.via) {
                (NodeRef::Member(id), Some(Link::Child)) => tree.set_member_value(id, None),
                (NodeRef::Member(id), Some(Link::Sibling)) => tree.set_member_next(id, None),
                (NodeRef::Value(id), Some(Link::Sibling)) => tree.set_value_next(id, None),
                (NodeRef::Value(id), Some(Link::Child)) => {
                    let emptied = match top.node {
                        NodeRef::Member(_) => ValueData::Object(None),
                        NodeRef::Value(_) => ValueData::Array(None),
                    };
                    tree.set_value_data(id, emptied);
                }
                (_, None) => {}
            }
        }
        let popped = self.pop(expected)?;
        tree.release(top.node);
        trace!("cursor: destroyed {} at depth {}", top.node.kind(), self.depth() + 1);
        Ok(popped)
    }
}

fn holds_array(tree: &Tree, node: NodeRef) -> bool {
    let NodeRef::Value(id) = node else {
        return false;
    };
    matches!(tree.value(id).map(|v| &v.data), Some(ValueData::Array(_)))
}

/// Event produced by [`Walk`]
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum WalkEvent {
    /// The node became the top of the stack
    Enter { node: NodeRef, via: Option<Link> },
    /// All children of the node have been walked
    Leave(NodeRef),
    /// The node was popped; its children and all following siblings have been walked
    Pop(NodeRef),
}

/// Depth-first walk over a finished tree, driven only by [`CursorStack::advance`]
/// and [`CursorStack::pop`]
///
/// Every node produces exactly one `Enter`, one `Leave` and one `Pop` event.
/// Between a node's `Pop` and the end of the walk its links are never read
/// again, so the node may be released as soon as its `Pop` event was returned.
#[derive(Debug)]
pub(crate) struct Walk {
    stack: CursorStack,
    root: Option<NodeRef>,
    pending: Option<WalkEvent>,
}

impl Walk {
    pub(crate) fn new(root: NodeRef) -> Self {
        Walk {
            stack: CursorStack::new(),
            root: Some(root),
            pending: None,
        }
    }

    /// Gets the next event, or `None` once the walk is complete
    pub(crate) fn next_event(&mut self, tree: &Tree) -> Result<Option<WalkEvent>, AllocError> {
        if let Some(root) = self.root.take() {
            let is_array = holds_array(tree, root);
            self.stack
                .push_root(root, is_array)
                .map_err(|_| AllocError)?;
            return Ok(Some(WalkEvent::Enter {
                node: root,
                via: None,
            }));
        }

        loop {
            if let Some(event) = self.pending.take() {
                return Ok(Some(event));
            }
            let Some(&top) = self.stack.top() else {
                return Ok(None);
            };

            if !top.down_visited {
                if let Some(child) = self.stack.advance(tree, Link::Child)? {
                    return Ok(Some(WalkEvent::Enter {
                        node: child,
                        via: Some(Link::Child),
                    }));
                }
                continue;
            }

            if !top.across_visited {
                if let Some(sibling) = self.stack.advance(tree, Link::Sibling)? {
                    self.pending = Some(WalkEvent::Enter {
                        node: sibling,
                        via: Some(Link::Sibling),
                    });
                }
                return Ok(Some(WalkEvent::Leave(top.node)));
            }

            // Cannot fail, stack is not empty
            let _ = self.stack.pop(None);
            return Ok(Some(WalkEvent::Pop(top.node)));
        }
    }
}
