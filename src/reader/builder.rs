//! Tree construction driven by structural tokens
//!
//! The builder keeps the path from the root to the slot currently being filled in a
//! [`CursorStack`]. The top of the stack is always one of:
//! - an unnamed member: the member name is expected next
//! - an unfilled value slot: a value is expected next
//! - a closed object or array value: a `,` or closing bracket is expected next
//!
//! Scalar text is only materialized when the token following it (`,` or closing
//! bracket) is consumed. The text is never classified; numbers and literals are
//! stored as string values.

use log::{debug, trace};

use super::{accumulator::Accumulator, decoder::Token, StructuralErrorKind};
use crate::tree::{
    arena::{AllocError, NodeKind, NodeRef, Tree, ValueData, ValueId},
    cursor::{CursorError, CursorStack, Link, Position},
    teardown, TeardownStats,
};

#[derive(PartialEq, Eq, Debug)]
pub(crate) enum BuildFailure {
    Structural(StructuralErrorKind),
    Allocation,
}

impl From<AllocError> for BuildFailure {
    fn from(_: AllocError) -> Self {
        BuildFailure::Allocation
    }
}

impl From<CursorError> for BuildFailure {
    fn from(e: CursorError) -> Self {
        match e {
            CursorError::Allocation => BuildFailure::Allocation,
            CursorError::InvalidLink | CursorError::UnexpectedKind | CursorError::Empty => {
                BuildFailure::Structural(StructuralErrorKind::InvalidLink)
            }
        }
    }
}

fn structural<T>(kind: StructuralErrorKind) -> Result<T, BuildFailure> {
    Err(BuildFailure::Structural(kind))
}

/// What the top value slot is within its parent
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum SlotContext {
    Root,
    MemberValue,
    ArrayElement,
}

#[derive(Debug)]
pub(crate) struct Builder {
    tree: Tree,
    stack: CursorStack,
    root: Option<ValueId>,
}

// Implementation with state inspection
impl Builder {
    pub(crate) fn new() -> Self {
        Builder {
            tree: Tree::new(),
            stack: CursorStack::new(),
            root: None,
        }
    }

    fn top(&self) -> Option<Position> {
        self.stack.top().copied()
    }

    fn slot_context(&self) -> SlotContext {
        match self.stack.below_top().map(|p| p.node.kind()) {
            None => SlotContext::Root,
            Some(NodeKind::Member) => SlotContext::MemberValue,
            Some(NodeKind::Value) => SlotContext::ArrayElement,
        }
    }

    fn data(&self, id: ValueId) -> &ValueData {
        match self.tree.value(id) {
            Some(value) => &value.data,
            None => panic!("Unexpected: Value {id:?} on stack is not live"),
        }
    }

    /// Whether the value is still an unfilled slot
    fn is_unfilled(&self, id: ValueId) -> bool {
        *self.data(id) == ValueData::Uninitialized
    }
}

// Implementation with token handling
impl Builder {
    pub(crate) fn handle(
        &mut self,
        token: Token,
        acc: &mut Accumulator,
    ) -> Result<(), BuildFailure> {
        trace!("builder: {token} at depth {}", self.stack.depth());
        match token {
            Token::ObjectStart => self.open(NodeKind::Member, acc),
            Token::ArrayStart => self.open(NodeKind::Value, acc),
            Token::Colon => self.colon(acc),
            Token::Comma => self.comma(acc),
            Token::ObjectEnd => self.close_object(acc),
            Token::ArrayEnd => self.close_array(acc),
        }
    }

    /// Opens an object (first child is a member) or an array (first child is a value)
    fn open(&mut self, first_child: NodeKind, acc: &mut Accumulator) -> Result<(), BuildFailure> {
        let Some(top) = self.top() else {
            if acc.has_content() {
                return structural(StructuralErrorKind::TextBeforeComposite);
            }
            let root = self.tree.alloc_value(ValueData::Uninitialized)?;
            self.root = Some(root);
            self.stack.push_root(NodeRef::Value(root), false)?;
            debug!("builder: opened root value");
            return self.open(first_child, acc);
        };

        let NodeRef::Value(slot) = top.node else {
            // Name expected, but composite value found
            return structural(StructuralErrorKind::MissingName);
        };
        if acc.has_content() {
            return structural(if self.is_unfilled(slot) {
                StructuralErrorKind::TextBeforeComposite
            } else {
                StructuralErrorKind::TrailingText
            });
        }
        if !self.is_unfilled(slot) {
            return structural(if self.slot_context() == SlotContext::Root {
                StructuralErrorKind::MultipleRoots
            } else {
                StructuralErrorKind::MissingComma
            });
        }

        self.stack.push_child(&mut self.tree, first_child, Link::Child)?;
        acc.clear();
        Ok(())
    }

    fn colon(&mut self, acc: &mut Accumulator) -> Result<(), BuildFailure> {
        let Some(Position {
            node: NodeRef::Member(member),
            ..
        }) = self.top()
        else {
            return structural(StructuralErrorKind::UnexpectedColon);
        };
        if !acc.has_content() {
            return structural(StructuralErrorKind::MissingName);
        }

        let name = acc.take()?;
        // Link the value slot first, so that a failure never leaves a named member
        // without value slot
        self.stack.push_child(&mut self.tree, NodeKind::Value, Link::Child)?;
        self.tree.set_member_name(member, name);
        Ok(())
    }

    /// Materializes the pending text into the top value slot
    ///
    /// `empty_kind` is the error if there is neither a value nor text.
    fn finish_slot(
        &mut self,
        slot: ValueId,
        empty_kind: StructuralErrorKind,
        acc: &mut Accumulator,
    ) -> Result<(), BuildFailure> {
        if self.is_unfilled(slot) {
            if !acc.has_content() {
                return structural(empty_kind);
            }
            let text = acc.take()?;
            self.tree.set_value_data(slot, ValueData::String(text));
        } else if acc.has_content() {
            return structural(StructuralErrorKind::TrailingText);
        }
        acc.clear();
        Ok(())
    }

    fn comma(&mut self, acc: &mut Accumulator) -> Result<(), BuildFailure> {
        let top = match self.top() {
            Some(top) => top,
            None => return structural(StructuralErrorKind::UnexpectedComma),
        };

        match top.node {
            NodeRef::Member(_) => {
                // `{"a",` or `{,`
                structural(if acc.has_content() {
                    StructuralErrorKind::MemberWithoutValue
                } else {
                    StructuralErrorKind::UnexpectedComma
                })
            }
            NodeRef::Value(slot) => match self.slot_context() {
                SlotContext::Root => structural(StructuralErrorKind::UnexpectedComma),
                SlotContext::MemberValue => {
                    self.finish_slot(slot, StructuralErrorKind::NameWithoutValue, acc)?;
                    self.stack.pop(Some(NodeKind::Value))?;
                    self.stack.push_child(&mut self.tree, NodeKind::Member, Link::Sibling)?;
                    Ok(())
                }
                SlotContext::ArrayElement => {
                    self.finish_slot(slot, StructuralErrorKind::EmptyValue, acc)?;
                    self.stack.push_child(&mut self.tree, NodeKind::Value, Link::Sibling)?;
                    Ok(())
                }
            },
        }
    }

    /// Pops the chain of siblings and the first child, so the composite becomes the top
    fn pop_children(&mut self, kind: NodeKind) -> Result<(), BuildFailure> {
        while let Some(top) = self.top() {
            self.stack.pop(Some(kind))?;
            if top.via != Some(Link::Sibling) {
                return Ok(());
            }
        }
        structural(StructuralErrorKind::InvalidLink)
    }

    fn close_object(&mut self, acc: &mut Accumulator) -> Result<(), BuildFailure> {
        let top = match self.top() {
            Some(top) => top,
            None => return structural(StructuralErrorKind::UnexpectedCloser),
        };

        match top.node {
            NodeRef::Member(_) => {
                if acc.has_content() {
                    return structural(StructuralErrorKind::MemberWithoutValue);
                }
                if top.via == Some(Link::Sibling) {
                    return structural(StructuralErrorKind::TrailingComma);
                }
                // `{}`, the placeholder first member is not needed
                self.stack.pop_destroy(&mut self.tree, Some(NodeKind::Member))?;
                Ok(())
            }
            NodeRef::Value(slot) => match self.slot_context() {
                SlotContext::Root => structural(StructuralErrorKind::UnexpectedCloser),
                SlotContext::ArrayElement => structural(StructuralErrorKind::MismatchedCloser),
                SlotContext::MemberValue => {
                    self.finish_slot(slot, StructuralErrorKind::NameWithoutValue, acc)?;
                    self.stack.pop(Some(NodeKind::Value))?;
                    self.pop_children(NodeKind::Member)
                }
            },
        }
    }

    fn close_array(&mut self, acc: &mut Accumulator) -> Result<(), BuildFailure> {
        let top = match self.top() {
            Some(top) => top,
            None => return structural(StructuralErrorKind::UnexpectedCloser),
        };

        match top.node {
            NodeRef::Member(_) => structural(StructuralErrorKind::MismatchedCloser),
            NodeRef::Value(slot) => match self.slot_context() {
                SlotContext::Root => structural(StructuralErrorKind::UnexpectedCloser),
                SlotContext::MemberValue => structural(StructuralErrorKind::MismatchedCloser),
                SlotContext::ArrayElement => {
                    if self.is_unfilled(slot) && !acc.has_content() {
                        if top.via == Some(Link::Sibling) {
                            return structural(StructuralErrorKind::TrailingComma);
                        }
                        // `[]`, the placeholder first element is not needed
                        self.stack.pop_destroy(&mut self.tree, Some(NodeKind::Value))?;
                        return Ok(());
                    }
                    self.finish_slot(slot, StructuralErrorKind::EmptyValue, acc)?;
                    self.pop_children(NodeKind::Value)
                }
            },
        }
    }
}

// Implementation with end of input handling
impl Builder {
    /// Completes the tree at the end of the input and returns its root
    ///
    /// Returns `Ok(None)` if the input ended while a structure was still open, or
    /// if it contained no value at all.
    pub(crate) fn finish(
        &mut self,
        acc: &mut Accumulator,
    ) -> Result<Option<ValueId>, BuildFailure> {
        let Some(top) = self.top() else {
            if !acc.has_content() {
                return Ok(None);
            }
            // Bare scalar without any brackets
            let text = acc.take()?;
            let root = self.tree.alloc_value(ValueData::String(text))?;
            self.root = Some(root);
            return Ok(Some(root));
        };

        let NodeRef::Value(root) = top.node else {
            return Ok(None);
        };
        if self.stack.depth() > 1 || self.is_unfilled(root) {
            return Ok(None);
        }
        if acc.has_content() {
            return structural(StructuralErrorKind::TrailingText);
        }
        Ok(Some(root))
    }

    pub(crate) fn into_tree(self) -> Tree {
        self.tree
    }

    /// Releases everything built so far
    pub(crate) fn abort(mut self) -> TeardownStats {
        teardown::teardown(&mut self.tree, self.root)
    }
}
