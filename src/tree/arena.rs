//! Index-addressed node storage backing a [`Document`](super::Document)
//!
//! Links between nodes are indices into the slot vectors of [`Tree`], so the tree
//! carries no pointers and dropping it never recurses, regardless of nesting depth
//! or sibling count. A slot is emptied when its node is released.

use std::collections::TryReserveError;

use thiserror::Error;

/// Handle of a value node within a [`Document`](super::Document)
///
/// Handles are only meaningful for the document which created them.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
pub struct ValueId(pub(crate) u32);

/// Handle of an object member node
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
pub(crate) struct MemberId(pub(crate) u32);

#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub(crate) enum NodeKind {
    Member,
    Value,
}

/// Reference to either kind of node
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum NodeRef {
    Member(MemberId),
    Value(ValueId),
}

impl NodeRef {
    pub(crate) fn kind(self) -> NodeKind {
        match self {
            NodeRef::Member(_) => NodeKind::Member,
            NodeRef::Value(_) => NodeKind::Value,
        }
    }
}

/// The boolean / null variant of a value
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum Literal {
    /// `false`
    #[strum(serialize = "false")]
    False,
    /// `true`
    #[strum(serialize = "true")]
    True,
    /// `null`
    #[strum(serialize = "null")]
    Null,
}

#[derive(PartialEq, Clone, Debug)]
pub(crate) enum ValueData {
    /// Slot was created but nothing has been stored in it yet
    Uninitialized,
    /// Object with its first member
    Object(Option<MemberId>),
    /// Array with its first element; further elements follow the `next` chain
    Array(Option<ValueId>),
    String(Box<[u8]>),
    Integer(i64),
    Double(f64),
    Literal(Literal),
}

impl ValueData {
    fn payload_len(&self) -> usize {
        match self {
            ValueData::String(bytes) => bytes.len(),
            _ => 0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ValueNode {
    pub(crate) data: ValueData,
    pub(crate) next: Option<ValueId>,
}

#[derive(Default, Debug)]
pub(crate) struct MemberNode {
    /// `None` until the name has been read
    pub(crate) name: Option<Box<[u8]>>,
    pub(crate) value: Option<ValueId>,
    pub(crate) next: Option<MemberId>,
}

/// Arena growth failed, either because memory could not be reserved or because the
/// index space is exhausted
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
#[error("allocation failure")]
pub(crate) struct AllocError;

impl From<TryReserveError> for AllocError {
    fn from(_: TryReserveError) -> Self {
        AllocError
    }
}

/// Sizes of what a tree currently holds
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct AllocationAudit {
    /// Number of member and value nodes which have not been released yet
    pub live_nodes: usize,
    /// Number of bytes held by member names and string values which have not been
    /// released yet
    pub live_payload_bytes: usize,
}

#[derive(Default, Debug)]
pub(crate) struct Tree {
    members: Vec<Option<MemberNode>>,
    values: Vec<Option<ValueNode>>,
    audit: AllocationAudit,
}

fn next_index<T>(slots: &mut Vec<Option<T>>) -> Result<u32, AllocError> {
    let index = u32::try_from(slots.len()).map_err(|_| AllocError)?;
    slots.try_reserve(1)?;
    Ok(index)
}

// Implementation with node creation and release
impl Tree {
    pub(crate) fn new() -> Self {
        Tree::default()
    }

    pub(crate) fn alloc_member(&mut self) -> Result<MemberId, AllocError> {
        let index = next_index(&mut self.members)?;
        self.members.push(Some(MemberNode::default()));
        self.audit.live_nodes += 1;
        Ok(MemberId(index))
    }

    pub(crate) fn alloc_value(&mut self, data: ValueData) -> Result<ValueId, AllocError> {
        let index = next_index(&mut self.values)?;
        self.audit.live_payload_bytes += data.payload_len();
        self.values.push(Some(ValueNode { data, next: None }));
        self.audit.live_nodes += 1;
        Ok(ValueId(index))
    }

    /// Releases the node and its owned payload
    ///
    /// Returns the number of payload bytes released, or `None` if the node had
    /// already been released.
    pub(crate) fn release(&mut self, node: NodeRef) -> Option<usize> {
        let payload_len = match node {
            NodeRef::Member(id) => {
                let member = self.members.get_mut(id.0 as usize)?.take()?;
                member.name.map_or(0, |name| name.len())
            }
            NodeRef::Value(id) => {
                let value = self.values.get_mut(id.0 as usize)?.take()?;
                value.data.payload_len()
            }
        };
        self.audit.live_nodes -= 1;
        self.audit.live_payload_bytes -= payload_len;
        Some(payload_len)
    }

    /// All nodes which have not been released yet, regardless of whether they are
    /// reachable from any root
    pub(crate) fn live_nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        let members = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| NodeRef::Member(MemberId(index as u32)));
        let values = self
            .values
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| NodeRef::Value(ValueId(index as u32)));
        members.chain(values)
    }

    pub(crate) fn audit(&self) -> AllocationAudit {
        self.audit
    }
}

// Implementation with node access and link / payload mutation
impl Tree {
    pub(crate) fn member(&self, id: MemberId) -> Option<&MemberNode> {
        self.members.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn value(&self, id: ValueId) -> Option<&ValueNode> {
        self.values.get(id.0 as usize)?.as_ref()
    }

    fn member_mut(&mut self, id: MemberId) -> &mut MemberNode {
        match self.members.get_mut(id.0 as usize) {
            Some(Some(member)) => member,
            _ => panic!("Unexpected: Member {id:?} is not live"),
        }
    }

    fn value_mut(&mut self, id: ValueId) -> &mut ValueNode {
        match self.values.get_mut(id.0 as usize) {
            Some(Some(value)) => value,
            _ => panic!("Unexpected: Value {id:?} is not live"),
        }
    }

    pub(crate) fn set_member_name(&mut self, id: MemberId, name: Box<[u8]>) {
        let name_len = name.len();
        let old = self.member_mut(id).name.replace(name);
        self.audit.live_payload_bytes += name_len;
        self.audit.live_payload_bytes -= old.map_or(0, |old| old.len());
    }

    pub(crate) fn set_member_value(&mut self, id: MemberId, value: Option<ValueId>) {
        self.member_mut(id).value = value;
    }

    pub(crate) fn set_member_next(&mut self, id: MemberId, next: Option<MemberId>) {
        self.member_mut(id).next = next;
    }

    pub(crate) fn set_value_data(&mut self, id: ValueId, data: ValueData) {
        let new_len = data.payload_len();
        let old = std::mem::replace(&mut self.value_mut(id).data, data);
        self.audit.live_payload_bytes += new_len;
        self.audit.live_payload_bytes -= old.payload_len();
    }

    pub(crate) fn set_value_next(&mut self, id: ValueId, next: Option<ValueId>) {
        self.value_mut(id).next = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_tracks_nodes_and_payload() -> Result<(), AllocError> {
        let mut tree = Tree::new();
        assert_eq!(AllocationAudit::default(), tree.audit());

        let member = tree.alloc_member()?;
        tree.set_member_name(member, b"name".to_vec().into_boxed_slice());
        let value = tree.alloc_value(ValueData::String(b"abc".to_vec().into_boxed_slice()))?;
        tree.set_member_value(member, Some(value));
        assert_eq!(
            AllocationAudit {
                live_nodes: 2,
                live_payload_bytes: 7
            },
            tree.audit()
        );

        tree.set_value_data(value, ValueData::Integer(3));
        assert_eq!(4, tree.audit().live_payload_bytes);

        assert_eq!(Some(4), tree.release(NodeRef::Member(member)));
        assert_eq!(Some(0), tree.release(NodeRef::Value(value)));
        assert_eq!(AllocationAudit::default(), tree.audit());
        Ok(())
    }

    #[test]
    fn release_twice() -> Result<(), AllocError> {
        let mut tree = Tree::new();
        let value = tree.alloc_value(ValueData::Uninitialized)?;
        assert_eq!(Some(0), tree.release(NodeRef::Value(value)));
        assert_eq!(None, tree.release(NodeRef::Value(value)));
        assert_eq!(0, tree.audit().live_nodes);
        assert_eq!(None, tree.value(value).map(|v| &v.data));
        Ok(())
    }

    #[test]
    fn live_nodes() -> Result<(), AllocError> {
        let mut tree = Tree::new();
        let m = tree.alloc_member()?;
        let v1 = tree.alloc_value(ValueData::Uninitialized)?;
        let v2 = tree.alloc_value(ValueData::Literal(Literal::Null))?;
        tree.release(NodeRef::Value(v1));

        assert_eq!(
            vec![NodeRef::Member(m), NodeRef::Value(v2)],
            tree.live_nodes().collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn literal_display() {
        assert_eq!("true", Literal::True.to_string());
        assert_eq!("false", Literal::False.to_string());
        assert_eq!("null", Literal::Null.to_string());
    }
}
