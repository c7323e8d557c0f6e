//! Module for the materialized JSON tree
//!
//! A [`Document`] owns all nodes of one JSON tree. It is produced by the
//! [parser](crate::reader) or built with the construction methods of [`Document`],
//! can be inspected through the borrowing views [`ValueRef`], [`ObjectRef`] and
//! [`MemberRef`], written with the [serializer](crate::writer), and is finally
//! released with [`Document::destroy`].
//!
//! Object members and array elements are singly linked chains. All traversals
//! follow these links iteratively, so arbitrarily deep or long documents never
//! exhaust the call stack.

use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
};

use thiserror::Error;

mod access;
pub(crate) mod arena;
pub(crate) mod cursor;
pub(crate) mod teardown;

pub use access::{find_member, string_of, value_of};
pub use arena::{AllocationAudit, Literal, ValueId};
pub use teardown::TeardownStats;

use self::arena::{AllocError, MemberId, MemberNode, NodeRef, Tree, ValueData, ValueNode};

/// Type of the root of a [`Document`]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum RootKind {
    /// The root value is an object
    Object,
    /// The root value is an array, a string or any other non-object value
    Value,
}

/// Type of a value
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum ValueKind {
    /// Value slot which was never filled
    ///
    /// Parsed and constructed documents never contain uninitialized values.
    Uninitialized,
    /// JSON object: `{ ... }`
    Object,
    /// JSON array: `[ ... ]`
    Array,
    /// String value, stored as raw bytes
    String,
    /// Integral number
    Integer,
    /// Floating point number
    Double,
    /// `true` or `false`
    Boolean,
    /// `null`
    Null,
}

/// Scalar value for the construction methods of [`Document`]
#[derive(PartialEq, Clone, Debug)]
pub enum Scalar {
    /// String value; the bytes are stored and written verbatim
    String(Vec<u8>),
    /// Integral number
    Integer(i64),
    /// Floating point number
    Double(f64),
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,
}

/// Value to add with [`Document::add_member`] or [`Document::add_element`]
///
/// Conversions exist for the primitive types, so most scalars can be passed directly:
/// ```
/// # use chainjson::tree::*;
/// let mut document = Document::new_array()?;
/// let root = document.root_id();
/// document.add_element(root, "text")?;
/// document.add_element(root, 3_i64)?;
/// document.add_element(root, true)?;
/// document.add_element(root, Scalar::Null)?;
/// document.add_element(root, NewValue::Object)?;
///
/// assert_eq!(r#"["text",3,true,null,{}]"#, chainjson::serialize_to_string(&document)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(PartialEq, Clone, Debug)]
pub enum NewValue {
    /// Empty object, members can be added afterwards
    Object,
    /// Empty array, elements can be added afterwards
    Array,
    /// Scalar value
    Scalar(Scalar),
}

impl From<Scalar> for NewValue {
    fn from(value: Scalar) -> Self {
        NewValue::Scalar(value)
    }
}

// Use `duplicate` crate to avoid repeating code for all supported types
duplicate::duplicate! {
    [
        source_type scalar_conversion;
        [i8] [Scalar::Integer(i64::from(value))];
        [i16] [Scalar::Integer(i64::from(value))];
        [i32] [Scalar::Integer(i64::from(value))];
        [i64] [Scalar::Integer(value)];
        [u8] [Scalar::Integer(i64::from(value))];
        [u16] [Scalar::Integer(i64::from(value))];
        [u32] [Scalar::Integer(i64::from(value))];
        [f32] [Scalar::Double(f64::from(value))];
        [f64] [Scalar::Double(value)];
        [bool] [Scalar::Boolean(value)];
        [&str] [Scalar::String(value.as_bytes().to_vec())];
        [String] [Scalar::String(value.into_bytes())];
        [&[u8]] [Scalar::String(value.to_vec())];
        [Vec<u8>] [Scalar::String(value)];
    ]
    impl From<source_type> for Scalar {
        fn from(value: source_type) -> Self {
            scalar_conversion
        }
    }

    impl From<source_type> for NewValue {
        fn from(value: source_type) -> Self {
            NewValue::Scalar(Scalar::from(value))
        }
    }
}

impl Scalar {
    fn into_data(self) -> ValueData {
        match self {
            Scalar::String(bytes) => ValueData::String(bytes.into_boxed_slice()),
            Scalar::Integer(value) => ValueData::Integer(value),
            Scalar::Double(value) => ValueData::Double(value),
            Scalar::Boolean(false) => ValueData::Literal(Literal::False),
            Scalar::Boolean(true) => ValueData::Literal(Literal::True),
            Scalar::Null => ValueData::Literal(Literal::Null),
        }
    }
}

impl NewValue {
    fn into_data(self) -> ValueData {
        match self {
            NewValue::Object => ValueData::Object(None),
            NewValue::Array => ValueData::Array(None),
            NewValue::Scalar(scalar) => scalar.into_data(),
        }
    }
}

/// Error which occurred while building a document with the construction methods
#[non_exhaustive]
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub enum BuildError {
    /// The target of [`Document::add_member`] is not an object
    #[error("target value is not an object")]
    NotAnObject,
    /// The target of [`Document::add_element`] is not an array
    #[error("target value is not an array")]
    NotAnArray,
    /// The value ID does not address a value of this document
    #[error("unknown value")]
    UnknownNode,
    /// Memory for the new nodes could not be reserved
    #[error("allocation failure")]
    AllocationFailure,
}

impl From<AllocError> for BuildError {
    fn from(_: AllocError) -> Self {
        BuildError::AllocationFailure
    }
}

/// A materialized JSON document
///
/// The document owns all of its nodes. Dropping it releases them as well, without
/// recursion; [`destroy`](Self::destroy) does the same but walks the tree explicitly
/// and reports what was released.
///
/// A shared `&Document` can be read from multiple threads at the same time.
pub struct Document {
    tree: Tree,
    root: ValueId,
    /// Last member or element of composites which were appended to, so that
    /// appending does not have to walk the whole chain
    tails: HashMap<ValueId, NodeRef>,
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("kind", &self.kind())
            .field("audit", &self.allocation_audit())
            .finish()
    }
}

// Implementation with creation and destruction
impl Document {
    pub(crate) fn from_parts(tree: Tree, root: ValueId) -> Self {
        Document {
            tree,
            root,
            tails: HashMap::new(),
        }
    }

    fn with_root(data: ValueData) -> Result<Self, BuildError> {
        let mut tree = Tree::new();
        let root = tree.alloc_value(data)?;
        Ok(Document::from_parts(tree, root))
    }

    /// Creates a document whose root is an empty object
    pub fn new_object() -> Result<Self, BuildError> {
        Document::with_root(ValueData::Object(None))
    }

    /// Creates a document whose root is an empty array
    pub fn new_array() -> Result<Self, BuildError> {
        Document::with_root(ValueData::Array(None))
    }

    /// Creates a document whose root is the given scalar
    pub fn new_scalar(value: impl Into<Scalar>) -> Result<Self, BuildError> {
        Document::with_root(value.into().into_data())
    }

    /// Releases all nodes of the document
    ///
    /// The document is consumed, so it cannot be used afterwards. The returned
    /// statistics count every node exactly once.
    pub fn destroy(mut self) -> TeardownStats {
        teardown::teardown(&mut self.tree, Some(self.root))
    }
}

/// Releases all nodes of the document, see [`Document::destroy`]
pub fn destroy(document: Document) -> TeardownStats {
    document.destroy()
}

// Implementation with read access
impl Document {
    /// Type of the root
    pub fn kind(&self) -> RootKind {
        match self.tree.value(self.root).map(|v| &v.data) {
            Some(ValueData::Object(_)) => RootKind::Object,
            _ => RootKind::Value,
        }
    }

    /// ID of the root value
    pub fn root_id(&self) -> ValueId {
        self.root
    }

    /// The root value
    pub fn root(&self) -> ValueRef<'_> {
        match self.value(self.root) {
            Some(root) => root,
            None => panic!("Unexpected: Root value is not live"),
        }
    }

    /// Gets the value with the given ID, `None` if it is not part of this document
    pub fn value(&self, id: ValueId) -> Option<ValueRef<'_>> {
        let node = self.tree.value(id)?;
        Some(ValueRef {
            tree: &self.tree,
            id,
            node,
        })
    }

    /// Number of nodes and payload bytes currently held by the document
    pub fn allocation_audit(&self) -> AllocationAudit {
        self.tree.audit()
    }

    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }
}

// Implementation with construction methods
impl Document {
    /// Appends a member to the end of an object and returns the ID of its value
    ///
    /// Existing members with the same name are kept; name lookups return the
    /// first match.
    pub fn add_member(
        &mut self,
        object: ValueId,
        name: impl AsRef<[u8]>,
        value: impl Into<NewValue>,
    ) -> Result<ValueId, BuildError> {
        let first = match self.tree.value(object).map(|v| &v.data) {
            Some(ValueData::Object(first)) => *first,
            Some(_) => return Err(BuildError::NotAnObject),
            None => return Err(BuildError::UnknownNode),
        };
        let name = copy_bytes(name.as_ref())?;
        self.tails.try_reserve(1).map_err(AllocError::from)?;

        let member_id = self.tree.alloc_member()?;
        let value_id = match self.tree.alloc_value(value.into().into_data()) {
            Ok(id) => id,
            Err(e) => {
                self.tree.release(NodeRef::Member(member_id));
                return Err(e.into());
            }
        };
        self.tree.set_member_name(member_id, name);
        self.tree.set_member_value(member_id, Some(value_id));

        match first {
            None => self
                .tree
                .set_value_data(object, ValueData::Object(Some(member_id))),
            Some(first) => {
                let last = match self.tails.get(&object) {
                    Some(NodeRef::Member(last)) => *last,
                    _ => last_member(&self.tree, first),
                };
                self.tree.set_member_next(last, Some(member_id));
            }
        }
        self.tails.insert(object, NodeRef::Member(member_id));
        Ok(value_id)
    }

    /// Appends an element to the end of an array and returns its ID
    pub fn add_element(
        &mut self,
        array: ValueId,
        value: impl Into<NewValue>,
    ) -> Result<ValueId, BuildError> {
        let first = match self.tree.value(array).map(|v| &v.data) {
            Some(ValueData::Array(first)) => *first,
            Some(_) => return Err(BuildError::NotAnArray),
            None => return Err(BuildError::UnknownNode),
        };

        self.tails.try_reserve(1).map_err(AllocError::from)?;

        let value_id = self.tree.alloc_value(value.into().into_data())?;
        match first {
            None => self
                .tree
                .set_value_data(array, ValueData::Array(Some(value_id))),
            Some(first) => {
                let last = match self.tails.get(&array) {
                    Some(NodeRef::Value(last)) => *last,
                    _ => last_element(&self.tree, first),
                };
                self.tree.set_value_next(last, Some(value_id));
            }
        }
        self.tails.insert(array, NodeRef::Value(value_id));
        Ok(value_id)
    }
}

fn copy_bytes(bytes: &[u8]) -> Result<Box<[u8]>, AllocError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len())?;
    copy.extend_from_slice(bytes);
    Ok(copy.into_boxed_slice())
}

/// Walks to the end of the chain; only needed once per composite of a parsed document
fn last_member(tree: &Tree, first: MemberId) -> MemberId {
    let mut last = first;
    while let Some(next) = tree.member(last).and_then(|m| m.next) {
        last = next;
    }
    last
}

fn last_element(tree: &Tree, first: ValueId) -> ValueId {
    let mut last = first;
    while let Some(next) = tree.value(last).and_then(|v| v.next) {
        last = next;
    }
    last
}

/// Borrowed view of a value
#[derive(Clone, Copy)]
pub struct ValueRef<'a> {
    tree: &'a Tree,
    id: ValueId,
    node: &'a ValueNode,
}

impl Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

impl<'a> ValueRef<'a> {
    /// ID of this value within its document
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// Type of this value
    pub fn kind(&self) -> ValueKind {
        match self.node.data {
            ValueData::Uninitialized => ValueKind::Uninitialized,
            ValueData::Object(_) => ValueKind::Object,
            ValueData::Array(_) => ValueKind::Array,
            ValueData::String(_) => ValueKind::String,
            ValueData::Integer(_) => ValueKind::Integer,
            ValueData::Double(_) => ValueKind::Double,
            ValueData::Literal(Literal::Null) => ValueKind::Null,
            ValueData::Literal(_) => ValueKind::Boolean,
        }
    }

    /// Raw bytes of a string value
    ///
    /// The bytes are exactly what was decoded, so they might contain NUL bytes or
    /// data which is not valid UTF-8.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match &self.node.data {
            ValueData::String(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// String value as `str`, `None` if this is not a string or if its bytes are not
    /// valid UTF-8
    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    #[allow(missing_docs)]
    pub fn as_i64(&self) -> Option<i64> {
        match self.node.data {
            ValueData::Integer(value) => Some(value),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_f64(&self) -> Option<f64> {
        match self.node.data {
            ValueData::Double(value) => Some(value),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_bool(&self) -> Option<bool> {
        match self.node.data {
            ValueData::Literal(Literal::True) => Some(true),
            ValueData::Literal(Literal::False) => Some(false),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn is_null(&self) -> bool {
        self.node.data == ValueData::Literal(Literal::Null)
    }

    /// Object view of this value, `None` if it is not an object
    pub fn as_object(&self) -> Option<ObjectRef<'a>> {
        match self.node.data {
            ValueData::Object(first) => Some(ObjectRef {
                tree: self.tree,
                first,
            }),
            _ => None,
        }
    }

    /// Iterator over the elements of an array, `None` if this is not an array
    pub fn elements(&self) -> Option<Elements<'a>> {
        match self.node.data {
            ValueData::Array(first) => Some(Elements {
                tree: self.tree,
                next: first,
            }),
            _ => None,
        }
    }
}

/// Borrowed view of an object
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    tree: &'a Tree,
    first: Option<MemberId>,
}

impl<'a> ObjectRef<'a> {
    /// Iterator over the members in document order
    pub fn members(&self) -> Members<'a> {
        Members {
            tree: self.tree,
            next: self.first,
        }
    }

    /// Number of members; this traverses the whole member chain
    pub fn len(&self) -> usize {
        self.members().count()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Finds the first member with the given name, see [`find_member`]
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<ValueRef<'a>> {
        value_of(name, *self)
    }
}

/// Borrowed view of an object member
#[derive(Clone, Copy)]
pub struct MemberRef<'a> {
    tree: &'a Tree,
    node: &'a MemberNode,
}

impl<'a> MemberRef<'a> {
    /// Raw bytes of the member name
    pub fn name(&self) -> &'a [u8] {
        self.node.name.as_deref().unwrap_or_default()
    }

    /// Member name as `str`, `None` if it is not valid UTF-8
    pub fn name_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.name()).ok()
    }

    #[allow(missing_docs)]
    pub fn value(&self) -> ValueRef<'a> {
        let value = self.node.value.and_then(|id| {
            self.tree.value(id).map(|node| ValueRef {
                tree: self.tree,
                id,
                node,
            })
        });
        match value {
            Some(value) => value,
            None => panic!("Unexpected: Member has no value"),
        }
    }
}

/// Iterator over the members of an object, see [`ObjectRef::members`]
pub struct Members<'a> {
    tree: &'a Tree,
    next: Option<MemberId>,
}

impl<'a> Iterator for Members<'a> {
    type Item = MemberRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.member(self.next?)?;
        self.next = node.next;
        Some(MemberRef {
            tree: self.tree,
            node,
        })
    }
}

/// Iterator over the elements of an array, see [`ValueRef::elements`]
pub struct Elements<'a> {
    tree: &'a Tree,
    next: Option<ValueId>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = ValueRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.value(id)?;
        self.next = node.next;
        Some(ValueRef {
            tree: self.tree,
            id,
            node,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn document_is_sync() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<Document>();
    }

    #[test]
    fn construct_object() -> TestResult {
        let mut document = Document::new_object()?;
        assert_eq!(RootKind::Object, document.kind());
        let root = document.root_id();

        let array = document.add_member(root, "a", NewValue::Array)?;
        document.add_element(array, "x")?;
        document.add_element(array, -3_i32)?;
        document.add_member(root, "b", Scalar::Null)?;
        document.add_member(root, "c", 0.5_f32)?;

        let object = document.root().as_object().unwrap();
        assert_eq!(3, object.len());
        let names: Vec<&[u8]> = object.members().map(|m| m.name()).collect();
        assert_eq!(vec![&b"a"[..], b"b", b"c"], names);

        let elements: Vec<ValueKind> = object
            .get("a")
            .and_then(|a| a.elements())
            .unwrap()
            .map(|e| e.kind())
            .collect();
        assert_eq!(vec![ValueKind::String, ValueKind::Integer], elements);
        assert_eq!(true, object.get("b").unwrap().is_null());
        assert_eq!(Some(0.5), object.get("c").unwrap().as_f64());

        // root + 3 members + 3 member values + 2 elements
        assert_eq!(
            AllocationAudit {
                live_nodes: 9,
                live_payload_bytes: 4
            },
            document.allocation_audit()
        );
        Ok(())
    }

    #[test]
    fn construct_scalar() -> TestResult {
        let document = Document::new_scalar(true)?;
        assert_eq!(RootKind::Value, document.kind());
        assert_eq!(ValueKind::Boolean, document.root().kind());
        assert_eq!(Some(true), document.root().as_bool());

        let document = Document::new_scalar(i64::MIN)?;
        assert_eq!(Some(i64::MIN), document.root().as_i64());

        let document = Document::new_scalar(&b"\xFFa"[..])?;
        assert_eq!(Some(&b"\xFFa"[..]), document.root().as_bytes());
        assert_eq!(None, document.root().as_str());
        Ok(())
    }

    #[test]
    fn construction_errors() -> TestResult {
        let mut document = Document::new_array()?;
        let root = document.root_id();
        let element = document.add_element(root, "s")?;

        assert_eq!(
            Err(BuildError::NotAnObject),
            document.add_member(root, "a", 1_i64)
        );
        assert_eq!(
            Err(BuildError::NotAnArray),
            document.add_element(element, 1_i64)
        );

        assert_eq!(
            Err(BuildError::UnknownNode),
            document.add_element(ValueId(100), 1_i64)
        );
        // Failed construction does not create nodes
        assert_eq!(2, document.allocation_audit().live_nodes);
        Ok(())
    }

    #[test]
    fn destroy_releases_everything() -> TestResult {
        let mut document = Document::new_object()?;
        let root = document.root_id();
        let inner = document.add_member(root, "abc", NewValue::Object)?;
        document.add_member(inner, "d", "ef")?;
        let audit = document.allocation_audit();

        let stats = destroy(document);
        assert_eq!(audit.live_nodes, stats.released_nodes);
        assert_eq!(audit.live_payload_bytes, stats.released_payload_bytes);
        assert_eq!(6, stats.released_payload_bytes);
        Ok(())
    }

    #[test]
    fn long_chains_and_deep_nesting() -> TestResult {
        let mut document = Document::new_array()?;
        let mut current = document.root_id();
        for _ in 0..5_000 {
            current = document.add_element(current, NewValue::Array)?;
        }
        let root = document.root_id();
        for i in 0..5_000_i64 {
            document.add_element(root, i)?;
        }

        let count = document.root().elements().unwrap().count();
        assert_eq!(5_001, count);
        drop(document);
        Ok(())
    }

    #[test]
    fn append_many() -> TestResult {
        let count = 100_000_i64;
        let mut document = Document::new_object()?;
        let root = document.root_id();
        let array = document.add_member(root, "array", NewValue::Array)?;
        for i in 0..count {
            document.add_element(array, i)?;
            document.add_member(root, "m", i)?;
        }

        let object = document.root().as_object().unwrap();
        assert_eq!(count as usize + 1, object.len());
        let elements: Vec<i64> = object
            .get("array")
            .and_then(|a| a.elements())
            .unwrap()
            .map(|e| e.as_i64().unwrap())
            .collect();
        assert_eq!((0..count).collect::<Vec<_>>(), elements);
        let last = object.members().last().unwrap();
        assert_eq!(Some(count - 1), last.value().as_i64());
        Ok(())
    }

    #[test]
    fn append_to_parsed_document() -> TestResult {
        let mut document = crate::parse_str(r#"{"a": [x, y], "b": z}"#)?;
        let root = document.root_id();
        let array = document.root().as_object().unwrap().get("a").unwrap().id();
        document.add_element(array, 1_i64)?;
        document.add_element(array, 2_i64)?;
        document.add_member(root, "c", true)?;
        document.add_member(root, "d", Scalar::Null)?;

        assert_eq!(
            r#"{"a":["x","y",1,2],"b":"z","c":true,"d":null}"#,
            crate::serialize_to_string(&document)?
        );
        Ok(())
    }

    #[test]
    fn kind_display() {
        assert_eq!("Object", RootKind::Object.to_string());
        assert_eq!("Null", ValueKind::Null.to_string());
    }
}
