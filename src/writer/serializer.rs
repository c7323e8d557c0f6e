//! Writing a tree as compact JSON text
//!
//! Output is driven by the events of a [`Walk`]: opening punctuation and scalars
//! are written when a node is entered, the closing bracket of an object or array
//! when the walk leaves it. A `,` precedes every node which is entered as sibling.

use log::debug;

use super::{JsonSink, SerializeError};
use crate::{
    json_number::format_json_number,
    tree::{
        arena::{NodeRef, Tree, ValueData},
        cursor::{Link, Walk, WalkEvent},
        Document,
    },
};

/// Counts the bytes written to the wrapped sink
struct CountingSink<'a, S: JsonSink + ?Sized> {
    sink: &'a mut S,
    count: usize,
}

impl<S: JsonSink + ?Sized> CountingSink<'_, S> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerializeError> {
        self.sink.write_bytes(bytes)?;
        self.count += bytes.len();
        Ok(())
    }

    fn write_quoted(&mut self, bytes: &[u8]) -> Result<(), SerializeError> {
        self.write(b"\"")?;
        // Verbatim, no escaping
        self.write(bytes)?;
        self.write(b"\"")
    }
}

fn enter<S: JsonSink + ?Sized>(
    tree: &Tree,
    node: NodeRef,
    out: &mut CountingSink<'_, S>,
) -> Result<(), SerializeError> {
    match node {
        NodeRef::Member(id) => {
            let name = tree
                .member(id)
                .and_then(|m| m.name.as_deref())
                .unwrap_or_default();
            out.write_quoted(name)?;
            out.write(b":")
        }
        NodeRef::Value(id) => {
            let Some(value) = tree.value(id) else {
                panic!("Unexpected: Walked value {id:?} is not live");
            };
            match &value.data {
                ValueData::Uninitialized => Err(SerializeError::UninitializedValue),
                ValueData::Object(_) => out.write(b"{"),
                ValueData::Array(_) => out.write(b"["),
                ValueData::String(bytes) => out.write_quoted(bytes),
                ValueData::Integer(number) => match format_json_number(*number) {
                    Some(formatted) => out.write(formatted.as_bytes()),
                    None => panic!("Unexpected: Integer {number} is not representable"),
                },
                ValueData::Double(number) => match format_json_number(*number) {
                    Some(formatted) => out.write(formatted.as_bytes()),
                    None => Err(SerializeError::NonFiniteNumber { value: *number }),
                },
                ValueData::Literal(literal) => out.write(literal.to_string().as_bytes()),
            }
        }
    }
}

fn leave<S: JsonSink + ?Sized>(
    tree: &Tree,
    node: NodeRef,
    out: &mut CountingSink<'_, S>,
) -> Result<(), SerializeError> {
    let NodeRef::Value(id) = node else {
        return Ok(());
    };
    match tree.value(id).map(|v| &v.data) {
        Some(ValueData::Object(_)) => out.write(b"}"),
        Some(ValueData::Array(_)) => out.write(b"]"),
        _ => Ok(()),
    }
}

pub(crate) fn serialize<S: JsonSink + ?Sized>(
    document: &Document,
    sink: &mut S,
) -> Result<(), SerializeError> {
    let tree = document.tree();
    let mut out = CountingSink { sink, count: 0 };
    let mut walk = Walk::new(NodeRef::Value(document.root_id()));

    while let Some(event) = walk
        .next_event(tree)
        .map_err(|_| SerializeError::AllocationFailure)?
    {
        match event {
            WalkEvent::Enter { node, via } => {
                if via == Some(Link::Sibling) {
                    out.write(b",")?;
                }
                enter(tree, node, &mut out)?;
            }
            WalkEvent::Leave(node) => leave(tree, node, &mut out)?,
            WalkEvent::Pop(_) => {}
        }
    }

    debug!("serialized document into {} bytes", out.count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NewValue, Scalar};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn to_string(document: &Document) -> Result<String, SerializeError> {
        let mut bytes = Vec::new();
        serialize(document, &mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn scalars() -> TestResult {
        duplicate::duplicate! {
            [
                value expected;
                [Scalar::from("a b")] ["\"a b\""];
                [Scalar::from(-12_i64)] ["-12"];
                [Scalar::from(0.25_f64)] ["0.25"];
                [Scalar::from(-3.0_f64)] ["-3"];
                [Scalar::from(true)] ["true"];
                [Scalar::from(false)] ["false"];
                [Scalar::Null] ["null"];
            ]
            assert_eq!(expected, to_string(&Document::new_scalar(value)?)?);
        }
        Ok(())
    }

    #[test]
    fn nested() -> TestResult {
        let mut document = Document::new_array()?;
        let root = document.root_id();
        document.add_element(root, NewValue::Array)?;
        let object = document.add_element(root, NewValue::Object)?;
        let inner = document.add_member(object, "x", NewValue::Object)?;
        document.add_member(inner, "y", NewValue::Array)?;
        document.add_member(object, "z", 1_i64)?;
        document.add_element(root, "s")?;

        assert_eq!(r#"[[],{"x":{"y":[]},"z":1},"s"]"#, to_string(&document)?);
        Ok(())
    }

    #[test]
    fn no_escaping() -> TestResult {
        let mut document = Document::new_object()?;
        let root = document.root_id();
        document.add_member(root, "a\"b", "c\\d\ne")?;
        assert_eq!("{\"a\"b\":\"c\\d\ne\"}", to_string(&document)?);
        Ok(())
    }

    #[test]
    fn non_finite_number() -> TestResult {
        let mut document = Document::new_array()?;
        let root = document.root_id();
        document.add_element(root, f64::INFINITY)?;
        match to_string(&document) {
            Err(SerializeError::NonFiniteNumber { value }) => assert_eq!(f64::INFINITY, value),
            r => panic!("Unexpected result: {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn uninitialized_value() -> TestResult {
        let mut tree = Tree::new();
        let root = tree.alloc_value(ValueData::Uninitialized)?;
        let document = Document::from_parts(tree, root);
        match to_string(&document) {
            Err(SerializeError::UninitializedValue) => {}
            r => panic!("Unexpected result: {r:?}"),
        }
        Ok(())
    }
}
