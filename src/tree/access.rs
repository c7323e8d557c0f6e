//! Name-keyed lookup of object members
//!
//! Lookups are linear scans over the member chain comparing the stored name bytes,
//! so names containing NUL bytes are matched exactly. If an object contains
//! duplicate names the first member in document order wins.

use super::{MemberRef, ObjectRef, ValueKind, ValueRef};

/// Finds the first member of `object` whose name equals `name`
///
/// # Examples
/// ```
/// # use chainjson::tree::find_member;
/// let document = chainjson::parse_str(r#"{"a": "1", "b": "2", "a": "3"}"#)?;
/// let object = document.root().as_object().unwrap();
///
/// let member = find_member("a", object).unwrap();
/// assert_eq!(Some("1"), member.value().as_str());
/// assert!(find_member("c", object).is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn find_member<'a>(name: impl AsRef<[u8]>, object: ObjectRef<'a>) -> Option<MemberRef<'a>> {
    let name = name.as_ref();
    object
        .members()
        .find(|member| member.name().len() == name.len() && member.name() == name)
}

/// Gets the value of the first member of `object` named `name`
pub fn value_of<'a>(name: impl AsRef<[u8]>, object: ObjectRef<'a>) -> Option<ValueRef<'a>> {
    find_member(name, object).map(|member| member.value())
}

/// Gets the string bytes of the first member of `object` named `name`
///
/// Returns `None` if there is no such member, or if its value is not a string.
pub fn string_of<'a>(name: impl AsRef<[u8]>, object: ObjectRef<'a>) -> Option<&'a [u8]> {
    let value = value_of(name, object)?;
    if value.kind() == ValueKind::String {
        value.as_bytes()
    } else {
        None
    }
}
