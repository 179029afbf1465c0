//! Record and identifier value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of a record within a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Creates a record identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the zone holding all synchronized records for one engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub String);

impl ZoneId {
    /// Creates a zone identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the standing change subscription for a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    /// Creates a subscription identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque position marker for incremental change fetches.
///
/// The server mints these; clients only store and echo them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeToken(pub Vec<u8>);

impl ChangeToken {
    /// Creates a change token from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A single field value in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// UTF-8 text.
    Text(String),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Homogeneous or heterogeneous list of values.
    List(Vec<FieldValue>),
}

/// A remote-store entity: a stable id plus named fields.
///
/// `change_tag` is the server's opaque version marker for the record. It is
/// preserved across the client-wins conflict merge so a re-send is accepted
/// as an update to the version the server actually holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Record type name.
    pub record_type: String,
    /// Server-assigned version marker, if the record has been saved before.
    pub change_tag: Option<String>,
    /// Named field values.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record of the given type.
    pub fn new(id: impl Into<RecordId>, record_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            change_tag: None,
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field, returning `self` for chaining.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Sets a field value.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Gets a field value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Removes every field, keeping id, type, and change tag.
    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    /// Copies every field of `other` into this record, replacing existing
    /// values. Identity and change tag are untouched.
    pub fn merge_fields_from(&mut self, other: &Record) {
        for (name, value) in &other.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

impl From<Record> for RecordId {
    fn from(record: Record) -> Self {
        record.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_field_access() {
        let mut record = Record::new("note-1", "Note")
            .with_field("title", FieldValue::Text("groceries".into()));
        record.set("pinned", FieldValue::Bool(true));

        assert_eq!(
            record.get("title"),
            Some(&FieldValue::Text("groceries".into()))
        );
        assert_eq!(record.get("pinned"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn clear_fields_keeps_identity() {
        let mut record = Record::new("note-1", "Note")
            .with_field("title", FieldValue::Text("x".into()));
        record.change_tag = Some("v3".into());

        record.clear_fields();

        assert!(record.fields.is_empty());
        assert_eq!(record.id, RecordId::from("note-1"));
        assert_eq!(record.change_tag, Some("v3".into()));
    }

    #[test]
    fn merge_replaces_and_adds_fields() {
        let mut server = Record::new("note-1", "Note")
            .with_field("title", FieldValue::Text("server".into()))
            .with_field("count", FieldValue::Integer(7));
        server.change_tag = Some("v9".into());

        let client = Record::new("note-1", "Note")
            .with_field("title", FieldValue::Text("client".into()))
            .with_field("pinned", FieldValue::Bool(true));

        server.merge_fields_from(&client);

        assert_eq!(server.get("title"), Some(&FieldValue::Text("client".into())));
        assert_eq!(server.get("pinned"), Some(&FieldValue::Bool(true)));
        // Fields absent from the client survive the merge
        assert_eq!(server.get("count"), Some(&FieldValue::Integer(7)));
        assert_eq!(server.change_tag, Some("v9".into()));
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = Record::new("note-1", "Note")
            .with_field("title", FieldValue::Text("hello".into()))
            .with_field("tags", FieldValue::List(vec![FieldValue::Text("a".into())]));

        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn record_id_from_owned_and_borrowed_strings() {
        assert_eq!(RecordId::from(String::from("note-1")), RecordId::from("note-1"));
        assert_eq!(Record::new(format!("note-{}", 2), "Note").id.as_str(), "note-2");
    }

    #[test]
    fn change_token_bytes() {
        let token = ChangeToken::new(vec![1, 2, 3]);
        assert_eq!(token.as_bytes(), &[1, 2, 3]);
    }
}
