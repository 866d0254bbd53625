//! Opaque upstream records.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use opsdigest_workbook::SheetRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream business entity, carried verbatim.
///
/// The pipeline only reads a handful of date fields by name; everything else
/// is forwarded untouched to the spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Scalar field rendered as text. `null`, absent, empty strings, arrays
    /// and objects all yield `None`.
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.0.get(field)? {
            Value::String(value) if !value.is_empty() => Some(Cow::Borrowed(value.as_str())),
            Value::Number(value) => Some(Cow::Owned(value.to_string())),
            Value::Bool(value) => Some(Cow::Owned(value.to_string())),
            _ => None,
        }
    }

    /// Date-only prefix of a field: everything before the first `T`.
    pub fn date_prefix(&self, field: &str) -> Option<Cow<'_, str>> {
        let value = self.text(field)?;
        let prefix = match value {
            Cow::Borrowed(text) => Cow::Borrowed(text.split('T').next().unwrap_or(text)),
            Cow::Owned(text) => Cow::Owned(text.split('T').next().unwrap_or(&text).to_owned()),
        };
        if prefix.is_empty() {
            None
        } else {
            Some(prefix)
        }
    }

    /// Identifier used for ticket de-duplication.
    pub fn identity(&self, field: &str) -> Option<RecordId> {
        match self.0.get(field)? {
            Value::Number(value) => Some(RecordId(value.to_string())),
            Value::String(value) if !value.is_empty() => Some(RecordId(value.clone())),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl SheetRow for Record {
    fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

/// Canonical textual form of a record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
