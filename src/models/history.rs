//! Clinical history submitted alongside diagnosis images.
//!
//! Wire keys are the human-readable field names used by the diagnosis
//! service (`"Total Birds in Farm"`, ...), so every field is renamed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

pub const SPECIES: &str = "Species";
pub const AGE: &str = "Age";
pub const CLINICAL_SIGNS: &str = "Clinical Signs";
pub const POST_MORTEM_FINDINGS: &str = "Post-Mortem Findings";
pub const TOTAL_BIRDS: &str = "Total Birds in Farm";
pub const TOTAL_AFFECTED: &str = "Total Affected";
pub const TOTAL_DEATHS: &str = "Total Deaths";

/// All history keys, in form order.
pub const HISTORY_FIELDS: [&str; 7] = [
    SPECIES,
    AGE,
    CLINICAL_SIGNS,
    POST_MORTEM_FINDINGS,
    TOTAL_BIRDS,
    TOTAL_AFFECTED,
    TOTAL_DEATHS,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Invalid history JSON: {0}")]
    InvalidJson(String),
}

/// A single history value, kept in the JSON type it arrived in.
///
/// Text and numbers are both accepted for every field. Re-serializing a
/// record writes each value back with its original type, so the history
/// forwarded upstream matches what the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HistoryValue {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl HistoryValue {
    /// The value as entered, for rule checks and display.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            HistoryValue::Text(s) => Cow::Borrowed(s),
            HistoryValue::Number(n) => Cow::Owned(n.to_string()),
            HistoryValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }

    /// Empty or whitespace-only text. Numbers and booleans are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, HistoryValue::Text(s) if s.trim().is_empty())
    }
}

impl Default for HistoryValue {
    fn default() -> Self {
        HistoryValue::Text(String::new())
    }
}

impl fmt::Display for HistoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for HistoryValue {
    fn from(value: &str) -> Self {
        HistoryValue::Text(value.to_string())
    }
}

impl From<String> for HistoryValue {
    fn from(value: String) -> Self {
        HistoryValue::Text(value)
    }
}

impl From<u64> for HistoryValue {
    fn from(value: u64) -> Self {
        HistoryValue::Number(value.into())
    }
}

impl PartialEq<&str> for HistoryValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == *other
    }
}

impl<'de> Deserialize<'de> for HistoryValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(HistoryValue::default()),
            Value::String(s) => Ok(HistoryValue::Text(s)),
            Value::Number(n) => Ok(HistoryValue::Number(n)),
            Value::Bool(b) => Ok(HistoryValue::Bool(b)),
            other => Err(serde::de::Error::custom(format!(
                "expected text or number, found {other}"
            ))),
        }
    }
}

/// Clinical context for one diagnosis request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalHistoryRecord {
    #[serde(rename = "Species")]
    pub species: HistoryValue,
    #[serde(rename = "Age")]
    pub age: HistoryValue,
    #[serde(rename = "Clinical Signs")]
    pub clinical_signs: HistoryValue,
    #[serde(rename = "Post-Mortem Findings")]
    pub post_mortem_findings: HistoryValue,
    #[serde(rename = "Total Birds in Farm")]
    pub total_birds: HistoryValue,
    #[serde(rename = "Total Affected")]
    pub total_affected: HistoryValue,
    #[serde(rename = "Total Deaths")]
    pub total_deaths: HistoryValue,
}

impl ClinicalHistoryRecord {
    /// Look up a field by its wire name.
    pub fn get(&self, field: &str) -> Option<&HistoryValue> {
        let value = match field {
            SPECIES => &self.species,
            AGE => &self.age,
            CLINICAL_SIGNS => &self.clinical_signs,
            POST_MORTEM_FINDINGS => &self.post_mortem_findings,
            TOTAL_BIRDS => &self.total_birds,
            TOTAL_AFFECTED => &self.total_affected,
            TOTAL_DEATHS => &self.total_deaths,
            _ => return None,
        };
        Some(value)
    }

    /// Set a field by its wire name. Unknown names are ignored and return `false`.
    pub fn set(&mut self, field: &str, value: impl Into<HistoryValue>) -> bool {
        let slot = match field {
            SPECIES => &mut self.species,
            AGE => &mut self.age,
            CLINICAL_SIGNS => &mut self.clinical_signs,
            POST_MORTEM_FINDINGS => &mut self.post_mortem_findings,
            TOTAL_BIRDS => &mut self.total_birds,
            TOTAL_AFFECTED => &mut self.total_affected,
            TOTAL_DEATHS => &mut self.total_deaths,
            _ => return false,
        };
        *slot = value.into();
        true
    }

    /// Iterate `(field, value)` pairs in form order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &HistoryValue)> + '_ {
        HISTORY_FIELDS
            .into_iter()
            .filter_map(move |field| self.get(field).map(|value| (field, value)))
    }

    /// Serialize to the JSON text carried by the `history` form field.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The two shapes a history can arrive in.
///
/// Resolved once at the request boundary; nothing downstream branches
/// on which one was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorySource {
    /// A single `history` field holding a JSON object.
    Json(String),
    /// Discrete form fields keyed by wire name.
    Fields(HashMap<String, String>),
}

impl HistorySource {
    pub fn resolve(self) -> Result<ClinicalHistoryRecord, HistoryError> {
        match self {
            HistorySource::Json(text) => {
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| HistoryError::InvalidJson(e.to_string()))?;
                if !value.is_object() {
                    return Err(HistoryError::InvalidJson(
                        "history must be a JSON object".into(),
                    ));
                }
                serde_json::from_value(value).map_err(|e| HistoryError::InvalidJson(e.to_string()))
            }
            HistorySource::Fields(map) => {
                let mut record = ClinicalHistoryRecord::default();
                for (field, value) in map {
                    record.set(&field, value);
                }
                Ok(record)
            }
        }
    }
}
