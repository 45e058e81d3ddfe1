use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One simulated respondent.
///
/// Demographic fields are optional; anything else found in a persona file
/// (personality traits, values, political leaning, ...) lands in
/// `attributes` and is written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

fn text(value: &Option<String>) -> Option<Value> {
    value.clone().map(Value::String)
}

impl Persona {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Value of a named attribute as JSON, `None` when unset.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "source" => text(&self.source),
            "description" => text(&self.description),
            "age" => self.age.map(Value::from),
            "gender" => text(&self.gender),
            "education" => text(&self.education),
            "income" => text(&self.income),
            "location" => text(&self.location),
            "occupation" => text(&self.occupation),
            "family_status" => text(&self.family_status),
            "interests" if self.interests.is_empty() => None,
            "interests" => Some(Value::from(self.interests.clone())),
            other => self.attributes.get(other).filter(|v| !v.is_null()).cloned(),
        }
    }

    /// Whether `name` is set and, when `value` is given, matches it.
    ///
    /// A list attribute matches any single value it contains; an object
    /// attribute matches an object whose entries it all carries.
    pub fn has_attribute(&self, name: &str, value: Option<&Value>) -> bool {
        let Some(actual) = self.attribute(name) else {
            return false;
        };
        let Some(expected) = value else {
            return true;
        };
        match (&actual, expected) {
            (Value::Object(have), Value::Object(want)) => {
                want.iter().all(|(k, v)| have.get(k) == Some(v))
            }
            (Value::Array(items), want) if !want.is_array() => items.contains(want),
            _ => &actual == expected,
        }
    }

    /// Text the persona is prompted with.
    pub fn prompt_description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => self.to_string(),
        }
    }
}

fn or_unknown<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => {
                let short: String = description.chars().take(50).collect();
                write!(f, "Persona {}: {short}...", self.id)
            }
            None => write!(
                f,
                "Persona {}: {}, {}, {}",
                self.id,
                or_unknown(&self.gender),
                or_unknown(&self.age),
                or_unknown(&self.occupation)
            ),
        }
    }
}
