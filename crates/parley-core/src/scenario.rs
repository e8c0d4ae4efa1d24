//! Scenario catalog entries.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Identifier of a scenario, unique within a catalog.
///
/// The backend keys scenarios by whatever its dictionary uses, so both JSON
/// strings and integers are accepted and normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Creates a scenario id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ScenarioId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = ScenarioId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer scenario id")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(ScenarioId(value.to_owned()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
                Ok(ScenarioId(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(ScenarioId(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(ScenarioId(value.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// A playable negotiation scenario.
///
/// Entries are kept verbatim: `name` and `story` are lifted out only when
/// they are strings. Anything else, including a `name` of another JSON type,
/// stays in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScenario")]
pub struct Scenario {
    /// Stable identifier.
    pub id: ScenarioId,
    /// Title shown in the scenario list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Long-form story text (markdown).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    /// Remaining backend fields (`purpose`, `goal`, `first_message`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawScenario {
    id: ScenarioId,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

fn take_string(
    extra: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    match extra.remove(key)? {
        serde_json::Value::String(value) => Some(value),
        serde_json::Value::Null => None,
        other => {
            extra.insert(key.to_owned(), other);
            None
        }
    }
}

impl From<RawScenario> for Scenario {
    fn from(raw: RawScenario) -> Self {
        let RawScenario { id, mut extra } = raw;
        let name = take_string(&mut extra, "name");
        let story = take_string(&mut extra, "story");
        Self {
            id,
            name,
            story,
            extra,
        }
    }
}

impl Scenario {
    /// Creates a scenario with a name and story and no extra fields.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, story: impl Into<String>) -> Self {
        Self {
            id: ScenarioId::new(id),
            name: Some(name.into()),
            story: Some(story.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Returns the name to show for this entry, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}
