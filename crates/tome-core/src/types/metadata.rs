//! Dublin Core metadata record.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Sentinel used for elements that could not be determined.
pub const NOT_AVAILABLE: &str = "Not Available";

/// The fifteen DCMI elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DcmiElement {
    Title,
    Creator,
    Subject,
    Description,
    Publisher,
    Contributor,
    Date,
    Type,
    Format,
    Identifier,
    Source,
    Language,
    Relation,
    Coverage,
    Rights,
}

impl DcmiElement {
    /// Field name as it appears in the JSON record.
    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    /// DCMI definition of the element, used as the schema description.
    pub fn definition(&self) -> &'static str {
        match self {
            DcmiElement::Title => "A name given to the resource.",
            DcmiElement::Creator => "An entity primarily responsible for making the resource.",
            DcmiElement::Subject => "The topic of the resource.",
            DcmiElement::Description => "An account of the resource.",
            DcmiElement::Publisher => "An entity responsible for making the resource available.",
            DcmiElement::Contributor => {
                "An entity responsible for making contributions to the resource."
            }
            DcmiElement::Date => {
                "A point or period of time associated with an event in the lifecycle of the resource."
            }
            DcmiElement::Type => "The nature or genre of the resource.",
            DcmiElement::Format => {
                "The file format, physical medium, or dimensions of the resource."
            }
            DcmiElement::Identifier => {
                "An unambiguous reference to the resource within a given context."
            }
            DcmiElement::Source => {
                "A related resource from which the described resource is derived."
            }
            DcmiElement::Language => "A language of the resource.",
            DcmiElement::Relation => "A related resource.",
            DcmiElement::Coverage => {
                "The spatial or temporal topic of the resource, spatial applicability, or jurisdiction."
            }
            DcmiElement::Rights => "Information about rights held in and over the resource.",
        }
    }

    /// Only the title is mandatory.
    pub fn is_required(&self) -> bool {
        matches!(self, DcmiElement::Title)
    }
}

/// Metadata describing one dataset archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DublinCoreMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
}

impl DublinCoreMetadata {
    /// Create a record with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// The fallback record: sentinel title, every other element unset.
    pub fn not_available() -> Self {
        Self::new(NOT_AVAILABLE)
    }

    /// Whether this is exactly the fallback record.
    pub fn is_not_available(&self) -> bool {
        *self == Self::not_available()
    }

    /// Read an element by name.
    pub fn get(&self, element: DcmiElement) -> Option<&str> {
        match element {
            DcmiElement::Title => Some(self.title.as_str()),
            DcmiElement::Creator => self.creator.as_deref(),
            DcmiElement::Subject => self.subject.as_deref(),
            DcmiElement::Description => self.description.as_deref(),
            DcmiElement::Publisher => self.publisher.as_deref(),
            DcmiElement::Contributor => self.contributor.as_deref(),
            DcmiElement::Date => self.date.as_deref(),
            DcmiElement::Type => self.resource_type.as_deref(),
            DcmiElement::Format => self.format.as_deref(),
            DcmiElement::Identifier => self.identifier.as_deref(),
            DcmiElement::Source => self.source.as_deref(),
            DcmiElement::Language => self.language.as_deref(),
            DcmiElement::Relation => self.relation.as_deref(),
            DcmiElement::Coverage => self.coverage.as_deref(),
            DcmiElement::Rights => self.rights.as_deref(),
        }
    }

    /// Number of optional elements that carry a value.
    pub fn populated_count(&self) -> usize {
        DcmiElement::iter()
            .filter(|e| !e.is_required())
            .filter(|e| self.get(*e).is_some())
            .count()
    }

    /// Strict JSON schema for structured completions.
    ///
    /// Strict mode requires every property to be listed as required, so
    /// optional elements are expressed as nullable strings.
    pub fn json_schema() -> Value {
        let mut properties = Map::new();
        for element in DcmiElement::iter() {
            let ty = if element.is_required() {
                json!("string")
            } else {
                json!(["string", "null"])
            };
            properties.insert(
                element.name().to_string(),
                json!({ "type": ty, "description": element.definition() }),
            );
        }
        let required: Vec<&str> = DcmiElement::iter().map(|e| e.name()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}
