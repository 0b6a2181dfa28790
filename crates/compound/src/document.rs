use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Named links of a resource, relationship, error or document.
pub type Links = BTreeMap<String, Link>;

/// JSON:API version written into the `jsonapi` member by default.
pub const JSON_API_VERSION: &str = "1.0";

// ============================================================================
// Document
// ============================================================================

/// A JSON:API top-level document.
///
/// A data document carries `data` (possibly `null`) and an optional
/// `included` side-list; an error document carries `errors`; a meta
/// document carries only `meta`. Members that are absent are omitted from
/// the JSON entirely, except `data: null`, which is written out.
///
/// # JSON shape
///
/// ```json
/// {
///   "data": { "type": "posts", "id": "1", "relationships": { … } },
///   "included": [ { "type": "people", "id": "9", "attributes": { … } } ],
///   "meta": { "total": 1 },
///   "links": { "self": "http://example.com/posts/1" },
///   "jsonapi": { "version": "1.0" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
}

/// The top-level `data` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Null,
    Single(Box<ResourceObject>),
    Collection(Vec<ResourceObject>),
}

impl PrimaryData {
    /// Resources held in `data`, in order.
    pub fn resources(&self) -> Vec<&ResourceObject> {
        match self {
            PrimaryData::Null => Vec::new(),
            PrimaryData::Single(resource) => vec![resource.as_ref()],
            PrimaryData::Collection(resources) => resources.iter().collect(),
        }
    }
}

/// The `jsonapi` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonApiObject {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl JsonApiObject {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            meta: None,
        }
    }
}

impl Default for JsonApiObject {
    fn default() -> Self {
        Self::new(JSON_API_VERSION)
    }
}

// ============================================================================
// Resource objects
// ============================================================================

/// A resource object, or a resource identifier object when only `type`,
/// `id` and `meta` are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, RelationshipObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ResourceObject {
    /// A bare `{type, id}` object.
    pub fn identifier(resource_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            attributes: None,
            relationships: None,
            links: None,
            meta: None,
        }
    }
}

/// A relationship object inside `relationships`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Resource linkage: the `data` member of a relationship object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Null,
    Single(ResourceIdentifier),
    Collection(Vec<ResourceIdentifier>),
}

impl Linkage {
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Linkage::Null => Vec::new(),
            Linkage::Single(identifier) => vec![identifier],
            Linkage::Collection(identifiers) => identifiers.iter().collect(),
        }
    }
}

/// A resource identifier object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

// ============================================================================
// Links
// ============================================================================

/// A link: serialized as a bare URL string, or as `{"href", "meta"}` when it
/// carries meta.
///
/// Sub-URL links (`is_sub_url`) are relative to the encoder's url prefix
/// and get it prepended when the document is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub href: String,
    pub meta: Option<Value>,
    pub is_sub_url: bool,
}

impl Link {
    /// An absolute link written as-is.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            meta: None,
            is_sub_url: false,
        }
    }

    /// A link relative to the encoder's url prefix.
    pub fn sub_url(href: impl Into<String>) -> Self {
        Self {
            is_sub_url: true,
            ..Self::new(href)
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The link with `prefix` applied if it is a sub-URL.
    pub fn resolve(&self, prefix: &str) -> Link {
        if self.is_sub_url {
            Link {
                href: format!("{}{}", prefix, self.href),
                meta: self.meta.clone(),
                is_sub_url: false,
            }
        } else {
            self.clone()
        }
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.meta {
            None => serializer.serialize_str(&self.href),
            Some(meta) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("href", &self.href)?;
                map.serialize_entry("meta", meta)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Href(String),
            Object {
                href: String,
                #[serde(default)]
                meta: Option<Value>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Href(href) => Link::new(href),
            Repr::Object { href, meta } => Link {
                href,
                meta,
                is_sub_url: false,
            },
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A JSON:API error object. Absent members are omitted, so an error with
/// nothing set is written as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Where in the request an error originated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).pointer = Some(pointer.into());
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).parameter = Some(parameter.into());
        self
    }

    /// Add an `about` link (or any other named link).
    pub fn with_link(mut self, name: impl Into<String>, link: Link) -> Self {
        self.links
            .get_or_insert_with(Links::new)
            .insert(name.into(), link);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

// ============================================================================
// Convenience methods
// ============================================================================

impl Document {
    /// Parse a document from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Keeps an explicit `null` distinct from a missing member.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
