//! The schema contract and the registry that maps Rust types onto it.
//!
//! A [`ResourceSchema`] knows how to read one domain type: its JSON:API
//! type name, id, attributes, relationships, links and meta. Schemas are
//! registered in a [`SchemaContainer`], keyed by the domain type, and domain
//! values reach the encoder as type-erased [`ObjectRef`] handles.

use crate::document::{Link, Links};
use crate::position::{IncludePaths, Position};
use crate::resource::Identifier;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Domain values
// ============================================================================

/// A shared, type-erased handle to a domain value.
#[derive(Clone)]
pub struct ObjectRef {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn value_type_id(&self) -> TypeId {
        let value: &dyn Any = self.value.as_ref();
        value.type_id()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef<{}>", self.type_name)
    }
}

/// One element of a collection: a full domain value or a bare identifier.
#[derive(Debug, Clone)]
pub enum Item {
    Identifier(Identifier),
    Object(ObjectRef),
}

/// Input to the encoder and the data side of a relationship description.
#[derive(Debug, Clone)]
pub enum Data {
    Null,
    Identifier(Identifier),
    Object(ObjectRef),
    Collection(Vec<Item>),
}

impl Data {
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Data::Object(ObjectRef::new(value))
    }

    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Data::Object(ObjectRef::from_arc(value))
    }

    /// A collection of shared domain values.
    pub fn collection<T, I>(values: I) -> Self
    where
        T: Any + Send + Sync,
        I: IntoIterator<Item = Arc<T>>,
    {
        Data::Collection(
            values
                .into_iter()
                .map(|v| Item::Object(ObjectRef::from_arc(v)))
                .collect(),
        )
    }

    /// `Object` for `Some`, `Null` for `None`.
    pub fn optional<T: Any + Send + Sync>(value: Option<Arc<T>>) -> Self {
        value.map(Data::shared).unwrap_or(Data::Null)
    }
}

impl From<Identifier> for Data {
    fn from(identifier: Identifier) -> Self {
        Data::Identifier(identifier)
    }
}

impl From<ObjectRef> for Data {
    fn from(object: ObjectRef) -> Self {
        Data::Object(object)
    }
}

impl From<Item> for Data {
    fn from(item: Item) -> Self {
        match item {
            Item::Identifier(identifier) => Data::Identifier(identifier),
            Item::Object(object) => Data::Object(object),
        }
    }
}

impl From<Identifier> for Item {
    fn from(identifier: Identifier) -> Self {
        Item::Identifier(identifier)
    }
}

impl From<ObjectRef> for Item {
    fn from(object: ObjectRef) -> Self {
        Item::Object(object)
    }
}

// ============================================================================
// Schema output
// ============================================================================

/// Attribute values collected by a schema, in declaration order.
///
/// Values are converted to JSON as they are added. A conversion failure is
/// kept and reported by the encoder together with the resource type.
#[derive(Debug, Default)]
pub struct Attributes {
    entries: Vec<(String, Value)>,
    failure: Option<(String, serde_json::Error)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Serialize) {
        if self.failure.is_some() {
            return;
        }
        let name = name.into();
        match serde_json::to_value(&value) {
            Ok(value) => self.entries.push((name, value)),
            Err(e) => self.failure = Some((name, e)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(
        self,
    ) -> std::result::Result<Vec<(String, Value)>, (String, serde_json::Error)> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.entries),
        }
    }
}

/// What a schema reports about one relationship. At least one of data,
/// links or meta must be present.
///
/// ```
/// use compound::v1::{Data, Identifier, Link, RelationshipDescription};
///
/// let author = RelationshipDescription::new()
///     .with_data(Data::Identifier(Identifier::new("people", "9")))
///     .with_related_link();
/// assert!(author.has_data());
///
/// let empty = RelationshipDescription::new();
/// assert!(!empty.has_data() && !empty.has_links() && !empty.has_meta());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelationshipDescription {
    pub(crate) data: Option<Data>,
    pub(crate) links: Links,
    pub(crate) meta: Option<Value>,
    pub(crate) self_link: bool,
    pub(crate) related_link: bool,
}

impl RelationshipDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_link(mut self, name: impl Into<String>, link: Link) -> Self {
        self.links.insert(name.into(), link);
        self
    }

    /// Generate `{resource-self}/relationships/{name}` as the `self` link.
    pub fn with_self_link(mut self) -> Self {
        self.self_link = true;
        self
    }

    /// Generate `{resource-self}/{name}` as the `related` link.
    pub fn with_related_link(mut self) -> Self {
        self.related_link = true;
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty() || self.self_link || self.related_link
    }

    pub fn has_meta(&self) -> bool {
        self.meta.is_some()
    }
}

// ============================================================================
// Context
// ============================================================================

/// What the current encode call asks of the resource being read.
///
/// Schemas can use it to skip work, e.g. leave out relationship data that
/// will not be included.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    position: &'a Position,
    include_paths: &'a IncludePaths,
    fields: Option<&'a BTreeSet<String>>,
}

impl<'a> Context<'a> {
    pub fn new(
        position: &'a Position,
        include_paths: &'a IncludePaths,
        fields: Option<&'a BTreeSet<String>>,
    ) -> Self {
        Self {
            position,
            include_paths,
            fields,
        }
    }

    pub fn position(&self) -> &'a Position {
        self.position
    }

    /// Whether the relationship `name` of this resource is on an include path.
    pub fn is_included(&self, name: &str) -> bool {
        self.include_paths
            .contains(self.position.child("", name).path())
    }

    /// Whether `name` survives the sparse fieldset for this resource's type.
    pub fn is_field_requested(&self, name: &str) -> bool {
        self.fields.is_none_or(|fields| fields.contains(name))
    }
}

// ============================================================================
// Schema trait
// ============================================================================

/// Maps one domain type onto JSON:API.
///
/// ```
/// use compound::v1::{Attributes, Context, ResourceSchema};
///
/// struct Person {
///     id: u32,
///     name: String,
/// }
///
/// struct PersonSchema;
///
/// impl ResourceSchema for PersonSchema {
///     type Object = Person;
///
///     fn resource_type(&self, _person: &Person) -> String {
///         "people".into()
///     }
///
///     fn id(&self, person: &Person) -> Option<String> {
///         Some(person.id.to_string())
///     }
///
///     fn attributes(&self, person: &Person, _ctx: &Context<'_>) -> Attributes {
///         Attributes::new().with("name", &person.name)
///     }
/// }
/// ```
pub trait ResourceSchema: Send + Sync + 'static {
    type Object: Any + Send + Sync;

    /// JSON:API type name. Constant per domain type for ordinary schemas.
    fn resource_type(&self, object: &Self::Object) -> String;

    fn id(&self, object: &Self::Object) -> Option<String>;

    fn attributes(&self, object: &Self::Object, ctx: &Context<'_>) -> Attributes;

    /// Relationships in the order they should be walked and written.
    fn relationships(
        &self,
        _object: &Self::Object,
        _ctx: &Context<'_>,
    ) -> Vec<(String, RelationshipDescription)> {
        Vec::new()
    }

    /// URL of the resource relative to the encoder's url prefix.
    fn self_sub_url(&self, object: &Self::Object) -> Option<String> {
        self.id(object)
            .map(|id| format!("/{}/{}", self.resource_type(object), id))
    }

    /// Resource links; a sub-URL `self` link by default.
    fn links(&self, object: &Self::Object) -> Links {
        self.self_sub_url(object)
            .map(|url| Links::from([("self".to_string(), Link::sub_url(url))]))
            .unwrap_or_default()
    }

    fn identifier_meta(&self, _object: &Self::Object) -> Option<Value> {
        None
    }

    fn resource_meta(&self, _object: &Self::Object) -> Option<Value> {
        None
    }
}

/// A domain value paired with its schema.
pub(crate) trait BoundResource {
    fn resource_type(&self) -> String;
    fn id(&self) -> Option<String>;
    fn attributes(&self, ctx: &Context<'_>) -> Attributes;
    fn relationships(&self, ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)>;
    fn self_sub_url(&self) -> Option<String>;
    fn links(&self) -> Links;
    fn identifier_meta(&self) -> Option<Value>;
    fn resource_meta(&self) -> Option<Value>;
}

struct Bound<'s, S: ResourceSchema> {
    schema: &'s S,
    object: Arc<S::Object>,
}

impl<S: ResourceSchema> BoundResource for Bound<'_, S> {
    fn resource_type(&self) -> String {
        self.schema.resource_type(&self.object)
    }

    fn id(&self) -> Option<String> {
        self.schema.id(&self.object)
    }

    fn attributes(&self, ctx: &Context<'_>) -> Attributes {
        self.schema.attributes(&self.object, ctx)
    }

    fn relationships(&self, ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)> {
        self.schema.relationships(&self.object, ctx)
    }

    fn self_sub_url(&self) -> Option<String> {
        self.schema.self_sub_url(&self.object)
    }

    fn links(&self) -> Links {
        self.schema.links(&self.object)
    }

    fn identifier_meta(&self) -> Option<Value> {
        self.schema.identifier_meta(&self.object)
    }

    fn resource_meta(&self) -> Option<Value> {
        self.schema.resource_meta(&self.object)
    }
}

trait SchemaEntry: Send + Sync {
    fn bind<'s>(&'s self, object: &ObjectRef) -> Option<Box<dyn BoundResource + 's>>;
}

struct Entry<S>(S);

impl<S: ResourceSchema> SchemaEntry for Entry<S> {
    fn bind<'s>(&'s self, object: &ObjectRef) -> Option<Box<dyn BoundResource + 's>> {
        let object = object.downcast::<S::Object>()?;
        Some(Box::new(Bound {
            schema: &self.0,
            object,
        }))
    }
}

// ============================================================================
// Container
// ============================================================================

/// Registry of schemas keyed by domain type.
///
/// The container is read-only during encoding and can be shared between
/// concurrent encode calls.
#[derive(Default)]
pub struct SchemaContainer {
    schemas: HashMap<TypeId, Box<dyn SchemaEntry>>,
}

impl SchemaContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` for its `Object` type, replacing any earlier one.
    pub fn register<S: ResourceSchema>(&mut self, schema: S) -> &mut Self {
        self.schemas
            .insert(TypeId::of::<S::Object>(), Box::new(Entry(schema)));
        self
    }

    pub fn with_schema<S: ResourceSchema>(mut self, schema: S) -> Self {
        self.register(schema);
        self
    }

    pub fn has_schema(&self, object: &ObjectRef) -> bool {
        self.schemas.contains_key(&object.value_type_id())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub(crate) fn bind(&self, object: &ObjectRef) -> Option<Box<dyn BoundResource + '_>> {
        self.schemas.get(&object.value_type_id())?.bind(object)
    }
}

impl fmt::Debug for SchemaContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContainer")
            .field("schemas", &self.schemas.len())
            .finish()
    }
}
