//! Identifiers, lazily-read resources and their relationships.

use crate::document::{Link, Links};
use crate::error::{EncodeError, Result};
use crate::position::{IncludePaths, Position};
use crate::schema::{BoundResource, Context, Data, Item, ObjectRef, SchemaContainer};
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// Member names a resource may not use for attributes or relationships.
pub const RESERVED_NAMES: [&str; 2] = ["type", "id"];

/// Per-type allow-lists of field names.
pub type FieldSets = BTreeMap<String, BTreeSet<String>>;

/// Identity of a resource for de-duplication: `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub resource_type: String,
    pub id: Option<String>,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.resource_type, id),
            None => write!(f, "{}:<new>", self.resource_type),
        }
    }
}

/// The minimal reference to a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    resource_type: String,
    id: Option<String>,
    meta: Option<Value>,
}

impl Identifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: Some(id.into()),
            meta: None,
        }
    }

    /// An identifier for a resource that has no id yet.
    pub fn unsaved(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

/// State shared by every resource produced in one parse call.
pub(crate) struct Scope<'s> {
    pub(crate) container: &'s SchemaContainer,
    pub(crate) include_paths: IncludePaths,
    pub(crate) field_sets: FieldSets,
}

impl<'s> Scope<'s> {
    /// Bind `object` to its schema as a resource sitting at `position`.
    pub(crate) fn resource(
        self: &Rc<Self>,
        object: &ObjectRef,
        position: Position,
    ) -> Result<Resource<'s>> {
        let source = self
            .container
            .bind(object)
            .ok_or_else(|| EncodeError::SchemaNotFound {
                type_name: object.type_name(),
                path: position.path().to_string(),
            })?;
        Ok(Resource::new(source, Rc::clone(self), position))
    }
}

// ============================================================================
// Resource
// ============================================================================

/// A domain value read through its schema.
///
/// Type and id are read when the resource is created; attributes and
/// relationships are read on first access and kept for the lifetime of the
/// value. Clones share the same memoized state.
#[derive(Clone)]
pub struct Resource<'s> {
    inner: Rc<ResourceInner<'s>>,
}

struct ResourceInner<'s> {
    source: Box<dyn BoundResource + 's>,
    scope: Rc<Scope<'s>>,
    position: Position,
    resource_type: String,
    id: Option<String>,
    attributes: OnceCell<Vec<(String, Value)>>,
    relationships: OnceCell<Vec<Relationship<'s>>>,
}

impl<'s> Resource<'s> {
    fn new(source: Box<dyn BoundResource + 's>, scope: Rc<Scope<'s>>, position: Position) -> Self {
        let resource_type = source.resource_type();
        let id = source.id();
        Self {
            inner: Rc::new(ResourceInner {
                source,
                scope,
                position,
                resource_type,
                id,
                attributes: OnceCell::new(),
                relationships: OnceCell::new(),
            }),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.inner.resource_type
    }

    pub fn id(&self) -> Option<&str> {
        self.inner.id.as_deref()
    }

    pub fn position(&self) -> &Position {
        &self.inner.position
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            resource_type: self.inner.resource_type.clone(),
            id: self.inner.id.clone(),
        }
    }

    /// The resource as an identifier, carrying identifier meta if any.
    pub fn identifier(&self) -> Identifier {
        Identifier {
            resource_type: self.inner.resource_type.clone(),
            id: self.inner.id.clone(),
            meta: self.inner.source.identifier_meta(),
        }
    }

    pub fn identifier_meta(&self) -> Option<Value> {
        self.inner.source.identifier_meta()
    }

    pub fn resource_meta(&self) -> Option<Value> {
        self.inner.source.resource_meta()
    }

    pub fn links(&self) -> Links {
        self.inner.source.links()
    }

    fn context(&self) -> Context<'_> {
        let scope = &self.inner.scope;
        Context::new(
            &self.inner.position,
            &scope.include_paths,
            scope.field_sets.get(&self.inner.resource_type),
        )
    }

    fn check_reserved(&self, name: &str) -> Result<()> {
        if RESERVED_NAMES.contains(&name) {
            return Err(EncodeError::ReservedKeyCollision {
                resource_type: self.inner.resource_type.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// All attributes reported by the schema, in schema order.
    pub fn attributes(&self) -> Result<&[(String, Value)]> {
        if let Some(attributes) = self.inner.attributes.get() {
            return Ok(attributes);
        }

        let entries = self
            .inner
            .source
            .attributes(&self.context())
            .into_entries()
            .map_err(|(field, source)| EncodeError::NonSerializableValue {
                resource_type: self.inner.resource_type.clone(),
                field,
                source,
            })?;
        for (name, _) in &entries {
            self.check_reserved(name)?;
        }

        Ok(self.inner.attributes.get_or_init(|| entries))
    }

    /// All relationships reported by the schema, in schema order.
    ///
    /// Domain values in relationship data are bound to their schemas here,
    /// so a value without a schema fails with the path it was found at.
    pub fn relationships(&self) -> Result<&[Relationship<'s>]> {
        if let Some(relationships) = self.inner.relationships.get() {
            return Ok(relationships);
        }

        let descriptions = self.inner.source.relationships(&self.context());
        let self_url = self.inner.source.self_sub_url();
        let mut relationships = Vec::with_capacity(descriptions.len());

        for (name, description) in descriptions {
            self.check_reserved(&name)?;

            let position = self.inner.position.child(&self.inner.resource_type, &name);
            let data = match description.data {
                Some(data) => Some(self.relationship_data(data, &position)?),
                None => None,
            };

            let mut links = description.links;
            if let Some(url) = &self_url {
                if description.self_link {
                    links.insert(
                        "self".to_string(),
                        Link::sub_url(format!("{}/relationships/{}", url, name)),
                    );
                }
                if description.related_link {
                    links.insert(
                        "related".to_string(),
                        Link::sub_url(format!("{}/{}", url, name)),
                    );
                }
            }

            let relationship = Relationship {
                name,
                position,
                data,
                links,
                meta: description.meta,
            };
            // generated links need a self URL; without one they are dropped
            if !(relationship.has_data() || relationship.has_links() || relationship.has_meta()) {
                return Err(EncodeError::MalformedRelationship {
                    resource_type: self.inner.resource_type.clone(),
                    name: relationship.name,
                });
            }
            relationships.push(relationship);
        }

        Ok(self.inner.relationships.get_or_init(|| relationships))
    }

    fn relationship_data(&self, data: Data, position: &Position) -> Result<RelationshipData<'s>> {
        let scope = &self.inner.scope;
        Ok(match data {
            Data::Null => RelationshipData::Null,
            Data::Identifier(identifier) => RelationshipData::Identifier(identifier),
            Data::Object(object) => {
                RelationshipData::Resource(scope.resource(&object, position.clone())?)
            }
            Data::Collection(items) => {
                let mut members = Vec::with_capacity(items.len());
                for item in items {
                    members.push(match item {
                        Item::Identifier(identifier) => DataItem::Identifier(identifier),
                        Item::Object(object) => {
                            DataItem::Resource(scope.resource(&object, position.clone())?)
                        }
                    });
                }
                RelationshipData::Collection(members)
            }
        })
    }
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("type", &self.inner.resource_type)
            .field("id", &self.inner.id)
            .field("path", &self.inner.position.path())
            .finish()
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// A relationship of a resource, with its data bound to schemas.
#[derive(Debug, Clone)]
pub struct Relationship<'s> {
    name: String,
    position: Position,
    data: Option<RelationshipData<'s>>,
    links: Links,
    meta: Option<Value>,
}

impl<'s> Relationship<'s> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the related resources.
    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn data(&self) -> Option<&RelationshipData<'s>> {
        self.data.as_ref()
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    pub fn has_meta(&self) -> bool {
        self.meta.is_some()
    }
}

/// Relationship data after schema lookup.
#[derive(Debug, Clone)]
pub enum RelationshipData<'s> {
    Null,
    Identifier(Identifier),
    Resource(Resource<'s>),
    Collection(Vec<DataItem<'s>>),
}

/// One member of a to-many relationship.
#[derive(Debug, Clone)]
pub enum DataItem<'s> {
    Identifier(Identifier),
    Resource(Resource<'s>),
}

impl DataItem<'_> {
    pub fn identifier(&self) -> Identifier {
        match self {
            DataItem::Identifier(identifier) => identifier.clone(),
            DataItem::Resource(resource) => resource.identifier(),
        }
    }
}
