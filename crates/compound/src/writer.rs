//! Assembly of top-level documents from traversal output.

use crate::document::{
    Document, ErrorObject, JsonApiObject, Linkage, Links, PrimaryData, RelationshipObject,
    ResourceIdentifier, ResourceObject,
};
use crate::error::Result;
use crate::fieldset::FieldSetFilter;
use crate::resource::{DataItem, Identifier, RelationshipData, Resource, ResourceKey};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

fn resolve_links(links: &Links, url_prefix: &str) -> Links {
    links
        .iter()
        .map(|(name, link)| (name.clone(), link.resolve(url_prefix)))
        .collect()
}

fn identifier_object(identifier: &Identifier) -> ResourceIdentifier {
    ResourceIdentifier {
        resource_type: identifier.resource_type().to_string(),
        id: identifier.id().map(str::to_string),
        meta: identifier.meta().cloned(),
    }
}

fn linkage(data: &RelationshipData<'_>) -> Linkage {
    match data {
        RelationshipData::Null => Linkage::Null,
        RelationshipData::Identifier(identifier) => Linkage::Single(identifier_object(identifier)),
        RelationshipData::Resource(resource) => {
            Linkage::Single(identifier_object(&resource.identifier()))
        }
        RelationshipData::Collection(items) => Linkage::Collection(
            items
                .iter()
                .map(|item| match item {
                    DataItem::Identifier(identifier) => identifier_object(identifier),
                    DataItem::Resource(resource) => identifier_object(&resource.identifier()),
                })
                .collect(),
        ),
    }
}

// ============================================================================
// DocumentWriter
// ============================================================================

/// Collects primary data and included resources into a [`Document`].
///
/// `included` never holds two entries with the same `(type, id)`; later
/// additions of a key already written are ignored. Primary data may repeat.
#[derive(Debug, Default)]
pub struct DocumentWriter {
    url_prefix: String,
    data: Option<PrimaryData>,
    included: Vec<ResourceObject>,
    included_keys: HashSet<ResourceKey>,
    meta: Option<Value>,
    links: Links,
    jsonapi: Option<JsonApiObject>,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix prepended to every sub-URL link.
    pub fn with_url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.url_prefix = url_prefix.into();
        self
    }

    pub fn set_data_as_array(&mut self) {
        self.data = Some(PrimaryData::Collection(Vec::new()));
    }

    pub fn set_null_to_data(&mut self) {
        self.data = Some(PrimaryData::Null);
    }

    pub fn set_meta(&mut self, meta: Value) {
        self.meta = Some(meta);
    }

    pub fn set_links(&mut self, links: Links) {
        self.links = links;
    }

    pub fn set_jsonapi(&mut self, jsonapi: JsonApiObject) {
        self.jsonapi = Some(jsonapi);
    }

    pub fn add_resource_to_data(
        &mut self,
        resource: &Resource<'_>,
        filter: &FieldSetFilter,
    ) -> Result<()> {
        let object = self.resource_object(resource, filter)?;
        self.push_data(object);
        Ok(())
    }

    /// Write `identifier` into `data` as a bare identifier object.
    pub fn add_identifier_to_data(&mut self, identifier: &Identifier) {
        let object = ResourceObject {
            meta: identifier.meta().cloned(),
            ..ResourceObject::identifier(identifier.resource_type(), identifier.id().map(str::to_string))
        };
        self.push_data(object);
    }

    /// Write `resource` into `included` unless its key is already there.
    pub fn add_resource_to_included(
        &mut self,
        resource: &Resource<'_>,
        filter: &FieldSetFilter,
    ) -> Result<()> {
        let key = resource.key();
        if self.included_keys.contains(&key) {
            return Ok(());
        }
        let object = self.resource_object(resource, filter)?;
        self.included_keys.insert(key);
        self.included.push(object);
        Ok(())
    }

    pub fn data_len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.resources().len())
    }

    pub fn included_len(&self) -> usize {
        self.included.len()
    }

    /// Snapshot of the document written so far. `data` is `null` if nothing
    /// has been written to it.
    pub fn get_document(&self) -> Document {
        Document {
            data: Some(self.data.clone().unwrap_or(PrimaryData::Null)),
            errors: None,
            included: self.included.clone(),
            meta: self.meta.clone(),
            links: (!self.links.is_empty()).then(|| resolve_links(&self.links, &self.url_prefix)),
            jsonapi: self.jsonapi.clone(),
        }
    }

    pub fn into_document(self) -> Document {
        let links = (!self.links.is_empty()).then(|| resolve_links(&self.links, &self.url_prefix));
        Document {
            data: Some(self.data.unwrap_or(PrimaryData::Null)),
            errors: None,
            included: self.included,
            meta: self.meta,
            links,
            jsonapi: self.jsonapi,
        }
    }

    fn push_data(&mut self, object: ResourceObject) {
        match &mut self.data {
            Some(PrimaryData::Collection(items)) => items.push(object),
            _ => self.data = Some(PrimaryData::Single(Box::new(object))),
        }
    }

    fn resource_object(
        &self,
        resource: &Resource<'_>,
        filter: &FieldSetFilter,
    ) -> Result<ResourceObject> {
        let attributes: Map<String, Value> = filter
            .attributes(resource)?
            .into_iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut relationships = BTreeMap::new();
        for relationship in filter.relationships(resource)? {
            relationships.insert(
                relationship.name().to_string(),
                RelationshipObject {
                    links: relationship
                        .has_links()
                        .then(|| resolve_links(relationship.links(), &self.url_prefix)),
                    data: relationship.data().map(linkage),
                    meta: relationship.meta().cloned(),
                },
            );
        }

        let links = resource.links();
        Ok(ResourceObject {
            resource_type: resource.resource_type().to_string(),
            id: resource.id().map(str::to_string),
            attributes: (!attributes.is_empty()).then_some(attributes),
            relationships: (!relationships.is_empty()).then_some(relationships),
            links: (!links.is_empty()).then(|| resolve_links(&links, &self.url_prefix)),
            meta: resource.resource_meta(),
        })
    }
}

// ============================================================================
// ErrorWriter
// ============================================================================

/// Builds `errors` documents. Independent of the graph traversal.
#[derive(Debug, Default)]
pub struct ErrorWriter {
    url_prefix: String,
    errors: Vec<ErrorObject>,
    meta: Option<Value>,
    links: Links,
    jsonapi: Option<JsonApiObject>,
}

impl ErrorWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.url_prefix = url_prefix.into();
        self
    }

    pub fn add_error(&mut self, error: &ErrorObject) {
        let mut error = error.clone();
        error.links = error
            .links
            .as_ref()
            .map(|links| resolve_links(links, &self.url_prefix));
        self.errors.push(error);
    }

    pub fn set_meta(&mut self, meta: Value) {
        self.meta = Some(meta);
    }

    pub fn set_links(&mut self, links: Links) {
        self.links = links;
    }

    pub fn set_jsonapi(&mut self, jsonapi: JsonApiObject) {
        self.jsonapi = Some(jsonapi);
    }

    pub fn get_document(&self) -> Document {
        Document {
            data: None,
            errors: Some(self.errors.clone()),
            included: Vec::new(),
            meta: self.meta.clone(),
            links: (!self.links.is_empty()).then(|| resolve_links(&self.links, &self.url_prefix)),
            jsonapi: self.jsonapi.clone(),
        }
    }
}
