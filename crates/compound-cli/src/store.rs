//! In-memory record store loaded from a JSON fixture, and the schema that
//! exposes its records to the encoder.
//!
//! ```json
//! {
//!   "resources": [
//!     {"type": "people", "id": "9", "attributes": {"first_name": "Dan"}},
//!     {"type": "posts", "id": "1", "attributes": {"title": "Hi"},
//!      "relationships": {"author": {"type": "people", "id": "9"}, "comments": []}}
//!   ]
//! }
//! ```

use anyhow::{Context as _, Result, bail};
use compound::v1::{
    Attributes, Context, Data, Identifier, Item, ObjectRef, RelationshipDescription,
    ResourceSchema, SchemaContainer,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// A `(type, id)` reference between records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct RecordKey {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

/// Relationship value as written in the fixture.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Null,
    One(RecordKey),
    Many(Vec<RecordKey>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Reference>,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl Record {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
        }
    }
}

#[derive(Deserialize)]
struct StoreFile {
    resources: Vec<Record>,
}

/// Records in file order, indexed by key.
#[derive(Debug, Default)]
pub struct Store {
    records: Vec<Arc<Record>>,
    index: HashMap<RecordKey, usize>,
}

impl Store {
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut store = Store::default();
        for record in records {
            let key = record.key();
            if store.index.contains_key(&key) {
                bail!("Duplicate record {}:{}", key.resource_type, key.id);
            }
            store.index.insert(key, store.records.len());
            store.records.push(Arc::new(record));
        }
        Ok(store)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: StoreFile = serde_json::from_str(json).context("Failed to parse record store")?;
        Self::from_records(file.resources)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&Arc<Record>> {
        let key = RecordKey {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        };
        self.index.get(&key).map(|&i| &self.records[i])
    }

    /// All records of `resource_type`, in file order.
    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Arc<Record>> {
        self.records
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// The record as a domain value, or a bare identifier if it is not in
    /// the store.
    pub fn item(&self, resource_type: &str, id: &str) -> Item {
        match self.get(resource_type, id) {
            Some(record) => Item::Object(ObjectRef::from_arc(record.clone())),
            None => Item::Identifier(Identifier::new(resource_type, id)),
        }
    }

    fn reference_data(&self, reference: &Reference) -> Data {
        match reference {
            Reference::Null => Data::Null,
            Reference::One(key) => self.item(&key.resource_type, &key.id).into(),
            Reference::Many(keys) => Data::Collection(
                keys.iter()
                    .map(|key| self.item(&key.resource_type, &key.id))
                    .collect(),
            ),
        }
    }
}

/// Exposes every record of a [`Store`], whatever its type.
pub struct RecordSchema {
    store: Arc<Store>,
}

impl RecordSchema {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn container(store: Arc<Store>) -> SchemaContainer {
        SchemaContainer::new().with_schema(Self::new(store))
    }
}

impl ResourceSchema for RecordSchema {
    type Object = Record;

    fn resource_type(&self, record: &Record) -> String {
        record.resource_type.clone()
    }

    fn id(&self, record: &Record) -> Option<String> {
        Some(record.id.clone())
    }

    fn attributes(&self, record: &Record, ctx: &Context<'_>) -> Attributes {
        let mut attributes = Attributes::new();
        for (name, value) in &record.attributes {
            if ctx.is_field_requested(name) {
                attributes.insert(name.clone(), value);
            }
        }
        attributes
    }

    fn relationships(
        &self,
        record: &Record,
        _ctx: &Context<'_>,
    ) -> Vec<(String, RelationshipDescription)> {
        record
            .relationships
            .iter()
            .map(|(name, reference)| {
                (
                    name.clone(),
                    RelationshipDescription::new()
                        .with_data(self.store.reference_data(reference))
                        .with_related_link(),
                )
            })
            .collect()
    }

    fn resource_meta(&self, record: &Record) -> Option<Value> {
        record.meta.clone()
    }
}
