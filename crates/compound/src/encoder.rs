//! The encode entry points.
//!
//! An [`Encoder`] drives a [`Parser`] traversal into a [`DocumentWriter`]:
//! root resources go to `data`, everything reached through an include path
//! goes to `included`. Every call builds its own trackers, so one encoder
//! can be reused (or shared behind a reference) for any number of calls.
//!
//! ```
//! use compound::v1::{Attributes, Context, Data, Encoder, ResourceSchema, SchemaContainer};
//!
//! struct Tag {
//!     id: u32,
//!     label: String,
//! }
//!
//! struct TagSchema;
//!
//! impl ResourceSchema for TagSchema {
//!     type Object = Tag;
//!
//!     fn resource_type(&self, _tag: &Tag) -> String {
//!         "tags".into()
//!     }
//!
//!     fn id(&self, tag: &Tag) -> Option<String> {
//!         Some(tag.id.to_string())
//!     }
//!
//!     fn attributes(&self, tag: &Tag, _ctx: &Context<'_>) -> Attributes {
//!         Attributes::new().with("label", &tag.label)
//!     }
//! }
//!
//! let container = SchemaContainer::new().with_schema(TagSchema);
//! let json = Encoder::new(&container)
//!     .with_url_prefix("http://example.com")
//!     .encode_data(Data::object(Tag { id: 3, label: "rust".into() }))
//!     .unwrap();
//! assert_eq!(
//!     json,
//!     r#"{"data":{"type":"tags","id":"3","attributes":{"label":"rust"},"links":{"self":"http://example.com/tags/3"}}}"#
//! );
//! ```

use crate::document::{Document, ErrorObject, JsonApiObject, Links};
use crate::error::Result;
use crate::fieldset::FieldSetFilter;
use crate::parser::{DataShape, Parser, ParserEvent};
use crate::resource::FieldSets;
use crate::schema::{Data, SchemaContainer};
use crate::writer::{DocumentWriter, ErrorWriter};
use serde_json::Value;
use tracing::{debug, trace};

/// Options applied to every document an [`Encoder`] produces.
#[derive(Debug, Clone, Default)]
pub struct EncoderOptions {
    /// Prepended to every sub-URL link.
    pub url_prefix: String,
    /// Dot-separated relationship paths to side-load into `included`.
    pub include_paths: Vec<String>,
    /// Sparse fieldsets: per-type allow-lists of attribute and
    /// relationship names.
    pub field_sets: FieldSets,
    /// Top-level `meta`.
    pub meta: Option<Value>,
    /// Top-level `links`.
    pub links: Links,
    /// Top-level `jsonapi` object; omitted when `None`.
    pub jsonapi: Option<JsonApiObject>,
    /// Pretty-print the string entry points.
    pub pretty: bool,
}

/// Encodes domain graphs into JSON:API documents.
#[derive(Debug, Clone)]
pub struct Encoder<'s> {
    container: &'s SchemaContainer,
    options: EncoderOptions,
}

impl<'s> Encoder<'s> {
    pub fn new(container: &'s SchemaContainer) -> Self {
        Self::with_options(container, EncoderOptions::default())
    }

    pub fn with_options(container: &'s SchemaContainer, options: EncoderOptions) -> Self {
        Self { container, options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn with_url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.options.url_prefix = url_prefix.into();
        self
    }

    pub fn with_include_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.include_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field_sets(mut self, field_sets: FieldSets) -> Self {
        self.options.field_sets = field_sets;
        self
    }

    /// Restrict `resource_type` to `fields`, leaving other types alone.
    pub fn with_fields<I, S>(mut self, resource_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .field_sets
            .insert(resource_type.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.options.meta = Some(meta);
        self
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.options.links = links;
        self
    }

    pub fn with_jsonapi_version(mut self, version: impl Into<String>) -> Self {
        self.options
            .jsonapi
            .get_or_insert_with(JsonApiObject::default)
            .version = version.into();
        self
    }

    pub fn with_jsonapi_meta(mut self, meta: Value) -> Self {
        self.options
            .jsonapi
            .get_or_insert_with(JsonApiObject::default)
            .meta = Some(meta);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.options.pretty = pretty;
        self
    }

    // ── Data documents ───────────────────────────────────────────────

    /// Encode `data` and everything on the include paths into a document.
    ///
    /// Fails on the first schema error met during the traversal; no partial
    /// document is returned.
    pub fn encode_document(&self, data: Data) -> Result<Document> {
        self.build(data, false)
    }

    pub fn encode_data(&self, data: Data) -> Result<String> {
        self.stringify(&self.encode_document(data)?)
    }

    /// Like [`encode_document`](Self::encode_document), with the primary
    /// data written as resource identifier objects.
    pub fn encode_identifiers_document(&self, data: Data) -> Result<Document> {
        self.build(data, true)
    }

    pub fn encode_identifiers(&self, data: Data) -> Result<String> {
        self.stringify(&self.encode_identifiers_document(data)?)
    }

    // ── Meta and error documents ─────────────────────────────────────

    /// A document with top-level `meta` and no `data`.
    pub fn encode_meta_document(&self, meta: Value) -> Document {
        Document {
            meta: Some(meta),
            links: (!self.options.links.is_empty()).then(|| {
                self.options
                    .links
                    .iter()
                    .map(|(name, link)| (name.clone(), link.resolve(&self.options.url_prefix)))
                    .collect()
            }),
            jsonapi: self.options.jsonapi.clone(),
            ..Default::default()
        }
    }

    pub fn encode_meta(&self, meta: Value) -> Result<String> {
        self.stringify(&self.encode_meta_document(meta))
    }

    pub fn encode_errors_document<'e, I>(&self, errors: I) -> Document
    where
        I: IntoIterator<Item = &'e ErrorObject>,
    {
        let mut writer = ErrorWriter::new().with_url_prefix(self.options.url_prefix.clone());
        for error in errors {
            writer.add_error(error);
        }
        if let Some(meta) = &self.options.meta {
            writer.set_meta(meta.clone());
        }
        writer.set_links(self.options.links.clone());
        if let Some(jsonapi) = &self.options.jsonapi {
            writer.set_jsonapi(jsonapi.clone());
        }
        writer.get_document()
    }

    pub fn encode_errors<'e, I>(&self, errors: I) -> Result<String>
    where
        I: IntoIterator<Item = &'e ErrorObject>,
    {
        self.stringify(&self.encode_errors_document(errors))
    }

    pub fn encode_error(&self, error: &ErrorObject) -> Result<String> {
        self.encode_errors([error])
    }

    // ── Internals ────────────────────────────────────────────────────

    fn build(&self, data: Data, identifiers_only: bool) -> Result<Document> {
        let options = &self.options;
        debug!(
            include = ?options.include_paths,
            field_sets = options.field_sets.len(),
            identifiers_only,
            "encoding document"
        );

        let filter = FieldSetFilter::new(options.field_sets.clone());
        let mut writer = DocumentWriter::new().with_url_prefix(options.url_prefix.clone());

        let events = Parser::new(self.container)
            .with_field_sets(options.field_sets.clone())
            .parse(data, &options.include_paths);

        for event in events {
            match event? {
                ParserEvent::Shape(DataShape::Collection) => writer.set_data_as_array(),
                ParserEvent::Shape(DataShape::Null) => writer.set_null_to_data(),
                ParserEvent::Shape(DataShape::Single) => {}
                ParserEvent::Identifier(identifier) => writer.add_identifier_to_data(&identifier),
                ParserEvent::Resource(resource) if resource.position().is_root() => {
                    if identifiers_only {
                        writer.add_identifier_to_data(&resource.identifier());
                    } else {
                        writer.add_resource_to_data(&resource, &filter)?;
                    }
                }
                ParserEvent::Resource(resource) => {
                    if filter.should_output_relationship(resource.position()) {
                        writer.add_resource_to_included(&resource, &filter)?;
                    } else {
                        trace!(
                            key = %resource.key(),
                            path = resource.position().path(),
                            "excluded by field set"
                        );
                    }
                }
            }
        }

        if let Some(meta) = &options.meta {
            writer.set_meta(meta.clone());
        }
        writer.set_links(options.links.clone());
        if let Some(jsonapi) = &options.jsonapi {
            writer.set_jsonapi(jsonapi.clone());
        }

        debug!(
            data = writer.data_len(),
            included = writer.included_len(),
            "encoded document"
        );
        Ok(writer.into_document())
    }

    fn stringify(&self, document: &Document) -> Result<String> {
        Ok(if self.options.pretty {
            document.to_json_pretty()?
        } else {
            document.to_json()?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Link, Linkage, PrimaryData, ResourceObject};
    use crate::error::EncodeError;
    use crate::fixtures::{self, Person};
    use crate::resource::Identifier;
    use crate::schema::ObjectRef;
    use serde_json::json;
    use std::sync::Arc;

    fn keys(resources: &[ResourceObject]) -> Vec<String> {
        resources
            .iter()
            .map(|r| format!("{}:{}", r.resource_type, r.id.as_deref().unwrap_or("")))
            .collect()
    }

    fn data_keys(doc: &Document) -> Vec<String> {
        let resources: Vec<ResourceObject> = doc
            .data
            .as_ref()
            .map(|d| d.resources().into_iter().cloned().collect())
            .unwrap_or_default();
        keys(&resources)
    }

    #[test]
    fn test_compound_document_with_includes() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let doc = Encoder::new(&container)
            .with_include_paths(["author", "comments", "comments.author"])
            .encode_document(Data::shared(blog.post))
            .unwrap();

        assert_eq!(data_keys(&doc), vec!["posts:1"]);
        assert_eq!(
            keys(&doc.included),
            vec!["people:9", "comments:5", "comments:12"]
        );

        let post = doc.data.as_ref().unwrap().resources()[0];
        let relationships = post.relationships.as_ref().unwrap();
        assert_eq!(
            relationships["author"].data,
            Some(Linkage::Single(crate::document::ResourceIdentifier {
                resource_type: "people".into(),
                id: Some("9".into()),
                meta: None,
            }))
        );
        let comment_ids: Vec<_> = relationships["comments"]
            .data
            .as_ref()
            .unwrap()
            .identifiers()
            .iter()
            .map(|i| i.id.clone().unwrap_or_default())
            .collect();
        assert_eq!(comment_ids, vec!["5", "12"]);
    }

    #[test]
    fn test_no_include_paths() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let json = Encoder::new(&container)
            .encode_data(Data::shared(blog.post))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert!(value.get("included").is_none());
        assert_eq!(
            value["data"]["relationships"]["comments"],
            json!({"links": {"related": "/posts/1/comments"}})
        );
        assert_eq!(
            value["data"]["relationships"]["author"],
            json!({"data": {"type": "people", "id": "9"}})
        );
    }

    #[test]
    fn test_sparse_fieldset() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let doc = Encoder::new(&container)
            .with_include_paths(["author"])
            .with_fields("people", ["first_name"])
            .encode_document(Data::shared(blog.post))
            .unwrap();

        let author = &doc.included[0];
        let attributes = author.attributes.as_ref().unwrap();
        assert_eq!(attributes.get("first_name"), Some(&json!("Dan")));
        assert!(attributes.get("last_name").is_none());
    }

    #[test]
    fn test_null_root() {
        let container = fixtures::container();
        let json = Encoder::new(&container).encode_data(Data::Null).unwrap();
        assert_eq!(json, r#"{"data":null}"#);
    }

    #[test]
    fn test_empty_collection_root() {
        let container = fixtures::container();
        let json = Encoder::new(&container)
            .encode_data(Data::Collection(vec![]))
            .unwrap();
        assert_eq!(json, r#"{"data":[]}"#);
    }

    #[test]
    fn test_root_duplicates_kept_in_data() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let doc = Encoder::new(&container)
            .with_include_paths(["author"])
            .encode_document(Data::collection([
                blog.comments[0].clone(),
                blog.comments[0].clone(),
                blog.comments[1].clone(),
            ]))
            .unwrap();

        assert_eq!(
            data_keys(&doc),
            vec!["comments:5", "comments:5", "comments:12"]
        );
        assert_eq!(keys(&doc.included), vec!["people:9"]);
    }

    #[test]
    fn test_resource_in_included_and_data() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let doc = Encoder::new(&container)
            .with_include_paths(["author"])
            .encode_document(Data::Collection(vec![
                ObjectRef::from_arc(blog.comments[0].clone()).into(),
                ObjectRef::from_arc(blog.author.clone()).into(),
            ]))
            .unwrap();

        assert_eq!(data_keys(&doc), vec!["comments:5", "people:9"]);
        assert_eq!(keys(&doc.included), vec!["people:9"]);
    }

    #[test]
    fn test_include_walked_but_hidden_by_field_set() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let doc = Encoder::new(&container)
            .with_include_paths(["comments.author"])
            .with_fields("posts", ["title", "author"])
            .encode_document(Data::shared(blog.post))
            .unwrap();

        // comments are walked to reach their author, but not written
        assert_eq!(keys(&doc.included), vec!["people:9"]);
        let post = doc.data.as_ref().unwrap().resources()[0];
        let names: Vec<_> = post.relationships.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["author"]);
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        let (container, nodes, expansions) =
            fixtures::node_graph(&[(1, vec![2]), (2, vec![3]), (3, vec![1])]);
        let doc = Encoder::new(&container)
            .with_include_paths(["next.next.next.next"])
            .encode_document(Data::shared(nodes[&1].clone()))
            .unwrap();

        assert_eq!(data_keys(&doc), vec!["nodes:1"]);
        assert_eq!(keys(&doc.included), vec!["nodes:2", "nodes:3"]);
        assert_eq!(*expansions.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_identifier_root() {
        let container = fixtures::container();
        let json = Encoder::new(&container)
            .encode_data(Identifier::new("people", "9").into())
            .unwrap();
        assert_eq!(json, r#"{"data":{"type":"people","id":"9"}}"#);
    }

    #[test]
    fn test_encode_identifiers_keeps_included() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let doc = Encoder::new(&container)
            .with_include_paths(["author"])
            .encode_identifiers_document(Data::collection(blog.comments.clone()))
            .unwrap();

        match &doc.data {
            Some(PrimaryData::Collection(items)) => {
                assert_eq!(items.len(), 2);
                assert!(items.iter().all(|r| r.attributes.is_none()));
                assert!(items.iter().all(|r| r.links.is_none()));
            }
            other => panic!("Expected collection, got {:?}", other),
        }
        assert_eq!(keys(&doc.included), vec!["people:9"]);
    }

    #[test]
    fn test_top_level_members_and_prefix() {
        let container = fixtures::container();
        let json = Encoder::new(&container)
            .with_url_prefix("http://example.com")
            .with_meta(json!({"total": 1}))
            .with_links(Links::from([("self".to_string(), Link::sub_url("/people"))]))
            .with_jsonapi_version("1.1")
            .encode_data(Data::object(Person::new(9, "Dan", "Gebhardt")))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["meta"], json!({"total": 1}));
        assert_eq!(value["links"]["self"], json!("http://example.com/people"));
        assert_eq!(value["jsonapi"], json!({"version": "1.1"}));
        assert_eq!(value["data"]["links"]["self"], json!("http://example.com/people/9"));
    }

    #[test]
    fn test_relationship_links_meta_and_identifier_meta() {
        let container = SchemaContainer::new().with_schema(fixtures::LabelSchema);
        let label = fixtures::Label {
            id: 2,
            parent: Some(Arc::new(fixtures::Label { id: 1, parent: None })),
        };
        let json = Encoder::new(&container)
            .with_url_prefix("http://example.com")
            .with_include_paths(["parent"])
            .encode_data(Data::object(label))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value["data"]["relationships"]["parent"],
            json!({
                "links": {
                    "describedby": "http://schemas.example.com/labels",
                    "self": "http://example.com/labels/2/relationships/parent"
                },
                "data": {"type": "labels", "id": "1", "meta": {"rank": 1}},
                "meta": {"depth": 1}
            })
        );
        assert_eq!(
            value["included"][0]["relationships"]["parent"]["data"],
            Value::Null
        );
        // declared as name, color; written sorted by name
        let color = json.find(r#""color""#).unwrap();
        let name = json.find(r#""name""#).unwrap();
        assert!(color < name);
    }

    #[test]
    fn test_generated_links_without_id_fail() {
        let container = SchemaContainer::new().with_schema(fixtures::DraftSchema);
        let err = Encoder::new(&container)
            .encode_data(Data::object(fixtures::Draft))
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::MalformedRelationship { ref name, .. } if name == "author"
        ));
    }

    #[test]
    fn test_pretty_output() {
        let container = fixtures::container();
        let json = Encoder::new(&container)
            .pretty(true)
            .encode_data(Data::Null)
            .unwrap();
        assert_eq!(json, "{\n  \"data\": null\n}");
    }

    #[test]
    fn test_encode_meta() {
        let container = fixtures::container();
        let json = Encoder::new(&container)
            .encode_meta(json!({"count": 0}))
            .unwrap();
        assert_eq!(json, r#"{"meta":{"count":0}}"#);
    }

    #[test]
    fn test_encode_error() {
        let container = fixtures::container();
        let json = Encoder::new(&container)
            .encode_error(&ErrorObject::new().with_status("404").with_title("Not found"))
            .unwrap();
        assert_eq!(json, r#"{"errors":[{"status":"404","title":"Not found"}]}"#);

        let json = Encoder::new(&container)
            .encode_errors(&[ErrorObject::new()])
            .unwrap();
        assert_eq!(json, r#"{"errors":[{}]}"#);
    }

    #[test]
    fn test_missing_schema_aborts() {
        let container = SchemaContainer::new().with_schema(fixtures::PostSchema);
        let blog = fixtures::blog();
        let err = Encoder::new(&container)
            .with_include_paths(["author"])
            .encode_document(Data::shared(blog.post))
            .unwrap_err();
        match err {
            EncodeError::SchemaNotFound { path, .. } => assert_eq!(path, "author"),
            other => panic!("Expected SchemaNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_authoring_errors_abort() {
        let container = SchemaContainer::new()
            .with_schema(fixtures::ReservedSchema)
            .with_schema(fixtures::OpaqueSchema);
        let encoder = Encoder::new(&container);

        assert!(matches!(
            encoder.encode_document(Data::object(fixtures::Reserved)),
            Err(EncodeError::ReservedKeyCollision { .. })
        ));
        assert!(matches!(
            encoder.encode_document(Data::object(fixtures::Opaque)),
            Err(EncodeError::NonSerializableValue { .. })
        ));
    }

    #[test]
    fn test_encoder_is_reusable() {
        let container = fixtures::container();
        let blog = fixtures::blog();
        let encoder = Encoder::new(&container).with_include_paths(["author"]);
        let first = encoder.encode_document(Data::shared(blog.post.clone())).unwrap();
        let second = encoder.encode_document(Data::shared(Arc::clone(&blog.post))).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.included.len(), 1);
    }
}
