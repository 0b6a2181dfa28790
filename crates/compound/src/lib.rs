#![doc = include_str!("../README.md")]

mod document;
mod encoder;
mod error;
mod fieldset;
mod parser;
mod position;
mod query;
mod resource;
mod schema;
mod writer;

#[cfg(test)]
mod fixtures;

pub mod v1 {
    //! Versioned public API for the compound document encoder.
    //!
    //! Everything is re-exported from this module. Types are organized into
    //! four groups:
    //!
    //! # Schemas
    //!
    //! How domain values are described to the encoder:
    //!
    //! - [`ResourceSchema`]: maps one domain type onto type, id, attributes,
    //!   relationships, links and meta
    //! - [`SchemaContainer`]: registry of schemas keyed by Rust type
    //! - [`ObjectRef`], [`Data`], [`Item`]: type-erased values handed to the encoder
    //! - [`Attributes`], [`RelationshipDescription`], [`Context`]: what a
    //!   schema returns, and what it is told about the current encode
    //!
    //! # Encoding
    //!
    //! - [`Encoder`] and [`EncoderOptions`]: the entry points
    //! - [`Parser`], [`Events`], [`ParserEvent`], [`DataShape`]: the lazy
    //!   depth-first traversal underneath
    //! - [`FieldSetFilter`], [`DocumentWriter`], [`ErrorWriter`]: document assembly
    //! - [`Position`], [`IncludePaths`]: where in the graph a resource sits
    //!   and which relationships to side-load
    //!
    //! # Resources
    //!
    //! - [`Resource`], [`Relationship`], [`RelationshipData`], [`DataItem`]:
    //!   domain values read through their schema
    //! - [`Identifier`], [`ResourceKey`]: `(type, id)` references
    //!
    //! # Documents
    //!
    //! The serde model of the output, usable for parsing as well:
    //!
    //! - [`Document`], [`PrimaryData`], [`ResourceObject`],
    //!   [`RelationshipObject`], [`Linkage`], [`ResourceIdentifier`]
    //! - [`Link`], [`Links`], [`JsonApiObject`]
    //! - [`ErrorObject`], [`ErrorSource`]
    //!
    //! # Example: a post with its author side-loaded
    //!
    //! ```
    //! use compound::v1::*;
    //! use std::sync::Arc;
    //!
    //! struct Person {
    //!     id: u32,
    //!     name: String,
    //! }
    //!
    //! struct Post {
    //!     id: u32,
    //!     title: String,
    //!     author: Arc<Person>,
    //! }
    //!
    //! struct PersonSchema;
    //!
    //! impl ResourceSchema for PersonSchema {
    //!     type Object = Person;
    //!
    //!     fn resource_type(&self, _: &Person) -> String {
    //!         "people".into()
    //!     }
    //!
    //!     fn id(&self, person: &Person) -> Option<String> {
    //!         Some(person.id.to_string())
    //!     }
    //!
    //!     fn attributes(&self, person: &Person, _ctx: &Context<'_>) -> Attributes {
    //!         Attributes::new().with("name", &person.name)
    //!     }
    //! }
    //!
    //! struct PostSchema;
    //!
    //! impl ResourceSchema for PostSchema {
    //!     type Object = Post;
    //!
    //!     fn resource_type(&self, _: &Post) -> String {
    //!         "posts".into()
    //!     }
    //!
    //!     fn id(&self, post: &Post) -> Option<String> {
    //!         Some(post.id.to_string())
    //!     }
    //!
    //!     fn attributes(&self, post: &Post, _ctx: &Context<'_>) -> Attributes {
    //!         Attributes::new().with("title", &post.title)
    //!     }
    //!
    //!     fn relationships(
    //!         &self,
    //!         post: &Post,
    //!         _ctx: &Context<'_>,
    //!     ) -> Vec<(String, RelationshipDescription)> {
    //!         vec![(
    //!             "author".into(),
    //!             RelationshipDescription::new().with_data(Data::shared(post.author.clone())),
    //!         )]
    //!     }
    //! }
    //!
    //! let container = SchemaContainer::new()
    //!     .with_schema(PersonSchema)
    //!     .with_schema(PostSchema);
    //!
    //! let post = Post {
    //!     id: 1,
    //!     title: "Hello".into(),
    //!     author: Arc::new(Person { id: 9, name: "Dan".into() }),
    //! };
    //!
    //! let doc = Encoder::new(&container)
    //!     .with_include_paths(["author"])
    //!     .encode_document(Data::object(post))
    //!     .unwrap();
    //!
    //! assert_eq!(doc.included.len(), 1);
    //! assert!(query::find_included(&doc, "people", "9").is_some());
    //! assert!(query::duplicate_included(&doc).is_empty());
    //! ```

    /// Lookups and consistency checks over encoded documents.
    ///
    /// # Example: check a document for duplicate side-loads
    ///
    /// ```
    /// use compound::v1::{Document, query};
    ///
    /// let doc = Document::from_json(
    ///     r#"{"data":{"type":"posts","id":"1"},"included":[{"type":"people","id":"9"}]}"#,
    /// ).unwrap();
    ///
    /// assert_eq!(query::primary_resources(&doc).len(), 1);
    /// assert!(query::duplicate_included(&doc).is_empty());
    /// assert!(query::unresolved_linkage(&doc).is_empty());
    /// ```
    pub mod query {
        pub use crate::query::{
            duplicate_included, find_included, primary_resources, unresolved_linkage,
        };
    }
    pub use crate::document::{
        Document, ErrorObject, ErrorSource, JSON_API_VERSION, JsonApiObject, Link, Linkage, Links,
        PrimaryData, RelationshipObject, ResourceIdentifier, ResourceObject,
    };
    pub use crate::encoder::{Encoder, EncoderOptions};
    pub use crate::error::{EncodeError, Result};
    pub use crate::fieldset::FieldSetFilter;
    pub use crate::parser::{DataShape, Events, Parser, ParserEvent};
    pub use crate::position::{IncludePaths, PATH_SEPARATOR, Position};
    pub use crate::resource::{
        DataItem, FieldSets, Identifier, RESERVED_NAMES, Relationship, RelationshipData, Resource,
        ResourceKey,
    };
    pub use crate::schema::{
        Attributes, Context, Data, Item, ObjectRef, RelationshipDescription, ResourceSchema,
        SchemaContainer,
    };
    pub use crate::writer::{DocumentWriter, ErrorWriter};
}
