//! Pull-based traversal of a domain graph.
//!
//! [`Parser::parse`] returns an iterator that first reports the shape of the
//! primary data and then yields resources and identifiers depth-first, with
//! relationships in schema order. Nothing is read from the graph until the
//! iterator is pulled, and a caller may stop after any event.
//!
//! Each distinct `(type, id)` has its relationships walked at most once per
//! parse call, which is what terminates cycles. A resource already seen is
//! still yielded when it sits at the root, since primary data may repeat.

use crate::error::Result;
use crate::position::{IncludePaths, Position};
use crate::resource::{DataItem, FieldSets, Identifier, RelationshipData, Resource, ResourceKey, Scope};
use crate::schema::{Data, Item, SchemaContainer};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::trace;

/// Shape of the primary data, reported before any item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataShape {
    Single,
    Collection,
    Null,
}

/// One step of the traversal.
#[derive(Debug, Clone)]
pub enum ParserEvent<'s> {
    Shape(DataShape),
    Identifier(Identifier),
    Resource(Resource<'s>),
}

/// Walks domain graphs using the schemas in a container.
#[derive(Debug)]
pub struct Parser<'s> {
    container: &'s SchemaContainer,
    field_sets: FieldSets,
}

impl<'s> Parser<'s> {
    pub fn new(container: &'s SchemaContainer) -> Self {
        Self {
            container,
            field_sets: FieldSets::new(),
        }
    }

    /// Field sets passed on to schemas through their context.
    pub fn with_field_sets(mut self, field_sets: FieldSets) -> Self {
        self.field_sets = field_sets;
        self
    }

    /// Start a traversal of `root` that expands the relationships on
    /// `include_paths` (and every prefix of them).
    ///
    /// Every call gets its own expansion tracker; nothing carries over
    /// between calls.
    pub fn parse<I, S>(&self, root: Data, include_paths: I) -> Events<'s>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scope = Rc::new(Scope {
            container: self.container,
            include_paths: IncludePaths::normalize(include_paths),
            field_sets: self.field_sets.clone(),
        });
        Events {
            scope,
            root: Some(root),
            stack: Vec::new(),
            tracker: ResourceTracker::default(),
            done: false,
        }
    }
}

/// Keys whose relationships have been walked in the current parse call.
#[derive(Debug, Default)]
struct ResourceTracker {
    expanded: HashSet<ResourceKey>,
}

impl ResourceTracker {
    /// Returns true the first time `key` is seen.
    fn mark(&mut self, key: ResourceKey) -> bool {
        self.expanded.insert(key)
    }
}

enum Pending<'s> {
    Root(Item),
    Nested(Resource<'s>),
}

/// Lazy event sequence produced by [`Parser::parse`].
///
/// Yields `Err` at most once, after which it is exhausted.
pub struct Events<'s> {
    scope: Rc<Scope<'s>>,
    root: Option<Data>,
    stack: Vec<Pending<'s>>,
    tracker: ResourceTracker,
    done: bool,
}

impl<'s> Events<'s> {
    fn start(&mut self, root: Data) -> DataShape {
        let shape = match root {
            Data::Null => DataShape::Null,
            Data::Identifier(identifier) => {
                self.stack.push(Pending::Root(Item::Identifier(identifier)));
                DataShape::Single
            }
            Data::Object(object) => {
                self.stack.push(Pending::Root(Item::Object(object)));
                DataShape::Single
            }
            Data::Collection(items) => {
                self.stack
                    .extend(items.into_iter().rev().map(Pending::Root));
                DataShape::Collection
            }
        };
        trace!(?shape, "primary data shape");
        shape
    }

    /// Walk `resource` if it is new; returns whether it should be yielded.
    fn visit(&mut self, resource: &Resource<'s>) -> Result<bool> {
        let first = self.tracker.mark(resource.key());
        if !first {
            trace!(key = %resource.key(), path = resource.position().path(), "already expanded");
            return Ok(resource.position().is_root());
        }

        let mut children = Vec::new();
        for relationship in resource.relationships()? {
            if !self.scope.include_paths.contains(relationship.position().path()) {
                continue;
            }
            match relationship.data() {
                Some(RelationshipData::Resource(child)) => children.push(child.clone()),
                Some(RelationshipData::Collection(items)) => {
                    children.extend(items.iter().filter_map(|item| match item {
                        DataItem::Resource(child) => Some(child.clone()),
                        DataItem::Identifier(_) => None,
                    }));
                }
                Some(RelationshipData::Null) | Some(RelationshipData::Identifier(_)) | None => {}
            }
        }
        self.stack
            .extend(children.into_iter().rev().map(Pending::Nested));
        Ok(true)
    }

    fn step(&mut self) -> Option<Result<ParserEvent<'s>>> {
        if let Some(root) = self.root.take() {
            return Some(Ok(ParserEvent::Shape(self.start(root))));
        }

        while let Some(pending) = self.stack.pop() {
            let resource = match pending {
                Pending::Root(Item::Identifier(identifier)) => {
                    return Some(Ok(ParserEvent::Identifier(identifier)));
                }
                Pending::Root(Item::Object(object)) => {
                    match self.scope.resource(&object, Position::root()) {
                        Ok(resource) => resource,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Pending::Nested(resource) => resource,
            };

            match self.visit(&resource) {
                Ok(true) => {
                    trace!(key = %resource.key(), path = resource.position().path(), "resource");
                    return Some(Ok(ParserEvent::Resource(resource)));
                }
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        None
    }
}

impl<'s> Iterator for Events<'s> {
    type Item = Result<ParserEvent<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let event = self.step();
        if matches!(event, None | Some(Err(_))) {
            self.done = true;
            self.stack.clear();
        }
        event
    }
}
