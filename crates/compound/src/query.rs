//! Lookups and consistency checks over encoded documents.

use crate::document::{Document, ResourceIdentifier, ResourceObject};
use crate::resource::ResourceKey;
use std::collections::HashSet;

fn object_key(resource: &ResourceObject) -> ResourceKey {
    ResourceKey {
        resource_type: resource.resource_type.clone(),
        id: resource.id.clone(),
    }
}

fn identifier_key(identifier: &ResourceIdentifier) -> ResourceKey {
    ResourceKey {
        resource_type: identifier.resource_type.clone(),
        id: identifier.id.clone(),
    }
}

/// Resources in `data`, in order. Empty for `null` and for documents
/// without `data`.
pub fn primary_resources(doc: &Document) -> Vec<&ResourceObject> {
    doc.data
        .as_ref()
        .map(|data| data.resources())
        .unwrap_or_default()
}

/// Find an `included` entry by type and id.
///
/// # Examples
///
/// ```
/// use compound::v1::{Document, query};
///
/// let doc = Document::from_json(
///     r#"{"data":null,"included":[{"type":"people","id":"9"}]}"#,
/// ).unwrap();
/// assert!(query::find_included(&doc, "people", "9").is_some());
/// assert!(query::find_included(&doc, "people", "10").is_none());
/// ```
pub fn find_included<'a>(doc: &'a Document, resource_type: &str, id: &str) -> Option<&'a ResourceObject> {
    doc.included
        .iter()
        .find(|r| r.resource_type == resource_type && r.id.as_deref() == Some(id))
}

/// Keys that occur more than once in `included`, each reported once, in
/// order of their second occurrence.
///
/// A document produced by the encoder always yields an empty list.
///
/// # Examples
///
/// ```
/// use compound::v1::{Document, query};
///
/// let doc = Document::from_json(
///     r#"{"data":[],"included":[{"type":"a","id":"1"},{"type":"a","id":"1"}]}"#,
/// ).unwrap();
/// let dups = query::duplicate_included(&doc);
/// assert_eq!(dups.len(), 1);
/// assert_eq!(dups[0].to_string(), "a:1");
/// ```
pub fn duplicate_included(doc: &Document) -> Vec<ResourceKey> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();
    for key in doc.included.iter().map(object_key) {
        if !seen.insert(key.clone()) && reported.insert(key.clone()) {
            duplicates.push(key);
        }
    }
    duplicates
}

/// Linkage in `included` resources that points at nothing in the document.
///
/// Only `included` entries are checked: linkage from primary data may
/// legitimately point outside a document with no include paths.
pub fn unresolved_linkage(doc: &Document) -> Vec<ResourceKey> {
    let present: HashSet<ResourceKey> = primary_resources(doc)
        .into_iter()
        .chain(doc.included.iter())
        .map(object_key)
        .collect();

    let mut reported = HashSet::new();
    let mut unresolved = Vec::new();
    for resource in &doc.included {
        let Some(relationships) = &resource.relationships else {
            continue;
        };
        for relationship in relationships.values() {
            let Some(linkage) = &relationship.data else {
                continue;
            };
            for identifier in linkage.identifiers() {
                let key = identifier_key(identifier);
                if !present.contains(&key) && reported.insert(key.clone()) {
                    unresolved.push(key);
                }
            }
        }
    }
    unresolved
}
