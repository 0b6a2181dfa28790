//! Sparse fieldset filtering of attributes and relationships.

use crate::error::Result;
use crate::position::Position;
use crate::resource::{FieldSets, Relationship, Resource};
use serde_json::Value;
use std::collections::BTreeSet;

/// Sparse fieldset filtering.
///
/// Types without an entry are unrestricted. Field sets only decide what is
/// written; include-path walking ignores them.
#[derive(Debug, Clone, Default)]
pub struct FieldSetFilter {
    field_sets: FieldSets,
}

impl FieldSetFilter {
    pub fn new(field_sets: FieldSets) -> Self {
        Self { field_sets }
    }

    pub fn field_sets(&self) -> &FieldSets {
        &self.field_sets
    }

    pub fn has_filter(&self, resource_type: &str) -> bool {
        self.field_sets.contains_key(resource_type)
    }

    pub fn allowed_fields(&self, resource_type: &str) -> Option<&BTreeSet<String>> {
        self.field_sets.get(resource_type)
    }

    pub fn is_allowed(&self, resource_type: &str, field: &str) -> bool {
        self.allowed_fields(resource_type)
            .is_none_or(|fields| fields.contains(field))
    }

    /// The resource's attributes that survive the filter, in schema order.
    pub fn attributes<'r>(&self, resource: &'r Resource<'_>) -> Result<Vec<&'r (String, Value)>> {
        Ok(self.filter_attributes(resource.resource_type(), resource.attributes()?))
    }

    pub fn filter_attributes<'a>(
        &self,
        resource_type: &str,
        attributes: &'a [(String, Value)],
    ) -> Vec<&'a (String, Value)> {
        attributes
            .iter()
            .filter(|(name, _)| self.is_allowed(resource_type, name))
            .collect()
    }

    /// The resource's relationships that survive the filter, in schema order.
    pub fn relationships<'r, 's>(
        &self,
        resource: &'r Resource<'s>,
    ) -> Result<Vec<&'r Relationship<'s>>> {
        let resource_type = resource.resource_type();
        Ok(resource
            .relationships()?
            .iter()
            .filter(|relationship| self.is_allowed(resource_type, relationship.name()))
            .collect())
    }

    /// Whether a resource reached at `position` should be written.
    ///
    /// False when the parent's field set leaves out the relationship that
    /// led here, even though the include path walked it.
    pub fn should_output_relationship(&self, position: &Position) -> bool {
        match (position.parent_type(), position.parent_relationship()) {
            (Some(parent_type), Some(relationship)) => self.is_allowed(parent_type, relationship),
            _ => true,
        }
    }
}
