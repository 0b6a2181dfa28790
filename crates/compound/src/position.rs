//! Traversal positions and include-path normalization.

use std::collections::BTreeSet;

/// Separator between relationship names in an include path.
pub const PATH_SEPARATOR: char = '.';

/// Where a node sits in the traversal.
///
/// The root has level 0 and an empty path. Every step down a relationship
/// appends the relationship name to the path and records the parent's type.
///
/// ```
/// use compound::v1::Position;
///
/// let root = Position::root();
/// let author = root.child("posts", "comments").child("comments", "author");
/// assert_eq!(author.level(), 2);
/// assert_eq!(author.path(), "comments.author");
/// assert_eq!(author.parent_type(), Some("comments"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    level: usize,
    path: String,
    parent_type: Option<String>,
    parent_relationship: Option<String>,
}

impl Position {
    pub fn root() -> Self {
        Self {
            level: 0,
            path: String::new(),
            parent_type: None,
            parent_relationship: None,
        }
    }

    /// Position reached by following `relationship` from a resource of
    /// `parent_type` sitting at `self`.
    pub fn child(&self, parent_type: &str, relationship: &str) -> Self {
        let path = if self.path.is_empty() {
            relationship.to_string()
        } else {
            format!("{}{}{}", self.path, PATH_SEPARATOR, relationship)
        };
        Self {
            level: self.level + 1,
            path,
            parent_type: Some(parent_type.to_string()),
            parent_relationship: Some(relationship.to_string()),
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent_type(&self) -> Option<&str> {
        self.parent_type.as_deref()
    }

    pub fn parent_relationship(&self) -> Option<&str> {
        self.parent_relationship.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.level == 0
    }
}

/// A normalized set of include paths.
///
/// Every requested path is expanded into all of its prefixes, so
/// `"comments.author"` also includes `"comments"`. Membership is then a
/// plain set lookup at any depth.
///
/// ```
/// use compound::v1::IncludePaths;
///
/// let paths = IncludePaths::normalize(["comments.author"]);
/// assert!(paths.contains("comments"));
/// assert!(paths.contains("comments.author"));
/// assert!(!paths.contains("author"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludePaths {
    paths: BTreeSet<String>,
}

impl IncludePaths {
    pub fn normalize<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = BTreeSet::new();
        for path in paths {
            let mut prefix = String::new();
            for segment in path.as_ref().split(PATH_SEPARATOR).map(str::trim) {
                // "a..b" or a trailing dot cuts the path short
                if segment.is_empty() {
                    break;
                }
                if !prefix.is_empty() {
                    prefix.push(PATH_SEPARATOR);
                }
                prefix.push_str(segment);
                normalized.insert(prefix.clone());
            }
        }
        Self { paths: normalized }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}
