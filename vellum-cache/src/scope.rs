//! Resource scopes: the structured keys the read cache is addressed by.
//!
//! A scope is a resource type tag followed by an ordered list of segments,
//! always rooted at the project reference. Scopes compare by prefix, so the
//! coarse `(folders, proj)` scope covers `(folders, proj, folderX)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource families the cache knows about.
///
/// Closed at compile time; every variant has a stable tag and a fixed
/// number of parameters (see [`crate::keys::ScopeQuery`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// Folder listings of a project (and, one level deeper, of a parent folder).
    Folders,
    /// Contents of the project's content tree.
    Contents,
    /// A single content item.
    ContentItem,
    /// Aggregate content counts.
    ContentCount,
}

impl ResourceType {
    /// Stable tag used when rendering a scope.
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceType::Folders => "folders",
            ResourceType::Contents => "content",
            ResourceType::ContentItem => "content-item",
            ResourceType::ContentCount => "content-count",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A canonical cache scope.
///
/// Construction goes through [`crate::keys::scope_for`] (or the
/// [`crate::keys::ContentKeys`] helpers) so identical logical inputs always
/// produce identical values; equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceScope {
    resource_type: ResourceType,
    segments: Vec<String>,
}

impl ResourceScope {
    pub(crate) fn new(resource_type: ResourceType, segments: Vec<String>) -> Self {
        Self {
            resource_type,
            segments,
        }
    }

    /// The resource family this scope belongs to.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Ordered scoping parameters, project reference first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The project this scope is rooted at.
    pub fn project_ref(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Returns true if invalidating `self` must also invalidate `other`.
    ///
    /// Holds when both share a resource type and `self`'s segments are a
    /// leading subsequence of `other`'s. Every scope covers itself.
    pub fn covers(&self, other: &ResourceScope) -> bool {
        self.resource_type == other.resource_type
            && self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type.tag())?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(resource_type: ResourceType, segments: &[&str]) -> ResourceScope {
        ResourceScope::new(
            resource_type,
            segments.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_scope_covers_itself() {
        let s = scope(ResourceType::Folders, &["proj1"]);
        assert!(s.covers(&s));
    }

    #[test]
    fn test_coarse_scope_covers_narrower() {
        let coarse = scope(ResourceType::Folders, &["proj1"]);
        let narrow = scope(ResourceType::Folders, &["proj1", "parentX"]);
        assert!(coarse.covers(&narrow));
        assert!(!narrow.covers(&coarse));
    }

    #[test]
    fn test_other_project_not_covered() {
        let a = scope(ResourceType::Folders, &["proj1"]);
        let b = scope(ResourceType::Folders, &["proj2", "parentX"]);
        assert!(!a.covers(&b));
    }

    #[test]
    fn test_other_resource_type_not_covered() {
        let folders = scope(ResourceType::Folders, &["proj1"]);
        let contents = scope(ResourceType::Contents, &["proj1"]);
        assert!(!folders.covers(&contents));
    }

    #[test]
    fn test_display() {
        let s = scope(ResourceType::ContentItem, &["proj1", "item9"]);
        assert_eq!(s.to_string(), "content-item/proj1/item9");
        assert_eq!(s.project_ref(), Some("proj1"));
    }
}
