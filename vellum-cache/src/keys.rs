//! Cache key registry.
//!
//! One place that maps a logical query ("folders of project X") to its
//! canonical [`ResourceScope`]. Views use it to subscribe to cached data and
//! the mutation coordinator uses it to decide what goes stale.

use crate::scope::{ResourceScope, ResourceType};

/// A logical cache query with its parameters in declared order.
///
/// Each variant fixes both the resource type and the parameter list, so a
/// scope with the wrong arity or ordering cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeQuery<'a> {
    /// All folders of a project.
    Folders { project_ref: &'a str },
    /// Folders nested directly under `folder_id`.
    FolderContents {
        project_ref: &'a str,
        folder_id: &'a str,
    },
    /// Every content item of a project.
    Contents { project_ref: &'a str },
    /// A single content item.
    ContentItem { project_ref: &'a str, id: &'a str },
    /// Aggregate content counts for a project.
    ContentCount { project_ref: &'a str },
}

impl ScopeQuery<'_> {
    /// The resource family this query reads.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ScopeQuery::Folders { .. } | ScopeQuery::FolderContents { .. } => {
                ResourceType::Folders
            }
            ScopeQuery::Contents { .. } => ResourceType::Contents,
            ScopeQuery::ContentItem { .. } => ResourceType::ContentItem,
            ScopeQuery::ContentCount { .. } => ResourceType::ContentCount,
        }
    }
}

/// Produce the canonical scope for a query. Pure.
pub fn scope_for(query: ScopeQuery<'_>) -> ResourceScope {
    let segments = match query {
        ScopeQuery::Folders { project_ref }
        | ScopeQuery::Contents { project_ref }
        | ScopeQuery::ContentCount { project_ref } => vec![project_ref.to_string()],
        ScopeQuery::FolderContents {
            project_ref,
            folder_id,
        } => vec![project_ref.to_string(), folder_id.to_string()],
        ScopeQuery::ContentItem { project_ref, id } => {
            vec![project_ref.to_string(), id.to_string()]
        }
    };
    ResourceScope::new(query.resource_type(), segments)
}

/// Named constructors for the content family of scopes.
pub struct ContentKeys;

impl ContentKeys {
    pub fn folders(project_ref: &str) -> ResourceScope {
        scope_for(ScopeQuery::Folders { project_ref })
    }

    pub fn folder_contents(project_ref: &str, folder_id: &str) -> ResourceScope {
        scope_for(ScopeQuery::FolderContents {
            project_ref,
            folder_id,
        })
    }

    pub fn contents(project_ref: &str) -> ResourceScope {
        scope_for(ScopeQuery::Contents { project_ref })
    }

    pub fn content_item(project_ref: &str, id: &str) -> ResourceScope {
        scope_for(ScopeQuery::ContentItem { project_ref, id })
    }

    pub fn content_count(project_ref: &str) -> ResourceScope {
        scope_for(ScopeQuery::ContentCount { project_ref })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folders_scope_shape() {
        let scope = ContentKeys::folders("proj1");
        assert_eq!(scope.resource_type(), ResourceType::Folders);
        assert_eq!(scope.segments(), ["proj1".to_string()]);
        assert_eq!(scope.to_string(), "folders/proj1");
    }

    #[test]
    fn test_folder_contents_under_folders_prefix() {
        let coarse = ContentKeys::folders("proj1");
        let nested = ContentKeys::folder_contents("proj1", "parentX");
        assert!(coarse.covers(&nested));
    }

    #[test]
    fn test_folders_does_not_cover_contents() {
        let folders = ContentKeys::folders("proj1");
        assert!(!folders.covers(&ContentKeys::contents("proj1")));
        assert!(!folders.covers(&ContentKeys::content_count("proj1")));
        assert!(!folders.covers(&ContentKeys::content_item("proj1", "f1")));
    }

    #[test]
    fn test_helpers_match_scope_for() {
        assert_eq!(
            ContentKeys::content_item("p", "i"),
            scope_for(ScopeQuery::ContentItem {
                project_ref: "p",
                id: "i"
            })
        );
    }
}
