//! Dynamic permission source.
//!
//! The access decision consults an in-memory [`PermissionIndex`] mapping
//! URL patterns to the role names allowed through. The index is rebuilt
//! from the `resources` ↔ `roles` relations in the database and installed
//! atomically: readers take an `Arc` snapshot, so an in-flight request
//! always sees either the old or the new complete rule set, never a mix.
//!
//! ```text
//! ┌──────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  Request  │───→│ authorize layer  │───→│ PermissionIndex │
//! │ (roles)   │    │ (middleware)     │    │ (Arc snapshot)  │
//! └──────────┘    └──────────────────┘    └────────┬────────┘
//!                                                  │ reload
//!                                         ┌────────▼────────┐
//!                                         │    Database      │
//!                                         │ (resources,      │
//!                                         │  role_resources) │
//!                                         └─────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::Method;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::sync::RwLock;

use crate::error::PalisadeError;
use crate::models::resource::Entity as Resource;
use crate::models::role::{self, Entity as Role};
use crate::models::role_resource::Entity as RoleResource;

/// A URL pattern with wildcard segments.
///
/// `*` matches exactly one path segment; a terminal `**` matches any
/// remainder (including nothing). `/api/users/*` matches `/api/users/5`
/// but not `/api/users/5/roles`; `/api/users/**` matches both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
    Rest,
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl PathPattern {
    /// Parse a pattern string. `**` terminates the pattern; segments after
    /// it would be unreachable and are dropped.
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        for part in split_path(pattern) {
            match part {
                "**" => {
                    segments.push(Segment::Rest);
                    break;
                }
                "*" => segments.push(Segment::Any),
                lit => segments.push(Segment::Literal(lit.to_string())),
            }
        }
        PathPattern {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Test a request path against this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let parts = split_path(path);
        let mut i = 0;
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Any => {
                    if i >= parts.len() {
                        return false;
                    }
                    i += 1;
                }
                Segment::Literal(lit) => {
                    if parts.get(i).copied() != Some(lit.as_str()) {
                        return false;
                    }
                    i += 1;
                }
            }
        }
        i == parts.len()
    }

    /// Ordering key for longest-most-specific-match-wins: more literal
    /// segments beat fewer; ties prefer bounded patterns (no `**`); then
    /// longer patterns.
    fn specificity(&self) -> (usize, usize, usize) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let bounded = usize::from(!self.segments.iter().any(|s| matches!(s, Segment::Rest)));
        (literals, bounded, self.segments.len())
    }
}

/// One configured rule: pattern + optional method restriction + the roles
/// permitted through it.
#[derive(Debug, Clone)]
struct Rule {
    pattern: PathPattern,
    method: Option<Method>,
    roles: HashSet<String>,
}

/// Immutable snapshot of all access rules.
#[derive(Debug, Clone, Default)]
pub struct PermissionIndex {
    rules: Vec<Rule>,
}

impl PermissionIndex {
    /// An index with no rules; under the fail-closed default policy this
    /// denies everything outside the public list.
    pub fn empty() -> Self {
        PermissionIndex::default()
    }

    /// Build an index from `(pattern, method, role)` rows, merging the
    /// role sets of rows that share a pattern and method.
    pub fn build(rows: Vec<(String, Option<String>, String)>) -> Self {
        let mut grouped: HashMap<(String, Option<String>), HashSet<String>> = HashMap::new();
        for (pattern, method, role) in rows {
            grouped.entry((pattern, method)).or_default().insert(role);
        }

        let rules = grouped
            .into_iter()
            .map(|((pattern, method), roles)| Rule {
                pattern: PathPattern::parse(&pattern),
                method: method.as_deref().and_then(parse_method),
                roles,
            })
            .collect();

        PermissionIndex { rules }
    }

    /// Number of distinct rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the required role set for a request, if any rule matches.
    ///
    /// The most specific matching pattern wins; at equal pattern
    /// specificity a method-restricted rule beats an any-method rule.
    pub fn required_roles(&self, path: &str, method: &Method) -> Option<&HashSet<String>> {
        self.rules
            .iter()
            .filter(|r| r.method.as_ref().map_or(true, |m| m == method))
            .filter(|r| r.pattern.matches(path))
            .max_by_key(|r| (r.pattern.specificity(), r.method.is_some()))
            .map(|r| &r.roles)
    }
}

/// An unparseable method column narrows the rule to no method at all,
/// which would silently unprotect the pattern; any-method is the
/// fail-closed reading.
fn parse_method(value: &str) -> Option<Method> {
    match Method::from_bytes(value.trim().to_uppercase().as_bytes()) {
        Ok(m) => Some(m),
        Err(_) => {
            tracing::warn!(method = value, "unrecognized method in resource rule, treating as any");
            None
        }
    }
}

/// The role-intersection gate: access requires a non-empty intersection
/// between the rule's role set and the principal's granted roles.
pub fn roles_intersect(required: &HashSet<String>, granted: &[String]) -> bool {
    granted.iter().any(|r| required.contains(r))
}

/// Shared handle to the current permission index.
///
/// `reload` rebuilds from the database and swaps the snapshot in one
/// assignment under a briefly-held write lock; `snapshot` clones the
/// `Arc` under the read lock. Readers never block on a rebuild in
/// progress and never observe a partially-built index.
#[derive(Clone)]
pub struct PermissionSource {
    inner: Arc<RwLock<Arc<PermissionIndex>>>,
}

impl PermissionSource {
    /// Create a source holding an empty index.
    pub fn new() -> Self {
        PermissionSource {
            inner: Arc::new(RwLock::new(Arc::new(PermissionIndex::empty()))),
        }
    }

    /// The current read-only snapshot.
    pub async fn snapshot(&self) -> Arc<PermissionIndex> {
        self.inner.read().await.clone()
    }

    /// Install a pre-built index (tests, bootstrap).
    pub async fn install(&self, index: PermissionIndex) {
        *self.inner.write().await = Arc::new(index);
    }

    /// Re-read the resource ↔ role relations and atomically replace the
    /// snapshot. Disabled or soft-deleted roles contribute no rules.
    ///
    /// Returns the number of rules in the new index. A store error leaves
    /// the previous snapshot in place.
    pub async fn reload(&self, db: &DatabaseConnection) -> Result<usize, PalisadeError> {
        let active_roles: HashMap<i32, String> = Role::find()
            .filter(role::Column::Status.eq(true))
            .filter(role::Column::Del.eq(false))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();

        let links = RoleResource::find().find_also_related(Resource).all(db).await?;

        let mut rows = Vec::with_capacity(links.len());
        for (link, resource) in links {
            let Some(resource) = resource else { continue };
            let Some(role_name) = active_roles.get(&link.role_id) else {
                continue;
            };
            rows.push((resource.pattern, resource.method, role_name.clone()));
        }

        let index = PermissionIndex::build(rows);
        let count = index.len();
        *self.inner.write().await = Arc::new(index);
        tracing::info!(rules = count, "permission index reloaded");
        Ok(count)
    }
}

impl Default for PermissionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn literal_pattern_matches_exactly() {
        let p = PathPattern::parse("/api/users");
        assert!(p.matches("/api/users"));
        assert!(p.matches("/api/users/")); // trailing slash
        assert!(!p.matches("/api/users/5"));
        assert!(!p.matches("/api"));
    }

    #[test]
    fn single_wildcard_matches_one_segment() {
        let p = PathPattern::parse("/api/users/*");
        assert!(p.matches("/api/users/5"));
        assert!(!p.matches("/api/users"));
        assert!(!p.matches("/api/users/5/roles"));
    }

    #[test]
    fn rest_wildcard_matches_any_remainder() {
        let p = PathPattern::parse("/api/users/**");
        assert!(p.matches("/api/users"));
        assert!(p.matches("/api/users/5"));
        assert!(p.matches("/api/users/5/roles"));
        assert!(!p.matches("/api/roles"));
    }

    #[test]
    fn most_specific_pattern_wins() {
        let index = PermissionIndex::build(vec![
            ("/api/**".to_string(), None, "VIEWER".to_string()),
            ("/api/users/*".to_string(), None, "ADMIN".to_string()),
            ("/api/users/export".to_string(), None, "AUDITOR".to_string()),
        ]);

        let get = Method::GET;
        assert_eq!(
            index.required_roles("/api/users/5", &get),
            Some(&roles(&["ADMIN"]))
        );
        assert_eq!(
            index.required_roles("/api/users/export", &get),
            Some(&roles(&["AUDITOR"]))
        );
        assert_eq!(
            index.required_roles("/api/roles", &get),
            Some(&roles(&["VIEWER"]))
        );
        assert_eq!(index.required_roles("/metrics", &get), None);
    }

    #[test]
    fn method_restricted_rule_beats_any_method_at_same_pattern() {
        let index = PermissionIndex::build(vec![
            ("/api/users".to_string(), None, "VIEWER".to_string()),
            ("/api/users".to_string(), Some("POST".to_string()), "ADMIN".to_string()),
        ]);

        assert_eq!(
            index.required_roles("/api/users", &Method::POST),
            Some(&roles(&["ADMIN"]))
        );
        assert_eq!(
            index.required_roles("/api/users", &Method::GET),
            Some(&roles(&["VIEWER"]))
        );
    }

    #[test]
    fn rows_sharing_a_rule_merge_their_roles() {
        let index = PermissionIndex::build(vec![
            ("/api/users".to_string(), None, "ADMIN".to_string()),
            ("/api/users".to_string(), None, "AUDITOR".to_string()),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.required_roles("/api/users", &Method::GET),
            Some(&roles(&["ADMIN", "AUDITOR"]))
        );
    }

    #[test]
    fn intersection_gate() {
        let required = roles(&["ADMIN", "AUDITOR"]);
        assert!(roles_intersect(&required, &["EDITOR".into(), "ADMIN".into()]));
        assert!(!roles_intersect(&required, &["EDITOR".into()]));
        assert!(!roles_intersect(&required, &[]));
    }

    #[tokio::test]
    async fn snapshot_survives_a_swap() {
        let source = PermissionSource::new();
        source
            .install(PermissionIndex::build(vec![(
                "/api/a".to_string(),
                None,
                "A".to_string(),
            )]))
            .await;

        // A reader holding the old snapshot keeps a complete rule set
        // even after a new index is installed.
        let before = source.snapshot().await;
        source
            .install(PermissionIndex::build(vec![(
                "/api/b".to_string(),
                None,
                "B".to_string(),
            )]))
            .await;

        assert!(before.required_roles("/api/a", &Method::GET).is_some());
        assert!(before.required_roles("/api/b", &Method::GET).is_none());

        let after = source.snapshot().await;
        assert!(after.required_roles("/api/a", &Method::GET).is_none());
        assert!(after.required_roles("/api/b", &Method::GET).is_some());
    }

    #[tokio::test]
    async fn concurrent_readers_never_see_a_torn_index() {
        let source = PermissionSource::new();
        source
            .install(PermissionIndex::build(vec![
                ("/api/a".to_string(), None, "A".to_string()),
                ("/api/b".to_string(), None, "A".to_string()),
            ]))
            .await;

        let reader = {
            let source = source.clone();
            tokio::spawn(async move {
                for _ in 0..1000 {
                    let snap = source.snapshot().await;
                    // Each snapshot holds both rules or both replacements,
                    // never one of each.
                    let a = snap.required_roles("/api/a", &Method::GET).is_some();
                    let b = snap.required_roles("/api/b", &Method::GET).is_some();
                    assert_eq!(a, b);
                }
            })
        };

        let writer = {
            let source = source.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    let (pa, pb) = if i % 2 == 0 {
                        ("/api/a", "/api/b")
                    } else {
                        ("/api/x", "/api/y")
                    };
                    source
                        .install(PermissionIndex::build(vec![
                            (pa.to_string(), None, "A".to_string()),
                            (pb.to_string(), None, "A".to_string()),
                        ]))
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };

        reader.await.unwrap();
        writer.await.unwrap();
    }
}
