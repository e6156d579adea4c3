//! Expansion of root scopes into candidate item ids.
//!
//! The hierarchy itself belongs to the book; the resolver only asks it which
//! ids are reachable from a root through the [`Reachability`] trait.

use crate::query::Scope;
use crate::types::ROOT_ID;
use std::collections::HashSet;

/// Answers "which items lie under this root".
///
/// Implementations return the root itself followed by everything
/// transitively reachable from it, in a stable order.
pub trait Reachability {
    fn reachable(&self, root: &str) -> Vec<String>;
}

impl<F> Reachability for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn reachable(&self, root: &str) -> Vec<String> {
        self(root)
    }
}

/// Resolve a root scope into the pool of candidate ids.
///
/// The pool is everything reachable from the included roots (the whole book
/// when none are given) minus everything reachable from the excluded roots.
/// Ids keep the order in which they were first reached.
pub fn resolve_roots(scope: &Scope, reachability: &dyn Reachability) -> Vec<String> {
    let default_roots = [ROOT_ID.to_string()];
    let include: &[String] = if scope.include.is_empty() {
        &default_roots
    } else {
        &scope.include
    };

    let excluded: HashSet<String> = scope
        .exclude
        .iter()
        .flat_map(|root| reachability.reachable(root))
        .collect();

    let mut seen = HashSet::new();
    include
        .iter()
        .flat_map(|root| reachability.reachable(root))
        .filter(|id| !excluded.contains(id) && seen.insert(id.clone()))
        .collect()
}
