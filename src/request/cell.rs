//! Single-slot request identity cache.
//!
//! Re-render-driven callers rebuild their inputs as fresh values on every
//! pass, so a freshly built [`Request`] cannot be compared by reference.
//! [`RequestCell`] closes that gap: it rebuilds on every call but hands back
//! the previously produced `Arc` whenever the key is unchanged, so
//! downstream lifecycle logic can treat "did the request change" as a
//! pointer-identity question.
//!
//! The cell holds exactly one slot. It debounces spurious re-derivation at a
//! single call site; request-level caching belongs to the execution engine.

use std::sync::Arc;

use crate::error::RequestError;
use crate::request::{FragmentMap, QuerySource, Request};

/// One-slot memoization cell for [`Request`] values.
#[derive(Debug, Default)]
pub struct RequestCell {
    slot: Option<Arc<Request>>,
}

impl RequestCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request and stabilizes its identity.
    ///
    /// The builder always runs; if the fresh request's key matches the
    /// retained one, the fresh instance is discarded and the retained `Arc`
    /// is returned unchanged.
    ///
    /// # Errors
    ///
    /// Propagates [`RequestError`] from request construction. The retained
    /// slot is left untouched on error.
    pub fn stable(
        &mut self,
        query: impl Into<QuerySource>,
        variables: Option<serde_json::Value>,
        fragments: Option<&FragmentMap>,
    ) -> Result<Arc<Request>, RequestError> {
        let fresh = Request::new(query, variables, fragments)?;

        if let Some(retained) = &self.slot
            && retained.key() == fresh.key()
        {
            return Ok(Arc::clone(retained));
        }

        let fresh = Arc::new(fresh);
        self.slot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const QUERY: &str = "query Todo($id: ID!) { todo(id: $id) { id } }";

    #[test]
    fn test_equal_inputs_return_the_same_reference() {
        let mut cell = RequestCell::new();
        // Fresh string and value instances on every call, like a re-render.
        let first = cell
            .stable(QUERY.to_owned(), Some(json!({ "id": 1 })), None)
            .unwrap();
        let second = cell
            .stable(QUERY.to_owned(), Some(json!({ "id": 1 })), None)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_changed_variables_return_a_new_reference() {
        let mut cell = RequestCell::new();
        let first = cell.stable(QUERY, Some(json!({ "id": 1 })), None).unwrap();
        let second = cell.stable(QUERY, Some(json!({ "id": 2 })), None).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn test_single_slot_does_not_remember_older_requests() {
        let mut cell = RequestCell::new();
        let first = cell.stable(QUERY, Some(json!({ "id": 1 })), None).unwrap();
        cell.stable(QUERY, Some(json!({ "id": 2 })), None).unwrap();
        let third = cell.stable(QUERY, Some(json!({ "id": 1 })), None).unwrap();
        // Same key as the first call, but the slot has moved on since.
        assert_eq!(first.key(), third.key());
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_build_error_leaves_the_slot_untouched() {
        let mut cell = RequestCell::new();
        let first = cell.stable(QUERY, None, None).unwrap();
        assert!(cell.stable("query {", None, None).is_err());
        let second = cell.stable(QUERY, None, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
