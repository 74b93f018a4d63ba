//! Shared session context snapshots.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last-known shared session state reported by the embedded peer.
///
/// Field payloads are deliberately schema-free: the protocol makes no
/// assumption about what a user or participant looks like.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// The user the session runs on behalf of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    /// Current session participants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Value>,
    /// Current session facilitators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facilitators: Vec<Value>,
}

/// Holder for the current [`SessionContext`] snapshot.
///
/// Snapshots are immutable once published; an update replaces the whole
/// snapshot rather than merging into it. Readers observing `None` have not
/// seen the handshake yet.
#[derive(Debug, Default)]
pub struct ContextCell {
    current: RwLock<Option<Arc<SessionContext>>>,
}

impl ContextCell {
    /// Create an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot, or `None` before the first handshake.
    #[must_use]
    pub fn current(&self) -> Option<Arc<SessionContext>> {
        self.current.read().unwrap().clone()
    }

    /// Replace the snapshot wholesale.
    ///
    /// Returns the previous and new snapshot references so callers can emit
    /// a change notification carrying both.
    pub fn replace(
        &self,
        context: SessionContext,
    ) -> (Option<Arc<SessionContext>>, Arc<SessionContext>) {
        let next = Arc::new(context);
        let mut slot = self.current.write().unwrap();
        let previous = slot.replace(Arc::clone(&next));
        (previous, next)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_replace_returns_previous_and_new() {
        let cell = ContextCell::new();
        assert!(cell.current().is_none());

        let (previous, current) = cell.replace(SessionContext {
            user: Some(json!({"name": "avery"})),
            ..SessionContext::default()
        });
        assert!(previous.is_none());
        assert_eq!(current.user, Some(json!({"name": "avery"})));

        let (previous, _) = cell.replace(SessionContext::default());
        assert_eq!(previous.unwrap().user, Some(json!({"name": "avery"})));
        assert!(cell.current().unwrap().user.is_none());
    }

    #[test]
    fn test_old_snapshot_survives_replacement() {
        let cell = ContextCell::new();
        let (_, first) = cell.replace(SessionContext {
            participants: vec![json!("p1")],
            ..SessionContext::default()
        });
        cell.replace(SessionContext::default());

        // Holders of the previous snapshot still read its original state.
        assert_eq!(first.participants, vec![json!("p1")]);
    }

    #[test]
    fn test_deserialize_with_absent_fields() {
        let context: SessionContext = serde_json::from_str("{}").unwrap();
        assert!(context.user.is_none());
        assert!(context.participants.is_empty());
        assert!(context.facilitators.is_empty());
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let json = serde_json::to_string(&SessionContext::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
