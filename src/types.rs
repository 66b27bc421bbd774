//! Plain Rust shapes for protocol results.
//!
//! Handlers work with `serde_json::Value` state; the server encodes these
//! into the protobuf messages.

use serde::{Deserialize, Serialize};

use crate::schema::Diagnostic;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// An attribute that is set for the first time.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// An attribute that goes away.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// An attribute whose value changes.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

// Absent sides travel as empty bytes.
fn side_bytes(side: Option<serde_json::Value>) -> Vec<u8> {
    side.and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: side_bytes(change.before),
            after: side_bytes(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with the given changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// The result of reading a resource back from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// The refreshed state, or `None` when the resource no longer exists.
    pub state: Option<serde_json::Value>,
    /// Non-fatal findings, such as processor types this provider does not know.
    pub diagnostics: Vec<Diagnostic>,
}

impl ReadResult {
    /// A resource that still exists.
    pub fn found(state: serde_json::Value, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            state: Some(state),
            diagnostics,
        }
    }

    /// A resource that is gone and must be removed from state.
    pub fn gone() -> Self {
        Self {
            state: None,
            diagnostics: Vec::new(),
        }
    }
}

/// State handed back by ImportResourceState.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Pair a resource type with the state its import produced.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Plan receives a null proposed state for destroys.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix printed on stdout when the server is ready.
pub const HANDSHAKE_PREFIX: &str = "TSUGA_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", serde_json::json!("payments"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(serde_json::json!("payments")));

        let removed = AttributeChange::removed("name", serde_json::json!("old"));
        assert_eq!(removed.before, Some(serde_json::json!("old")));
        assert!(removed.after.is_none());

        let modified =
            AttributeChange::modified("priority", serde_json::json!(1), serde_json::json!(2));
        assert_eq!(modified.before, Some(serde_json::json!(1)));
        assert_eq!(modified.after, Some(serde_json::json!(2)));
    }

    #[test]
    fn test_attribute_change_encodes_absent_side_as_empty() {
        let proto: crate::generated::AttributeChange =
            AttributeChange::added("query", serde_json::json!("service:api")).into();
        assert_eq!(proto.path, "query");
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, br#""service:api""#.to_vec());

        let proto: crate::generated::AttributeChange =
            AttributeChange::removed("owner", serde_json::json!("team-1")).into();
        assert_eq!(proto.before, br#""team-1""#.to_vec());
        assert!(proto.after.is_empty());
    }

    #[test]
    fn test_plan_result() {
        let plan = PlanResult::with_changes(
            serde_json::json!({"id": "team-1", "name": "new"}),
            vec![AttributeChange::modified(
                "name",
                serde_json::json!("old"),
                serde_json::json!("new"),
            )],
            false,
        );
        assert_eq!(plan.changes.len(), 1);
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_read_result() {
        let found = ReadResult::found(serde_json::json!({"id": "r-1"}), vec![]);
        assert!(found.state.is_some());

        let gone = ReadResult::gone();
        assert!(gone.state.is_none());
        assert!(gone.diagnostics.is_empty());
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("tsuga_team", serde_json::json!({"id": "team-1"}));
        assert_eq!(imported.resource_type, "tsuga_team");
        assert_eq!(imported.state["id"], "team-1");
    }
}
