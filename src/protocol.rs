//! Model exchange protocol — the messages crossing the core boundary.
//!
//! Two coarse-grained messages flow out to the renderer/host: a full result
//! for the whole workspace and a per-file update to be diffed against
//! previous state. One message flows in: a node edit carrying a component
//! location and a flat bag of new field values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::graph::GraphPayload;
use crate::model::MemberKind;

/// Core → renderer/host messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModelMessage {
    /// All currently known nodes and links for the whole workspace.
    #[serde(rename_all = "camelCase")]
    FullResult { payload: GraphPayload },

    /// Nodes and links recomputed for one changed path. An empty payload
    /// means the path no longer contributes anything.
    #[serde(rename_all = "camelCase")]
    FileUpdate { path: PathBuf, payload: GraphPayload },

    /// A file failed to parse; its contribution is now empty. Reported
    /// once, never retried.
    #[serde(rename_all = "camelCase")]
    ParseFailure { path: PathBuf, message: String },
}

/// Identifies one declaration by its ownership chain: declaration kind,
/// owning type identity, and index chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "camelCase")]
pub enum ComponentLocation {
    #[serde(rename_all = "camelCase")]
    Type { namespace: String, name: String },

    #[serde(rename_all = "camelCase")]
    Member {
        namespace: String,
        type_name: String,
        member_kind: MemberKind,
        index: u32,
    },

    #[serde(rename_all = "camelCase")]
    Parameter {
        namespace: String,
        type_name: String,
        member_kind: MemberKind,
        index: u32,
        parameter_index: u32,
    },

    #[serde(rename_all = "camelCase")]
    Statement {
        namespace: String,
        type_name: String,
        member_kind: MemberKind,
        index: u32,
        /// Present when the statement lives in a property accessor body.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accessor_index: Option<u32>,
        statement_index: u32,
    },
}

impl ComponentLocation {
    /// The `(namespace, name)` identity of the owning type.
    pub fn type_identity(&self) -> (&str, &str) {
        match self {
            ComponentLocation::Type { namespace, name } => (namespace, name),
            ComponentLocation::Member {
                namespace,
                type_name,
                ..
            }
            | ComponentLocation::Parameter {
                namespace,
                type_name,
                ..
            }
            | ComponentLocation::Statement {
                namespace,
                type_name,
                ..
            } => (namespace, type_name),
        }
    }
}

impl fmt::Display for ComponentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentLocation::Type { namespace, name } => {
                if namespace.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{namespace}.{name}")
                }
            }
            ComponentLocation::Member {
                namespace,
                type_name,
                member_kind,
                index,
            } => write!(f, "{namespace}.{type_name}.{member_kind}.{index}"),
            ComponentLocation::Parameter {
                namespace,
                type_name,
                member_kind,
                index,
                parameter_index,
            } => write!(
                f,
                "{namespace}.{type_name}.{member_kind}.{index}.{parameter_index}"
            ),
            ComponentLocation::Statement {
                namespace,
                type_name,
                member_kind,
                index,
                accessor_index,
                statement_index,
            } => match accessor_index {
                Some(accessor) => write!(
                    f,
                    "{namespace}.{type_name}.{member_kind}.{index}.{accessor}:{statement_index}"
                ),
                None => write!(
                    f,
                    "{namespace}.{type_name}.{member_kind}.{index}:{statement_index}"
                ),
            },
        }
    }
}

/// Renderer → core: mutate the fields of one declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEdit {
    pub location: ComponentLocation,
    /// Flat bag of new field values, keyed by field name (`name`,
    /// `typeName`, `modifiers`, `text`, ...). Unknown keys are ignored.
    pub fields: HashMap<String, Value>,
}

/// Where to place an added sibling relative to its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    Before,
    After,
}

/// Renderer → core: the three reconciler operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ModelPatch {
    Edit(NodeEdit),

    /// Insert a new sibling next to the referenced member.
    #[serde(rename_all = "camelCase")]
    Add {
        reference: ComponentLocation,
        placement: Placement,
    },

    #[serde(rename_all = "camelCase")]
    Delete { location: ComponentLocation },
}

/// What a committed patch produced for the backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenOutcome {
    pub path: PathBuf,
    /// `None` means the file lost its last declaration: delete it rather
    /// than writing an empty blob.
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_location_round_trips_as_json() {
        let location = ComponentLocation::Statement {
            namespace: "App".to_string(),
            type_name: "Order".to_string(),
            member_kind: MemberKind::Method,
            index: 1,
            accessor_index: None,
            statement_index: 2,
        };
        let json = serde_json::to_string(&location).unwrap();
        assert!(json.contains("\"component\":\"statement\""));
        assert!(json.contains("\"memberKind\":\"method\""));
        let back: ComponentLocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, location);
    }

    #[test]
    fn display_matches_key_shapes() {
        let member = ComponentLocation::Member {
            namespace: "N".to_string(),
            type_name: "A".to_string(),
            member_kind: MemberKind::Field,
            index: 0,
        };
        assert_eq!(member.to_string(), "N.A.field.0");

        let accessor_statement = ComponentLocation::Statement {
            namespace: "N".to_string(),
            type_name: "A".to_string(),
            member_kind: MemberKind::Property,
            index: 0,
            accessor_index: Some(1),
            statement_index: 0,
        };
        assert_eq!(accessor_statement.to_string(), "N.A.property.0.1:0");
    }

    #[test]
    fn node_edit_deserializes_from_renderer_json() {
        let raw = r#"{
            "location": {
                "component": "member",
                "namespace": "N",
                "typeName": "A",
                "memberKind": "method",
                "index": 1
            },
            "fields": { "name": "Renamed" }
        }"#;
        let edit: NodeEdit = serde_json::from_str(raw).unwrap();
        assert_eq!(edit.location.type_identity(), ("N", "A"));
        assert_eq!(edit.fields["name"], Value::String("Renamed".to_string()));
    }
}
