//! Graph node and link types — the visualization-facing projection.
//!
//! Keys are built compositionally from the ownership chain and are the core
//! invariant of the whole system: the same declaration always yields the
//! same key across re-parses, which is what lets incremental updates patch
//! the rendered graph instead of rebuilding it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::model::MemberKind;

/// The kind of a node in the diagram graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Field,
    Property,
    Constructor,
    Method,
    EnumValue,
    Parameter,
    Statement,
}

impl NodeKind {
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::Class | NodeKind::Struct | NodeKind::Interface | NodeKind::Enum
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Class => write!(f, "class"),
            NodeKind::Struct => write!(f, "struct"),
            NodeKind::Interface => write!(f, "interface"),
            NodeKind::Enum => write!(f, "enum"),
            NodeKind::Field => write!(f, "field"),
            NodeKind::Property => write!(f, "property"),
            NodeKind::Constructor => write!(f, "constructor"),
            NodeKind::Method => write!(f, "method"),
            NodeKind::EnumValue => write!(f, "enum_value"),
            NodeKind::Parameter => write!(f, "parameter"),
            NodeKind::Statement => write!(f, "statement"),
        }
    }
}

/// The closed set of link categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Generalization,
    Realization,
    MemberType,
    ParameterType,
    StatementUsesType,
    StatementUsesFieldOrProperty,
    StatementUsesConstructorOrMethod,
    StatementUsesEnumValue,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Generalization => write!(f, "generalization"),
            LinkKind::Realization => write!(f, "realization"),
            LinkKind::MemberType => write!(f, "member_type"),
            LinkKind::ParameterType => write!(f, "parameter_type"),
            LinkKind::StatementUsesType => write!(f, "statement_uses_type"),
            LinkKind::StatementUsesFieldOrProperty => {
                write!(f, "statement_uses_field_or_property")
            }
            LinkKind::StatementUsesConstructorOrMethod => {
                write!(f, "statement_uses_constructor_or_method")
            }
            LinkKind::StatementUsesEnumValue => write!(f, "statement_uses_enum_value"),
        }
    }
}

/// One node of the diagram graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Deterministic key derived from the ownership chain.
    pub key: String,
    /// Display text: the declaration name, or statement text.
    pub label: String,
    pub kind: NodeKind,
    /// The file the owning type was parsed from.
    pub file: PathBuf,
    /// Declared/return type, modifiers, or other secondary display text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One directed, categorized link between two node keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub kind: LinkKind,
    pub from: String,
    pub to: String,
}

/// The node/link arrays handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

/// Counts over the built graph, by coarse node class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_links: usize,
    pub type_count: usize,
    pub member_count: usize,
    pub statement_count: usize,
}

// ─── Key Composition ────────────────────────────────────────────

/// `typeKey.kindTag.index`, e.g. `App.Core.Order.method.1`.
pub fn member_key(type_key: &str, kind: MemberKind, index: u32) -> String {
    format!("{type_key}.{}.{index}", kind.tag())
}

/// `memberKey.parameterIndex`.
pub fn parameter_key(member_key: &str, parameter_index: usize) -> String {
    format!("{member_key}.{parameter_index}")
}

/// `memberKey:statementIndex`.
pub fn statement_key(member_key: &str, statement_index: u32) -> String {
    format!("{member_key}:{statement_index}")
}

/// `memberKey.accessorIndex:statementIndex` — for property accessor bodies.
pub fn accessor_statement_key(
    member_key: &str,
    accessor_index: usize,
    statement_index: u32,
) -> String {
    format!("{member_key}.{accessor_index}:{statement_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compose_along_the_ownership_chain() {
        let type_key = "App.Core.Order";
        let member = member_key(type_key, MemberKind::Method, 2);
        assert_eq!(member, "App.Core.Order.method.2");
        assert_eq!(parameter_key(&member, 0), "App.Core.Order.method.2.0");
        assert_eq!(statement_key(&member, 3), "App.Core.Order.method.2:3");

        let property = member_key(type_key, MemberKind::Property, 0);
        assert_eq!(
            accessor_statement_key(&property, 1, 0),
            "App.Core.Order.property.0.1:0"
        );
    }

    #[test]
    fn kind_serialization_is_snake_case() {
        let json = serde_json::to_string(&LinkKind::StatementUsesFieldOrProperty).unwrap();
        assert_eq!(json, "\"statement_uses_field_or_property\"");
        let json = serde_json::to_string(&NodeKind::EnumValue).unwrap();
        assert_eq!(json, "\"enum_value\"");
    }
}
