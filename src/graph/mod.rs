//! Diagram graph module — nodes, links, and the scope-aware builder.

pub mod builder;
pub mod types;

pub use builder::{build, ModelGraph};
pub use types::{
    accessor_statement_key, member_key, parameter_key, statement_key, GraphLink, GraphNode,
    GraphPayload, GraphStats, LinkKind, NodeKind,
};
