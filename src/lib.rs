//! # sharpgraph
//!
//! A C# code model and class-diagram graph engine.
//!
//! sharpgraph parses C# sources into a structured, navigable code model,
//! resolves cross-references into a node/link graph with stable
//! deterministic keys, and can serialize an edited model back into source
//! text — the regenerated text must itself re-parse, which is how edits are
//! validated before they are committed.
//!
//! ## Key Features
//!
//! - **Grammar-driven**: tree-sitter drives the parse; the C# grammar is
//!   external data, not hand-written logic
//! - **Stable keys**: every declaration's graph key derives from its
//!   ownership chain and survives unrelated edits
//! - **Incremental**: per-file reconciliation patches the model without
//!   disturbing other files' data
//! - **Round-trip**: model → source text → model preserves structure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sharpgraph::{build_workspace_graph, LinkConfig};
//! use std::path::Path;
//!
//! // Scan a workspace and build the diagram graph
//! let graph = build_workspace_graph(Path::new("."), &LinkConfig::default());
//!
//! // Hand the node/link payload to a renderer
//! let payload = graph.payload();
//! println!("{} nodes, {} links", payload.nodes.len(), payload.links.len());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod parser;
pub mod protocol;
pub mod regen;
pub mod service;
pub mod watcher;
pub mod workspace;

// Re-exports for convenience
pub use error::{ModelError, Result};

// Core model and parsing
pub use config::LinkConfig;
pub use model::{MemberKind, ParsedTypes, TypeDeclaration, TypeKind, TypeMembers};
pub use parser::parse;

// Graph re-exports
pub use graph::{
    GraphLink, GraphNode, GraphPayload, GraphStats, LinkKind, ModelGraph, NodeKind,
};

// Regeneration
pub use regen::{to_file_text, to_source_text};

// Protocol and incremental model
pub use protocol::{
    ComponentLocation, ModelMessage, ModelPatch, NodeEdit, Placement, RegenOutcome,
};
pub use service::ModelService;
pub use watcher::FileWatcher;
pub use workspace::{scan::scan_workspace, WorkspaceModel};

use std::path::Path;

/// Scan every C# source under a workspace root and build its diagram graph.
pub fn build_workspace_graph(root: &Path, config: &LinkConfig) -> ModelGraph {
    let (model, _) = workspace::scan::scan_workspace(root);
    graph::build(model.types(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_all(source: &str, file: &str) -> Vec<TypeDeclaration> {
        parser::parse(source, &PathBuf::from(file))
            .expect("test source parses")
            .into_vec()
    }

    #[test]
    fn test_inheritance_scenario_end_to_end() {
        let types = parse_all(
            r#"
namespace N
{
    public class A : B
    {
    }

    public class B
    {
    }
}
"#,
            "ab.cs",
        );

        let payload = graph::build(&types, &LinkConfig::default()).payload();
        let generalizations: Vec<_> = payload
            .links
            .iter()
            .filter(|l| l.kind == LinkKind::Generalization)
            .collect();
        assert_eq!(generalizations.len(), 1);
        assert_eq!(generalizations[0].from, "N.A");
        assert_eq!(generalizations[0].to, "N.B");

        let config = LinkConfig {
            inheritance: false,
            ..LinkConfig::default()
        };
        let gated = graph::build(&types, &config).payload();
        assert!(
            gated.links.is_empty(),
            "toggling inheritance off removes the only link"
        );
    }

    #[test]
    fn test_primitive_parameters_yield_facts_but_no_links() {
        let types = parse_all(
            r#"
namespace N
{
    public class Calculator
    {
        public int Add(int x, int y)
        {
            return x + y;
        }
    }
}
"#,
            "calc.cs",
        );

        let add = &types[0].methods()[0];
        assert_eq!(
            add.statements[0].used_fields_and_properties,
            vec!["x", "y"],
            "the heuristic records the candidates"
        );

        let payload = graph::build(&types, &LinkConfig::default()).payload();
        assert!(
            payload.links.is_empty(),
            "no type hosts x or y, so no links resolve — the correct outcome"
        );
    }

    #[test]
    fn test_key_determinism_across_reparses() {
        let source = r#"
namespace App.Core
{
    public class Order
    {
        private int _count;
        public string Name { get; set; }

        public Order(int count)
        {
            _count = count;
        }

        public int Total(int price)
        {
            return _count * price;
        }
    }

    public enum Status
    {
        Active,
        Closed,
    }
}
"#;
        let first = parse_all(source, "order.cs");
        let second = parse_all(source, "order.cs");

        let keys_of = |types: &[TypeDeclaration]| {
            graph::build(types, &LinkConfig::default())
                .payload()
                .nodes
                .into_iter()
                .map(|n| n.key)
                .collect::<Vec<_>>()
        };
        let first_keys = keys_of(&first);
        assert_eq!(first_keys, keys_of(&second));
        assert!(first_keys.contains(&"App.Core.Order".to_string()));
        assert!(first_keys.contains(&"App.Core.Order.field.0".to_string()));
        assert!(first_keys.contains(&"App.Core.Order.constructor.0.0".to_string()));
        assert!(first_keys.contains(&"App.Core.Order.method.0:0".to_string()));
        assert!(first_keys.contains(&"App.Core.Status.value.1".to_string()));
    }

    #[test]
    fn test_cross_file_usage_links() {
        let order = parse_all(
            r#"
namespace Shop
{
    public class Order
    {
        public int Total;

        public void Recalculate()
        {
        }
    }
}
"#,
            "order.cs",
        );
        let service = parse_all(
            r#"
namespace Shop
{
    public class Billing
    {
        public void Charge(Order order)
        {
            order.Recalculate();
            total = order.Total;
        }
    }
}
"#,
            "billing.cs",
        );

        let mut types = order;
        types.extend(service);
        let payload = graph::build(&types, &LinkConfig::default()).payload();

        assert!(payload.links.iter().any(|l| {
            l.kind == LinkKind::StatementUsesConstructorOrMethod
                && l.to == "Shop.Order.method.0"
        }));
        assert!(payload.links.iter().any(|l| {
            l.kind == LinkKind::StatementUsesFieldOrProperty && l.to == "Shop.Order.field.0"
        }));
        assert!(payload.links.iter().any(|l| {
            l.kind == LinkKind::ParameterType
                && l.from == "Shop.Billing.method.0.0"
                && l.to == "Shop.Order"
        }));
    }

    #[test]
    fn test_full_round_trip_with_edit() {
        use serde_json::json;
        use std::collections::HashMap;

        let mut model = WorkspaceModel::new();
        let path = PathBuf::from("service.cs");
        let parsed = parser::parse(
            r#"
namespace App
{
    public class Greeter
    {
        public string Greet(string name)
        {
            return name;
        }
    }
}
"#,
            &path,
        )
        .unwrap();
        let version = model.next_version(&path);
        model.replace_file(&path, parsed.into_vec(), version);

        let patch = ModelPatch::Edit(NodeEdit {
            location: ComponentLocation::Member {
                namespace: "App".to_string(),
                type_name: "Greeter".to_string(),
                member_kind: MemberKind::Method,
                index: 0,
            },
            fields: HashMap::from([("name".to_string(), json!("Welcome"))]),
        });
        let outcome = model.commit(&patch).expect("edit validates");
        let text = outcome.text.expect("file still has content");

        // The regenerated file is valid input for the parser again.
        let reparsed = parser::parse(&text, &path).unwrap().into_vec();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].methods()[0].name, "Welcome");
        assert_eq!(reparsed[0].methods()[0].parameters[0].name, "name");
    }

    #[test]
    fn test_deleting_file_spares_unrelated_nodes() {
        let mut model = WorkspaceModel::new();
        for (file, source) in [
            (
                "trio.cs",
                "namespace N { public class A { } public class B { } public class C { } }",
            ),
            ("keep.cs", "namespace N { public class Keep { } }"),
        ] {
            let path = PathBuf::from(file);
            let parsed = parser::parse(source, &path).unwrap();
            let version = model.next_version(&path);
            model.replace_file(&path, parsed.into_vec(), version);
        }

        let before = graph::build(model.types(), &LinkConfig::default()).payload();
        assert_eq!(before.nodes.len(), 4);

        model.remove_file(Path::new("trio.cs"));
        let after = graph::build(model.types(), &LinkConfig::default()).payload();
        assert_eq!(after.nodes.len(), 1);
        assert_eq!(after.nodes[0].key, "N.Keep");
    }

    #[test]
    fn test_workspace_graph_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Shape.cs"),
            r#"
namespace Geometry
{
    public interface IShape
    {
        double Area();
    }

    public class Circle : IShape
    {
        private double _radius;

        public double Area()
        {
            return _radius * _radius;
        }
    }
}
"#,
        )
        .unwrap();

        let graph = build_workspace_graph(dir.path(), &LinkConfig::default());
        let payload = graph.payload();
        assert!(payload.nodes.iter().any(|n| n.key == "Geometry.IShape"));
        assert!(payload.nodes.iter().any(|n| n.key == "Geometry.Circle"));
        assert!(payload
            .links
            .iter()
            .any(|l| l.kind == LinkKind::Realization
                && l.from == "Geometry.Circle"
                && l.to == "Geometry.IShape"));
    }
}
