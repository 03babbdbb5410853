//! Scope resolver and graph builder.
//!
//! A pure projection: given the full set of parsed types and the link
//! toggles, produce the node/link graph. Identical inputs always yield
//! identical arrays in identical order; nothing here touches the network or
//! the filesystem.
//!
//! Name resolution is scoped and first-match-wins: a type's own namespace is
//! searched before its explicit dependencies (fixed, documented order), and
//! member lookup does no overload disambiguation. Unresolvable names are a
//! silent no-link outcome, never an error — the supported language subset is
//! intentionally incomplete.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::types::{
    accessor_statement_key, member_key, parameter_key, statement_key, GraphLink, GraphNode,
    GraphPayload, GraphStats, LinkKind, NodeKind,
};
use crate::config::LinkConfig;
use crate::model::{
    DeclaredVariable, MemberKind, Parameter, Statement, TypeDeclaration, TypeKind, TypeMembers,
};

/// The built diagram graph: petgraph storage plus a key index.
pub struct ModelGraph {
    graph: DiGraph<GraphNode, LinkKind>,
    key_index: HashMap<String, NodeIndex>,
}

impl ModelGraph {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            key_index: HashMap::new(),
        }
    }

    fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.key_index.get(&node.key) {
            return idx;
        }
        let key = node.key.clone();
        let idx = self.graph.add_node(node);
        self.key_index.insert(key, idx);
        idx
    }

    fn add_link(&mut self, from: &str, to: &str, kind: LinkKind) {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.key_index.get(from), self.key_index.get(to))
        {
            self.graph.add_edge(from_idx, to_idx, kind);
        }
    }

    pub fn node(&self, key: &str) -> Option<&GraphNode> {
        self.key_index.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    /// All nodes and links, in deterministic insertion order.
    pub fn payload(&self) -> GraphPayload {
        GraphPayload {
            nodes: self
                .graph
                .node_indices()
                .map(|idx| self.graph[idx].clone())
                .collect(),
            links: self
                .graph
                .edge_references()
                .map(|edge| GraphLink {
                    kind: *edge.weight(),
                    from: self.graph[edge.source()].key.clone(),
                    to: self.graph[edge.target()].key.clone(),
                })
                .collect(),
        }
    }

    /// Nodes owned by one file, plus the links whose source they own. Link
    /// targets may live in other files; the renderer already knows them.
    pub fn payload_for_path(&self, path: &Path) -> GraphPayload {
        GraphPayload {
            nodes: self
                .graph
                .node_indices()
                .map(|idx| &self.graph[idx])
                .filter(|node| node.file == path)
                .cloned()
                .collect(),
            links: self
                .graph
                .edge_references()
                .filter(|edge| self.graph[edge.source()].file == path)
                .map(|edge| GraphLink {
                    kind: *edge.weight(),
                    from: self.graph[edge.source()].key.clone(),
                    to: self.graph[edge.target()].key.clone(),
                })
                .collect(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.graph.node_count(),
            total_links: self.graph.edge_count(),
            ..Default::default()
        };
        for node in self.graph.node_weights() {
            if node.kind.is_type() {
                stats.type_count += 1;
            } else if node.kind == NodeKind::Statement {
                stats.statement_count += 1;
            } else if node.kind != NodeKind::Parameter {
                stats.member_count += 1;
            }
        }
        stats
    }
}

/// Build the diagram graph for every given type.
pub fn build(types: &[TypeDeclaration], config: &LinkConfig) -> ModelGraph {
    let mut by_namespace: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, decl) in types.iter().enumerate() {
        by_namespace.entry(&decl.namespace).or_default().push(i);
    }
    debug!(type_count = types.len(), "building diagram graph");

    let mut builder = Builder {
        types,
        config,
        by_namespace,
        graph: ModelGraph::new(),
    };

    // Phase 1: every declaration becomes a node, so phase 2 can link in any
    // direction regardless of declaration order.
    for decl in types {
        builder.add_type_nodes(decl);
    }
    // Phase 2: resolve cross-references into links.
    for decl in types {
        builder.add_type_links(decl);
    }

    let graph = builder.graph;
    let stats = graph.stats();
    debug!(
        nodes = stats.total_nodes,
        links = stats.total_links,
        "diagram graph built"
    );
    graph
}

struct Builder<'a> {
    types: &'a [TypeDeclaration],
    config: &'a LinkConfig,
    by_namespace: HashMap<&'a str, Vec<usize>>,
    graph: ModelGraph,
}

impl<'a> Builder<'a> {
    // ─── Nodes ──────────────────────────────────────────────────

    fn add_type_nodes(&mut self, decl: &TypeDeclaration) {
        let type_key = decl.type_key();
        let kind = match decl.kind() {
            TypeKind::Class => NodeKind::Class,
            TypeKind::Struct => NodeKind::Struct,
            TypeKind::Interface => NodeKind::Interface,
            TypeKind::Enum => NodeKind::Enum,
        };
        self.push_node(&type_key, &decl.name, kind, decl, join_nonempty(&decl.modifiers));

        for field in decl.fields() {
            let key = member_key(&type_key, MemberKind::Field, field.index);
            self.push_node(&key, &field.name, NodeKind::Field, decl, Some(field.type_name.clone()));
        }
        for property in decl.properties() {
            let key = member_key(&type_key, MemberKind::Property, property.index);
            self.push_node(
                &key,
                &property.name,
                NodeKind::Property,
                decl,
                Some(property.type_name.clone()),
            );
            for (accessor_index, accessor) in property.accessors.iter().enumerate() {
                for statement in &accessor.statements {
                    let stmt_key = accessor_statement_key(&key, accessor_index, statement.index);
                    self.push_node(&stmt_key, &statement.text, NodeKind::Statement, decl, None);
                }
            }
        }
        for ctor in decl.constructors() {
            let key = member_key(&type_key, MemberKind::Constructor, ctor.index);
            self.push_node(&key, &ctor.name, NodeKind::Constructor, decl, None);
            self.add_callable_nodes(&key, decl, &ctor.parameters, &ctor.statements);
        }
        for method in decl.methods() {
            let key = member_key(&type_key, MemberKind::Method, method.index);
            self.push_node(
                &key,
                &method.name,
                NodeKind::Method,
                decl,
                Some(method.return_type.clone()),
            );
            self.add_callable_nodes(&key, decl, &method.parameters, &method.statements);
        }
        for value in decl.enum_values() {
            let key = member_key(&type_key, MemberKind::Value, value.index);
            self.push_node(&key, &value.name, NodeKind::EnumValue, decl, value.value.clone());
        }
    }

    fn add_callable_nodes(
        &mut self,
        callable_key: &str,
        decl: &TypeDeclaration,
        parameters: &[Parameter],
        statements: &[Statement],
    ) {
        for (i, parameter) in parameters.iter().enumerate() {
            let key = parameter_key(callable_key, i);
            self.push_node(
                &key,
                &parameter.name,
                NodeKind::Parameter,
                decl,
                Some(parameter.type_name.clone()),
            );
        }
        for statement in statements {
            let key = statement_key(callable_key, statement.index);
            self.push_node(&key, &statement.text, NodeKind::Statement, decl, None);
        }
    }

    fn push_node(
        &mut self,
        key: &str,
        label: &str,
        kind: NodeKind,
        owner: &TypeDeclaration,
        detail: Option<String>,
    ) {
        self.graph.add_node(GraphNode {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            file: owner.source_file_path.clone(),
            detail,
        });
    }

    // ─── Links ──────────────────────────────────────────────────

    fn add_type_links(&mut self, decl: &TypeDeclaration) {
        let type_key = decl.type_key();

        if self.config.inheritance {
            for parent in &decl.parent_inheritances {
                let Some(target) = self.resolve_type(decl, parent) else {
                    continue;
                };
                if target.type_key() == type_key {
                    continue;
                }
                let kind = if target.kind() == TypeKind::Interface || target.is_abstract() {
                    LinkKind::Realization
                } else {
                    LinkKind::Generalization
                };
                self.push_link(&type_key, &target.type_key(), kind, decl, target);
            }
        }

        if self.config.member_types {
            for field in decl.fields() {
                if let Some(target) = self.resolve_type(decl, &field.type_name) {
                    let key = member_key(&type_key, MemberKind::Field, field.index);
                    self.push_link(&key, &target.type_key(), LinkKind::MemberType, decl, target);
                }
            }
            for property in decl.properties() {
                if let Some(target) = self.resolve_type(decl, &property.type_name) {
                    let key = member_key(&type_key, MemberKind::Property, property.index);
                    self.push_link(&key, &target.type_key(), LinkKind::MemberType, decl, target);
                }
            }
        }

        for ctor in decl.constructors() {
            let key = member_key(&type_key, MemberKind::Constructor, ctor.index);
            self.add_callable_links(&key, decl, &ctor.parameters, &ctor.declared_variables, &ctor.statements);
        }
        for method in decl.methods() {
            let key = member_key(&type_key, MemberKind::Method, method.index);
            self.add_callable_links(
                &key,
                decl,
                &method.parameters,
                &method.declared_variables,
                &method.statements,
            );
        }
        for property in decl.properties() {
            let prop_key = member_key(&type_key, MemberKind::Property, property.index);
            for (accessor_index, accessor) in property.accessors.iter().enumerate() {
                for statement in &accessor.statements {
                    let stmt_key =
                        accessor_statement_key(&prop_key, accessor_index, statement.index);
                    self.statement_links(&stmt_key, decl, &[], &[], statement);
                }
            }
        }
    }

    fn add_callable_links(
        &mut self,
        callable_key: &str,
        decl: &TypeDeclaration,
        parameters: &[Parameter],
        variables: &[DeclaredVariable],
        statements: &[Statement],
    ) {
        if self.config.parameter_types {
            for (i, parameter) in parameters.iter().enumerate() {
                if let Some(target) = self.resolve_type(decl, &parameter.type_name) {
                    let key = parameter_key(callable_key, i);
                    self.push_link(&key, &target.type_key(), LinkKind::ParameterType, decl, target);
                }
            }
        }
        for statement in statements {
            let stmt_key = statement_key(callable_key, statement.index);
            self.statement_links(&stmt_key, decl, parameters, variables, statement);
        }
    }

    /// Statement usage-fact resolution, with the documented scope precedence:
    /// parameters, then declared variables (when enabled), then static type
    /// access. One-atom candidates resolve only against the enclosing type,
    /// and only for fields/properties — same-type method and type links are
    /// suppressed so renames do not flood the diagram with self-loops.
    fn statement_links(
        &mut self,
        stmt_key: &str,
        owner: &TypeDeclaration,
        parameters: &[Parameter],
        variables: &[DeclaredVariable],
        statement: &Statement,
    ) {
        if self.config.statement_fields || self.config.statement_enum_values {
            for candidate in &statement.used_fields_and_properties {
                match candidate.split_once('.') {
                    None => {
                        if !self.config.statement_fields {
                            continue;
                        }
                        if let Some(key) = self.field_or_property_key(owner, candidate) {
                            self.push_link(
                                stmt_key,
                                &key,
                                LinkKind::StatementUsesFieldOrProperty,
                                owner,
                                owner,
                            );
                        }
                    }
                    Some((receiver, member)) => {
                        match self.scoped_receiver(owner, parameters, variables, receiver) {
                            ScopedReceiver::Resolved(target) => {
                                if !self.config.statement_fields {
                                    continue;
                                }
                                if let Some(key) = self.field_or_property_key(target, member) {
                                    self.push_link(
                                        stmt_key,
                                        &key,
                                        LinkKind::StatementUsesFieldOrProperty,
                                        owner,
                                        target,
                                    );
                                }
                            }
                            ScopedReceiver::Unresolvable => {}
                            ScopedReceiver::NotInScope => {
                                let Some(target) = self.resolve_type(owner, receiver) else {
                                    continue;
                                };
                                if let Some(key) = self.field_or_property_key(target, member) {
                                    if self.config.statement_fields {
                                        self.push_link(
                                            stmt_key,
                                            &key,
                                            LinkKind::StatementUsesFieldOrProperty,
                                            owner,
                                            target,
                                        );
                                    }
                                } else if let Some(key) = self.enum_value_key(target, member) {
                                    if self.config.statement_enum_values {
                                        self.push_link(
                                            stmt_key,
                                            &key,
                                            LinkKind::StatementUsesEnumValue,
                                            owner,
                                            target,
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        if self.config.statement_calls {
            for candidate in &statement.used_methods {
                // One-atom method candidates are same-type references and
                // intentionally produce no link.
                let Some((receiver, member)) = candidate.split_once('.') else {
                    continue;
                };
                let target = match self.scoped_receiver(owner, parameters, variables, receiver) {
                    ScopedReceiver::Resolved(target) => Some(target),
                    ScopedReceiver::Unresolvable => None,
                    ScopedReceiver::NotInScope => self.resolve_type(owner, receiver),
                };
                let Some(target) = target else {
                    continue;
                };
                if let Some(key) = self.constructor_or_method_key(target, member) {
                    self.push_link(
                        stmt_key,
                        &key,
                        LinkKind::StatementUsesConstructorOrMethod,
                        owner,
                        target,
                    );
                }
            }

            for candidate in &statement.used_constructors {
                let Some(target) = self.resolve_type(owner, candidate) else {
                    continue;
                };
                if let Some(key) = self.constructor_or_method_key(target, &target.name) {
                    self.push_link(
                        stmt_key,
                        &key,
                        LinkKind::StatementUsesConstructorOrMethod,
                        owner,
                        target,
                    );
                }
            }
        }

        if self.config.statement_types {
            for candidate in &statement.used_types {
                let Some(target) = self.resolve_type(owner, candidate) else {
                    continue;
                };
                if target.type_key() == owner.type_key() {
                    continue;
                }
                self.push_link(
                    stmt_key,
                    &target.type_key(),
                    LinkKind::StatementUsesType,
                    owner,
                    target,
                );
            }
        }
    }

    fn push_link(
        &mut self,
        from: &str,
        to: &str,
        kind: LinkKind,
        owner: &TypeDeclaration,
        target: &TypeDeclaration,
    ) {
        // Two distinct declarations sharing a type name are rename noise
        // unless same-type links are explicitly enabled. References within
        // one declaration are never suppressed.
        if !self.config.same_type_links
            && owner.name == target.name
            && owner.type_key() != target.type_key()
        {
            return;
        }
        self.graph.add_link(from, to, kind);
    }

    // ─── Resolution ─────────────────────────────────────────────

    /// Resolve a type name referenced by `from`: the type's own namespace is
    /// searched first, then its dependencies in declaration order. First
    /// match wins; a miss is silent.
    fn resolve_type(&self, from: &TypeDeclaration, raw: &str) -> Option<&'a TypeDeclaration> {
        let name = strip_type_decorations(raw);
        if name.is_empty() {
            return None;
        }
        if let Some((namespace, last)) = name.rsplit_once('.') {
            if let Some(found) = self.lookup(namespace, last) {
                return Some(found);
            }
        }
        if let Some(found) = self.lookup(&from.namespace, &name) {
            return Some(found);
        }
        for dependency in &from.namespace_dependencies {
            if let Some(found) = self.lookup(dependency, &name) {
                return Some(found);
            }
        }
        None
    }

    fn lookup(&self, namespace: &str, name: &str) -> Option<&'a TypeDeclaration> {
        self.by_namespace
            .get(namespace)?
            .iter()
            .map(|&i| &self.types[i])
            .find(|t| t.name == name)
    }

    fn scoped_receiver(
        &self,
        owner: &TypeDeclaration,
        parameters: &[Parameter],
        variables: &[DeclaredVariable],
        atom: &str,
    ) -> ScopedReceiver<'a> {
        if let Some(parameter) = parameters.iter().find(|p| p.name == atom) {
            return match self.resolve_type(owner, &parameter.type_name) {
                Some(target) => ScopedReceiver::Resolved(target),
                None => ScopedReceiver::Unresolvable,
            };
        }
        if self.config.declared_variable_types {
            if let Some(variable) = variables.iter().find(|v| v.name == atom) {
                return match self.resolve_type(owner, &variable.type_name) {
                    Some(target) => ScopedReceiver::Resolved(target),
                    None => ScopedReceiver::Unresolvable,
                };
            }
        }
        ScopedReceiver::NotInScope
    }

    /// First name match across fields then properties; interfaces expose
    /// only properties; enums expose neither.
    fn field_or_property_key(&self, t: &TypeDeclaration, name: &str) -> Option<String> {
        let type_key = t.type_key();
        match &t.members {
            TypeMembers::Class(_) | TypeMembers::Struct(_) => t
                .fields()
                .iter()
                .find(|f| f.name == name)
                .map(|f| member_key(&type_key, MemberKind::Field, f.index))
                .or_else(|| {
                    t.properties()
                        .iter()
                        .find(|p| p.name == name)
                        .map(|p| member_key(&type_key, MemberKind::Property, p.index))
                }),
            TypeMembers::Interface(_) => t
                .properties()
                .iter()
                .find(|p| p.name == name)
                .map(|p| member_key(&type_key, MemberKind::Property, p.index)),
            TypeMembers::Enum(_) => None,
        }
    }

    /// First name match across constructors then methods. No overload
    /// disambiguation, by design.
    fn constructor_or_method_key(&self, t: &TypeDeclaration, name: &str) -> Option<String> {
        let type_key = t.type_key();
        t.constructors()
            .iter()
            .find(|c| c.name == name)
            .map(|c| member_key(&type_key, MemberKind::Constructor, c.index))
            .or_else(|| {
                t.methods()
                    .iter()
                    .find(|m| m.name == name)
                    .map(|m| member_key(&type_key, MemberKind::Method, m.index))
            })
    }

    fn enum_value_key(&self, t: &TypeDeclaration, name: &str) -> Option<String> {
        let type_key = t.type_key();
        t.enum_values()
            .iter()
            .find(|v| v.name == name)
            .map(|v| member_key(&type_key, MemberKind::Value, v.index))
    }
}

enum ScopedReceiver<'a> {
    /// The atom names a parameter or declared variable with a resolvable type.
    Resolved(&'a TypeDeclaration),
    /// The atom names a parameter or declared variable, but its declared
    /// type is not in the model — the candidate dies here, by precedence.
    Unresolvable,
    /// Not a scoped name; fall through to static/qualified interpretation.
    NotInScope,
}

/// Reduce a raw type-name string to a resolvable bare name: strip generic
/// arguments, array suffixes, and nullable markers.
fn strip_type_decorations(raw: &str) -> String {
    let mut name = raw.trim();
    if let Some(open) = name.find('<') {
        name = &name[..open];
    }
    name.trim_end_matches("[]").trim_end_matches('?').trim().to_string()
}

fn join_nonempty(parts: &[String]) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
