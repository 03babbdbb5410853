//! C# source parsing via tree-sitter.
//!
//! The grammar itself is external data shipped by `tree-sitter-c-sharp`;
//! this module drives it and projects the syntax tree into the code model.
//! The supported subset: using directives, namespaces (block and
//! file-scoped), class/struct/interface/enum declarations with modifier and
//! base lists, fields, properties with accessors, constructors, methods,
//! parameters, and top-level body statements. Statement bodies are captured
//! as raw text spans; usage facts come from the heuristic pass in [`facts`].
//!
//! A file whose tree contains any syntax error is rejected whole: the caller
//! keeps the rest of the model intact and drops this file's contribution.

pub mod facts;

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{ModelError, Result};
use crate::model::{
    Accessor, AccessorKind, Constructor, DeclaredVariable, EnumMembers, EnumValue, Field,
    InterfaceMembers, Method, ObjectMembers, Parameter, ParsedTypes, Property, Statement,
    TypeDeclaration, TypeMembers,
};

/// True for paths this parser handles.
pub fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("cs")
}

/// Parse one C# source file into structured declarations.
///
/// `path` is stamped on every returned type as its `source_file_path`.
pub fn parse(source: &str, path: &Path) -> Result<ParsedTypes> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| ModelError::Parse {
            file: path.to_path_buf(),
            message: format!("grammar load failed: {e}"),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| ModelError::Parse {
        file: path.to_path_buf(),
        message: "parser produced no tree".to_string(),
    })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ModelError::Parse {
            file: path.to_path_buf(),
            message: first_error_message(root),
        });
    }

    let mut out = ParsedTypes::default();
    let mut scope = Scope::default();
    walk_container(root, source, path, &mut scope, &mut out);
    Ok(out)
}

/// Namespace path and visible using directives at one nesting level.
#[derive(Debug, Clone, Default)]
struct Scope {
    namespace: String,
    usings: Vec<String>,
}

impl Scope {
    fn child(&self, segment: &str) -> Self {
        let namespace = if self.namespace.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.namespace, segment)
        };
        Self {
            namespace,
            usings: self.usings.clone(),
        }
    }
}

fn walk_container(
    node: Node<'_>,
    source: &str,
    path: &Path,
    scope: &mut Scope,
    out: &mut ParsedTypes,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "using_directive" => {
                if let Some(target) = using_target(child, source) {
                    scope.usings.push(target);
                }
            }
            "file_scoped_namespace_declaration" => {
                // Everything after a file-scoped namespace lives inside it.
                if let Some(name) = name_text(child, source) {
                    *scope = scope.child(&name);
                }
                walk_container(child, source, path, scope, out);
            }
            "namespace_declaration" => {
                let Some(name) = name_text(child, source) else {
                    continue;
                };
                let mut inner = scope.child(&name);
                if let Some(body) = child.child_by_field_name("body") {
                    walk_container(body, source, path, &mut inner, out);
                }
            }
            "class_declaration" => {
                if let Some(decl) = object_declaration(child, source, path, scope, false) {
                    out.push(decl);
                }
            }
            "struct_declaration" => {
                if let Some(decl) = object_declaration(child, source, path, scope, true) {
                    out.push(decl);
                }
            }
            "interface_declaration" => {
                if let Some(decl) = interface_declaration(child, source, path, scope) {
                    out.push(decl);
                }
            }
            "enum_declaration" => {
                if let Some(decl) = enum_declaration(child, source, path, scope) {
                    out.push(decl);
                }
            }
            _ => {}
        }
    }
}

// ─── Type Declarations ──────────────────────────────────────────

fn object_declaration(
    node: Node<'_>,
    source: &str,
    path: &Path,
    scope: &Scope,
    is_struct: bool,
) -> Option<TypeDeclaration> {
    let name = name_text(node, source)?;
    let mut members = ObjectMembers::default();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "field_declaration" => {
                    collect_fields(child, source, &mut members.fields);
                }
                "property_declaration" => {
                    let index = members.properties.len() as u32;
                    if let Some(property) = property_declaration(child, source, index) {
                        members.properties.push(property);
                    }
                }
                "constructor_declaration" => {
                    let index = members.constructors.len() as u32;
                    if let Some(ctor) = constructor_declaration(child, source, index) {
                        members.constructors.push(ctor);
                    }
                }
                "method_declaration" => {
                    let index = members.methods.len() as u32;
                    if let Some(method) = method_declaration(child, source, index) {
                        members.methods.push(method);
                    }
                }
                _ => {}
            }
        }
    }
    Some(TypeDeclaration {
        name,
        modifiers: modifier_list(node, source),
        namespace: scope.namespace.clone(),
        namespace_dependencies: scope.usings.clone(),
        parent_inheritances: base_list(node, source),
        source_file_path: path.to_path_buf(),
        stale: false,
        members: if is_struct {
            TypeMembers::Struct(members)
        } else {
            TypeMembers::Class(members)
        },
    })
}

fn interface_declaration(
    node: Node<'_>,
    source: &str,
    path: &Path,
    scope: &Scope,
) -> Option<TypeDeclaration> {
    let name = name_text(node, source)?;
    let mut members = InterfaceMembers::default();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "property_declaration" => {
                    let index = members.properties.len() as u32;
                    if let Some(property) = property_declaration(child, source, index) {
                        members.properties.push(property);
                    }
                }
                "method_declaration" => {
                    let index = members.methods.len() as u32;
                    if let Some(method) = method_declaration(child, source, index) {
                        members.methods.push(method);
                    }
                }
                _ => {}
            }
        }
    }
    Some(TypeDeclaration {
        name,
        modifiers: modifier_list(node, source),
        namespace: scope.namespace.clone(),
        namespace_dependencies: scope.usings.clone(),
        parent_inheritances: base_list(node, source),
        source_file_path: path.to_path_buf(),
        stale: false,
        members: TypeMembers::Interface(members),
    })
}

fn enum_declaration(
    node: Node<'_>,
    source: &str,
    path: &Path,
    scope: &Scope,
) -> Option<TypeDeclaration> {
    let name = name_text(node, source)?;
    let mut values = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() != "enum_member_declaration" {
                continue;
            }
            let Some(value_name) = name_text(child, source) else {
                continue;
            };
            let value = equals_value(child, source);
            values.push(EnumValue {
                index: values.len() as u32,
                name: value_name,
                value,
            });
        }
    }
    Some(TypeDeclaration {
        name,
        modifiers: modifier_list(node, source),
        namespace: scope.namespace.clone(),
        namespace_dependencies: scope.usings.clone(),
        parent_inheritances: base_list(node, source),
        source_file_path: path.to_path_buf(),
        stale: false,
        members: TypeMembers::Enum(EnumMembers { values }),
    })
}

// ─── Members ────────────────────────────────────────────────────

/// One `field_declaration` can declare several variables; each becomes its
/// own Field with its own index.
fn collect_fields(node: Node<'_>, source: &str, fields: &mut Vec<Field>) {
    let modifiers = modifier_list(node, source);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "variable_declaration" {
            continue;
        }
        let type_name = child
            .child_by_field_name("type")
            .map(|n| node_text(n, source))
            .unwrap_or_else(|| "object".to_string());
        let mut decl_cursor = child.walk();
        for declarator in child.named_children(&mut decl_cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = name_text(declarator, source) else {
                continue;
            };
            fields.push(Field {
                index: fields.len() as u32,
                name,
                type_name: type_name.clone(),
                modifiers: modifiers.clone(),
                default_value: equals_value(declarator, source),
            });
        }
    }
}

fn property_declaration(node: Node<'_>, source: &str, index: u32) -> Option<Property> {
    let name = name_text(node, source)?;
    let type_name = node
        .child_by_field_name("type")
        .map(|n| node_text(n, source))
        .unwrap_or_else(|| "object".to_string());

    let mut accessors = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "accessor_list" => {
                let mut list_cursor = child.walk();
                for accessor in child.named_children(&mut list_cursor) {
                    if accessor.kind() != "accessor_declaration" {
                        continue;
                    }
                    if let Some(parsed) = parse_accessor(accessor, source) {
                        accessors.push(parsed);
                    }
                }
            }
            "arrow_expression_clause" => {
                // `public int X => expr;` reads as a get accessor.
                accessors.push(Accessor {
                    kind: AccessorKind::Get,
                    has_body: true,
                    statements: vec![make_statement(0, arrow_return_text(child, source))],
                });
            }
            _ => {}
        }
    }

    Some(Property {
        index,
        name,
        type_name,
        modifiers: modifier_list(node, source),
        accessors,
    })
}

fn parse_accessor(node: Node<'_>, source: &str) -> Option<Accessor> {
    let mut kind = None;
    let mut body = None;
    let mut arrow = None;
    let count = node.child_count();
    for i in 0..count {
        let Some(child) = node.child(i) else {
            continue;
        };
        match child.kind() {
            "get" => kind = Some(AccessorKind::Get),
            // `init` behaves as a setter for this model.
            "set" | "init" => kind = Some(AccessorKind::Set),
            "block" => body = Some(child),
            "arrow_expression_clause" => arrow = Some(child),
            _ => {}
        }
    }
    let kind = kind?;
    if let Some(block) = body {
        let (statements, _) = block_statements(block, source);
        Some(Accessor {
            kind,
            has_body: true,
            statements,
        })
    } else if let Some(arrow) = arrow {
        let text = match kind {
            AccessorKind::Get => arrow_return_text(arrow, source),
            AccessorKind::Set => format!("{};", arrow_expression_text(arrow, source)),
        };
        Some(Accessor {
            kind,
            has_body: true,
            statements: vec![make_statement(0, text)],
        })
    } else {
        Some(Accessor {
            kind,
            has_body: false,
            statements: Vec::new(),
        })
    }
}

fn constructor_declaration(node: Node<'_>, source: &str, index: u32) -> Option<Constructor> {
    let name = name_text(node, source)?;
    let parameters = parameter_list(node, source);
    let (statements, declared_variables) = callable_body(node, source);
    Some(Constructor {
        index,
        name,
        modifiers: modifier_list(node, source),
        parameters,
        declared_variables,
        statements,
    })
}

fn method_declaration(node: Node<'_>, source: &str, index: u32) -> Option<Method> {
    let name = name_text(node, source)?;
    let return_type = node
        .child_by_field_name("returns")
        .or_else(|| node.child_by_field_name("type"))
        .map(|n| node_text(n, source))
        .unwrap_or_else(|| "void".to_string());
    let parameters = parameter_list(node, source);

    let body = node.child_by_field_name("body");
    let arrow = named_child_of_kind(node, "arrow_expression_clause");
    let has_body = body.is_some() || arrow.is_some();
    let (statements, declared_variables) = if let Some(block) = body {
        block_statements(block, source)
    } else if let Some(arrow) = arrow {
        let text = if return_type == "void" {
            format!("{};", arrow_expression_text(arrow, source))
        } else {
            arrow_return_text(arrow, source)
        };
        (vec![make_statement(0, text)], Vec::new())
    } else {
        (Vec::new(), Vec::new())
    };

    Some(Method {
        index,
        name,
        modifiers: modifier_list(node, source),
        return_type,
        parameters,
        declared_variables,
        statements,
        has_body,
    })
}

fn callable_body(node: Node<'_>, source: &str) -> (Vec<Statement>, Vec<DeclaredVariable>) {
    match node.child_by_field_name("body") {
        Some(block) if block.kind() == "block" => block_statements(block, source),
        _ => (Vec::new(), Vec::new()),
    }
}

/// Top-level statements of a block, plus every local variable declared
/// anywhere inside it (nested blocks included — scope inference only).
fn block_statements(block: Node<'_>, source: &str) -> (Vec<Statement>, Vec<DeclaredVariable>) {
    let mut statements = Vec::new();
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        let text = collapse_whitespace(&node_text(child, source));
        if text.is_empty() {
            continue;
        }
        statements.push(make_statement(statements.len() as u32, text));
    }
    let mut declared_variables = Vec::new();
    collect_declared_variables(block, source, &mut declared_variables);
    (statements, declared_variables)
}

fn collect_declared_variables(node: Node<'_>, source: &str, out: &mut Vec<DeclaredVariable>) {
    if node.kind() == "variable_declaration" {
        let type_name = node
            .child_by_field_name("type")
            .map(|n| node_text(n, source))
            .unwrap_or_else(|| "var".to_string());
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            if let Some(name) = name_text(declarator, source) {
                out.push(DeclaredVariable {
                    name,
                    type_name: type_name.clone(),
                });
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_declared_variables(child, source, out);
    }
}

fn parameter_list(node: Node<'_>, source: &str) -> Vec<Parameter> {
    let Some(list) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut parameters = Vec::new();
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        if child.kind() != "parameter" {
            continue;
        }
        let Some(name) = name_text(child, source) else {
            continue;
        };
        let type_name = child
            .child_by_field_name("type")
            .map(|n| node_text(n, source))
            .unwrap_or_else(|| "object".to_string());
        let mut modifier = None;
        let count = child.child_count();
        for i in 0..count {
            if let Some(token) = child.child(i) {
                if matches!(token.kind(), "ref" | "out" | "in" | "params") {
                    modifier = Some(token.kind().to_string());
                }
            }
        }
        parameters.push(Parameter {
            name,
            type_name,
            modifier,
            default_value: equals_value(child, source),
        });
    }
    parameters
}

// ─── Node Helpers ───────────────────────────────────────────────

fn make_statement(index: u32, text: String) -> Statement {
    let usage = facts::extract(&text);
    Statement {
        index,
        text,
        used_fields_and_properties: usage.fields_and_properties,
        used_constructors: usage.constructors,
        used_methods: usage.methods,
        used_types: usage.types,
    }
}

fn modifier_list(node: Node<'_>, source: &str) -> Vec<String> {
    let mut modifiers = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "modifier" {
            modifiers.push(node_text(child, source));
        }
    }
    modifiers
}

/// Base types from a `base_list`, in declaration order.
fn base_list(node: Node<'_>, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "base_list" {
            continue;
        }
        let mut list_cursor = child.walk();
        for base in child.named_children(&mut list_cursor) {
            match base.kind() {
                "argument_list" => {}
                "primary_constructor_base_type" => {
                    let name = base
                        .child_by_field_name("type")
                        .map(|n| node_text(n, source))
                        .unwrap_or_else(|| node_text(base, source));
                    if !name.is_empty() {
                        bases.push(name);
                    }
                }
                _ => {
                    let name = node_text(base, source);
                    if !name.is_empty() {
                        bases.push(name);
                    }
                }
            }
        }
    }
    bases
}

fn using_target(node: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "qualified_name" | "identifier" | "generic_name" | "alias_qualified_name" => {
                let name = node_text(child, source);
                if !name.is_empty() {
                    return Some(name);
                }
            }
            _ => {}
        }
    }
    None
}

/// Initializer text after the first `=` of a declarator, parameter, or
/// enum member; `None` when there is no initializer.
fn equals_value(node: Node<'_>, source: &str) -> Option<String> {
    let text = node_text(node, source);
    let (_, value) = text.split_once('=')?;
    let value = collapse_whitespace(value.trim());
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn named_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() == kind)
}

fn name_text(node: Node<'_>, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, source))
        .filter(|n| !n.is_empty())
}

fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .trim()
        .to_string()
}

fn arrow_expression_text(node: Node<'_>, source: &str) -> String {
    let text = node_text(node, source);
    collapse_whitespace(text.trim_start_matches("=>").trim())
}

fn arrow_return_text(node: Node<'_>, source: &str) -> String {
    format!("return {};", arrow_expression_text(node, source))
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_ws = true;
        } else {
            if in_ws && !out.is_empty() {
                out.push(' ');
            }
            in_ws = false;
            out.push(c);
        }
    }
    out
}

fn first_error_message(root: Node<'_>) -> String {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return format!("syntax error at line {}", node.start_position().row + 1);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    "syntax error".to_string()
}
