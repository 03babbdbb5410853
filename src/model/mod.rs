//! The code model — plain data definitions for parsed C# declarations.
//!
//! Nothing in here has behavior beyond structural accessors. Types are
//! identified by `(namespace, name)`; members carry a small-integer `index`
//! that is part of their identity and survives incremental edits (deletion
//! leaves a gap, only an explicit insert shifts siblings).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Class => write!(f, "class"),
            TypeKind::Struct => write!(f, "struct"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Enum => write!(f, "enum"),
        }
    }
}

/// Explicit member discriminant, carried through key generation and patch
/// routing rather than inferred from structural shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    Property,
    Constructor,
    Method,
    Value,
}

impl MemberKind {
    /// The tag used in graph keys, e.g. `N.Type.method.2`.
    pub fn tag(&self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Property => "property",
            MemberKind::Constructor => "constructor",
            MemberKind::Method => "method",
            MemberKind::Value => "value",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A parsed type declaration and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    /// Ordered keyword strings, e.g. `["public", "abstract"]`.
    pub modifiers: Vec<String>,
    /// Single qualifying namespace path; empty for the global namespace.
    pub namespace: String,
    /// Imported namespaces searched during resolution.
    pub namespace_dependencies: Vec<String>,
    /// Unresolved base type/interface name strings, in declaration order.
    pub parent_inheritances: Vec<String>,
    /// The file this declaration was parsed from.
    pub source_file_path: PathBuf,
    /// Set when an edit has touched this type but no reparse has validated it.
    #[serde(default)]
    pub stale: bool,
    pub members: TypeMembers,
}

/// Member sets per type kind. Consumption sites match exhaustively; there is
/// no runtime shape inspection anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMembers {
    Class(ObjectMembers),
    Struct(ObjectMembers),
    Interface(InterfaceMembers),
    Enum(EnumMembers),
}

/// Members a class or struct owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMembers {
    pub fields: Vec<Field>,
    pub properties: Vec<Property>,
    pub constructors: Vec<Constructor>,
    pub methods: Vec<Method>,
}

/// Members an interface owns. No bodies are implied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMembers {
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
}

/// Ordered values of an enum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumMembers {
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub index: u32,
    pub name: String,
    pub type_name: String,
    pub modifiers: Vec<String>,
    /// Initializer text, without the `=`.
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub index: u32,
    pub name: String,
    pub type_name: String,
    pub modifiers: Vec<String>,
    pub accessors: Vec<Accessor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    Get,
    Set,
}

impl fmt::Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorKind::Get => write!(f, "get"),
            AccessorKind::Set => write!(f, "set"),
        }
    }
}

/// A property accessor. Auto-accessors have an empty statement list and
/// `has_body == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessor {
    pub kind: AccessorKind,
    pub has_body: bool,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    pub index: u32,
    pub name: String,
    pub modifiers: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub declared_variables: Vec<DeclaredVariable>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub index: u32,
    pub name: String,
    pub modifiers: Vec<String>,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub declared_variables: Vec<DeclaredVariable>,
    pub statements: Vec<Statement>,
    /// Interface methods and abstract methods carry no body.
    pub has_body: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub index: u32,
    pub name: String,
    /// Explicit constant text, without the `=`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    /// `ref`, `out`, `in`, `params`, or absent.
    pub modifier: Option<String>,
    /// Default value text, without the `=`.
    pub default_value: Option<String>,
}

/// A local variable declaration, recorded for scope inference only. Its
/// type name is not itself re-resolved recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredVariable {
    pub name: String,
    pub type_name: String,
}

/// One statement of a callable body: its position, literal text, and the
/// raw usage-fact candidates the parser's heuristic pass extracted. The
/// candidates are unresolved token strings; dotted access is stored as
/// `"receiver.member"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub index: u32,
    pub text: String,
    pub used_fields_and_properties: Vec<String>,
    pub used_constructors: Vec<String>,
    pub used_methods: Vec<String>,
    pub used_types: Vec<String>,
}

impl TypeDeclaration {
    pub fn kind(&self) -> TypeKind {
        match &self.members {
            TypeMembers::Class(_) => TypeKind::Class,
            TypeMembers::Struct(_) => TypeKind::Struct,
            TypeMembers::Interface(_) => TypeKind::Interface,
            TypeMembers::Enum(_) => TypeKind::Enum,
        }
    }

    /// The deterministic graph key of this type: `namespace.name`, or the
    /// bare name for the global namespace.
    pub fn type_key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// True when this type carries the `abstract` modifier.
    pub fn is_abstract(&self) -> bool {
        self.modifiers.iter().any(|m| m == "abstract")
    }

    /// Fields, where the kind owns any (empty slice otherwise).
    pub fn fields(&self) -> &[Field] {
        match &self.members {
            TypeMembers::Class(m) | TypeMembers::Struct(m) => &m.fields,
            TypeMembers::Interface(_) | TypeMembers::Enum(_) => &[],
        }
    }

    pub fn properties(&self) -> &[Property] {
        match &self.members {
            TypeMembers::Class(m) | TypeMembers::Struct(m) => &m.properties,
            TypeMembers::Interface(m) => &m.properties,
            TypeMembers::Enum(_) => &[],
        }
    }

    pub fn constructors(&self) -> &[Constructor] {
        match &self.members {
            TypeMembers::Class(m) | TypeMembers::Struct(m) => &m.constructors,
            TypeMembers::Interface(_) | TypeMembers::Enum(_) => &[],
        }
    }

    pub fn methods(&self) -> &[Method] {
        match &self.members {
            TypeMembers::Class(m) | TypeMembers::Struct(m) => &m.methods,
            TypeMembers::Interface(m) => &m.methods,
            TypeMembers::Enum(_) => &[],
        }
    }

    pub fn enum_values(&self) -> &[EnumValue] {
        match &self.members {
            TypeMembers::Enum(m) => &m.values,
            _ => &[],
        }
    }

    /// The highest member index in use, across every member kind.
    pub fn max_member_index(&self) -> Option<u32> {
        let mut max = None;
        let mut track = |index: u32| {
            max = Some(max.map_or(index, |m: u32| m.max(index)));
        };
        for f in self.fields() {
            track(f.index);
        }
        for p in self.properties() {
            track(p.index);
        }
        for c in self.constructors() {
            track(c.index);
        }
        for m in self.methods() {
            track(m.index);
        }
        for v in self.enum_values() {
            track(v.index);
        }
        max
    }
}

impl Method {
    /// Default content for a method inserted through a graph edit: public,
    /// void, no parameters, empty brace body.
    pub fn stub(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            modifiers: vec!["public".to_string()],
            return_type: "void".to_string(),
            parameters: Vec::new(),
            declared_variables: Vec::new(),
            statements: Vec::new(),
            has_body: true,
        }
    }
}

impl Field {
    /// Default content for a field inserted through a graph edit.
    pub fn stub(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            type_name: "object".to_string(),
            modifiers: vec!["private".to_string()],
            default_value: None,
        }
    }
}

impl Property {
    /// Default content for a property inserted through a graph edit: a
    /// public auto-property with get and set.
    pub fn stub(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            type_name: "object".to_string(),
            modifiers: vec!["public".to_string()],
            accessors: vec![
                Accessor {
                    kind: AccessorKind::Get,
                    has_body: false,
                    statements: Vec::new(),
                },
                Accessor {
                    kind: AccessorKind::Set,
                    has_body: false,
                    statements: Vec::new(),
                },
            ],
        }
    }
}

impl Constructor {
    /// Default content for a constructor inserted through a graph edit.
    pub fn stub(index: u32, type_name: impl Into<String>) -> Self {
        Self {
            index,
            name: type_name.into(),
            modifiers: vec!["public".to_string()],
            parameters: Vec::new(),
            declared_variables: Vec::new(),
            statements: Vec::new(),
        }
    }
}

impl EnumValue {
    pub fn stub(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            value: None,
        }
    }
}

/// Everything one parse call produced, split by type kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTypes {
    pub classes: Vec<TypeDeclaration>,
    pub structs: Vec<TypeDeclaration>,
    pub interfaces: Vec<TypeDeclaration>,
    pub enums: Vec<TypeDeclaration>,
}

impl ParsedTypes {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.structs.len() + self.interfaces.len() + self.enums.len()
    }

    /// All declarations in source order within each kind bucket.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.classes
            .iter()
            .chain(self.structs.iter())
            .chain(self.interfaces.iter())
            .chain(self.enums.iter())
    }

    /// Flatten into one vector, consuming the buckets.
    pub fn into_vec(self) -> Vec<TypeDeclaration> {
        let mut out = self.classes;
        out.extend(self.structs);
        out.extend(self.interfaces);
        out.extend(self.enums);
        out
    }

    pub fn push(&mut self, decl: TypeDeclaration) {
        match decl.kind() {
            TypeKind::Class => self.classes.push(decl),
            TypeKind::Struct => self.structs.push(decl),
            TypeKind::Interface => self.interfaces.push(decl),
            TypeKind::Enum => self.enums.push(decl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_class(namespace: &str, name: &str) -> TypeDeclaration {
        TypeDeclaration {
            name: name.to_string(),
            modifiers: vec!["public".to_string()],
            namespace: namespace.to_string(),
            namespace_dependencies: Vec::new(),
            parent_inheritances: Vec::new(),
            source_file_path: PathBuf::from("a.cs"),
            stale: false,
            members: TypeMembers::Class(ObjectMembers::default()),
        }
    }

    #[test]
    fn type_key_joins_namespace_and_name() {
        assert_eq!(empty_class("App.Core", "User").type_key(), "App.Core.User");
        assert_eq!(empty_class("", "User").type_key(), "User");
    }

    #[test]
    fn member_kind_tags_are_stable() {
        assert_eq!(MemberKind::Field.tag(), "field");
        assert_eq!(MemberKind::Value.tag(), "value");
    }

    #[test]
    fn max_member_index_spans_kinds() {
        let mut decl = empty_class("N", "A");
        if let TypeMembers::Class(m) = &mut decl.members {
            m.fields.push(Field::stub(0, "a"));
            m.methods.push(Method::stub(4, "B"));
        }
        assert_eq!(decl.max_member_index(), Some(4));
    }

    #[test]
    fn parsed_types_push_routes_by_kind() {
        let mut parsed = ParsedTypes::default();
        parsed.push(empty_class("N", "A"));
        let mut e = empty_class("N", "E");
        e.members = TypeMembers::Enum(EnumMembers::default());
        parsed.push(e);
        assert_eq!(parsed.classes.len(), 1);
        assert_eq!(parsed.enums.len(), 1);
        assert_eq!(parsed.len(), 2);
    }
}
