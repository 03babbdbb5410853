//! Code regeneration — serializing a model subtree back into C# text.
//!
//! The output follows fixed conventions: four-space indentation, Allman
//! braces, usings first, members in array order. The contract is that
//! regenerated text re-parses into a structurally equivalent model; that
//! round trip is validated before any edit is committed.

use crate::model::{
    Accessor, Constructor, EnumValue, Field, Method, Parameter, Property, TypeDeclaration,
    TypeKind, TypeMembers,
};

const INDENT: &str = "    ";

/// Serialize one type declaration, with its own using directives and
/// namespace block.
pub fn to_source_text(decl: &TypeDeclaration) -> String {
    let mut out = String::new();
    for using in &decl.namespace_dependencies {
        out.push_str("using ");
        out.push_str(using);
        out.push_str(";\n");
    }
    if !decl.namespace_dependencies.is_empty() {
        out.push('\n');
    }

    if decl.namespace.is_empty() {
        write_type(&mut out, decl, 0);
    } else {
        out.push_str(&format!("namespace {}\n{{\n", decl.namespace));
        write_type(&mut out, decl, 1);
        out.push_str("}\n");
    }
    out
}

/// Serialize every type that belongs in one file. Using directives are
/// merged and deduplicated; each type keeps its own namespace block.
pub fn to_file_text(decls: &[&TypeDeclaration]) -> String {
    let mut usings: Vec<&str> = Vec::new();
    for decl in decls {
        for using in &decl.namespace_dependencies {
            if !usings.contains(&using.as_str()) {
                usings.push(using);
            }
        }
    }

    let mut out = String::new();
    for using in &usings {
        out.push_str("using ");
        out.push_str(using);
        out.push_str(";\n");
    }
    if !usings.is_empty() {
        out.push('\n');
    }

    for (i, decl) in decls.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if decl.namespace.is_empty() {
            write_type(&mut out, decl, 0);
        } else {
            out.push_str(&format!("namespace {}\n{{\n", decl.namespace));
            write_type(&mut out, decl, 1);
            out.push_str("}\n");
        }
    }
    out
}

fn write_type(out: &mut String, decl: &TypeDeclaration, level: usize) {
    let keyword = match decl.kind() {
        TypeKind::Class => "class",
        TypeKind::Struct => "struct",
        TypeKind::Interface => "interface",
        TypeKind::Enum => "enum",
    };
    let mut header = String::new();
    for modifier in &decl.modifiers {
        header.push_str(modifier);
        header.push(' ');
    }
    header.push_str(keyword);
    header.push(' ');
    header.push_str(&decl.name);
    if !decl.parent_inheritances.is_empty() {
        header.push_str(" : ");
        header.push_str(&decl.parent_inheritances.join(", "));
    }
    push_line(out, level, &header);
    push_line(out, level, "{");

    match &decl.members {
        TypeMembers::Class(m) | TypeMembers::Struct(m) => {
            let mut first = true;
            for field in &m.fields {
                separate(out, &mut first);
                write_field(out, field, level + 1);
            }
            for property in &m.properties {
                separate(out, &mut first);
                write_property(out, property, level + 1);
            }
            for ctor in &m.constructors {
                separate(out, &mut first);
                write_constructor(out, ctor, level + 1);
            }
            for method in &m.methods {
                separate(out, &mut first);
                write_method(out, method, level + 1);
            }
        }
        TypeMembers::Interface(m) => {
            let mut first = true;
            for property in &m.properties {
                separate(out, &mut first);
                write_property(out, property, level + 1);
            }
            for method in &m.methods {
                separate(out, &mut first);
                write_method(out, method, level + 1);
            }
        }
        TypeMembers::Enum(m) => {
            for value in &m.values {
                write_enum_value(out, value, level + 1);
            }
        }
    }

    push_line(out, level, "}");
}

fn write_field(out: &mut String, field: &Field, level: usize) {
    let mut line = String::new();
    for modifier in &field.modifiers {
        line.push_str(modifier);
        line.push(' ');
    }
    line.push_str(&field.type_name);
    line.push(' ');
    line.push_str(&field.name);
    if let Some(default) = &field.default_value {
        line.push_str(" = ");
        line.push_str(default);
    }
    line.push(';');
    push_line(out, level, &line);
}

fn write_property(out: &mut String, property: &Property, level: usize) {
    let mut header = String::new();
    for modifier in &property.modifiers {
        header.push_str(modifier);
        header.push(' ');
    }
    header.push_str(&property.type_name);
    header.push(' ');
    header.push_str(&property.name);

    let any_body = property.accessors.iter().any(|a| a.has_body);
    if !any_body {
        // Auto-property: accessors collapse onto the declaration line.
        let accessors: Vec<String> = property
            .accessors
            .iter()
            .map(|a| format!("{};", a.kind))
            .collect();
        if accessors.is_empty() {
            push_line(out, level, &format!("{header} {{ get; }}"));
        } else {
            push_line(out, level, &format!("{header} {{ {} }}", accessors.join(" ")));
        }
        return;
    }

    push_line(out, level, &header);
    push_line(out, level, "{");
    for accessor in &property.accessors {
        write_accessor(out, accessor, level + 1);
    }
    push_line(out, level, "}");
}

fn write_accessor(out: &mut String, accessor: &Accessor, level: usize) {
    if !accessor.has_body {
        push_line(out, level, &format!("{};", accessor.kind));
        return;
    }
    push_line(out, level, &accessor.kind.to_string());
    push_line(out, level, "{");
    for statement in &accessor.statements {
        push_line(out, level + 1, &statement.text);
    }
    push_line(out, level, "}");
}

fn write_constructor(out: &mut String, ctor: &Constructor, level: usize) {
    let mut header = String::new();
    for modifier in &ctor.modifiers {
        header.push_str(modifier);
        header.push(' ');
    }
    header.push_str(&ctor.name);
    header.push('(');
    header.push_str(&parameter_text(&ctor.parameters));
    header.push(')');
    push_line(out, level, &header);
    push_line(out, level, "{");
    for statement in &ctor.statements {
        push_line(out, level + 1, &statement.text);
    }
    push_line(out, level, "}");
}

fn write_method(out: &mut String, method: &Method, level: usize) {
    let mut header = String::new();
    for modifier in &method.modifiers {
        header.push_str(modifier);
        header.push(' ');
    }
    header.push_str(&method.return_type);
    header.push(' ');
    header.push_str(&method.name);
    header.push('(');
    header.push_str(&parameter_text(&method.parameters));
    header.push(')');

    if !method.has_body {
        header.push(';');
        push_line(out, level, &header);
        return;
    }
    push_line(out, level, &header);
    push_line(out, level, "{");
    for statement in &method.statements {
        push_line(out, level + 1, &statement.text);
    }
    push_line(out, level, "}");
}

fn write_enum_value(out: &mut String, value: &EnumValue, level: usize) {
    let line = match &value.value {
        Some(explicit) => format!("{} = {},", value.name, explicit),
        None => format!("{},", value.name),
    };
    push_line(out, level, &line);
}

fn parameter_text(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let mut text = String::new();
            if let Some(modifier) = &p.modifier {
                text.push_str(modifier);
                text.push(' ');
            }
            text.push_str(&p.type_name);
            text.push(' ');
            text.push_str(&p.name);
            if let Some(default) = &p.default_value {
                text.push_str(" = ");
                text.push_str(default);
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_line(out: &mut String, level: usize, text: &str) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn separate(out: &mut String, first: &mut bool) {
    if *first {
        *first = false;
    } else {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::path::PathBuf;

    fn roundtrip(source: &str) -> (Vec<TypeDeclaration>, Vec<TypeDeclaration>) {
        let path = PathBuf::from("roundtrip.cs");
        let first = parser::parse(source, &path).expect("initial parse").into_vec();
        let regenerated = to_file_text(&first.iter().collect::<Vec<_>>());
        let second = parser::parse(&regenerated, &path)
            .unwrap_or_else(|e| panic!("regenerated text failed to parse: {e}\n{regenerated}"))
            .into_vec();
        (first, second)
    }

    #[test]
    fn class_round_trips_structurally() {
        let (first, second) = roundtrip(
            r#"
using System;

namespace App.Core
{
    public class Order : OrderBase
    {
        private int _count = 2;
        public string Name { get; set; }

        public Order(int count)
        {
            _count = count;
        }

        public int Total(int price, int discount = 0)
        {
            int sum = _count * price;
            return sum - discount;
        }
    }
}
"#,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn interface_and_enum_round_trip() {
        let (first, second) = roundtrip(
            r#"
namespace App
{
    public interface IRepository
    {
        string Name { get; }
        void Save(int id);
    }

    public enum Status
    {
        Active,
        Closed = 5,
    }
}
"#,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn bodied_accessors_round_trip() {
        let (first, second) = roundtrip(
            r#"
namespace App
{
    public class Counter
    {
        private int _value;

        public int Value
        {
            get
            {
                return _value;
            }
            set
            {
                _value = value;
            }
        }
    }
}
"#,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn global_namespace_type_round_trips() {
        let (first, second) = roundtrip("public class Standalone { }");
        assert_eq!(first, second);
        assert_eq!(first[0].namespace, "");
    }

    #[test]
    fn ref_parameters_round_trip() {
        let (first, second) = roundtrip(
            "namespace N { public class A { public void Swap(ref int a, ref int b) { } } }",
        );
        assert_eq!(first, second);
    }

    #[test]
    fn multi_type_file_merges_usings() {
        let path = PathBuf::from("two.cs");
        let parsed = parser::parse(
            r#"
using System;

namespace N
{
    public class A { }
    public class B { }
}
"#,
            &path,
        )
        .unwrap()
        .into_vec();
        let text = to_file_text(&parsed.iter().collect::<Vec<_>>());
        assert_eq!(text.matches("using System;").count(), 1);
        assert_eq!(text.matches("namespace N").count(), 2);

        let reparsed = parser::parse(&text, &path).unwrap().into_vec();
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn serialization_is_deterministic() {
        let parsed = parser::parse(
            "namespace N { public class A { private int _x; } }",
            &PathBuf::from("a.cs"),
        )
        .unwrap()
        .into_vec();
        assert_eq!(to_source_text(&parsed[0]), to_source_text(&parsed[0]));
    }
}
