//! The global in-memory model and its incremental reconciler.
//!
//! One `WorkspaceModel` holds every parsed type across all files. File-level
//! reconciliation wholesale-replaces a path's contribution, guarded by a
//! per-path version counter so an older in-flight reparse can never clobber
//! a newer one (last-writer-wins by version, not arrival order). Node-level
//! patches locate declarations by their stored index chains; indices are
//! identifiers, not positions, so deletion leaves gaps and only an explicit
//! insert shifts siblings.

pub mod scan;

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::model::{
    Constructor, EnumValue, Field, MemberKind, Method, Parameter, Property, Statement,
    TypeDeclaration, TypeMembers,
};
use crate::parser;
use crate::protocol::{ComponentLocation, ModelPatch, NodeEdit, Placement, RegenOutcome};
use crate::regen;

/// The shared global model. Mutated synchronously per operation; callers
/// serialize access (see the service actor).
#[derive(Debug, Default)]
pub struct WorkspaceModel {
    types: Vec<TypeDeclaration>,
    /// Highest version handed out per path.
    issued: HashMap<PathBuf, u64>,
    /// Version of the last applied contribution per path.
    applied: HashMap<PathBuf, u64>,
}

impl WorkspaceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(&self) -> &[TypeDeclaration] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn types_for_path(&self, path: &Path) -> Vec<&TypeDeclaration> {
        self.types
            .iter()
            .filter(|t| t.source_file_path == path)
            .collect()
    }

    pub fn find_type(&self, namespace: &str, name: &str) -> Option<&TypeDeclaration> {
        self.types
            .iter()
            .find(|t| t.namespace == namespace && t.name == name)
    }

    fn find_type_mut(&mut self, namespace: &str, name: &str) -> Option<&mut TypeDeclaration> {
        self.types
            .iter_mut()
            .find(|t| t.namespace == namespace && t.name == name)
    }

    // ─── File-Level Reconciliation ──────────────────────────────

    /// Hand out the next version for a path. Capture this when a change is
    /// observed, before parsing starts.
    pub fn next_version(&mut self, path: &Path) -> u64 {
        let version = self.issued.entry(path.to_path_buf()).or_insert(0);
        *version += 1;
        *version
    }

    /// Replace a path's whole contribution. Returns false when a newer
    /// version was already applied and this result must be discarded.
    pub fn replace_file(
        &mut self,
        path: &Path,
        types: Vec<TypeDeclaration>,
        version: u64,
    ) -> bool {
        let applied = self.applied.entry(path.to_path_buf()).or_insert(0);
        if version < *applied {
            debug!(
                path = %path.display(),
                version,
                applied = *applied,
                "discarding superseded parse result"
            );
            return false;
        }
        *applied = version;
        self.types.retain(|t| t.source_file_path != path);
        self.types.extend(types);
        true
    }

    /// Merge newly written declarations into a file that already has
    /// unrelated ones: same-identity types are replaced, the rest are kept.
    pub fn merge_file(&mut self, path: &Path, new_types: Vec<TypeDeclaration>) {
        self.types.retain(|t| {
            t.source_file_path != path
                || !new_types
                    .iter()
                    .any(|n| n.namespace == t.namespace && n.name == t.name)
        });
        self.types.extend(new_types);
    }

    /// Drop every declaration parsed from a path. Bumps the version so any
    /// still-in-flight parse of the removed file is discarded on arrival.
    pub fn remove_file(&mut self, path: &Path) {
        let version = self.next_version(path);
        self.applied.insert(path.to_path_buf(), version);
        let before = self.types.len();
        self.types.retain(|t| t.source_file_path != path);
        debug!(
            path = %path.display(),
            removed = before - self.types.len(),
            "removed file from model"
        );
    }

    // ─── Patch Operations ───────────────────────────────────────

    /// Apply a patch without validation. Returns the owning file path; the
    /// touched type stays marked stale until a regeneration round trip
    /// clears it.
    pub fn apply(&mut self, patch: &ModelPatch) -> Result<PathBuf> {
        match patch {
            ModelPatch::Edit(edit) => self.apply_edit(edit),
            ModelPatch::Add {
                reference,
                placement,
            } => self.add_declaration(reference, *placement).map(|(p, _)| p),
            ModelPatch::Delete { location } => self.delete_declaration(location),
        }
    }

    /// Apply a patch, regenerate the owning file, and re-parse the result to
    /// validate it. On failure the model is rolled back and the edit is
    /// rejected. On success the regenerated text is returned for the host
    /// to write; `None` text means the file lost its last declaration and
    /// must be deleted instead.
    pub fn commit(&mut self, patch: &ModelPatch) -> Result<RegenOutcome> {
        let backup = self.types.clone();
        let path = self.apply(patch)?;

        let decls = self.types_for_path(&path);
        if decls.is_empty() {
            self.remove_file(&path);
            return Ok(RegenOutcome { path, text: None });
        }
        let text = regen::to_file_text(&decls);
        match parser::parse(&text, &path) {
            Ok(_) => {
                for decl in self.types.iter_mut().filter(|t| t.source_file_path == path) {
                    decl.stale = false;
                }
                Ok(RegenOutcome {
                    path,
                    text: Some(text),
                })
            }
            Err(err) => {
                self.types = backup;
                Err(ModelError::RegenerationValidation {
                    file: path,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Commit a patch and apply its outcome to disk: the regenerated text is
    /// written to the backing file, or the file is deleted when the patch
    /// removed its last declaration.
    pub fn commit_to_disk(&mut self, patch: &ModelPatch) -> Result<RegenOutcome> {
        let outcome = self.commit(patch)?;
        match &outcome.text {
            Some(text) => std::fs::write(&outcome.path, text)?,
            None => {
                if let Err(err) = std::fs::remove_file(&outcome.path) {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        return Err(err.into());
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// Mutate only the listed fields of one declaration.
    pub fn apply_edit(&mut self, edit: &NodeEdit) -> Result<PathBuf> {
        let (namespace, name) = edit.location.type_identity();
        let decl = self
            .find_type_mut(namespace, name)
            .ok_or_else(|| ModelError::UnknownTarget(edit.location.to_string()))?;

        let applied = match &edit.location {
            ComponentLocation::Type { .. } => {
                if let Some(new_name) = string_field(&edit.fields, "name") {
                    decl.name = new_name;
                }
                if let Some(modifiers) = list_field(&edit.fields, "modifiers") {
                    decl.modifiers = modifiers;
                }
                if let Some(parents) = list_field(&edit.fields, "parentInheritances") {
                    decl.parent_inheritances = parents;
                }
                if let Some(deps) = list_field(&edit.fields, "namespaceDependencies") {
                    decl.namespace_dependencies = deps;
                }
                true
            }
            ComponentLocation::Member {
                member_kind, index, ..
            } => edit_member(decl, *member_kind, *index, &edit.fields),
            ComponentLocation::Parameter {
                member_kind,
                index,
                parameter_index,
                ..
            } => edit_parameter(decl, *member_kind, *index, *parameter_index, &edit.fields),
            ComponentLocation::Statement {
                member_kind,
                index,
                accessor_index,
                statement_index,
                ..
            } => edit_statement(
                decl,
                *member_kind,
                *index,
                *accessor_index,
                *statement_index,
                &edit.fields,
            ),
        };
        if !applied {
            return Err(ModelError::UnknownTarget(edit.location.to_string()));
        }

        decl.stale = true;
        Ok(decl.source_file_path.clone())
    }

    /// Insert a new sibling next to the referenced member. The target index
    /// is the reference index (Before) or one past it (After); every
    /// existing sibling at or beyond the target shifts up by one.
    pub fn add_declaration(
        &mut self,
        reference: &ComponentLocation,
        placement: Placement,
    ) -> Result<(PathBuf, ComponentLocation)> {
        let ComponentLocation::Member {
            namespace,
            type_name,
            member_kind,
            index,
        } = reference
        else {
            return Err(ModelError::UnknownTarget(reference.to_string()));
        };
        let decl = self
            .find_type_mut(namespace, type_name)
            .ok_or_else(|| ModelError::UnknownTarget(reference.to_string()))?;

        let target = match placement {
            Placement::Before => *index,
            Placement::After => *index + 1,
        };
        if !insert_member(decl, *member_kind, target) {
            return Err(ModelError::UnknownTarget(reference.to_string()));
        }
        decl.stale = true;

        let path = decl.source_file_path.clone();
        let location = ComponentLocation::Member {
            namespace: namespace.clone(),
            type_name: type_name.clone(),
            member_kind: *member_kind,
            index: target,
        };
        Ok((path, location))
    }

    /// Remove the declaration at a location. Sibling indices are not
    /// renumbered; gaps are permitted and outstanding references held by
    /// the renderer stay valid.
    pub fn delete_declaration(&mut self, location: &ComponentLocation) -> Result<PathBuf> {
        if let ComponentLocation::Type { namespace, name } = location {
            let position = self
                .types
                .iter()
                .position(|t| &t.namespace == namespace && &t.name == name)
                .ok_or_else(|| ModelError::UnknownTarget(location.to_string()))?;
            let removed = self.types.remove(position);
            return Ok(removed.source_file_path);
        }

        let (namespace, name) = location.type_identity();
        let decl = self
            .find_type_mut(namespace, name)
            .ok_or_else(|| ModelError::UnknownTarget(location.to_string()))?;
        let removed = match location {
            ComponentLocation::Type { .. } => false,
            ComponentLocation::Member {
                member_kind, index, ..
            } => remove_member(decl, *member_kind, *index),
            ComponentLocation::Parameter {
                member_kind,
                index,
                parameter_index,
                ..
            } => remove_parameter(decl, *member_kind, *index, *parameter_index as usize),
            ComponentLocation::Statement {
                member_kind,
                index,
                accessor_index,
                statement_index,
                ..
            } => remove_statement(
                decl,
                *member_kind,
                *index,
                *accessor_index,
                *statement_index,
            ),
        };
        if !removed {
            return Err(ModelError::UnknownTarget(location.to_string()));
        }
        decl.stale = true;
        Ok(decl.source_file_path.clone())
    }
}

// ─── Kind-Checked Member Access ─────────────────────────────────

fn fields_mut(decl: &mut TypeDeclaration) -> Option<&mut Vec<Field>> {
    match &mut decl.members {
        TypeMembers::Class(m) | TypeMembers::Struct(m) => Some(&mut m.fields),
        TypeMembers::Interface(_) | TypeMembers::Enum(_) => None,
    }
}

fn properties_mut(decl: &mut TypeDeclaration) -> Option<&mut Vec<Property>> {
    match &mut decl.members {
        TypeMembers::Class(m) | TypeMembers::Struct(m) => Some(&mut m.properties),
        TypeMembers::Interface(m) => Some(&mut m.properties),
        TypeMembers::Enum(_) => None,
    }
}

fn constructors_mut(decl: &mut TypeDeclaration) -> Option<&mut Vec<Constructor>> {
    match &mut decl.members {
        TypeMembers::Class(m) | TypeMembers::Struct(m) => Some(&mut m.constructors),
        TypeMembers::Interface(_) | TypeMembers::Enum(_) => None,
    }
}

fn methods_mut(decl: &mut TypeDeclaration) -> Option<&mut Vec<Method>> {
    match &mut decl.members {
        TypeMembers::Class(m) | TypeMembers::Struct(m) => Some(&mut m.methods),
        TypeMembers::Interface(m) => Some(&mut m.methods),
        TypeMembers::Enum(_) => None,
    }
}

fn values_mut(decl: &mut TypeDeclaration) -> Option<&mut Vec<EnumValue>> {
    match &mut decl.members {
        TypeMembers::Enum(m) => Some(&mut m.values),
        _ => None,
    }
}

// ─── Member Mutation ────────────────────────────────────────────

fn edit_member(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
    fields: &HashMap<String, Value>,
) -> bool {
    match kind {
        MemberKind::Field => {
            let Some(field) = fields_mut(decl).and_then(|v| v.iter_mut().find(|f| f.index == index))
            else {
                return false;
            };
            if let Some(name) = string_field(fields, "name") {
                field.name = name;
            }
            if let Some(type_name) = string_field(fields, "typeName") {
                field.type_name = type_name;
            }
            if let Some(modifiers) = list_field(fields, "modifiers") {
                field.modifiers = modifiers;
            }
            if let Some(default) = optional_string_field(fields, "defaultValue") {
                field.default_value = default;
            }
            true
        }
        MemberKind::Property => {
            let Some(property) =
                properties_mut(decl).and_then(|v| v.iter_mut().find(|p| p.index == index))
            else {
                return false;
            };
            if let Some(name) = string_field(fields, "name") {
                property.name = name;
            }
            if let Some(type_name) = string_field(fields, "typeName") {
                property.type_name = type_name;
            }
            if let Some(modifiers) = list_field(fields, "modifiers") {
                property.modifiers = modifiers;
            }
            true
        }
        MemberKind::Constructor => {
            let Some(ctor) =
                constructors_mut(decl).and_then(|v| v.iter_mut().find(|c| c.index == index))
            else {
                return false;
            };
            if let Some(name) = string_field(fields, "name") {
                ctor.name = name;
            }
            if let Some(modifiers) = list_field(fields, "modifiers") {
                ctor.modifiers = modifiers;
            }
            true
        }
        MemberKind::Method => {
            let Some(method) =
                methods_mut(decl).and_then(|v| v.iter_mut().find(|m| m.index == index))
            else {
                return false;
            };
            if let Some(name) = string_field(fields, "name") {
                method.name = name;
            }
            if let Some(return_type) = string_field(fields, "returnType") {
                method.return_type = return_type;
            }
            if let Some(modifiers) = list_field(fields, "modifiers") {
                method.modifiers = modifiers;
            }
            true
        }
        MemberKind::Value => {
            let Some(value) = values_mut(decl).and_then(|v| v.iter_mut().find(|e| e.index == index))
            else {
                return false;
            };
            if let Some(name) = string_field(fields, "name") {
                value.name = name;
            }
            if let Some(explicit) = optional_string_field(fields, "value") {
                value.value = explicit;
            }
            true
        }
    }
}

fn edit_parameter(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
    parameter_index: u32,
    fields: &HashMap<String, Value>,
) -> bool {
    let Some(parameter) = callable_parameters_mut(decl, kind, index)
        .and_then(|v| v.get_mut(parameter_index as usize))
    else {
        return false;
    };
    if let Some(name) = string_field(fields, "name") {
        parameter.name = name;
    }
    if let Some(type_name) = string_field(fields, "typeName") {
        parameter.type_name = type_name;
    }
    if let Some(modifier) = optional_string_field(fields, "modifier") {
        parameter.modifier = modifier;
    }
    if let Some(default) = optional_string_field(fields, "defaultValue") {
        parameter.default_value = default;
    }
    true
}

fn edit_statement(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
    accessor_index: Option<u32>,
    statement_index: u32,
    fields: &HashMap<String, Value>,
) -> bool {
    let Some(statement) = statements_mut(decl, kind, index, accessor_index)
        .and_then(|v| v.iter_mut().find(|s| s.index == statement_index))
    else {
        return false;
    };
    if let Some(text) = string_field(fields, "text") {
        // Text changes re-run the usage-fact pass; the index and therefore
        // the key stay put.
        let usage = parser::facts::extract(&text);
        statement.text = text;
        statement.used_fields_and_properties = usage.fields_and_properties;
        statement.used_constructors = usage.constructors;
        statement.used_methods = usage.methods;
        statement.used_types = usage.types;
    }
    true
}

fn insert_member(decl: &mut TypeDeclaration, kind: MemberKind, target: u32) -> bool {
    let type_name = decl.name.clone();
    let is_interface = matches!(decl.members, TypeMembers::Interface(_));
    match kind {
        MemberKind::Field => match fields_mut(decl) {
            Some(list) => {
                shift_and_insert(list, target, Field::stub(target, "NewField"), |f| {
                    &mut f.index
                });
                true
            }
            None => false,
        },
        MemberKind::Property => match properties_mut(decl) {
            Some(list) => {
                shift_and_insert(list, target, Property::stub(target, "NewProperty"), |p| {
                    &mut p.index
                });
                true
            }
            None => false,
        },
        MemberKind::Constructor => match constructors_mut(decl) {
            Some(list) => {
                shift_and_insert(list, target, Constructor::stub(target, type_name), |c| {
                    &mut c.index
                });
                true
            }
            None => false,
        },
        MemberKind::Method => match methods_mut(decl) {
            Some(list) => {
                let mut stub = Method::stub(target, "NewMethod");
                if is_interface {
                    stub.has_body = false;
                    stub.modifiers = Vec::new();
                }
                shift_and_insert(list, target, stub, |m| &mut m.index);
                true
            }
            None => false,
        },
        MemberKind::Value => match values_mut(decl) {
            Some(list) => {
                shift_and_insert(list, target, EnumValue::stub(target, "NewValue"), |v| {
                    &mut v.index
                });
                true
            }
            None => false,
        },
    }
}

/// Shift every sibling index >= target up by one, then insert the new
/// member so the array stays in index order.
fn shift_and_insert<T>(
    list: &mut Vec<T>,
    target: u32,
    new: T,
    index_of: impl Fn(&mut T) -> &mut u32,
) {
    for item in list.iter_mut() {
        let index = index_of(item);
        if *index >= target {
            *index += 1;
        }
    }
    let mut position = list.len();
    for (i, item) in list.iter_mut().enumerate() {
        if *index_of(item) > target {
            position = i;
            break;
        }
    }
    list.insert(position, new);
}

fn remove_member(decl: &mut TypeDeclaration, kind: MemberKind, index: u32) -> bool {
    match kind {
        MemberKind::Field => fields_mut(decl)
            .map(|v| remove_by(v, |f| f.index == index))
            .unwrap_or(false),
        MemberKind::Property => properties_mut(decl)
            .map(|v| remove_by(v, |p| p.index == index))
            .unwrap_or(false),
        MemberKind::Constructor => constructors_mut(decl)
            .map(|v| remove_by(v, |c| c.index == index))
            .unwrap_or(false),
        MemberKind::Method => methods_mut(decl)
            .map(|v| remove_by(v, |m| m.index == index))
            .unwrap_or(false),
        MemberKind::Value => values_mut(decl)
            .map(|v| remove_by(v, |e| e.index == index))
            .unwrap_or(false),
    }
}

fn remove_parameter(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
    parameter_index: usize,
) -> bool {
    match callable_parameters_mut(decl, kind, index) {
        Some(parameters) if parameter_index < parameters.len() => {
            parameters.remove(parameter_index);
            true
        }
        _ => false,
    }
}

fn remove_statement(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
    accessor_index: Option<u32>,
    statement_index: u32,
) -> bool {
    match statements_mut(decl, kind, index, accessor_index) {
        Some(statements) => remove_by(statements, |s| s.index == statement_index),
        None => false,
    }
}

fn remove_by<T>(list: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    match list.iter().position(matches) {
        Some(position) => {
            list.remove(position);
            true
        }
        None => false,
    }
}

fn callable_parameters_mut(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
) -> Option<&mut Vec<Parameter>> {
    match kind {
        MemberKind::Constructor => constructors_mut(decl)?
            .iter_mut()
            .find(|c| c.index == index)
            .map(|c| &mut c.parameters),
        MemberKind::Method => methods_mut(decl)?
            .iter_mut()
            .find(|m| m.index == index)
            .map(|m| &mut m.parameters),
        _ => None,
    }
}

fn statements_mut(
    decl: &mut TypeDeclaration,
    kind: MemberKind,
    index: u32,
    accessor_index: Option<u32>,
) -> Option<&mut Vec<Statement>> {
    match (kind, accessor_index) {
        (MemberKind::Constructor, None) => constructors_mut(decl)?
            .iter_mut()
            .find(|c| c.index == index)
            .map(|c| &mut c.statements),
        (MemberKind::Method, None) => methods_mut(decl)?
            .iter_mut()
            .find(|m| m.index == index)
            .map(|m| &mut m.statements),
        (MemberKind::Property, Some(accessor)) => properties_mut(decl)?
            .iter_mut()
            .find(|p| p.index == index)
            .and_then(|p| p.accessors.get_mut(accessor as usize))
            .map(|a| &mut a.statements),
        _ => None,
    }
}

// ─── Field Bag Helpers ──────────────────────────────────────────

fn string_field(fields: &HashMap<String, Value>, key: &str) -> Option<String> {
    fields.get(key)?.as_str().map(|s| s.to_string())
}

/// A present key with `null` clears the value; an absent key leaves it.
fn optional_string_field(fields: &HashMap<String, Value>, key: &str) -> Option<Option<String>> {
    match fields.get(key)? {
        Value::Null => Some(None),
        value => Some(value.as_str().map(|s| s.to_string())),
    }
}

fn list_field(fields: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
    let array = fields.get(key)?.as_array()?;
    Some(
        array
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn model_from(sources: &[(&str, &str)]) -> WorkspaceModel {
        let mut model = WorkspaceModel::new();
        for (path, source) in sources {
            let path = PathBuf::from(path);
            let parsed = parser::parse(source, &path).expect("test source parses");
            let version = model.next_version(&path);
            model.replace_file(&path, parsed.into_vec(), version);
        }
        model
    }

    fn member(namespace: &str, type_name: &str, kind: MemberKind, index: u32) -> ComponentLocation {
        ComponentLocation::Member {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            member_kind: kind,
            index,
        }
    }

    const THREE_METHODS: &str = r#"
namespace N
{
    public class Service
    {
        public void First() { }
        public void Second() { }
        public void Third() { }
    }
}
"#;

    #[test]
    fn replace_file_swaps_only_that_path() {
        let mut model = model_from(&[
            ("a.cs", "namespace N { public class A { } }"),
            ("b.cs", "namespace N { public class B { } }"),
        ]);
        let path = PathBuf::from("a.cs");
        let parsed = parser::parse("namespace N { public class A2 { } }", &path).unwrap();
        let version = model.next_version(&path);
        assert!(model.replace_file(&path, parsed.into_vec(), version));

        assert!(model.find_type("N", "A").is_none());
        assert!(model.find_type("N", "A2").is_some());
        assert!(model.find_type("N", "B").is_some(), "other files untouched");
    }

    #[test]
    fn superseded_versions_are_discarded() {
        let mut model = WorkspaceModel::new();
        let path = PathBuf::from("a.cs");
        let old_version = model.next_version(&path);
        let new_version = model.next_version(&path);

        let newer = parser::parse("namespace N { public class New { } }", &path).unwrap();
        assert!(model.replace_file(&path, newer.into_vec(), new_version));

        let older = parser::parse("namespace N { public class Old { } }", &path).unwrap();
        assert!(
            !model.replace_file(&path, older.into_vec(), old_version),
            "older in-flight result must lose"
        );
        assert!(model.find_type("N", "New").is_some());
        assert!(model.find_type("N", "Old").is_none());
    }

    #[test]
    fn remove_file_drops_exactly_its_types() {
        let mut model = model_from(&[
            (
                "three.cs",
                "namespace N { public class A { } public class B { } public class C { } }",
            ),
            ("other.cs", "namespace N { public class Keep { } }"),
        ]);
        assert_eq!(model.len(), 4);
        model.remove_file(Path::new("three.cs"));
        assert_eq!(model.len(), 1);
        assert!(model.find_type("N", "Keep").is_some());
    }

    #[test]
    fn remove_file_rejects_late_parse_results() {
        let mut model = WorkspaceModel::new();
        let path = PathBuf::from("a.cs");
        let version = model.next_version(&path);
        model.remove_file(&path);

        let late = parser::parse("namespace N { public class Ghost { } }", &path).unwrap();
        assert!(!model.replace_file(&path, late.into_vec(), version));
        assert!(model.is_empty());
    }

    #[test]
    fn edit_renames_method_and_marks_stale() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        let edit = NodeEdit {
            location: member("N", "Service", MemberKind::Method, 1),
            fields: HashMap::from([("name".to_string(), json!("Renamed"))]),
        };
        let path = model.apply_edit(&edit).unwrap();
        assert_eq!(path, PathBuf::from("s.cs"));

        let decl = model.find_type("N", "Service").unwrap();
        assert!(decl.stale);
        assert_eq!(decl.methods()[1].name, "Renamed");
        assert_eq!(decl.methods()[1].index, 1, "index chain is identity");
    }

    #[test]
    fn edit_statement_reruns_usage_facts() {
        let mut model = model_from(&[(
            "s.cs",
            "namespace N { public class A { public void Run() { old = 1; } } }",
        )]);
        let edit = NodeEdit {
            location: ComponentLocation::Statement {
                namespace: "N".to_string(),
                type_name: "A".to_string(),
                member_kind: MemberKind::Method,
                index: 0,
                accessor_index: None,
                statement_index: 0,
            },
            fields: HashMap::from([("text".to_string(), json!("helper.Run();"))]),
        };
        model.apply_edit(&edit).unwrap();
        let statement = &model.find_type("N", "A").unwrap().methods()[0].statements[0];
        assert_eq!(statement.text, "helper.Run();");
        assert_eq!(statement.used_methods, vec!["helper.Run"]);
        assert!(statement.used_fields_and_properties.is_empty());
    }

    #[test]
    fn edit_unknown_target_errors() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        let edit = NodeEdit {
            location: member("N", "Service", MemberKind::Method, 9),
            fields: HashMap::new(),
        };
        assert!(matches!(
            model.apply_edit(&edit),
            Err(ModelError::UnknownTarget(_))
        ));
    }

    #[test]
    fn kind_mismatch_is_an_unknown_target() {
        let mut model = model_from(&[("e.cs", "namespace N { public enum E { A } }")]);
        let edit = NodeEdit {
            location: member("N", "E", MemberKind::Method, 0),
            fields: HashMap::from([("name".to_string(), json!("X"))]),
        };
        assert!(matches!(
            model.apply_edit(&edit),
            Err(ModelError::UnknownTarget(_))
        ));
    }

    #[test]
    fn add_before_shifts_later_siblings() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        let (_, location) = model
            .add_declaration(
                &member("N", "Service", MemberKind::Method, 2),
                Placement::Before,
            )
            .unwrap();
        assert_eq!(
            location,
            member("N", "Service", MemberKind::Method, 2),
            "new member takes the reference index"
        );

        let decl = model.find_type("N", "Service").unwrap();
        let indices: Vec<(u32, &str)> = decl
            .methods()
            .iter()
            .map(|m| (m.index, m.name.as_str()))
            .collect();
        assert_eq!(
            indices,
            vec![(0, "First"), (1, "Second"), (2, "NewMethod"), (3, "Third")]
        );
    }

    #[test]
    fn add_after_inserts_past_reference() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        let (_, location) = model
            .add_declaration(
                &member("N", "Service", MemberKind::Method, 0),
                Placement::After,
            )
            .unwrap();
        assert_eq!(location, member("N", "Service", MemberKind::Method, 1));

        let decl = model.find_type("N", "Service").unwrap();
        assert_eq!(decl.methods()[1].name, "NewMethod");
        assert_eq!(decl.methods()[2].name, "Second");
        assert_eq!(decl.methods()[2].index, 2);
    }

    #[test]
    fn delete_leaves_index_gap() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        model
            .delete_declaration(&member("N", "Service", MemberKind::Method, 1))
            .unwrap();
        let decl = model.find_type("N", "Service").unwrap();
        let indices: Vec<u32> = decl.methods().iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 2], "no renumbering after delete");
    }

    #[test]
    fn commit_returns_regenerated_text() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        let patch = ModelPatch::Edit(NodeEdit {
            location: member("N", "Service", MemberKind::Method, 0),
            fields: HashMap::from([("name".to_string(), json!("Renamed"))]),
        });
        let outcome = model.commit(&patch).unwrap();
        assert_eq!(outcome.path, PathBuf::from("s.cs"));
        let text = outcome.text.expect("file still has declarations");
        assert!(text.contains("public void Renamed()"));
        assert!(!model.find_type("N", "Service").unwrap().stale);
    }

    #[test]
    fn invalid_edit_is_rejected_and_rolled_back() {
        let mut model = model_from(&[("s.cs", THREE_METHODS)]);
        let patch = ModelPatch::Edit(NodeEdit {
            location: member("N", "Service", MemberKind::Method, 0),
            fields: HashMap::from([("name".to_string(), json!("broken name("))]),
        });
        let err = model.commit(&patch).unwrap_err();
        assert!(matches!(err, ModelError::RegenerationValidation { .. }));
        assert_eq!(
            model.find_type("N", "Service").unwrap().methods()[0].name,
            "First",
            "rejected edit must not leak into the model"
        );
    }

    #[test]
    fn deleting_last_declaration_deletes_the_file() {
        let mut model = model_from(&[("one.cs", "namespace N { public class Only { } }")]);
        let patch = ModelPatch::Delete {
            location: ComponentLocation::Type {
                namespace: "N".to_string(),
                name: "Only".to_string(),
            },
        };
        let outcome = model.commit(&patch).unwrap();
        assert_eq!(outcome.text, None, "empty regeneration deletes the file");
        assert!(model.is_empty());
    }

    #[test]
    fn commit_to_disk_writes_the_regenerated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.cs");
        std::fs::write(&path, THREE_METHODS).unwrap();

        let mut model = WorkspaceModel::new();
        let parsed = parser::parse(THREE_METHODS, &path).unwrap();
        let version = model.next_version(&path);
        model.replace_file(&path, parsed.into_vec(), version);

        let patch = ModelPatch::Edit(NodeEdit {
            location: ComponentLocation::Member {
                namespace: "N".to_string(),
                type_name: "Service".to_string(),
                member_kind: MemberKind::Method,
                index: 2,
            },
            fields: HashMap::from([("name".to_string(), json!("Last"))]),
        });
        model.commit_to_disk(&patch).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("public void Last()"));
        let reparsed = parser::parse(&written, &path).unwrap();
        assert_eq!(reparsed.len(), 1);
    }

    #[test]
    fn commit_to_disk_deletes_an_emptied_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("only.cs");
        let source = "namespace N { public class Only { } }";
        std::fs::write(&path, source).unwrap();

        let mut model = WorkspaceModel::new();
        let parsed = parser::parse(source, &path).unwrap();
        let version = model.next_version(&path);
        model.replace_file(&path, parsed.into_vec(), version);

        let patch = ModelPatch::Delete {
            location: ComponentLocation::Type {
                namespace: "N".to_string(),
                name: "Only".to_string(),
            },
        };
        let outcome = model.commit_to_disk(&patch).unwrap();
        assert_eq!(outcome.text, None);
        assert!(!path.exists(), "emptied file is deleted, not written");
    }

    #[test]
    fn merge_preserves_unrelated_declarations() {
        let mut model = model_from(&[(
            "shared.cs",
            "namespace N { public class Existing { } public class Moved { } }",
        )]);
        let path = PathBuf::from("shared.cs");
        let incoming = parser::parse(
            "namespace N { public class Moved { public int X; } }",
            &path,
        )
        .unwrap();
        model.merge_file(&path, incoming.into_vec());

        assert!(model.find_type("N", "Existing").is_some());
        let moved = model.find_type("N", "Moved").unwrap();
        assert_eq!(moved.fields().len(), 1, "same-identity type was replaced");
    }
}
