//! Loads a type universe and a variable environment from a TOML schema.
//!
//! ```toml
//! [[assembly]]
//! name = "Contoso.Crm"
//! version = "1.0.0.0"
//!
//! [[type]]
//! name = "Customer"
//! namespace = "Contoso.Crm"
//! assembly = "Contoso.Crm"
//! property = [{ name = "Age", type = "int" }]
//!
//! [variables]
//! customer = "Contoso.Crm.Customer"
//! ```
//!
//! Base types and interfaces must be declared before the types that use them.
//! Member and variable types may refer to any declared type, an array of one
//! (`Customer[]`) or a generic instance (`Pair<Customer, int>`).

use std::path::Path;

use flowexpr::types::{MethodRef, TypeDef};
use flowexpr::{AssemblyName, Environment, TypeId, TypeUniverse};
use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::binder::expand_alias;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid schema: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unknown type `{name}` referenced by {context}")]
    UnknownType { name: String, context: String },
    #[error("Type `{ty}` is declared in unknown assembly `{assembly}`")]
    UnknownAssembly { ty: String, assembly: SmolStr },
    #[error("Type `{0}` is declared more than once")]
    DuplicateType(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SchemaFile {
    #[serde(rename = "assembly")]
    assemblies: Vec<AssemblyDecl>,
    #[serde(rename = "type")]
    types: Vec<TypeDecl>,
    variables: IndexMap<SmolStr, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssemblyDecl {
    name: SmolStr,
    version: Option<SmolStr>,
    #[serde(default)]
    dynamic: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypeDeclKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct TypeDecl {
    name: SmolStr,
    #[serde(default)]
    namespace: String,
    assembly: SmolStr,
    #[serde(default)]
    kind: TypeDeclKind,
    base: Option<String>,
    #[serde(default)]
    interfaces: Vec<String>,
    #[serde(default)]
    generic_parameters: Vec<String>,
    #[serde(default, rename = "property")]
    properties: Vec<PropertyDecl>,
    #[serde(default, rename = "field")]
    fields: Vec<FieldDecl>,
    #[serde(default, rename = "method")]
    methods: Vec<MethodDecl>,
    #[serde(default, rename = "constructor")]
    constructors: Vec<ConstructorDecl>,
    #[serde(default, rename = "indexer")]
    indexers: Vec<IndexerDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyDecl {
    name: SmolStr,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    settable: bool,
    #[serde(default, rename = "static")]
    is_static: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FieldDecl {
    name: SmolStr,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    read_only: bool,
    #[serde(default, rename = "static")]
    is_static: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodDecl {
    name: SmolStr,
    #[serde(default)]
    parameters: Vec<String>,
    returns: Option<String>,
    #[serde(default, rename = "static")]
    is_static: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstructorDecl {
    #[serde(default)]
    parameters: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexerDecl {
    parameters: Vec<String>,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    settable: bool,
}

/// A type universe seeded with the core types plus the declared ones, and the
/// variables expressions can refer to.
#[derive(Debug, Clone)]
pub struct Schema {
    pub universe: TypeUniverse,
    pub environment: Environment,
}

/// The core types only, with their arrays interned.
impl Default for Schema {
    fn default() -> Self {
        Loader::default().finish(Environment::new())
    }
}

impl Schema {
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(source)?;
        Loader::default().load(file)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

#[derive(Default)]
struct Loader {
    universe: TypeUniverse,
}

impl Loader {
    fn load(mut self, file: SchemaFile) -> Result<Schema, SchemaError> {
        for assembly in &file.assemblies {
            let mut name = AssemblyName::new(assembly.name.clone());
            if let Some(version) = &assembly.version {
                name = name.with_version(version.clone());
            }
            self.universe.define_assembly(name, assembly.dynamic);
        }

        let mut declared = Vec::with_capacity(file.types.len());
        for decl in &file.types {
            declared.push(self.declare(decl)?);
        }
        for (decl, ty) in file.types.iter().zip(declared) {
            self.add_members(decl, ty)?;
        }

        let mut environment = Environment::new();
        for (name, ty) in &file.variables {
            let context = format!("variable `{name}`");
            environment.insert(name.clone(), self.resolve(ty, None, &context)?);
        }

        Ok(self.finish(environment))
    }

    fn finish(mut self, environment: Environment) -> Schema {
        self.intern_arrays();
        Schema {
            universe: self.universe,
            environment,
        }
    }

    fn declare(&mut self, decl: &TypeDecl) -> Result<TypeId, SchemaError> {
        let full_name = match decl.namespace.as_str() {
            "" => decl.name.to_string(),
            ns => format!("{ns}.{}", decl.name),
        };
        let assembly = self
            .universe
            .find_assembly(&decl.assembly)
            .ok_or_else(|| SchemaError::UnknownAssembly {
                ty: full_name.clone(),
                assembly: decl.assembly.clone(),
            })?;
        let generic_name = format!("{full_name}`{}", decl.generic_parameters.len());
        if self.universe.find_type(&full_name).is_some() || self.universe.find_type(&generic_name).is_some() {
            return Err(SchemaError::DuplicateType(full_name));
        }

        let core = *self.universe.core();
        let namespace = Some(decl.namespace.as_str()).filter(|ns| !ns.is_empty());
        let context = format!("type `{full_name}`");
        let base = match (&decl.base, decl.kind) {
            (Some(base), _) => Some(self.resolve(base, namespace, &context)?),
            (None, TypeDeclKind::Class) => Some(core.object),
            (None, TypeDeclKind::Struct) => Some(core.value_type),
            (None, TypeDeclKind::Enum) => Some(core.enum_type),
            (None, TypeDeclKind::Interface) => None,
        };
        let interfaces = decl
            .interfaces
            .iter()
            .map(|name| self.resolve(name, namespace, &context))
            .collect::<Result<Vec<_>, _>>()?;

        let mut def = match decl.kind {
            TypeDeclKind::Class => TypeDef::class(&decl.namespace, &decl.name, assembly),
            TypeDeclKind::Struct => TypeDef::structure(&decl.namespace, &decl.name, assembly),
            TypeDeclKind::Interface => TypeDef::interface(&decl.namespace, &decl.name, assembly),
            TypeDeclKind::Enum => TypeDef::enumeration(&decl.namespace, &decl.name, assembly),
        }
        .with_interfaces(interfaces);
        if let Some(base) = base {
            def = def.with_base(base);
        }
        if !decl.generic_parameters.is_empty() {
            let parameters: Vec<&str> = decl.generic_parameters.iter().map(String::as_str).collect();
            def = def.with_generic_parameters(&parameters);
        }
        Ok(self.universe.define_type(def))
    }

    fn add_members(&mut self, decl: &TypeDecl, ty: TypeId) -> Result<(), SchemaError> {
        let namespace = Some(decl.namespace.as_str()).filter(|ns| !ns.is_empty());
        let owner = self.universe.full_name(ty);

        for property in &decl.properties {
            let context = format!("property `{owner}.{}`", property.name);
            let property_type = self.resolve(&property.ty, namespace, &context)?;
            if property.is_static {
                self.universe.add_static_property(ty, &property.name, property_type, property.settable);
            } else {
                self.universe.add_property(ty, &property.name, property_type, property.settable);
            }
        }

        for field in &decl.fields {
            let context = format!("field `{owner}.{}`", field.name);
            let field_type = self.resolve(&field.ty, namespace, &context)?;
            if field.is_static {
                self.universe.add_static_field(ty, &field.name, field_type, field.read_only);
            } else {
                self.universe.add_field(ty, &field.name, field_type, field.read_only);
            }
        }

        for method in &decl.methods {
            let context = format!("method `{owner}.{}`", method.name);
            let parameters = self.resolve_all(&method.parameters, namespace, &context)?;
            let return_type = match &method.returns {
                Some(returns) => self.resolve(returns, namespace, &context)?,
                None => self.universe.core().void,
            };
            let mut method_ref = MethodRef::new(method.name.clone(), ty, parameters, return_type);
            if method.is_static {
                method_ref = method_ref.static_method();
            }
            self.universe.add_method(ty, method_ref);
        }

        for constructor in &decl.constructors {
            let context = format!("constructor of `{owner}`");
            let parameters = self.resolve_all(&constructor.parameters, namespace, &context)?;
            self.universe.add_constructor(ty, parameters);
        }

        for indexer in &decl.indexers {
            let context = format!("indexer of `{owner}`");
            let parameters = self.resolve_all(&indexer.parameters, namespace, &context)?;
            let item_type = self.resolve(&indexer.ty, namespace, &context)?;
            self.universe.add_indexer(ty, parameters, item_type, indexer.settable);
        }
        Ok(())
    }

    fn resolve_all(
        &mut self,
        names: &[String],
        namespace: Option<&str>,
        context: &str,
    ) -> Result<Vec<TypeId>, SchemaError> {
        names.iter().map(|name| self.resolve(name, namespace, context)).collect()
    }

    /// Resolves a type reference relative to `namespace`, then `System`.
    fn resolve(&mut self, name: &str, namespace: Option<&str>, context: &str) -> Result<TypeId, SchemaError> {
        let name = name.trim();
        let unknown = || SchemaError::UnknownType {
            name: name.to_string(),
            context: context.to_string(),
        };

        if let Some(element) = name.strip_suffix("[]") {
            let element = self.resolve(element, namespace, context)?;
            return Ok(self.universe.array_of(element, 1));
        }

        if let Some((definition, rest)) = name.split_once('<')
            && let Some(arguments) = rest.strip_suffix('>')
        {
            let arguments = split_arguments(arguments)
                .into_iter()
                .map(|argument| self.resolve(argument, namespace, context))
                .collect::<Result<Vec<_>, _>>()?;
            let generic_name = format!("{}`{}", definition.trim(), arguments.len());
            let definition = self.lookup(&generic_name, namespace).ok_or_else(unknown)?;
            return self.universe.make_generic(definition, arguments).ok_or_else(unknown);
        }

        self.lookup(expand_alias(name), namespace).ok_or_else(unknown)
    }

    fn lookup(&self, name: &str, namespace: Option<&str>) -> Option<TypeId> {
        self.universe
            .resolve_type_name(name, namespace.into_iter().chain(std::iter::once("System")))
    }

    /// Interns the one-dimensional array of every concrete type so array
    /// expressions can be bound against a shared universe.
    fn intern_arrays(&mut self) {
        let elements: Vec<TypeId> = self
            .universe
            .types()
            .filter(|(_, info)| {
                !info.is_generic_definition
                    && !matches!(
                        info.kind,
                        flowexpr::types::TypeKind::Array { .. } | flowexpr::types::TypeKind::GenericParameter
                    )
            })
            .map(|(ty, _)| ty)
            .collect();
        for element in elements {
            self.universe.array_of(element, 1);
        }
    }
}

/// Splits `A, B<C, D>, E` at top-level commas.
fn split_arguments(arguments: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in arguments.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(arguments[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(arguments[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const CRM: &str = r#"
        [[assembly]]
        name = "Contoso.Crm"
        version = "1.0.0.0"

        [[type]]
        name = "IParty"
        namespace = "Contoso.Crm"
        assembly = "Contoso.Crm"
        kind = "interface"

        [[type]]
        name = "Person"
        namespace = "Contoso.Crm"
        assembly = "Contoso.Crm"
        property = [{ name = "Name", type = "string", settable = true }]

        [[type]]
        name = "Customer"
        namespace = "Contoso.Crm"
        assembly = "Contoso.Crm"
        base = "Person"
        interfaces = ["IParty"]
        property = [
            { name = "Age", type = "int", settable = true },
            { name = "Orders", type = "Order[]" },
            { name = "Count", type = "Int32", static = true },
        ]
        method = [
            { name = "Rename", parameters = ["string"] },
            { name = "Create", parameters = ["string"], returns = "Customer", static = true },
        ]
        constructor = [{ parameters = ["string"] }]
        indexer = [{ parameters = ["string"], type = "object" }]

        [[type]]
        name = "Order"
        namespace = "Contoso.Crm"
        assembly = "Contoso.Crm"
        kind = "struct"
        field = [{ name = "Total", type = "double", read-only = true }]

        [[type]]
        name = "Pair"
        namespace = "Contoso.Crm"
        assembly = "Contoso.Crm"
        generic-parameters = ["TFirst", "TSecond"]

        [variables]
        customer = "Contoso.Crm.Customer"
        pairs = "Contoso.Crm.Pair<Contoso.Crm.Customer, Int32>[]"
        count = "int"
    "#;

    #[test]
    fn test_load_types_and_variables() {
        let schema = Schema::from_toml_str(CRM).unwrap();
        let universe = &schema.universe;

        let customer = universe.find_type("Contoso.Crm.Customer").unwrap();
        let person = universe.find_type("Contoso.Crm.Person").unwrap();
        let party = universe.find_type("Contoso.Crm.IParty").unwrap();
        assert_eq!(universe.base_type(customer), Some(person));
        assert_eq!(universe.interfaces(customer), &[party]);
        assert_eq!(universe.assembly_of(customer).unwrap().name.full_name(), "Contoso.Crm, Version=1.0.0.0");

        assert_eq!(universe.find_member(customer, "Name").unwrap().ty, universe.core().string);
        assert!(universe.find_member(customer, "Count").unwrap().is_static);
        let orders = universe.find_member(customer, "Orders").unwrap().ty;
        assert_eq!(universe.display_name(orders), "Order[]");
        assert!(universe.find_methods(customer, "Create")[0].is_static);
        assert_eq!(universe.find_methods(customer, "Rename")[0].return_type, universe.core().void);
        assert_eq!(universe.constructors(customer).len(), 1);
        assert!(universe.find_indexer(customer).is_some());

        let names: Vec<_> = schema.environment.visible_bindings().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(schema.environment.lookup("customer"), Some(customer));
        assert_eq!(schema.environment.lookup("count"), Some(universe.core().int32));
        let pairs = schema.environment.lookup("pairs").unwrap();
        assert_eq!(universe.display_name(pairs), "Pair<Customer, Int32>[]");
    }

    #[test]
    fn test_arrays_are_interned() {
        let schema = Schema::from_toml_str(CRM).unwrap();
        let universe = &schema.universe;
        let customer = universe.find_type("Contoso.Crm.Customer").unwrap();
        assert!(universe.find_array(customer, 1).is_some());
        assert!(universe.find_array(universe.core().string, 1).is_some());
    }

    #[test]
    fn test_default_schema_interns_core_arrays() {
        let schema = Schema::default();
        let core = *schema.universe.core();
        assert!(schema.universe.find_array(core.int32, 1).is_some());
        assert!(schema.universe.find_array(core.string, 1).is_some());
        assert!(schema.environment.visible_bindings().is_empty());
    }

    #[test]
    fn test_default_bases() {
        let schema = Schema::from_toml_str(CRM).unwrap();
        let universe = &schema.universe;
        let order = universe.find_type("Contoso.Crm.Order").unwrap();
        let party = universe.find_type("Contoso.Crm.IParty").unwrap();
        assert!(universe.is_value_type(order));
        assert_eq!(universe.base_type(party), None);
    }

    #[rstest]
    #[case::unknown_assembly(
        "[[type]]\nname = \"A\"\nassembly = \"Missing\"",
        "Type `A` is declared in unknown assembly `Missing`"
    )]
    #[case::base_after_use(
        "[[assembly]]\nname = \"X\"\n[[type]]\nname = \"A\"\nassembly = \"X\"\nbase = \"B\"\n[[type]]\nname = \"B\"\nassembly = \"X\"",
        "Unknown type `B` referenced by type `A`"
    )]
    #[case::unknown_variable_type("[variables]\nx = \"Nope\"", "Unknown type `Nope` referenced by variable `x`")]
    #[case::duplicate(
        "[[assembly]]\nname = \"X\"\n[[type]]\nname = \"A\"\nassembly = \"X\"\n[[type]]\nname = \"A\"\nassembly = \"X\"",
        "Type `A` is declared more than once"
    )]
    fn test_schema_errors(#[case] source: &str, #[case] expected: &str) {
        let err = Schema::from_toml_str(source).unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(Schema::from_toml_str("colour = 1"), Err(SchemaError::Parse(_))));
    }

    #[rstest]
    #[case("A", vec!["A"])]
    #[case("A, B<C, D>, E", vec!["A", "B<C, D>", "E"])]
    fn test_split_arguments(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_arguments(input), expected);
    }
}
