//! Nominal type model: assemblies, types, and their members.
//!
//! A [`TypeUniverse`] owns every type an expression can mention. Type identity is
//! arena identity, so a [`TypeId`] is the structural-equality handle used by the
//! closure walker and the import aggregator.

use std::fmt;
use std::ops::Index;

use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smol_str::SmolStr;

slotmap::new_key_type! {
    /// Identity of a nominal type inside a [`TypeUniverse`]
    pub struct TypeId;
    /// Identity of an assembly inside a [`TypeUniverse`]
    pub struct AssemblyId;
}

/// Name of the assembly that defines the universal root and the core types.
pub const CORE_ASSEMBLY: &str = "System.Private.CoreLib";

/// An assembly identity in its display form
/// (`Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AssemblyName {
    pub name: SmolStr,
    pub version: Option<SmolStr>,
    pub culture: Option<SmolStr>,
    pub public_key_token: Option<SmolStr>,
}

impl AssemblyName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parses the display form. Unknown attributes are ignored; an empty simple
    /// name yields `None`.
    pub fn parse(display: &str) -> Option<Self> {
        let mut parts = display.split(',').map(str::trim);
        let name = parts.next().filter(|n| !n.is_empty())?;
        let mut assembly = Self::new(name);

        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = SmolStr::new(value.trim());
            match key.trim().to_ascii_lowercase().as_str() {
                "version" => assembly.version = Some(value),
                "culture" => assembly.culture = Some(value),
                "publickeytoken" => assembly.public_key_token = Some(value),
                _ => {}
            }
        }

        Some(assembly)
    }

    pub fn with_version(mut self, version: impl Into<SmolStr>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Canonical display form, the inverse of [`AssemblyName::parse`].
    pub fn full_name(&self) -> String {
        let mut full = self.name.to_string();
        if let Some(version) = &self.version {
            full.push_str(&format!(", Version={version}"));
        }
        if let Some(culture) = &self.culture {
            full.push_str(&format!(", Culture={culture}"));
        }
        if let Some(token) = &self.public_key_token {
            full.push_str(&format!(", PublicKeyToken={token}"));
        }
        full
    }
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyInfo {
    pub name: AssemblyName,
    /// Generated at runtime; such types can never be persisted as imports.
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Array { element: TypeId, rank: u32 },
    GenericParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field { read_only: bool },
    Property { settable: bool },
}

/// A field or property, as referenced from a member-access node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub name: SmolStr,
    pub declaring_type: TypeId,
    pub ty: TypeId,
    pub kind: MemberKind,
    pub is_static: bool,
}

impl MemberRef {
    pub fn is_settable(&self) -> bool {
        match self.kind {
            MemberKind::Field { read_only } => !read_only,
            MemberKind::Property { settable } => settable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodKind {
    #[default]
    Ordinary,
    /// Getter of an indexed property (`get_Item`).
    IndexerGet { settable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub name: SmolStr,
    pub declaring_type: TypeId,
    pub parameters: Vec<TypeId>,
    pub return_type: TypeId,
    pub generic_arguments: Vec<TypeId>,
    pub is_generic_definition: bool,
    pub is_static: bool,
    pub kind: MethodKind,
}

impl MethodRef {
    pub fn new(
        name: impl Into<SmolStr>,
        declaring_type: TypeId,
        parameters: Vec<TypeId>,
        return_type: TypeId,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            parameters,
            return_type,
            generic_arguments: Vec::new(),
            is_generic_definition: false,
            is_static: false,
            kind: MethodKind::Ordinary,
        }
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_generic_arguments(mut self, arguments: Vec<TypeId>) -> Self {
        self.generic_arguments = arguments;
        self
    }

    /// A generic method instantiated with concrete type arguments only.
    pub fn is_closed_generic(&self, universe: &TypeUniverse) -> bool {
        !self.generic_arguments.is_empty()
            && !self.is_generic_definition
            && !self
                .generic_arguments
                .iter()
                .any(|arg| universe.contains_generic_parameters(*arg))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorRef {
    pub declaring_type: TypeId,
    pub parameters: Vec<TypeId>,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: SmolStr,
    pub namespace: Option<SmolStr>,
    pub assembly: AssemblyId,
    pub kind: TypeKind,
    pub base_type: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub generic_arguments: Vec<TypeId>,
    pub generic_definition: Option<TypeId>,
    pub is_generic_definition: bool,
    pub members: Vec<MemberRef>,
    pub methods: Vec<MethodRef>,
    pub constructors: Vec<ConstructorRef>,
}

impl TypeInfo {
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::Struct | TypeKind::Enum)
    }
}

/// Declaration used to add a type to a universe.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: SmolStr,
    pub namespace: Option<SmolStr>,
    pub assembly: AssemblyId,
    pub kind: TypeKind,
    pub base_type: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub generic_parameters: Vec<SmolStr>,
}

impl TypeDef {
    fn new(namespace: &str, name: &str, assembly: AssemblyId, kind: TypeKind) -> Self {
        Self {
            name: SmolStr::new(name),
            namespace: (!namespace.is_empty()).then(|| SmolStr::new(namespace)),
            assembly,
            kind,
            base_type: None,
            interfaces: Vec::new(),
            generic_parameters: Vec::new(),
        }
    }

    pub fn class(namespace: &str, name: &str, assembly: AssemblyId) -> Self {
        Self::new(namespace, name, assembly, TypeKind::Class)
    }

    pub fn structure(namespace: &str, name: &str, assembly: AssemblyId) -> Self {
        Self::new(namespace, name, assembly, TypeKind::Struct)
    }

    pub fn interface(namespace: &str, name: &str, assembly: AssemblyId) -> Self {
        Self::new(namespace, name, assembly, TypeKind::Interface)
    }

    pub fn enumeration(namespace: &str, name: &str, assembly: AssemblyId) -> Self {
        Self::new(namespace, name, assembly, TypeKind::Enum)
    }

    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base_type = Some(base);
        self
    }

    pub fn with_interfaces(mut self, interfaces: impl IntoIterator<Item = TypeId>) -> Self {
        self.interfaces.extend(interfaces);
        self
    }

    /// Makes this declaration an open generic definition with the given parameter names.
    pub fn with_generic_parameters(mut self, parameters: &[&str]) -> Self {
        self.generic_parameters = parameters.iter().map(|p| SmolStr::new(p)).collect();
        self
    }
}

/// Handles of the types every universe is seeded with.
#[derive(Debug, Clone, Copy)]
pub struct CoreTypes {
    pub assembly: AssemblyId,
    pub object: TypeId,
    pub value_type: TypeId,
    pub enum_type: TypeId,
    pub boolean: TypeId,
    pub int32: TypeId,
    pub int64: TypeId,
    pub double: TypeId,
    pub string: TypeId,
    pub type_type: TypeId,
    pub void: TypeId,
    pub array: TypeId,
    pub math: TypeId,
    pub icomparable: TypeId,
    pub iconvertible: TypeId,
    pub ienumerable: TypeId,
    pub icloneable: TypeId,
}

#[derive(Debug, Clone)]
pub struct TypeUniverse {
    assemblies: SlotMap<AssemblyId, AssemblyInfo>,
    types: SlotMap<TypeId, TypeInfo>,
    by_full_name: FxHashMap<String, TypeId>,
    arrays: FxHashMap<(TypeId, u32), TypeId>,
    generic_instances: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    core: CoreTypes,
}

impl TypeUniverse {
    /// Creates a universe seeded with the core assembly and its types.
    pub fn new() -> Self {
        let mut assemblies = SlotMap::with_key();
        let assembly = assemblies.insert(AssemblyInfo {
            name: AssemblyName::new(CORE_ASSEMBLY).with_version("8.0.0.0"),
            is_dynamic: false,
        });
        let mut universe = Self {
            assemblies,
            types: SlotMap::with_key(),
            by_full_name: FxHashMap::default(),
            arrays: FxHashMap::default(),
            generic_instances: FxHashMap::default(),
            core: CoreTypes {
                assembly,
                object: TypeId::default(),
                value_type: TypeId::default(),
                enum_type: TypeId::default(),
                boolean: TypeId::default(),
                int32: TypeId::default(),
                int64: TypeId::default(),
                double: TypeId::default(),
                string: TypeId::default(),
                type_type: TypeId::default(),
                void: TypeId::default(),
                array: TypeId::default(),
                math: TypeId::default(),
                icomparable: TypeId::default(),
                iconvertible: TypeId::default(),
                ienumerable: TypeId::default(),
                icloneable: TypeId::default(),
            },
        };
        universe.seed_core_types(assembly);
        universe
    }

    fn seed_core_types(&mut self, asm: AssemblyId) {
        let object = self.define_type(TypeDef::class("System", "Object", asm));
        let icomparable = self.define_type(TypeDef::interface("System", "IComparable", asm));
        let iconvertible = self.define_type(TypeDef::interface("System", "IConvertible", asm));
        let icloneable = self.define_type(TypeDef::interface("System", "ICloneable", asm));
        let ienumerable =
            self.define_type(TypeDef::interface("System.Collections", "IEnumerable", asm));
        let value_type = self.define_type(TypeDef::class("System", "ValueType", asm).with_base(object));
        let enum_type = self.define_type(
            TypeDef::class("System", "Enum", asm)
                .with_base(value_type)
                .with_interfaces([icomparable, iconvertible]),
        );
        let primitive = |name: &str| {
            TypeDef::structure("System", name, asm)
                .with_base(value_type)
                .with_interfaces([icomparable, iconvertible])
        };
        let boolean = self.define_type(primitive("Boolean"));
        let int32 = self.define_type(primitive("Int32"));
        let int64 = self.define_type(primitive("Int64"));
        let double = self.define_type(primitive("Double"));
        let string = self.define_type(
            TypeDef::class("System", "String", asm)
                .with_base(object)
                .with_interfaces([icomparable, iconvertible, ienumerable, icloneable]),
        );
        let type_type = self.define_type(TypeDef::class("System", "Type", asm).with_base(object));
        let void = self.define_type(TypeDef::structure("System", "Void", asm).with_base(value_type));
        let array = self.define_type(
            TypeDef::class("System", "Array", asm)
                .with_base(object)
                .with_interfaces([ienumerable, icloneable]),
        );
        let math = self.define_type(TypeDef::class("System", "Math", asm).with_base(object));

        self.core = CoreTypes {
            assembly: asm,
            object,
            value_type,
            enum_type,
            boolean,
            int32,
            int64,
            double,
            string,
            type_type,
            void,
            array,
            math,
            icomparable,
            iconvertible,
            ienumerable,
            icloneable,
        };

        self.add_method(object, MethodRef::new("ToString", object, vec![], string));
        self.add_property(string, "Length", int32, false);
        self.add_static_field(string, "Empty", string, true);
        self.add_method(
            string,
            MethodRef::new("Concat", string, vec![string, string], string).static_method(),
        );
        self.add_method(string, MethodRef::new("ToUpper", string, vec![], string));
        self.add_method(string, MethodRef::new("Contains", string, vec![string], boolean));
        self.add_static_field(int32, "MaxValue", int32, true);
        self.add_static_field(int32, "MinValue", int32, true);
        self.add_property(array, "Length", int32, false);
        self.add_method(
            math,
            MethodRef::new("Max", math, vec![int32, int32], int32).static_method(),
        );
        self.add_method(
            math,
            MethodRef::new("Abs", math, vec![int32], int32).static_method(),
        );
    }

    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    /// The universal root type; base-type walks stop before it.
    pub fn object(&self) -> TypeId {
        self.core.object
    }

    /// Registers an assembly, returning the existing id when a name is already known.
    pub fn define_assembly(&mut self, name: AssemblyName, is_dynamic: bool) -> AssemblyId {
        if let Some((id, _)) = self.assemblies.iter().find(|(_, a)| a.name.name == name.name) {
            return id;
        }
        self.assemblies.insert(AssemblyInfo { name, is_dynamic })
    }

    pub fn find_assembly(&self, simple_name: &str) -> Option<AssemblyId> {
        self.assemblies
            .iter()
            .find_map(|(id, a)| (a.name.name == simple_name).then_some(id))
    }

    pub fn assembly(&self, id: AssemblyId) -> Option<&AssemblyInfo> {
        self.assemblies.get(id)
    }

    pub fn assembly_of(&self, ty: TypeId) -> Option<&AssemblyInfo> {
        self.types.get(ty).and_then(|info| self.assemblies.get(info.assembly))
    }

    pub fn define_type(&mut self, def: TypeDef) -> TypeId {
        let is_generic_definition = !def.generic_parameters.is_empty();
        let id = self.types.insert(TypeInfo {
            name: def.name,
            namespace: def.namespace,
            assembly: def.assembly,
            kind: def.kind,
            base_type: def.base_type,
            interfaces: def.interfaces,
            generic_arguments: Vec::new(),
            generic_definition: None,
            is_generic_definition,
            members: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        });

        if is_generic_definition {
            let parameters = def
                .generic_parameters
                .iter()
                .map(|p| {
                    self.types.insert(TypeInfo {
                        name: p.clone(),
                        namespace: None,
                        assembly: def.assembly,
                        kind: TypeKind::GenericParameter,
                        base_type: None,
                        interfaces: Vec::new(),
                        generic_arguments: Vec::new(),
                        generic_definition: None,
                        is_generic_definition: false,
                        members: Vec::new(),
                        methods: Vec::new(),
                        constructors: Vec::new(),
                    })
                })
                .collect();
            self.types[id].generic_arguments = parameters;
        }

        self.by_full_name.insert(self.full_name(id), id);
        id
    }

    /// Instantiates an open generic definition with concrete arguments. Instances
    /// are interned, so the same arguments always produce the same id.
    pub fn make_generic(&mut self, definition: TypeId, arguments: Vec<TypeId>) -> Option<TypeId> {
        let def = self.types.get(definition)?;
        if !def.is_generic_definition || def.generic_arguments.len() != arguments.len() {
            return None;
        }
        if let Some(id) = self.generic_instances.get(&(definition, arguments.clone())) {
            return Some(*id);
        }

        let instance = TypeInfo {
            generic_arguments: arguments.clone(),
            generic_definition: Some(definition),
            is_generic_definition: false,
            members: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            ..def.clone()
        };
        let id = self.types.insert(instance);
        self.generic_instances.insert((definition, arguments), id);
        self.by_full_name.insert(self.full_name(id), id);
        Some(id)
    }

    /// Returns the interned array type of `element` with the given rank.
    pub fn array_of(&mut self, element: TypeId, rank: u32) -> TypeId {
        if let Some(id) = self.arrays.get(&(element, rank)) {
            return *id;
        }
        let (namespace, assembly) = self
            .types
            .get(element)
            .map(|e| (e.namespace.clone(), e.assembly))
            .unwrap_or((None, self.core.assembly));
        let id = self.types.insert(TypeInfo {
            name: SmolStr::default(),
            namespace,
            assembly,
            kind: TypeKind::Array { element, rank },
            base_type: Some(self.core.array),
            interfaces: Vec::new(),
            generic_arguments: Vec::new(),
            generic_definition: None,
            is_generic_definition: false,
            members: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        });
        self.arrays.insert((element, rank), id);
        id
    }

    /// The array type of `element` with the given rank, if it has been interned.
    pub fn find_array(&self, element: TypeId, rank: u32) -> Option<TypeId> {
        self.arrays.get(&(element, rank)).copied()
    }

    pub fn add_property(&mut self, ty: TypeId, name: &str, property_type: TypeId, settable: bool) {
        self.push_member(ty, name, property_type, MemberKind::Property { settable }, false);
    }

    pub fn add_static_property(&mut self, ty: TypeId, name: &str, property_type: TypeId, settable: bool) {
        self.push_member(ty, name, property_type, MemberKind::Property { settable }, true);
    }

    pub fn add_field(&mut self, ty: TypeId, name: &str, field_type: TypeId, read_only: bool) {
        self.push_member(ty, name, field_type, MemberKind::Field { read_only }, false);
    }

    pub fn add_static_field(&mut self, ty: TypeId, name: &str, field_type: TypeId, read_only: bool) {
        self.push_member(ty, name, field_type, MemberKind::Field { read_only }, true);
    }

    fn push_member(&mut self, ty: TypeId, name: &str, member_type: TypeId, kind: MemberKind, is_static: bool) {
        if let Some(info) = self.types.get_mut(ty) {
            info.members.push(MemberRef {
                name: SmolStr::new(name),
                declaring_type: ty,
                ty: member_type,
                kind,
                is_static,
            });
        }
    }

    pub fn add_method(&mut self, ty: TypeId, method: MethodRef) {
        if let Some(info) = self.types.get_mut(ty) {
            info.methods.push(MethodRef {
                declaring_type: ty,
                ..method
            });
        }
    }

    /// Adds an indexed property (`this[...]`), exposed as a `get_Item` accessor.
    pub fn add_indexer(&mut self, ty: TypeId, parameters: Vec<TypeId>, item_type: TypeId, settable: bool) {
        let getter = MethodRef {
            kind: MethodKind::IndexerGet { settable },
            ..MethodRef::new("get_Item", ty, parameters, item_type)
        };
        self.add_method(ty, getter);
    }

    pub fn add_constructor(&mut self, ty: TypeId, parameters: Vec<TypeId>) {
        if let Some(info) = self.types.get_mut(ty) {
            info.constructors.push(ConstructorRef {
                declaring_type: ty,
                parameters,
            });
        }
    }

    pub fn get(&self, ty: TypeId) -> Option<&TypeInfo> {
        self.types.get(ty)
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types.iter()
    }

    pub fn base_type(&self, ty: TypeId) -> Option<TypeId> {
        self.types.get(ty).and_then(|info| info.base_type)
    }

    pub fn interfaces(&self, ty: TypeId) -> &[TypeId] {
        self.types
            .get(ty)
            .map(|info| info.interfaces.as_slice())
            .unwrap_or_default()
    }

    /// Element type of an array type.
    pub fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.types.get(ty)?.kind {
            TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn is_array(&self, ty: TypeId) -> bool {
        self.element_type(ty).is_some()
    }

    pub fn is_value_type(&self, ty: TypeId) -> bool {
        self.types.get(ty).is_some_and(TypeInfo::is_value_type)
    }

    pub fn generic_arguments(&self, ty: TypeId) -> &[TypeId] {
        self.types
            .get(ty)
            .map(|info| info.generic_arguments.as_slice())
            .unwrap_or_default()
    }

    /// A generic instance whose arguments are all concrete.
    pub fn is_closed_generic(&self, ty: TypeId) -> bool {
        self.types.get(ty).is_some_and(|info| {
            info.generic_definition.is_some()
                && !info
                    .generic_arguments
                    .iter()
                    .any(|arg| self.contains_generic_parameters(*arg))
        })
    }

    pub fn contains_generic_parameters(&self, ty: TypeId) -> bool {
        let Some(info) = self.types.get(ty) else {
            return false;
        };
        match info.kind {
            TypeKind::GenericParameter => true,
            TypeKind::Array { element, .. } => self.contains_generic_parameters(element),
            _ => {
                info.is_generic_definition
                    || info
                        .generic_arguments
                        .iter()
                        .any(|arg| self.contains_generic_parameters(*arg))
            }
        }
    }

    /// Namespace-qualified name, e.g. `System.Int32`, `Contoso.Box<System.Int32>`, `System.String[]`.
    pub fn full_name(&self, ty: TypeId) -> String {
        self.format_name(ty, true)
    }

    /// Short name used in diagnostics, e.g. `Int32`, `Box<Int32>`.
    pub fn display_name(&self, ty: TypeId) -> String {
        self.format_name(ty, false)
    }

    fn format_name(&self, ty: TypeId, qualified: bool) -> String {
        let Some(info) = self.types.get(ty) else {
            return "<unknown>".to_string();
        };

        if let TypeKind::Array { element, rank } = info.kind {
            let commas = ",".repeat(rank.saturating_sub(1) as usize);
            return format!("{}[{commas}]", self.format_name(element, qualified));
        }

        let mut name = match (&info.namespace, qualified) {
            (Some(ns), true) => format!("{ns}.{}", info.name),
            _ => info.name.to_string(),
        };
        if !info.generic_arguments.is_empty() && !info.is_generic_definition {
            let args = info
                .generic_arguments
                .iter()
                .map(|arg| self.format_name(*arg, qualified))
                .join(", ");
            name.push_str(&format!("<{args}>"));
        } else if info.is_generic_definition {
            name.push_str(&format!("`{}", info.generic_arguments.len()));
        }
        name
    }

    pub fn find_type(&self, full_name: &str) -> Option<TypeId> {
        self.by_full_name.get(full_name).copied()
    }

    /// Resolves a possibly-qualified type name, trying it verbatim first and then
    /// under each of the given namespaces in order.
    pub fn resolve_type_name<'a>(
        &self,
        name: &str,
        namespaces: impl IntoIterator<Item = &'a str>,
    ) -> Option<TypeId> {
        self.find_type(name).or_else(|| {
            namespaces
                .into_iter()
                .find_map(|ns| self.find_type(&format!("{ns}.{name}")))
        })
    }

    /// Every type `ty` can be viewed as through its base chain and interfaces,
    /// including `ty` itself.
    pub fn supertypes(&self, ty: TypeId) -> FxHashSet<TypeId> {
        let mut seen = FxHashSet::default();
        let mut pending = vec![ty];
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            pending.extend(self.interfaces(current).iter().copied());
            if let Some(base) = self.base_type(current) {
                pending.push(base);
            }
        }
        seen
    }

    /// Reference or boxing conversion from `from` to `to`.
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        from == to || to == self.core.object || self.supertypes(from).contains(&to)
    }

    /// Implicit numeric widening between core numeric types.
    pub fn is_widening(&self, from: TypeId, to: TypeId) -> bool {
        let core = &self.core;
        (from == core.int32 && (to == core.int64 || to == core.double))
            || (from == core.int64 && to == core.double)
    }

    pub fn is_numeric(&self, ty: TypeId) -> bool {
        let core = &self.core;
        ty == core.int32 || ty == core.int64 || ty == core.double
    }

    /// Finds a field or property by name on `ty` or its base chain.
    pub fn find_member(&self, ty: TypeId, name: &str) -> Option<&MemberRef> {
        let mut current = Some(ty);
        while let Some(t) = current {
            let info = self.types.get(t)?;
            if let Some(member) = info.members.iter().find(|m| m.name == name) {
                return Some(member);
            }
            current = info.base_type;
        }
        None
    }

    /// All methods named `name` on `ty` and its base chain, most derived first.
    pub fn find_methods(&self, ty: TypeId, name: &str) -> Vec<&MethodRef> {
        let mut methods = Vec::new();
        let mut current = Some(ty);
        while let Some(t) = current {
            let Some(info) = self.types.get(t) else {
                break;
            };
            methods.extend(info.methods.iter().filter(|m| m.name == name));
            current = info.base_type;
        }
        methods
    }

    pub fn find_indexer(&self, ty: TypeId) -> Option<&MethodRef> {
        self.find_methods(ty, "get_Item")
            .into_iter()
            .find(|m| matches!(m.kind, MethodKind::IndexerGet { .. }))
    }

    pub fn constructors(&self, ty: TypeId) -> &[ConstructorRef] {
        self.types
            .get(ty)
            .map(|info| info.constructors.as_slice())
            .unwrap_or_default()
    }
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TypeId> for TypeUniverse {
    type Output = TypeInfo;

    fn index(&self, ty: TypeId) -> &Self::Output {
        &self.types[ty]
    }
}
