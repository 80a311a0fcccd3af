//! Interned type representation shared by the analyzer and the interpreter.
//!
//! Every type lives once in a [`TypeTable`] and is referred to by a
//! [`TypeId`], so type equality is an integer comparison. Function types are
//! structural: they are deduplicated by their canonical signature name
//! (`<int, double?: text>`), which is what lets two independently written
//! functions with the same signature share one type.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// TypeId
// ══════════════════════════════════════════════════════════════════════════════

/// Handle to a type interned in a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const ANY: Self = Self(0);
    pub const INT: Self = Self(1);
    pub const DOUBLE: Self = Self(2);
    pub const BOOL: Self = Self(3);
    pub const TEXT: Self = Self(4);
    pub const NULL: Self = Self(5);
    /// Marker type shared by natives registered with an arity contract.
    pub const NATIVE_FUNCTION: Self = Self(6);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Type descriptions
// ══════════════════════════════════════════════════════════════════════════════

/// One parameter of a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub ty: TypeId,
    pub optional: bool,
}

impl ParamType {
    pub fn required(ty: TypeId) -> Self {
        Self {
            ty,
            optional: false,
        }
    }

    pub fn optional(ty: TypeId) -> Self {
        Self { ty, optional: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub params: Vec<ParamType>,
    /// `None` for void functions.
    pub ret: Option<TypeId>,
}

impl FunctionSignature {
    /// Number of parameters without a default.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Primitive { numeric: bool },
    Function(FunctionSignature),
    NativeFunction,
    Enum,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    /// `None` only for `any`.
    pub supertype: Option<TypeId>,
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeTable
// ══════════════════════════════════════════════════════════════════════════════

/// Interning table for every type known to an engine instance.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
    functions: FxHashMap<String, TypeId>,
    enums: FxHashMap<(String, Span), TypeId>,
}

/// Primitive types reachable by name from source code.
pub const PRIMITIVE_NAMES: &[(&str, TypeId)] = &[
    ("any", TypeId::ANY),
    ("int", TypeId::INT),
    ("double", TypeId::DOUBLE),
    ("bool", TypeId::BOOL),
    ("text", TypeId::TEXT),
];

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            functions: FxHashMap::default(),
            enums: FxHashMap::default(),
        };
        table.push("any", TypeKind::Primitive { numeric: false }, None);
        table.push("int", TypeKind::Primitive { numeric: true }, Some(TypeId::ANY));
        table.push("double", TypeKind::Primitive { numeric: true }, Some(TypeId::ANY));
        table.push("bool", TypeKind::Primitive { numeric: false }, Some(TypeId::ANY));
        table.push("text", TypeKind::Primitive { numeric: false }, Some(TypeId::ANY));
        table.push("null", TypeKind::Primitive { numeric: false }, Some(TypeId::ANY));
        table.push("<native func>", TypeKind::NativeFunction, Some(TypeId::ANY));
        table
    }

    fn push(&mut self, name: impl Into<String>, kind: TypeKind, supertype: Option<TypeId>) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeInfo {
            name: name.into(),
            kind,
            supertype,
        });
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.index()]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.get(id).name
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Primitive { numeric: true })
    }

    /// True for scripted function types and the native marker.
    pub fn is_callable(&self, id: TypeId) -> bool {
        matches!(
            self.get(id).kind,
            TypeKind::Function(_) | TypeKind::NativeFunction
        )
    }

    pub fn signature(&self, id: TypeId) -> Option<&FunctionSignature> {
        match &self.get(id).kind {
            TypeKind::Function(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Canonical structural name of a function type: `<int, double?: text>`.
    ///
    /// Parameters are joined by `", "`, optional ones carry a trailing `?`,
    /// and a void function has nothing after the colon (`<int:>`).
    pub fn canonical_name(&self, ret: Option<TypeId>, params: &[ParamType]) -> String {
        let mut name = String::from("<");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                name.push_str(", ");
            }
            name.push_str(self.name(param.ty));
            if param.optional {
                name.push('?');
            }
        }
        name.push(':');
        if let Some(ret) = ret {
            name.push(' ');
            name.push_str(self.name(ret));
        }
        name.push('>');
        name
    }

    /// Intern a function type, reusing an existing one with the same signature.
    pub fn function(&mut self, ret: Option<TypeId>, params: Vec<ParamType>) -> TypeId {
        let name = self.canonical_name(ret, &params);
        if let Some(&existing) = self.functions.get(&name) {
            return existing;
        }
        let id = self.push(
            name.clone(),
            TypeKind::Function(FunctionSignature { params, ret }),
            Some(TypeId::ANY),
        );
        self.functions.insert(name, id);
        id
    }

    /// Function type with the given canonical name, if already interned.
    pub fn find_function(&self, canonical_name: &str) -> Option<TypeId> {
        self.functions.get(canonical_name).copied()
    }

    /// Nominal type for an enum declaration.
    ///
    /// Keyed by qualified name and declaration site, so the analyzer and the
    /// interpreter resolve the same declaration to the same id.
    pub fn enum_type(&mut self, qualified_name: &str, declared_at: Span) -> TypeId {
        let key = (qualified_name.to_string(), declared_at);
        if let Some(&existing) = self.enums.get(&key) {
            return existing;
        }
        let id = self.push(qualified_name, TypeKind::Enum, Some(TypeId::ANY));
        self.enums.insert(key, id);
        id
    }

    /// Whether a value of type `value` may be used where `target` is expected.
    ///
    /// Anything counts as `any`; numeric types count as each other; otherwise
    /// the value's supertype chain must reach `target`.
    pub fn counts_as(&self, value: TypeId, target: TypeId) -> bool {
        if target == TypeId::ANY {
            return true;
        }
        if self.is_numeric(value) && self.is_numeric(target) {
            return true;
        }
        let mut current = Some(value);
        while let Some(ty) = current {
            if ty == target {
                return true;
            }
            current = self.get(ty).supertype;
        }
        false
    }

    /// Display helper: `TypeTable::display(id)` renders the type's name.
    pub fn display(&self, id: TypeId) -> TypeName<'_> {
        TypeName { table: self, id }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Displays a type by name.
pub struct TypeName<'a> {
    table: &'a TypeTable,
    id: TypeId,
}

impl fmt::Display for TypeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table.name(self.id))
    }
}
