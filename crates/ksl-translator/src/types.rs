//! The semantic type universe: scalars, vectors, matrices, arrays, structs.
//!
//! Mirrors the original C++ `types::Mgr` (a `Type` registry keyed by mangled
//! name) but replaces its `base::rtti::Castable` type hierarchy with a
//! closed enum, same as `ast.rs` does for AST nodes.

use std::collections::HashMap;

/// The six scalar families that participate in vector/matrix construction.
pub const VECTOR_SCALARS: [&str; 6] = ["half", "uhalf", "float", "double", "int", "uint"];
/// All scalar primitives, including the two 64-bit-literal-only ones that
/// have no vector/matrix counterpart (spec.md §3.5).
pub const ALL_SCALARS: [&str; 8] = ["half", "uhalf", "float", "double", "int", "uint", "long", "ulong"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Scalar { name: String },
    Vec { elem: TypeId, columns: u8 },
    Mat { elem: TypeId, rows: u8, columns: u8 },
    Array { elem: TypeId, count: u64 },
    Custom { name: String, members: Vec<Member> },
}

impl Type {
    pub fn mangled_name(&self, registry: &TypeRegistry) -> String {
        match self {
            Type::Scalar { name } => name.clone(),
            Type::Vec { elem, columns } => format!("{}{}", registry.get(*elem).mangled_name(registry), columns),
            Type::Mat { elem, rows, columns } => {
                format!("{}{}x{}", registry.get(*elem).mangled_name(registry), rows, columns)
            }
            Type::Array { elem, count } => {
                let elem_name = registry.get(*elem).mangled_name(registry);
                if *count == 0 {
                    format!("{elem_name}[]")
                } else {
                    format!("{elem_name}[{count}]")
                }
            }
            Type::Custom { name, .. } => name.clone(),
        }
    }

    pub fn num_slots(&self, registry: &TypeRegistry) -> u64 {
        match self {
            Type::Scalar { .. } => 1,
            Type::Vec { columns, .. } => *columns as u64,
            Type::Mat { rows, columns, .. } => *rows as u64 * *columns as u64,
            Type::Array { .. } | Type::Custom { .. } => {
                let _ = registry;
                0
            }
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Custom { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar { .. })
    }
}

/// Owns every interned type, keyed by mangled name for fast re-lookup.
/// Scalars/vectors/matrices are pre-populated in [`TypeRegistry::new`];
/// arrays and structs are interned lazily on first demand (spec.md §3.5).
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<Type>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut reg = Self { types: Vec::new(), by_name: HashMap::new() };
        reg.seed();
        reg
    }

    fn intern_new(&mut self, ty: Type) -> TypeId {
        let name = ty.mangled_name(self);
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        self.by_name.insert(name, id);
        id
    }

    fn seed(&mut self) {
        let mut scalar_ids = HashMap::new();
        for name in ALL_SCALARS {
            let id = self.intern_new(Type::Scalar { name: name.to_string() });
            scalar_ids.insert(name, id);
        }
        // A function with no declared return type defaults to `void`
        // (spec.md §4.2). It has no vector/matrix forms and never appears
        // as a value, so it's seeded here rather than added to
        // `ALL_SCALARS`/`VECTOR_SCALARS`.
        self.intern_new(Type::Scalar { name: "void".to_string() });
        for name in VECTOR_SCALARS {
            let elem = scalar_ids[name];
            for columns in 2..=4u8 {
                self.intern_new(Type::Vec { elem, columns });
            }
            for rows in 2..=4u8 {
                for columns in 2..=4u8 {
                    self.intern_new(Type::Mat { elem, rows, columns });
                }
            }
        }
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn find_by_name(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn mangled_name(&self, id: TypeId) -> String {
        self.get(id).mangled_name(self)
    }

    pub fn num_slots(&self, id: TypeId) -> u64 {
        self.get(id).num_slots(self)
    }

    /// Interns a (possibly runtime-sized, `count == 0`) array type, reusing
    /// an existing entry with the same mangled name if one exists.
    pub fn intern_array(&mut self, elem: TypeId, count: u64) -> TypeId {
        let mangled = {
            let elem_name = self.mangled_name(elem);
            if count == 0 {
                format!("{elem_name}[]")
            } else {
                format!("{elem_name}[{count}]")
            }
        };
        if let Some(id) = self.by_name.get(&mangled) {
            return *id;
        }
        self.intern_new(Type::Array { elem, count })
    }

    /// Interns a struct type. Returns `None` if the name is already taken by
    /// a different type (callers should treat that as a semantic error).
    pub fn intern_struct(&mut self, name: String, members: Vec<Member>) -> TypeId {
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        self.intern_new(Type::Custom { name, members })
    }

    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_seeded() {
        let reg = TypeRegistry::new();
        assert!(reg.find_by_name("float").is_some());
        assert!(reg.find_by_name("ulong").is_some());
    }

    #[test]
    fn void_is_seeded_but_has_no_vector_form() {
        let reg = TypeRegistry::new();
        assert!(reg.find_by_name("void").is_some());
        assert!(reg.find_by_name("void2").is_none());
    }

    #[test]
    fn vectors_and_matrices_are_seeded_with_mangled_names() {
        let reg = TypeRegistry::new();
        let v = reg.find_by_name("float3").expect("float3 seeded");
        assert_eq!(reg.get(v).num_slots(&reg), 3);
        let m = reg.find_by_name("float4x4").expect("float4x4 seeded");
        assert_eq!(reg.get(m).num_slots(&reg), 16);
    }

    #[test]
    fn long_and_ulong_have_no_vector_forms() {
        let reg = TypeRegistry::new();
        assert!(reg.find_by_name("long2").is_none());
        assert!(reg.find_by_name("ulong4x4").is_none());
    }

    #[test]
    fn array_interning_is_idempotent_by_mangled_name() {
        let mut reg = TypeRegistry::new();
        let float = reg.find_by_name("float").unwrap();
        let a1 = reg.intern_array(float, 4);
        let a2 = reg.intern_array(float, 4);
        assert_eq!(a1, a2);
        assert_eq!(reg.mangled_name(a1), "float[4]");
    }

    #[test]
    fn runtime_sized_array_mangles_with_empty_brackets() {
        let mut reg = TypeRegistry::new();
        let float = reg.find_by_name("float").unwrap();
        let a = reg.intern_array(float, 0);
        assert_eq!(reg.mangled_name(a), "float[]");
    }
}
