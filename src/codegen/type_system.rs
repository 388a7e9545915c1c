//! Type mapping and scope tracking
//!
//! Cinder types map onto C as follows:
//!
//! | Cinder     | C              |
//! |------------|----------------|
//! | `num`      | `int64_t`      |
//! | `rnum`     | `double`       |
//! | `bool`     | `bool`         |
//! | `str`      | `char *`       |
//! | `ptr T`    | `T *`          |
//! | `array<T>` | `__rt_array *` |
//! | `void`     | `void`         |
//!
//! The generator keeps a stack of scopes (one per block) mapping variable
//! names to their declared types. It is only consulted where emission
//! depends on a type, i.e. routing array intrinsics to the element-specific
//! runtime functions.

use crate::codegen::engine::Generator;
use crate::parser::ast::{Scalar, Type};
use rustc_hash::FxHashMap;

/// Scalar to C type table
pub(crate) fn scalar_table() -> FxHashMap<Scalar, &'static str> {
    let mut table = FxHashMap::default();
    table.insert(Scalar::Num, "int64_t");
    table.insert(Scalar::Rnum, "double");
    table.insert(Scalar::Bool, "bool");
    table.insert(Scalar::Str, "char *");
    table
}

/// Suffix of the element-specific array runtime functions
pub(crate) fn element_suffix(scalar: Scalar) -> &'static str {
    scalar.keyword()
}

impl Generator<'_> {
    pub(crate) fn c_scalar(&self, scalar: Scalar) -> &'static str {
        self.types.get(&scalar).copied().unwrap_or("int64_t")
    }

    /// C spelling of `ty`
    pub(crate) fn c_type(&self, ty: Type) -> String {
        match ty {
            Type::Void => "void".to_string(),
            Type::Scalar(s) => self.c_scalar(s).to_string(),
            Type::Pointer(s) => format!("{} *", self.c_scalar(s)),
            Type::Array(_) => "__rt_array *".to_string(),
        }
    }

    /// `T name` with the pointer star attached to the name
    pub(crate) fn c_declarator(&self, ty: Type, name: &str) -> String {
        let c = self.c_type(ty);
        if c.ends_with('*') {
            format!("{}{}", c, name)
        } else {
            format!("{} {}", c, name)
        }
    }

    /// Value of a declaration without initializer
    pub(crate) fn zero_value(&self, ty: Type) -> String {
        match ty {
            Type::Void => String::new(),
            Type::Scalar(Scalar::Num) => "0".to_string(),
            Type::Scalar(Scalar::Rnum) => "0.0".to_string(),
            Type::Scalar(Scalar::Bool) => "false".to_string(),
            Type::Scalar(Scalar::Str) => "(char *)\"\"".to_string(),
            Type::Pointer(_) => "NULL".to_string(),
            Type::Array(element) => {
                format!("__rt_array_create_{}()", element_suffix(element))
            }
        }
    }

    // ===== Scopes =====

    pub(crate) fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub(crate) fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn declare(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    /// Innermost declaration of `name`
    pub(crate) fn lookup(&self, name: &str) -> Option<Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}
