//! The immutable type graph.
//!
//! A [`ClassDef`] is the identity of a generic declaration: it owns an
//! ordered list of type parameters whose positions are the keys everything
//! else is zipped against. A [`Type`] applies a class to argument
//! projections, or references a type parameter; both carry a nullability
//! flag. All of these are value-like and never mutated after the declaring
//! store has sealed them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a class/interface declaration inside a [`crate::TypeStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(u32);

impl ClassId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Identity of a type parameter declaration inside a [`crate::TypeStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeParamId(u32);

impl TypeParamId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeParamId({})", self.0)
    }
}

/// Declaration-site or use-site variance of a type parameter/projection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variance {
    #[default]
    Invariant,
    /// `out T`: only produced, safe to widen.
    Covariant,
    /// `in T`: only consumed, safe to narrow.
    Contravariant,
}

impl Variance {
    /// Use-site label as written in source (`""`, `"out "`, `"in "`).
    pub fn label(self) -> &'static str {
        match self {
            Variance::Invariant => "",
            Variance::Covariant => "out ",
            Variance::Contravariant => "in ",
        }
    }
}

/// A type parameter declaration.
///
/// Owned by exactly one class; `owner` and `index` are assigned once, when
/// the owning class is added to the store, and never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParamDef {
    pub name: String,
    pub variance: Variance,
    /// Position within the owning class's parameter list.
    pub index: u32,
    pub owner: Option<ClassId>,
}

/// A class/interface declaration: name plus its ordered type parameters.
///
/// Direct supertypes are held by the store, not the def, because they may be
/// deferred; see [`crate::TypeEnv::supertypes`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub type_params: Vec<TypeParamId>,
}

/// An application of a class to argument projections.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassType {
    pub def: ClassId,
    /// Invariant: `args.len()` equals the class's declared parameter count.
    /// A mismatch is a bug in upstream declaration construction and is fatal.
    pub args: Vec<TypeProjection>,
    pub nullable: bool,
}

/// A use of a type parameter as a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeVarRef {
    pub id: TypeParamId,
    pub nullable: bool,
}

/// A fully-formed type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Class(ClassType),
    TypeVar(TypeVarRef),
}

impl Type {
    /// Non-nullable class application.
    pub fn class(def: ClassId, args: Vec<TypeProjection>) -> Self {
        Type::Class(ClassType {
            def,
            args,
            nullable: false,
        })
    }

    /// Non-nullable reference to a type parameter.
    pub fn type_var(id: TypeParamId) -> Self {
        Type::TypeVar(TypeVarRef {
            id,
            nullable: false,
        })
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Class(ct) => ct.nullable,
            Type::TypeVar(r) => r.nullable,
        }
    }

    /// The same type with its nullability flag set to `nullable`.
    pub fn with_nullability(self, nullable: bool) -> Self {
        match self {
            Type::Class(ct) => Type::Class(ClassType { nullable, ..ct }),
            Type::TypeVar(r) => Type::TypeVar(TypeVarRef { nullable, ..r }),
        }
    }
}

/// One argument at an instantiation site: a concrete type with use-site
/// variance, or a star projection standing for "unknown, bounded only by the
/// parameter's own constraints".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeProjection {
    Star,
    Arg { variance: Variance, ty: Type },
}

impl TypeProjection {
    pub fn invariant(ty: Type) -> Self {
        TypeProjection::Arg {
            variance: Variance::Invariant,
            ty,
        }
    }

    pub fn covariant(ty: Type) -> Self {
        TypeProjection::Arg {
            variance: Variance::Covariant,
            ty,
        }
    }

    pub fn contravariant(ty: Type) -> Self {
        TypeProjection::Arg {
            variance: Variance::Contravariant,
            ty,
        }
    }

    /// The projected type, if this is not a star projection.
    pub fn ty(&self) -> Option<&Type> {
        match self {
            TypeProjection::Star => None,
            TypeProjection::Arg { ty, .. } => Some(ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_nullability_round_trips() {
        let ty = Type::class(ClassId::from_raw(3), vec![]);
        assert!(!ty.is_nullable());
        let nullable = ty.clone().with_nullability(true);
        assert!(nullable.is_nullable());
        assert_eq!(nullable.with_nullability(false), ty);
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let id = ClassId::from_raw(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: ClassId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
