//! Type graph model and deep substitution for Kite.
//!
//! This crate currently provides:
//! - the immutable type graph: [`Type`], [`TypeProjection`], [`ClassDef`],
//!   [`TypeParamDef`] and the id newtypes addressing them;
//! - [`TypeStore`]: the canonical owner of declarations, plus the [`TypeEnv`]
//!   trait other environments can implement;
//! - [`DeferredType`]: a lazily-computed type slot for declarations whose
//!   resolution may still be in flight;
//! - deep substitution: [`build_deep_substitutor`] and
//!   [`build_deep_substitution_multimap`], which walk a type's entire
//!   supertype closure and map every type parameter declared anywhere in it
//!   to the argument it resolves to at the given instantiation.
//!
//! The crate never parses source text. Types are produced by upstream
//! resolution and consumed here as fully-formed values.

mod deferred;
mod format;
mod model;
mod store;
mod subst;

pub use deferred::DeferredType;
pub use format::{format_projection, format_type};
pub use model::{
    ClassDef, ClassId, ClassType, Type, TypeParamDef, TypeParamId, TypeProjection, TypeVarRef,
    Variance,
};
pub use store::{TypeEnv, TypeStore, WellKnownTypes};
pub use subst::{
    build_deep_substitution_multimap, build_deep_substitutor, DeepSubstitutionMultimap,
    Substitutor,
};

pub use kite_storage::LazyError;
