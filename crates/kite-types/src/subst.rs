//! Deep substitution over the supertype closure.
//!
//! Given a fully-applied type, [`build_deep_substitutor`] computes one
//! consistent mapping from every type parameter declared anywhere in the
//! type's supertype closure to the projection it resolves to at this
//! instantiation. For a hierarchy
//!
//! ```text
//! interface Iterable<out T>
//! interface Collection<out E> : Iterable<E>
//! interface FooCollection<F> : Collection<Foo<F>>
//! ```
//!
//! the substitutor for `FooCollection<out CharSequence>` maps `F` to
//! `out CharSequence` and both `E` and `T` to `Foo<out CharSequence>`:
//! argument projections are rewritten through the substitution accumulated
//! so far before being recorded, so parameters declared deep in the
//! hierarchy end up expressed in terms of the original call-site arguments.
//!
//! The walk is a depth-first traversal of the constructor-level supertype
//! DAG in declaration order. A constructor reachable along several paths
//! (diamond) is visited once per path — on purpose, since different paths
//! may produce different effective projections. In the single-map variant
//! the last write along the traversal wins; the multimap variant retains
//! every distinct projection per parameter for inspection.

use std::collections::HashMap;

use kite_storage::LazyError;

use crate::{format_type, ClassType, Type, TypeEnv, TypeParamId, TypeProjection, Variance};

/// Rewrites projections by replacing recognized type parameters.
#[derive(Debug, Clone, Default)]
pub struct Substitutor {
    substitution: HashMap<TypeParamId, TypeProjection>,
}

impl Substitutor {
    pub fn new(substitution: HashMap<TypeParamId, TypeProjection>) -> Self {
        Self { substitution }
    }

    /// The identity substitutor.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.substitution.is_empty()
    }

    /// The projection recorded for `param`, if any.
    pub fn projection_for(&self, param: TypeParamId) -> Option<&TypeProjection> {
        self.substitution.get(&param)
    }

    /// Rewrite `projection`, replacing every recognized type parameter.
    ///
    /// Projections containing no recognized parameter come back value-equal.
    /// A parameter occurrence marked nullable keeps the replacement nullable
    /// (`T?` substituted by `Int` yields `Int?`).
    pub fn substitute(&self, projection: &TypeProjection) -> TypeProjection {
        substitute_projection(&self.substitution, projection)
    }
}

fn substitute_projection(
    substitution: &HashMap<TypeParamId, TypeProjection>,
    projection: &TypeProjection,
) -> TypeProjection {
    let TypeProjection::Arg { variance, ty } = projection else {
        return TypeProjection::Star;
    };

    match ty {
        Type::TypeVar(var) => match substitution.get(&var.id) {
            None => projection.clone(),
            Some(TypeProjection::Star) => TypeProjection::Star,
            Some(TypeProjection::Arg {
                variance: replacement_variance,
                ty: replacement,
            }) => TypeProjection::Arg {
                variance: compose_variance(*variance, *replacement_variance),
                ty: replacement
                    .clone()
                    .with_nullability(replacement.is_nullable() || var.nullable),
            },
        },
        Type::Class(ct) => TypeProjection::Arg {
            variance: *variance,
            ty: Type::Class(ClassType {
                def: ct.def,
                args: ct
                    .args
                    .iter()
                    .map(|arg| substitute_projection(substitution, arg))
                    .collect(),
                nullable: ct.nullable,
            }),
        },
    }
}

/// Combine the variance written at the occurrence with the variance of the
/// projection substituted into it. Invariance defers to the other side; a
/// genuine conflict keeps the substituted projection's use-site variance.
fn compose_variance(use_site: Variance, substituted: Variance) -> Variance {
    match (use_site, substituted) {
        (Variance::Invariant, v) | (v, Variance::Invariant) => v,
        (a, b) if a == b => a,
        (_, b) => b,
    }
}

/// Every distinct projection computed for each parameter across all paths of
/// the supertype DAG. Insertion-ordered at both levels; used for inspection
/// and debugging, not for resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepSubstitutionMultimap {
    entries: Vec<(TypeParamId, Vec<TypeProjection>)>,
}

impl DeepSubstitutionMultimap {
    pub fn get(&self, param: TypeParamId) -> &[TypeProjection] {
        self.entries
            .iter()
            .find(|(id, _)| *id == param)
            .map(|(_, projections)| projections.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeParamId, &[TypeProjection])> {
        self.entries
            .iter()
            .map(|(id, projections)| (*id, projections.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, param: TypeParamId, projection: TypeProjection) {
        match self.entries.iter_mut().find(|(id, _)| *id == param) {
            Some((_, projections)) => {
                if !projections.contains(&projection) {
                    projections.push(projection);
                }
            }
            None => self.entries.push((param, vec![projection])),
        }
    }
}

/// Build a substitutor covering the whole supertype closure of `ty`.
///
/// Later writes along the traversal overwrite earlier ones for the same
/// parameter; use [`build_deep_substitution_multimap`] to see every value a
/// parameter took. Propagates [`LazyError`] from forcing deferred supertype
/// slots; an arity mismatch between a constructor's parameters and its
/// arguments is a fatal internal-consistency error.
pub fn build_deep_substitutor(env: &dyn TypeEnv, ty: &Type) -> Result<Substitutor, LazyError> {
    tracing::trace!(ty = %format_type(env, ty), "building deep substitutor");
    let mut substitution = HashMap::new();
    fill_deep_substitution(env, ty, &mut substitution, None)?;
    Ok(Substitutor::new(substitution))
}

/// The multi-valued variant of [`build_deep_substitutor`]: retains every
/// distinct projection computed for each parameter across all paths.
pub fn build_deep_substitution_multimap(
    env: &dyn TypeEnv,
    ty: &Type,
) -> Result<DeepSubstitutionMultimap, LazyError> {
    tracing::trace!(ty = %format_type(env, ty), "building deep substitution multimap");
    let mut substitution = HashMap::new();
    let mut multimap = DeepSubstitutionMultimap::default();
    fill_deep_substitution(env, ty, &mut substitution, Some(&mut multimap))?;
    Ok(multimap)
}

// The accumulator is deliberately shared down the recursion: rewriting an
// argument projection through the substitution gathered so far is what turns
// a deeply declared parameter's argument into call-site terms.
fn fill_deep_substitution(
    env: &dyn TypeEnv,
    ty: &Type,
    substitution: &mut HashMap<TypeParamId, TypeProjection>,
    mut multimap: Option<&mut DeepSubstitutionMultimap>,
) -> Result<(), LazyError> {
    let Type::Class(ct) = ty else {
        // A bare type-parameter reference has no constructor of its own.
        return Ok(());
    };

    let class = env
        .class(ct.def)
        .unwrap_or_else(|| panic!("no class in type environment for {:?}", ct.def));
    assert_eq!(
        class.type_params.len(),
        ct.args.len(),
        "type argument arity mismatch on `{}`",
        class.name,
    );

    for (&param, argument) in class.type_params.iter().zip(&ct.args) {
        let rewritten = substitute_projection(substitution, argument);
        substitution.insert(param, rewritten.clone());
        if let Some(multimap) = multimap.as_deref_mut() {
            multimap.insert(param, rewritten);
        }
    }

    // The bottom type terminates the walk: its argument substitution is
    // meaningless even though the declaration lists supertypes.
    if env.well_known().is_nothing(ty) {
        return Ok(());
    }

    for supertype in env.supertypes(ct.def)? {
        fill_deep_substitution(env, &supertype, substitution, multimap.as_deref_mut())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{ClassDef, ClassId, TypeStore, TypeVarRef};

    use super::*;

    #[test]
    fn empty_substitutor_is_identity() {
        let subst = Substitutor::empty();
        assert!(subst.is_empty());

        let proj = TypeProjection::invariant(Type::class(ClassId::from_raw(5), vec![]));
        assert_eq!(subst.substitute(&proj), proj);
        assert_eq!(subst.substitute(&TypeProjection::Star), TypeProjection::Star);
    }

    #[test]
    fn substitute_leaves_unrecognized_params_unchanged() {
        let mut store = TypeStore::with_builtins();
        let t = store.add_type_param("T", Variance::Invariant);
        let u = store.add_type_param("U", Variance::Invariant);
        let any = store.well_known().any;

        let mut substitution = HashMap::new();
        substitution.insert(t, TypeProjection::invariant(Type::class(any, vec![])));
        let subst = Substitutor::new(substitution);

        let unrecognized = TypeProjection::invariant(Type::type_var(u));
        assert_eq!(subst.substitute(&unrecognized), unrecognized);

        let recognized = TypeProjection::invariant(Type::type_var(t));
        assert_eq!(
            subst.substitute(&recognized),
            TypeProjection::invariant(Type::class(any, vec![]))
        );
    }

    #[test]
    fn substitute_composes_nullability_of_occurrence() {
        let mut store = TypeStore::with_builtins();
        let t = store.add_type_param("T", Variance::Invariant);
        let any = store.well_known().any;

        let mut substitution = HashMap::new();
        substitution.insert(t, TypeProjection::invariant(Type::class(any, vec![])));
        let subst = Substitutor::new(substitution);

        // T? substituted by Any yields Any?.
        let nullable_occurrence = TypeProjection::invariant(Type::TypeVar(TypeVarRef {
            id: t,
            nullable: true,
        }));
        assert_eq!(
            subst.substitute(&nullable_occurrence),
            TypeProjection::invariant(Type::class(any, vec![]).with_nullability(true))
        );
    }

    #[test]
    fn substitute_rewrites_nested_arguments() {
        let mut store = TypeStore::with_builtins();
        let e = store.add_type_param("E", Variance::Covariant);
        let any = store.well_known().any;
        let list = store.add_class(
            ClassDef {
                name: "List".to_string(),
                type_params: vec![e],
            },
            vec![Type::class(any, vec![])],
        );
        let t = store.add_type_param("T", Variance::Invariant);

        let mut substitution = HashMap::new();
        substitution.insert(t, TypeProjection::invariant(Type::class(any, vec![])));
        let subst = Substitutor::new(substitution);

        let list_of_t = TypeProjection::invariant(Type::class(
            list,
            vec![TypeProjection::invariant(Type::type_var(t))],
        ));
        assert_eq!(
            subst.substitute(&list_of_t),
            TypeProjection::invariant(Type::class(
                list,
                vec![TypeProjection::invariant(Type::class(any, vec![]))],
            ))
        );
    }

    #[test]
    fn star_replacement_erases_the_argument() {
        let mut store = TypeStore::with_builtins();
        let t = store.add_type_param("T", Variance::Invariant);

        let mut substitution = HashMap::new();
        substitution.insert(t, TypeProjection::Star);
        let subst = Substitutor::new(substitution);

        assert_eq!(
            subst.substitute(&TypeProjection::covariant(Type::type_var(t))),
            TypeProjection::Star
        );
    }

    #[test]
    fn variance_composition_prefers_the_explicit_side() {
        assert_eq!(
            compose_variance(Variance::Invariant, Variance::Covariant),
            Variance::Covariant
        );
        assert_eq!(
            compose_variance(Variance::Contravariant, Variance::Invariant),
            Variance::Contravariant
        );
        assert_eq!(
            compose_variance(Variance::Covariant, Variance::Covariant),
            Variance::Covariant
        );
        assert_eq!(
            compose_variance(Variance::Covariant, Variance::Contravariant),
            Variance::Contravariant
        );
    }

    #[test]
    #[should_panic(expected = "arity mismatch")]
    fn arity_mismatch_is_fatal() {
        let mut store = TypeStore::with_builtins();
        let t = store.add_type_param("T", Variance::Invariant);
        let any = store.well_known().any;
        let boxed = store.add_class(
            ClassDef {
                name: "Box".to_string(),
                type_params: vec![t],
            },
            vec![Type::class(any, vec![])],
        );

        // `Box` declares one parameter but is applied to none.
        let malformed = Type::class(boxed, vec![]);
        let _ = build_deep_substitutor(&store, &malformed);
    }
}
