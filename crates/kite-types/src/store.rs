//! Declaration storage and the environment trait.
//!
//! [`TypeStore`] owns every [`ClassDef`] and [`TypeParamDef`] and seeds the
//! well-known builtins (`Any`, `Nothing`). Supertype lists are stored as
//! [`DeferredType`] slots so that a class can be registered before its
//! supertypes have finished resolving; [`TypeEnv::supertypes`] forces the
//! slots and propagates any [`LazyError`] from the underlying computation.
//! The constructor-level supertype graph is required to be a DAG — a cycle
//! surfaces as [`LazyError::Reentrant`] out of the deferred slot, never as
//! non-termination here.

use kite_storage::LazyError;

use crate::{ClassDef, ClassId, ClassType, DeferredType, Type, TypeParamDef, TypeParamId, Variance};

/// Ids of the builtin declarations every store provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    /// The implicit top type.
    pub any: ClassId,
    /// The bottom type; subtype of everything, terminates substitution
    /// recursion.
    pub nothing: ClassId,
}

impl WellKnownTypes {
    /// Whether `ty` is the bottom type, nullable or not.
    pub fn is_nothing(&self, ty: &Type) -> bool {
        matches!(ty, Type::Class(ClassType { def, .. }) if *def == self.nothing)
    }
}

/// Read access to declarations, abstracted so tests and layered environments
/// can substitute their own lookup.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;

    fn type_param(&self, id: TypeParamId) -> Option<&TypeParamDef>;

    /// Look up a class id for an already-registered name.
    fn lookup_class(&self, name: &str) -> Option<ClassId>;

    /// The directly declared supertypes of `id`, forcing deferred slots.
    ///
    /// Forcing is this layer's responsibility: consumers (the substitutor in
    /// particular) only ever see fully-resolved types. Failures from the
    /// underlying lazy computation propagate unchanged.
    fn supertypes(&self, id: ClassId) -> Result<Vec<Type>, LazyError>;

    fn well_known(&self) -> &WellKnownTypes;
}

struct StoredClass {
    def: ClassDef,
    supertypes: Vec<DeferredType>,
}

/// The canonical owner of type declarations.
pub struct TypeStore {
    classes: Vec<StoredClass>,
    type_params: Vec<TypeParamDef>,
    well_known: WellKnownTypes,
}

impl TypeStore {
    /// A store seeded with the builtin declarations.
    ///
    /// `Nothing` is declared with `Any` as a supertype, like any other class;
    /// the substitutor short-circuits on it semantically rather than relying
    /// on an empty supertype list.
    pub fn with_builtins() -> Self {
        let mut store = Self {
            classes: Vec::new(),
            type_params: Vec::new(),
            well_known: WellKnownTypes {
                any: ClassId::from_raw(0),
                nothing: ClassId::from_raw(0),
            },
        };

        let any = store.add_class(
            ClassDef {
                name: "Any".to_string(),
                type_params: vec![],
            },
            vec![],
        );
        let nothing = store.add_class(
            ClassDef {
                name: "Nothing".to_string(),
                type_params: vec![],
            },
            vec![Type::class(any, vec![])],
        );

        store.well_known = WellKnownTypes { any, nothing };
        store
    }

    /// Register a fresh, unowned type parameter.
    ///
    /// `index` and `owner` are assigned when the owning class is added.
    pub fn add_type_param(&mut self, name: impl Into<String>, variance: Variance) -> TypeParamId {
        let id = TypeParamId::from_raw(
            self.type_params
                .len()
                .try_into()
                .expect("too many type params"),
        );
        self.type_params.push(TypeParamDef {
            name: name.into(),
            variance,
            index: 0,
            owner: None,
        });
        id
    }

    /// Register a class whose supertypes are already resolved.
    pub fn add_class(&mut self, def: ClassDef, supertypes: Vec<Type>) -> ClassId {
        let supertypes = supertypes
            .into_iter()
            .map(|ty| DeferredType::computed(format!("supertype of {}", def.name), ty))
            .collect();
        self.add_class_with_slots(def, supertypes)
    }

    /// Register a class whose supertype slots may still be computing.
    pub fn add_class_deferred(&mut self, def: ClassDef, supertypes: Vec<DeferredType>) -> ClassId {
        self.add_class_with_slots(def, supertypes)
    }

    fn add_class_with_slots(&mut self, def: ClassDef, supertypes: Vec<DeferredType>) -> ClassId {
        let id = ClassId::from_raw(self.classes.len().try_into().expect("too many classes"));
        self.claim_type_params(id, &def);
        self.classes.push(StoredClass { def, supertypes });
        id
    }

    /// Assign ownership and positions to a new class's parameters.
    ///
    /// A parameter belongs to exactly one class; claiming one twice is a bug
    /// in declaration construction and fails fast.
    fn claim_type_params(&mut self, owner: ClassId, def: &ClassDef) {
        for (index, &param) in def.type_params.iter().enumerate() {
            let param_def = self
                .type_params
                .get_mut(param.to_raw() as usize)
                .unwrap_or_else(|| panic!("unknown type param {param:?} on class `{}`", def.name));
            assert!(
                param_def.owner.is_none(),
                "type param `{}` already owned by {:?}, cannot claim for `{}`",
                param_def.name,
                param_def.owner,
                def.name,
            );
            param_def.owner = Some(owner);
            param_def.index = index.try_into().expect("too many type params on one class");
        }
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.lookup_class(name)
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.to_raw() as usize).map(|c| &c.def)
    }

    fn type_param(&self, id: TypeParamId) -> Option<&TypeParamDef> {
        self.type_params.get(id.to_raw() as usize)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.def.name == name)
            .map(|idx| ClassId::from_raw(idx as u32))
    }

    fn supertypes(&self, id: ClassId) -> Result<Vec<Type>, LazyError> {
        let stored = match self.classes.get(id.to_raw() as usize) {
            Some(stored) => stored,
            None => return Ok(Vec::new()),
        };
        stored.supertypes.iter().map(|slot| slot.force()).collect()
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}
