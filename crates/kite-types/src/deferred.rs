//! Lazily-computed type slots.

use std::fmt;

use kite_storage::{LazyError, LazyValue};

use crate::Type;

/// A type whose computation may still be in flight.
///
/// Used for supertype slots in the store: declaration resolution can register
/// a class before the types it refers to have finished resolving. The slot
/// computes at most once; a reentrant force (the computation depending on its
/// own result) reports [`LazyError::Reentrant`], which callers surface as an
/// internal error rather than a diagnostic about user code.
pub struct DeferredType {
    lazy: LazyValue<Type>,
}

impl DeferredType {
    pub fn new(
        name: impl Into<String>,
        compute: impl FnOnce() -> Result<Type, LazyError> + Send + 'static,
    ) -> Self {
        Self {
            lazy: LazyValue::new(name, compute),
        }
    }

    /// An already-resolved slot.
    pub fn computed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            lazy: LazyValue::computed(name, ty),
        }
    }

    /// Force resolution, returning the cached type if present.
    pub fn force(&self) -> Result<Type, LazyError> {
        self.lazy.force()
    }

    pub fn is_computed(&self) -> bool {
        self.lazy.is_computed()
    }

    pub fn name(&self) -> &str {
        self.lazy.name()
    }
}

impl fmt::Debug for DeferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_computed() {
            match self.lazy.force() {
                Ok(ty) => write!(f, "DeferredType({ty:?})"),
                Err(_) => write!(f, "DeferredType(<failed>)"),
            }
        } else {
            write!(f, "DeferredType(<not computed>)")
        }
    }
}
