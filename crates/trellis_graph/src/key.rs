//! Type identity for providers and instances.
//!
//! Every provider and every instance in a graph is keyed by a [`TypeKey`].
//! Two keys are equal exactly when they describe the same Rust type, so
//! lookups are exact-type matches with no interface-to-implementation
//! binding.
//!
//! # Example
//!
//! ```
//! use trellis_graph::key::{IntoTypeKeys, TypeKey};
//!
//! struct Database;
//! struct Cache;
//!
//! let key = TypeKey::of::<Database>();
//! assert!(key.type_name().ends_with("Database"));
//!
//! let keys = <(Database, Cache)>::type_keys();
//! assert_eq!(keys, vec![TypeKey::of::<Database>(), TypeKey::of::<Cache>()]);
//! ```

use core::any::TypeId;
use core::fmt;
use variadics_please::all_tuples;

// ─────────────────────────────────────────────────────────────────────────────
// TypeKey
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for an injectable type.
///
/// Based on [`TypeId`], with the type name captured alongside it for error
/// messages and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a `TypeKey` for the given type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoTypeKeys Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for types that can be converted into a list of type keys.
///
/// Implemented for tuples of `'static` types, so a module can declare several
/// explicit requirements in one call:
///
/// ```ignore
/// m.require_all::<(Config, Clock, Metrics)>()?;
/// ```
pub trait IntoTypeKeys {
    /// Returns the type keys for this type, in declaration order.
    fn type_keys() -> Vec<TypeKey>;
}

/// Macro to implement `IntoTypeKeys` for tuples of types.
macro_rules! impl_into_type_keys_for_tuple {
    ($($T:ident),*) => {
        impl<$($T: 'static),*> IntoTypeKeys for ($($T,)*) {
            fn type_keys() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$T>()),*]
            }
        }
    };
}

// Generate implementations for tuples from 1 to 16 elements
all_tuples!(impl_into_type_keys_for_tuple, 1, 16, T);

#[cfg(test)]
mod tests {
    use super::*;

    struct KeyA;
    struct KeyB;
    struct KeyC;

    #[test]
    fn type_key_equality() {
        let id1 = TypeKey::of::<KeyA>();
        let id2 = TypeKey::of::<KeyA>();
        let id3 = TypeKey::of::<KeyB>();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn type_key_type_name() {
        let key = TypeKey::of::<KeyA>();
        assert!(key.type_name().contains("KeyA"));
        assert_eq!(key.to_string(), key.type_name());
    }

    #[test]
    fn type_key_type_id() {
        let key = TypeKey::of::<KeyA>();
        assert_eq!(key.type_id(), TypeId::of::<KeyA>());
    }

    #[test]
    fn type_key_distinguishes_wrappers() {
        assert_ne!(TypeKey::of::<KeyA>(), TypeKey::of::<Box<KeyA>>());
        assert_ne!(TypeKey::of::<u32>(), TypeKey::of::<u64>());
    }

    #[test]
    fn into_type_keys_single() {
        let keys = <(KeyA,)>::type_keys();
        assert_eq!(keys, vec![TypeKey::of::<KeyA>()]);
    }

    #[test]
    fn into_type_keys_tuple_preserves_order() {
        let keys = <(KeyC, KeyA, KeyB)>::type_keys();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], TypeKey::of::<KeyC>());
        assert_eq!(keys[1], TypeKey::of::<KeyA>());
        assert_eq!(keys[2], TypeKey::of::<KeyB>());
    }
}
