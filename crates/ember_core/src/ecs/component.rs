// component.rs - Component type registration
//
// Component ids come from the COMPONENTS registry and double as pool indices
// inside every EntityContext.

use crate::registry::{TypeKey, COMPONENTS};

pub type ComponentId = TypeKey;

/// Data attached to an owner id.
///
/// Implementors must be `Send + Sync` so pools can be read from worker
/// threads during a wave.
pub trait Component: 'static + Sized + Send + Sync {
    /// Human-readable name for logs and errors.
    const NAME: &'static str;

    /// Registry id, assigned on first use.
    #[inline]
    fn id() -> ComponentId {
        COMPONENTS.id_of::<Self>()
    }
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, "Position");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
    ($ty:ty) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = stringify!($ty);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{ComponentPool, OwnerId};

    #[derive(Debug, PartialEq)]
    struct Mass(f32);
    #[derive(Debug, PartialEq)]
    struct Charge(f32);
    define_component!(Mass, "Mass");
    define_component!(Charge);

    #[test]
    fn ids_are_stable_and_distinct() {
        assert_eq!(Mass::id(), Mass::id());
        assert_ne!(Mass::id(), Charge::id());
        assert_eq!(Charge::NAME, "Charge");
    }

    #[test]
    fn names_label_pool_values_and_errors() {
        let owner = OwnerId::new(1);
        let mut masses = ComponentPool::<Mass>::new();
        masses.set(owner, Mass(2.5)).unwrap();
        assert_eq!(masses.get(owner).unwrap().0, 2.5);

        let mut charges = ComponentPool::<Charge>::new();
        charges.set(owner, Charge(-1.0)).unwrap();
        let previous = charges.update(owner, Charge(1.0)).unwrap();
        assert_eq!(previous.0 + charges.get(owner).unwrap().0, 0.0);

        let err = masses.get(OwnerId::new(2)).unwrap_err();
        assert_eq!(err.to_string(), "Mass not found for owner #2");
    }

    #[test]
    fn id_resolves_back_to_type() {
        let registered = COMPONENTS.type_of(Mass::id()).unwrap();
        assert_eq!(registered.type_id, std::any::TypeId::of::<Mass>());
    }
}
