//! Specialized collection types
//!
//! Scene objects are addressed through generational slot-map keys. A key
//! whose slot has been freed (or reused) no longer resolves, which gives the
//! weak-reference behaviour the overlap bookkeeping relies on.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generational handle to a collidable primitive component
    pub struct ComponentKey;

    /// Generational handle to an actor (the owner of one or more components)
    pub struct ActorId;
}

/// Handle-based map of components
pub type ComponentMap<T> = SlotMap<ComponentKey, T>;

/// Handle-based map of actors
pub type ActorMap<T> = SlotMap<ActorId, T>;
