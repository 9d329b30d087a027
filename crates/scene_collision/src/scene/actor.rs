//! Actors: named owners of collidable components

use crate::foundation::collections::ComponentKey;

/// Owner of one or more primitive components
///
/// Components of the same actor never generate overlap events with each
/// other.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    name: String,
    components: Vec<ComponentKey>,
}

impl Actor {
    pub(crate) fn new(name: String) -> Self {
        Self { name, components: Vec::new() }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owned components in the order they were added
    pub fn components(&self) -> &[ComponentKey] {
        &self.components
    }

    pub(crate) fn attach(&mut self, key: ComponentKey) {
        self.components.push(key);
    }

    pub(crate) fn detach(&mut self, key: ComponentKey) {
        self.components.retain(|owned| *owned != key);
    }
}
