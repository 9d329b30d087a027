//! Overlap event delivery
//!
//! Every begin/end transition of a pair is delivered twice, once to each
//! participating component, with the event naming the receiving component
//! and the other side of the pair. Handlers register either for every event
//! of a kind or for the events of one component, and receive the scene
//! mutably so they can react (including destroying actors) immediately.

use std::collections::HashMap;

use crate::foundation::collections::{ActorId, ComponentKey};
use crate::scene::Scene;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlapEventKind {
    /// The pair started overlapping this frame
    Begin,
    /// The pair stopped overlapping this frame
    End,
}

/// A begin or end overlap notification for one side of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEvent {
    /// Begin or end
    pub kind: OverlapEventKind,
    /// Component receiving the notification
    pub component: ComponentKey,
    /// Owner of the receiving component
    pub actor: ActorId,
    /// The other component of the pair
    pub other_component: ComponentKey,
    /// Owner of the other component
    pub other_actor: ActorId,
    /// Overlap manager frame the transition was detected in
    pub frame: u64,
}

impl OverlapEvent {
    /// The same transition as seen from the other component
    pub fn mirrored(&self) -> Self {
        Self {
            component: self.other_component,
            actor: self.other_actor,
            other_component: self.component,
            other_actor: self.actor,
            ..*self
        }
    }
}

/// Overlap event handler trait
pub trait OverlapHandler {
    /// Handle an event
    fn on_overlap(&mut self, event: &OverlapEvent, scene: &mut Scene);
}

impl<F> OverlapHandler for F
where
    F: FnMut(&OverlapEvent, &mut Scene),
{
    fn on_overlap(&mut self, event: &OverlapEvent, scene: &mut Scene) {
        self(event, scene);
    }
}

/// Registry of overlap handlers
#[derive(Default)]
pub struct OverlapDispatcher {
    handlers: HashMap<OverlapEventKind, Vec<Box<dyn OverlapHandler>>>,
    component_handlers: HashMap<(ComponentKey, OverlapEventKind), Vec<Box<dyn OverlapHandler>>>,
}

impl std::fmt::Debug for OverlapDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlapDispatcher")
            .field("handlers", &self.handlers.values().map(Vec::len).sum::<usize>())
            .field("component_handlers", &self.component_handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl OverlapDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every event of `kind`
    pub fn register_handler(&mut self, kind: OverlapEventKind, handler: impl OverlapHandler + 'static) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Register a handler for events of `kind` received by `component`
    pub fn register_component_handler(
        &mut self,
        component: ComponentKey,
        kind: OverlapEventKind,
        handler: impl OverlapHandler + 'static,
    ) {
        self.component_handlers
            .entry((component, kind))
            .or_default()
            .push(Box::new(handler));
    }

    /// Drop every handler registered for `component`
    pub fn unregister_component(&mut self, component: ComponentKey) {
        self.component_handlers.retain(|(key, _), _| *key != component);
    }

    /// Drop component handlers whose component no longer exists
    pub fn prune(&mut self, scene: &Scene) {
        self.component_handlers
            .retain(|(key, _), _| scene.component(*key).is_some());
    }

    /// Number of registered handlers of both kinds
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum::<usize>()
            + self.component_handlers.values().map(Vec::len).sum::<usize>()
    }

    /// Deliver one event: the receiving component's handlers first, then
    /// the handlers registered for every event of that kind
    pub fn dispatch(&mut self, event: &OverlapEvent, scene: &mut Scene) {
        if let Some(handlers) = self.component_handlers.get_mut(&(event.component, event.kind)) {
            for handler in handlers.iter_mut() {
                handler.on_overlap(event, scene);
            }
        }
        if let Some(handlers) = self.handlers.get_mut(&event.kind) {
            for handler in handlers.iter_mut() {
                handler.on_overlap(event, scene);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::{ActorMap, ComponentMap};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event(kind: OverlapEventKind) -> OverlapEvent {
        let mut components: ComponentMap<()> = ComponentMap::with_key();
        let mut actors: ActorMap<()> = ActorMap::with_key();
        OverlapEvent {
            kind,
            component: components.insert(()),
            actor: actors.insert(()),
            other_component: components.insert(()),
            other_actor: actors.insert(()),
            frame: 1,
        }
    }

    #[test]
    fn test_handlers_only_receive_their_kind() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = OverlapDispatcher::new();
        let sink = Rc::clone(&received);
        dispatcher.register_handler(OverlapEventKind::End, move |event: &OverlapEvent, _: &mut Scene| {
            sink.borrow_mut().push(event.kind);
        });

        let mut scene = Scene::default();
        dispatcher.dispatch(&event(OverlapEventKind::Begin), &mut scene);
        dispatcher.dispatch(&event(OverlapEventKind::End), &mut scene);

        assert_eq!(*received.borrow(), vec![OverlapEventKind::End]);
    }

    #[test]
    fn test_component_handlers_run_first_and_prune() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let begin = event(OverlapEventKind::Begin);
        let mut dispatcher = OverlapDispatcher::new();

        let global = Rc::clone(&order);
        dispatcher.register_handler(OverlapEventKind::Begin, move |_: &OverlapEvent, _: &mut Scene| {
            global.borrow_mut().push("global");
        });
        let local = Rc::clone(&order);
        dispatcher.register_component_handler(begin.component, OverlapEventKind::Begin, move |_: &OverlapEvent, _: &mut Scene| {
            local.borrow_mut().push("component");
        });

        let mut scene = Scene::default();
        dispatcher.dispatch(&begin, &mut scene);
        dispatcher.dispatch(&begin.mirrored(), &mut scene);
        assert_eq!(*order.borrow(), vec!["component", "global", "global"]);

        // The component key was never issued by this scene
        dispatcher.prune(&scene);
        assert_eq!(dispatcher.handler_count(), 1);
    }
}
