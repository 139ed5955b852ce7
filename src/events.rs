//! Lifecycle hooks of a conversion run.
//!
//! Subscribers run synchronously, in subscription order, and receive the
//! project together with the run's id registry so they can annotate, add or
//! remove reflections in place.

use crate::program::Node;
use crate::project::ProjectReflection;
use crate::reflection::{IdRegistry, Reflection, ReflectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Begin,
    FileBegin,
    CreateDeclaration,
    CreateSignature,
    CreateParameter,
    CreateTypeParameter,
    FunctionImplementation,
    ResolveBegin,
    Resolve,
    ResolveEnd,
    End,
}

/// An event with its payload.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// Conversion of a project starts.
    Begin,
    /// A source file is about to be converted (first pass only).
    FileBegin { node: &'a Node },
    CreateDeclaration { reflection: ReflectionId, node: &'a Node },
    CreateSignature { reflection: ReflectionId, node: &'a Node },
    CreateParameter { reflection: ReflectionId, node: &'a Node },
    CreateTypeParameter { reflection: ReflectionId, node: &'a Node },
    /// An overloaded callable has an implementation body. `reflection` is the
    /// declaration holding the overload signatures.
    FunctionImplementation { reflection: ReflectionId, node: &'a Node },
    ResolveBegin,
    /// Fired once per reflection during resolution.
    Resolve { reflection: ReflectionId },
    ResolveEnd,
    /// The finished, swept project is about to be returned.
    End,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Begin => EventKind::Begin,
            Event::FileBegin { .. } => EventKind::FileBegin,
            Event::CreateDeclaration { .. } => EventKind::CreateDeclaration,
            Event::CreateSignature { .. } => EventKind::CreateSignature,
            Event::CreateParameter { .. } => EventKind::CreateParameter,
            Event::CreateTypeParameter { .. } => EventKind::CreateTypeParameter,
            Event::FunctionImplementation { .. } => EventKind::FunctionImplementation,
            Event::ResolveBegin => EventKind::ResolveBegin,
            Event::Resolve { .. } => EventKind::Resolve,
            Event::ResolveEnd => EventKind::ResolveEnd,
            Event::End => EventKind::End,
        }
    }

    pub fn reflection(&self) -> Option<ReflectionId> {
        match *self {
            Event::CreateDeclaration { reflection, .. }
            | Event::CreateSignature { reflection, .. }
            | Event::CreateParameter { reflection, .. }
            | Event::CreateTypeParameter { reflection, .. }
            | Event::FunctionImplementation { reflection, .. }
            | Event::Resolve { reflection } => Some(reflection),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&Node> {
        match *self {
            Event::FileBegin { node }
            | Event::CreateDeclaration { node, .. }
            | Event::CreateSignature { node, .. }
            | Event::CreateParameter { node, .. }
            | Event::CreateTypeParameter { node, .. }
            | Event::FunctionImplementation { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// What a subscriber may touch: the project under construction and the id
/// registry new reflections must be numbered from.
pub struct EventContext<'a> {
    pub project: &'a mut ProjectReflection,
    ids: &'a mut IdRegistry,
}

impl<'a> EventContext<'a> {
    pub fn new(project: &'a mut ProjectReflection, ids: &'a mut IdRegistry) -> Self {
        EventContext { project, ids }
    }

    /// Registers `reflection` and attaches it as a child of `parent`.
    pub fn add_child(&mut self, parent: ReflectionId, reflection: Reflection) -> ReflectionId {
        let id = self.project.register(self.ids, reflection);
        self.project.add_child(parent, id);
        id
    }

    /// Registers `reflection` without attaching it anywhere.
    pub fn register(&mut self, reflection: Reflection) -> ReflectionId {
        self.project.register(self.ids, reflection)
    }

    pub fn remove(&mut self, id: ReflectionId) -> bool {
        self.project.remove_reflection(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&mut EventContext<'_>, &Event<'_>)>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut EventContext<'_>, &Event<'_>) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            listener: Box::new(listener),
        });
        id
    }

    pub fn unsubscribe(&mut self, kind: EventKind, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|s| !(s.kind == kind && s.id == id));
        before != self.subscriptions.len()
    }

    /// Calls every listener of the event's kind in subscription order.
    pub fn emit(&mut self, cx: &mut EventContext<'_>, event: &Event<'_>) {
        let kind = event.kind();
        for subscription in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            (subscription.listener)(cx, event);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }
}
