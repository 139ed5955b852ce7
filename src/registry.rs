use crate::context::Context;
use crate::error::ConvertError;
use crate::program::{Node, SyntaxKind};
use crate::reflection::ReflectionId;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::rc::Rc;

/// Converts oracle nodes of the kinds it supports into reflections.
pub trait NodeConverter {
    /// Every node kind this converter handles.
    fn supports(&self) -> &[SyntaxKind];

    /// Converts `node`, attaching any reflection it creates under the
    /// context's active scope.
    ///
    /// `Ok(None)` means no reflection was produced (excluded or merged
    /// nodes, for example) and is never treated as a failure by callers.
    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError>;
}

/// Identifies a registered converter for [`NodeConverterRegistry::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u32);

impl Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler {}", self.0)
    }
}

struct Registered {
    id: HandlerId,
    converter: Rc<dyn NodeConverter>,
}

/// Maps node kinds to the converter handling them. A converter supporting
/// several kinds is installed under each of them and removed from all of
/// them at once.
#[derive(Default)]
pub struct NodeConverterRegistry {
    next_id: u32,
    entries: HashMap<SyntaxKind, Registered>,
}

impl NodeConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `converter` under every kind it supports, replacing whatever
    /// was registered for those kinds before.
    pub fn register<C: NodeConverter + 'static>(&mut self, converter: C) -> HandlerId {
        self.register_rc(Rc::new(converter))
    }

    pub fn register_rc(&mut self, converter: Rc<dyn NodeConverter>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        for &kind in converter.supports() {
            let previous = self.entries.insert(
                kind,
                Registered {
                    id,
                    converter: Rc::clone(&converter),
                },
            );
            if let Some(previous) = previous {
                log::debug!("{id} replaces {} for {kind}", previous.id);
            }
        }
        id
    }

    /// Removes every kind entry installed by the converter `id`. Returns
    /// whether anything was removed.
    pub fn unregister(&mut self, id: HandlerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, registered| registered.id != id);
        before != self.entries.len()
    }

    pub fn get(&self, kind: SyntaxKind) -> Option<&Rc<dyn NodeConverter>> {
        self.entries.get(&kind).map(|r| &r.converter)
    }

    pub fn supports(&self, kind: SyntaxKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// The kinds currently handled by converter `id`.
    pub fn kinds_of(&self, id: HandlerId) -> Vec<SyntaxKind> {
        self.entries
            .iter()
            .filter(|(_, r)| r.id == id)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(&'static [SyntaxKind]);

    impl NodeConverter for Noop {
        fn supports(&self) -> &[SyntaxKind] {
            self.0
        }

        fn convert<'a>(
            &self,
            _cx: &mut Context<'a>,
            _node: &'a Node,
        ) -> Result<Option<ReflectionId>, ConvertError> {
            Ok(None)
        }
    }

    #[test]
    fn test_register_installs_every_supported_kind() {
        let mut registry = NodeConverterRegistry::new();
        let id = registry.register(Noop(&[SyntaxKind::Class, SyntaxKind::Interface]));

        assert!(registry.supports(SyntaxKind::Class));
        assert!(registry.supports(SyntaxKind::Interface));
        let mut kinds = registry.kinds_of(id);
        kinds.sort_by_key(|k| k.to_string());
        assert_eq!(kinds, vec![SyntaxKind::Class, SyntaxKind::Interface]);
    }

    #[test]
    fn test_unregister_removes_all_entries_of_handler() {
        let mut registry = NodeConverterRegistry::new();
        let both = registry.register(Noop(&[SyntaxKind::Class, SyntaxKind::Interface]));
        let other = registry.register(Noop(&[SyntaxKind::Enum]));

        assert!(registry.unregister(both));
        assert!(!registry.supports(SyntaxKind::Class));
        assert!(!registry.supports(SyntaxKind::Interface));
        assert!(registry.supports(SyntaxKind::Enum));
        assert!(!registry.unregister(both));
        assert!(registry.unregister(other));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_later_registration_takes_over_shared_kind() {
        let mut registry = NodeConverterRegistry::new();
        let first = registry.register(Noop(&[SyntaxKind::Class, SyntaxKind::Interface]));
        let second = registry.register(Noop(&[SyntaxKind::Interface]));

        assert_eq!(registry.kinds_of(first), vec![SyntaxKind::Class]);
        assert_eq!(registry.kinds_of(second), vec![SyntaxKind::Interface]);

        registry.unregister(first);
        assert!(registry.supports(SyntaxKind::Interface));
    }
}
