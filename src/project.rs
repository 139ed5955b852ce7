use crate::program::SymbolId;
use crate::reflection::{Comment, IdRegistry, Reflection, ReflectionId, ReflectionVariant};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// The root of the documentation graph.
///
/// The project owns every reflection of a run through a single id mapping.
/// Children, signatures and parameters refer to each other by id only, so
/// the graph can be navigated both ways without any reflection owning
/// another.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReflection {
    pub id: ReflectionId,
    pub name: String,
    pub comment: Option<Comment>,
    /// Top-level children by name.
    pub children: BTreeMap<String, ReflectionId>,
    reflections: BTreeMap<ReflectionId, Reflection>,
    #[serde(skip)]
    symbols: HashMap<SymbolId, ReflectionId>,
}

impl ProjectReflection {
    pub fn new(id: ReflectionId, name: &str) -> Self {
        ProjectReflection {
            id,
            name: name.to_string(),
            comment: None,
            children: BTreeMap::new(),
            reflections: BTreeMap::new(),
            symbols: HashMap::new(),
        }
    }

    pub fn get(&self, id: ReflectionId) -> Option<&Reflection> {
        self.reflections.get(&id)
    }

    pub fn get_mut(&mut self, id: ReflectionId) -> Option<&mut Reflection> {
        self.reflections.get_mut(&id)
    }

    pub fn contains(&self, id: ReflectionId) -> bool {
        self.reflections.contains_key(&id)
    }

    /// Number of registered reflections, not counting the project itself.
    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }

    /// All reflections in id (creation) order.
    pub fn reflections(&self) -> impl Iterator<Item = &Reflection> {
        self.reflections.values()
    }

    pub fn ids(&self) -> Vec<ReflectionId> {
        self.reflections.keys().copied().collect()
    }

    /// The first registered id greater than `after`, or the first id at all.
    pub fn next_id_after(&self, after: Option<ReflectionId>) -> Option<ReflectionId> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        self.reflections
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    /// Assigns the next id to `reflection` and stores it. The reflection is
    /// not attached to any parent yet.
    pub fn register(&mut self, ids: &mut IdRegistry, mut reflection: Reflection) -> ReflectionId {
        let id = ids.next_id();
        reflection.id = id;
        self.reflections.insert(id, reflection);
        id
    }

    /// Records `symbol` as documented by `id`. The first registration of a
    /// symbol wins.
    pub fn register_symbol(&mut self, symbol: SymbolId, id: ReflectionId) {
        self.symbols.entry(symbol).or_insert(id);
    }

    pub fn reflection_for_symbol(&self, symbol: SymbolId) -> Option<ReflectionId> {
        self.symbols.get(&symbol).copied()
    }

    pub fn is_child_of(&self, id: ReflectionId, parent: ReflectionId) -> bool {
        self.get(id).and_then(|r| r.parent) == Some(parent)
    }

    /// Children of `parent`, which may be the project itself.
    pub fn children_of(&self, parent: ReflectionId) -> Option<&BTreeMap<String, ReflectionId>> {
        if parent == self.id {
            Some(&self.children)
        } else {
            self.get(parent).and_then(Reflection::children)
        }
    }

    pub fn child_named(&self, parent: ReflectionId, name: &str) -> Option<ReflectionId> {
        self.children_of(parent)
            .and_then(|children| children.get(name))
            .copied()
    }

    /// Attaches `id` under `parent` by name. A previous child with the same
    /// name is removed together with everything it owns.
    ///
    /// Returns `false` if `parent` cannot hold children.
    pub fn add_child(&mut self, parent: ReflectionId, id: ReflectionId) -> bool {
        let Some(name) = self.get(id).map(|r| r.name.clone()) else {
            return false;
        };

        let displaced = if parent == self.id {
            self.children.insert(name, id)
        } else {
            match self.get_mut(parent).and_then(Reflection::as_declaration_mut) {
                Some(data) => data.children.insert(name, id),
                None => return false,
            }
        };

        self.set_parent(id, parent);
        if let Some(old) = displaced.filter(|&old| old != id) {
            log::debug!("child `{}` of {parent} replaced by {id}", self.full_name(old));
            self.remove_reflection(old);
        }
        true
    }

    /// Appends a signature to a declaration.
    pub fn add_signature(&mut self, owner: ReflectionId, id: ReflectionId) -> bool {
        let added = match self.get_mut(owner).and_then(Reflection::as_declaration_mut) {
            Some(data) => {
                data.signatures.push(id);
                true
            }
            None => false,
        };
        if added {
            self.set_parent(id, owner);
        }
        added
    }

    /// Appends a type parameter to a declaration or signature.
    pub fn add_type_parameter(&mut self, owner: ReflectionId, id: ReflectionId) -> bool {
        let added = match self.get_mut(owner).map(|r| &mut r.variant) {
            Some(ReflectionVariant::Declaration(d)) => {
                d.type_parameters.push(id);
                true
            }
            Some(ReflectionVariant::Signature(s)) => {
                s.type_parameters.push(id);
                true
            }
            _ => false,
        };
        if added {
            self.set_parent(id, owner);
        }
        added
    }

    /// Appends a parameter to a signature.
    pub fn add_parameter(&mut self, signature: ReflectionId, id: ReflectionId) -> bool {
        let added = match self.get_mut(signature).and_then(Reflection::as_signature_mut) {
            Some(data) => {
                data.parameters.push(id);
                true
            }
            None => false,
        };
        if added {
            self.set_parent(id, signature);
        }
        added
    }

    pub fn set_parent(&mut self, id: ReflectionId, parent: ReflectionId) {
        if let Some(reflection) = self.get_mut(id) {
            reflection.parent = Some(parent);
        }
    }

    /// Removes `id` and everything it owns, detaching it from its parent and
    /// forgetting any symbols that pointed at the removed reflections.
    ///
    /// References to the removed reflections elsewhere in the graph are left
    /// for [`ProjectReflection::remove_dangling_references`].
    pub fn remove_reflection(&mut self, id: ReflectionId) -> bool {
        let Some(parent) = self.get(id).map(|r| r.parent) else {
            return false;
        };

        match parent {
            Some(parent) if parent == self.id => {
                self.children.retain(|_, &mut child| child != id);
            }
            Some(parent) => {
                if let Some(owner) = self.get_mut(parent) {
                    owner.detach_member(id);
                }
            }
            None => {}
        }

        let mut pending = vec![id];
        let mut removed = Vec::new();
        while let Some(next) = pending.pop() {
            if let Some(reflection) = self.reflections.remove(&next) {
                pending.extend(reflection.owned_ids());
                removed.push(next);
            }
        }
        self.symbols.retain(|_, target| !removed.contains(target));
        true
    }

    /// Dotted name from the project root, `Outer.Inner.member`.
    pub fn full_name(&self, id: ReflectionId) -> String {
        let mut parts = Vec::new();
        let mut current = self.get(id);
        while let Some(reflection) = current {
            parts.push(reflection.name.as_str());
            current = reflection
                .parent
                .filter(|&p| p != self.id)
                .and_then(|p| self.get(p));
        }
        parts.reverse();
        parts.join(".")
    }

    pub fn find_by_full_name(&self, full_name: &str) -> Vec<ReflectionId> {
        let last = full_name.rsplit('.').next().unwrap_or(full_name);
        self.reflections
            .values()
            .filter(|r| r.name == last)
            .filter(|r| self.full_name(r.id) == full_name)
            .map(|r| r.id)
            .collect()
    }

    /// Declaration children of `id` (or of the project), in name order,
    /// walked depth-first.
    pub fn descendants(&self, id: ReflectionId) -> Vec<ReflectionId> {
        let mut result = Vec::new();
        let mut pending: Vec<ReflectionId> = self
            .children_of(id)
            .map(|c| c.values().rev().copied().collect())
            .unwrap_or_default();
        while let Some(next) = pending.pop() {
            result.push(next);
            if let Some(children) = self.get(next).and_then(Reflection::children) {
                pending.extend(children.values().rev().copied());
            }
        }
        result
    }

    pub(crate) fn reflections_mut(&mut self) -> impl Iterator<Item = &mut Reflection> {
        self.reflections.values_mut()
    }

    pub(crate) fn symbol_table(&self) -> &HashMap<SymbolId, ReflectionId> {
        &self.symbols
    }
}
