use crate::api::ConverterOptions;
use crate::error::{ConvertError, ConvertWarning};
use crate::events::{Event, EventBus, EventContext};
use crate::program::{Node, NodeId, OracleType, ProgramOracle, TypeNode};
use crate::project::ProjectReflection;
use crate::reflection::{IdRegistry, Reflection, ReflectionId};
use crate::registry::NodeConverterRegistry;
use crate::type_converter::{self, TypeSource};
use crate::types::Type;
use std::collections::{HashMap, HashSet};

/// Which of the two compile passes is running.
///
/// Handlers declare reflections in the first pass and do work that needs
/// every top-level symbol to exist in the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FirstPass,
    SecondPass,
}

/// The state of one conversion run: the project being built, the active
/// scope, and the stack of nodes currently being converted.
pub struct Context<'a> {
    program: &'a dyn ProgramOracle,
    converters: &'a NodeConverterRegistry,
    events: &'a mut EventBus,
    ids: &'a mut IdRegistry,
    options: &'a ConverterOptions,
    project: ProjectReflection,
    scope: ReflectionId,
    visit_stack: Vec<NodeId>,
    phase: Phase,
    node_reflections: HashMap<NodeId, ReflectionId>,
    superseded: HashSet<NodeId>,
    module_per_file: bool,
    warnings: Vec<ConvertWarning>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        program: &'a dyn ProgramOracle,
        converters: &'a NodeConverterRegistry,
        events: &'a mut EventBus,
        ids: &'a mut IdRegistry,
        options: &'a ConverterOptions,
        project: ProjectReflection,
    ) -> Self {
        let scope = project.id;
        Context {
            program,
            converters,
            events,
            ids,
            options,
            project,
            scope,
            visit_stack: Vec::new(),
            phase: Phase::FirstPass,
            node_reflections: HashMap::new(),
            superseded: HashSet::new(),
            module_per_file: false,
            warnings: Vec::new(),
        }
    }

    pub fn program(&self) -> &'a dyn ProgramOracle {
        self.program
    }

    pub fn options(&self) -> &'a ConverterOptions {
        self.options
    }

    pub fn project(&self) -> &ProjectReflection {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut ProjectReflection {
        &mut self.project
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_first_pass(&self) -> bool {
        self.phase == Phase::FirstPass
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        log::debug!("entering {phase:?}");
        self.phase = phase;
    }

    /// Whether each entry file gets its own module reflection. Set when more
    /// than one entry point was located.
    pub fn module_per_file(&self) -> bool {
        self.module_per_file
    }

    pub(crate) fn set_module_per_file(&mut self, value: bool) {
        self.module_per_file = value;
    }

    // === Scope ===

    /// The reflection new children attach to.
    pub fn scope(&self) -> ReflectionId {
        self.scope
    }

    /// Runs `f` with `scope` as the active scope, restoring the previous one
    /// afterwards.
    pub fn with_scope<T>(&mut self, scope: ReflectionId, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    /// Walks from the active scope towards the root and returns the nearest
    /// reflection declaring a type parameter called `name`.
    pub fn type_parameter_owner(&self, name: &str) -> Option<ReflectionId> {
        let mut current = Some(self.scope);
        while let Some(id) = current.filter(|&id| id != self.project.id) {
            let reflection = self.project.get(id)?;
            let declares = reflection
                .type_parameters()
                .iter()
                .filter_map(|&tp| self.project.get(tp))
                .any(|tp| tp.name == name);
            if declares {
                return Some(id);
            }
            current = reflection.parent;
        }
        None
    }

    // === Visit stack ===

    pub fn is_visiting(&self, node: NodeId) -> bool {
        self.visit_stack.contains(&node)
    }

    pub fn push_visit(&mut self, node: NodeId) {
        self.visit_stack.push(node);
    }

    pub fn pop_visit(&mut self, node: NodeId) {
        match self.visit_stack.iter().rposition(|&n| n == node) {
            Some(index) => {
                debug_assert_eq!(index + 1, self.visit_stack.len(), "visit stack popped out of order");
                self.visit_stack.truncate(index);
            }
            None => log::debug!("pop of node {node} that is not being visited"),
        }
    }

    pub fn visit_depth(&self) -> usize {
        self.visit_stack.len()
    }

    // === Conversion ===

    /// Converts `node` with the handler registered for its kind.
    ///
    /// Returns `Ok(None)` without a diagnostic when the node is already
    /// being converted further up the stack, and `Ok(None)` with a
    /// [`ConvertWarning::MissingConverter`] when no handler supports its kind.
    pub fn convert_node(&mut self, node: &'a Node) -> Result<Option<ReflectionId>, ConvertError> {
        if self.is_visiting(node.id) {
            log::trace!("skipping {} {}: already being converted", node.kind, node.id);
            return Ok(None);
        }

        let converters = self.converters;
        let Some(handler) = converters.get(node.kind) else {
            self.warn(ConvertWarning::MissingConverter {
                kind: node.kind,
                name: node.display_name().map(str::to_string),
            });
            return Ok(None);
        };

        self.push_visit(node.id);
        let result = handler.convert(self, node);
        self.pop_visit(node.id);
        result
    }

    /// Converts the node behind `id`. An id the oracle cannot resolve is
    /// skipped with a [`ConvertWarning::MissingNode`].
    pub fn convert_node_id(&mut self, id: NodeId) -> Result<Option<ReflectionId>, ConvertError> {
        match self.lookup_node(id) {
            Some(node) => self.convert_node(node),
            None => Ok(None),
        }
    }

    pub fn node(&self, id: NodeId) -> Result<&'a Node, ConvertError> {
        self.program
            .node(id)
            .ok_or(ConvertError::MissingNode { node: id })
    }

    /// Like [`Context::node`], but a missing node is a warning.
    pub fn lookup_node(&mut self, id: NodeId) -> Option<&'a Node> {
        let node = self.program.node(id);
        if node.is_none() {
            self.warn(ConvertWarning::MissingNode { node: id });
        }
        node
    }

    /// See [`type_converter::convert_type`].
    pub fn convert_type(&mut self, source: TypeSource<'a>) -> Result<Option<Type>, ConvertError> {
        type_converter::convert_type(self, source)
    }

    /// Converts the written type if there is one, the resolved type
    /// otherwise.
    pub fn convert_type_or(
        &mut self,
        node: Option<&'a TypeNode>,
        ty: Option<&'a OracleType>,
    ) -> Result<Option<Type>, ConvertError> {
        match (node, ty) {
            (Some(node), _) => self.convert_type(TypeSource::Node(node)),
            (None, Some(ty)) => self.convert_type(TypeSource::Type(ty)),
            (None, None) => Ok(None),
        }
    }

    /// See [`type_converter::convert_types`].
    pub fn convert_types(
        &mut self,
        nodes: &'a [TypeNode],
        types: &'a [OracleType],
    ) -> Result<Vec<Type>, ConvertError> {
        type_converter::convert_types(self, nodes, types)
    }

    // === Registration ===

    /// Stores `reflection` in the project and remembers it as the reflection
    /// of `node` and of the node's symbol. The caller attaches it to a parent.
    pub fn register_reflection(&mut self, reflection: Reflection, node: &Node) -> ReflectionId {
        let id = self.project.register(self.ids, reflection);
        self.node_reflections.entry(node.id).or_insert(id);
        if let Some(symbol) = node.symbol {
            self.project.register_symbol(symbol, id);
        }
        id
    }

    /// The reflection created for `node` earlier in this run.
    pub fn reflection_for_node(&self, node: NodeId) -> Option<ReflectionId> {
        self.node_reflections
            .get(&node)
            .copied()
            .filter(|&id| self.project.contains(id))
    }

    /// The reflection created for `node` if it belongs to the active scope.
    ///
    /// An anonymous type converted twice gets a fresh set of members each
    /// time, so members are only reused within the same parent.
    pub fn reflection_in_scope(&self, node: NodeId) -> Option<ReflectionId> {
        self.reflection_for_node(node)
            .filter(|&id| self.project.is_child_of(id, self.scope))
    }

    pub(crate) fn remember_node(&mut self, node: NodeId, id: ReflectionId) {
        self.node_reflections.insert(node, id);
    }

    /// Marks every node documented by `id` as replaced by a later
    /// declaration of the same name. Replaced nodes are not declared again.
    pub(crate) fn supersede(&mut self, id: ReflectionId) {
        let nodes = self
            .node_reflections
            .iter()
            .filter(|&(_, &reflection)| reflection == id)
            .map(|(&node, _)| node);
        self.superseded.extend(nodes);
    }

    pub fn is_superseded(&self, node: NodeId) -> bool {
        self.superseded.contains(&node)
    }

    // === Events and diagnostics ===

    pub fn trigger(&mut self, event: Event<'_>) {
        let mut cx = EventContext::new(&mut self.project, self.ids);
        self.events.emit(&mut cx, &event);
    }

    /// Logs `warning` and keeps it for [`crate::Converter::warnings`].
    pub fn warn(&mut self, warning: ConvertWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub(crate) fn finish(self) -> (ProjectReflection, Vec<ConvertWarning>) {
        (self.project, self.warnings)
    }
}
