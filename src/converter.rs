use crate::api::ConverterOptions;
use crate::context::{Context, Phase};
use crate::error::{ConvertError, ConvertWarning, SemanticError};
use crate::events::{Event, EventBus, EventContext, EventKind, SubscriptionId};
use crate::nodes;
use crate::program::{Node, ProgramOracle, Severity};
use crate::project::ProjectReflection;
use crate::reflection::{IdRegistry, ReflectionId};
use crate::registry::{HandlerId, NodeConverter, NodeConverterRegistry};
use crate::resolver::DanglingReference;
use crate::utils;
use std::fmt::{self, Display};

/// Where a converter is in its current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterState {
    Idle,
    Compiling(Phase),
    Resolving,
    Done,
    /// The oracle reported errors or a node converter failed; no project
    /// was produced.
    Failed,
}

impl Display for ConverterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConverterState::Idle => f.write_str("idle"),
            ConverterState::Compiling(Phase::FirstPass) => f.write_str("compiling (first pass)"),
            ConverterState::Compiling(Phase::SecondPass) => f.write_str("compiling (second pass)"),
            ConverterState::Resolving => f.write_str("resolving"),
            ConverterState::Done => f.write_str("done"),
            ConverterState::Failed => f.write_str("failed"),
        }
    }
}

/// Turns a checked program into a [`ProjectReflection`].
///
/// A converter holds the node converters and event subscribers and can be
/// run any number of times. Every run starts from a fresh id sequence, so
/// the project of each run numbers its reflections from zero.
pub struct Converter {
    options: ConverterOptions,
    converters: NodeConverterRegistry,
    events: EventBus,
    ids: IdRegistry,
    state: ConverterState,
    warnings: Vec<ConvertWarning>,
}

impl Converter {
    /// A converter with no node converters registered.
    pub fn new(options: ConverterOptions) -> Self {
        Converter {
            options,
            converters: NodeConverterRegistry::new(),
            events: EventBus::new(),
            ids: IdRegistry::new(),
            state: ConverterState::Idle,
            warnings: Vec::new(),
        }
    }

    /// A converter with the built-in node converters registered.
    pub fn with_default_converters(options: ConverterOptions) -> Self {
        let mut converter = Converter::new(options);
        nodes::register_defaults(&mut converter.converters);
        converter
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    pub fn state(&self) -> ConverterState {
        self.state
    }

    /// Warnings of the last run.
    pub fn warnings(&self) -> &[ConvertWarning] {
        &self.warnings
    }

    pub fn node_converters(&self) -> &NodeConverterRegistry {
        &self.converters
    }

    pub fn register_node_converter<C: NodeConverter + 'static>(&mut self, converter: C) -> HandlerId {
        self.converters.register(converter)
    }

    pub fn unregister_node_converter(&mut self, id: HandlerId) -> bool {
        self.converters.unregister(id)
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut EventContext<'_>, &Event<'_>) + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn unsubscribe(&mut self, kind: EventKind, id: SubscriptionId) -> bool {
        self.events.unsubscribe(kind, id)
    }

    /// Converts the source files named by `entry_points`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Semantic`] with every error diagnostic of the
    /// oracle, in which case nothing is converted and the end event is not
    /// fired. Errors raised by node converters are returned as they are.
    pub fn convert(
        &mut self,
        program: &dyn ProgramOracle,
        entry_points: &[String],
    ) -> Result<ProjectReflection, ConvertError> {
        self.convert_with_report(program, entry_points)
            .map(|(project, _)| project)
    }

    /// Like [`Converter::convert`], also returning every reference the
    /// dangling sweep pruned.
    ///
    /// # Errors
    ///
    /// See [`Converter::convert`].
    pub fn convert_with_report(
        &mut self,
        program: &dyn ProgramOracle,
        entry_points: &[String],
    ) -> Result<(ProjectReflection, Vec<DanglingReference>), ConvertError> {
        self.warnings.clear();
        self.ids.reset();
        let mut project = ProjectReflection::new(self.ids.next_id(), &self.options.name);

        self.state = ConverterState::Compiling(Phase::FirstPass);
        emit(&mut self.events, &mut self.ids, &mut project, Event::Begin);

        let project = match self.compile(program, entry_points, project) {
            Ok(project) => project,
            Err(error) => {
                self.state = ConverterState::Failed;
                return Err(error);
            }
        };

        let (mut project, dangling) = self.resolve(project);
        emit(&mut self.events, &mut self.ids, &mut project, Event::End);
        self.state = ConverterState::Done;
        Ok((project, dangling))
    }

    fn compile(
        &mut self,
        program: &dyn ProgramOracle,
        entry_points: &[String],
        project: ProjectReflection,
    ) -> Result<ProjectReflection, ConvertError> {
        let errors: Vec<SemanticError> = program
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(SemanticError::from)
            .collect();
        if !errors.is_empty() {
            return Err(ConvertError::Semantic { errors });
        }

        let mut cx = Context::new(
            program,
            &self.converters,
            &mut self.events,
            &mut self.ids,
            &self.options,
            project,
        );

        let mut files: Vec<&Node> = Vec::new();
        for entry in entry_points {
            if !utils::is_source_entry(entry) {
                log::debug!("skipping non-source entry point {entry}");
                continue;
            }
            match program.source_file(&utils::normalize_path(entry)) {
                Some(file) => files.push(file),
                None => cx.warn(ConvertWarning::MissingEntryPoint {
                    path: entry.clone(),
                }),
            }
        }
        cx.set_module_per_file(files.len() > 1);

        cx.set_phase(Phase::FirstPass);
        for &file in &files {
            cx.convert_node(file)?;
        }

        self.state = ConverterState::Compiling(Phase::SecondPass);
        cx.set_phase(Phase::SecondPass);
        for &file in &files {
            cx.convert_node(file)?;
        }

        let (project, warnings) = cx.finish();
        self.warnings.extend(warnings);
        Ok(project)
    }

    fn resolve(&mut self, mut project: ProjectReflection) -> (ProjectReflection, Vec<DanglingReference>) {
        self.state = ConverterState::Resolving;
        let linked = project.link_symbol_references();
        log::debug!("linked {linked} forward reference(s)");

        emit(&mut self.events, &mut self.ids, &mut project, Event::ResolveBegin);
        let mut cursor: Option<ReflectionId> = None;
        while let Some(id) = project.next_id_after(cursor) {
            emit(
                &mut self.events,
                &mut self.ids,
                &mut project,
                Event::Resolve { reflection: id },
            );
            cursor = Some(id);
        }
        emit(&mut self.events, &mut self.ids, &mut project, Event::ResolveEnd);

        let dangling = project.remove_dangling_references();
        if self.options.report_dangling_references {
            for reference in &dangling {
                let warning = ConvertWarning::DanglingReference {
                    reference: *reference,
                };
                log::warn!("{warning}");
                self.warnings.push(warning);
            }
        }
        (project, dangling)
    }
}

fn emit(events: &mut EventBus, ids: &mut IdRegistry, project: &mut ProjectReflection, event: Event<'_>) {
    let mut cx = EventContext::new(project, ids);
    events.emit(&mut cx, &event);
}
