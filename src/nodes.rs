//! Built-in node converters.
//!
//! Container handlers (source files, namespaces, classes, interfaces, enums)
//! walk their children in both passes. Every declaration is created the first
//! time its node is seen, which for top-level declarations is the first pass,
//! and types, signatures, parameters and relations are filled in during the
//! second pass once every top-level symbol has a reflection.

use crate::context::Context;
use crate::error::{ConvertError, ConvertWarning};
use crate::events::Event;
use crate::program::{Node, NodeId, Signature, SyntaxKind};
use crate::reflection::{
    Comment, DeclarationData, Reflection, ReflectionFlags, ReflectionId, ReflectionKind,
    ReflectionVariant, Relation, RelationKind,
};
use crate::registry::{HandlerId, NodeConverter, NodeConverterRegistry};
use crate::types::Type;
use crate::utils;

/// Installs every built-in converter and returns their handler ids in
/// registration order.
pub fn register_defaults(registry: &mut NodeConverterRegistry) -> Vec<HandlerId> {
    vec![
        registry.register(SourceFileConverter),
        registry.register(NamespaceConverter),
        registry.register(ClassConverter),
        registry.register(CallableConverter),
        registry.register(VariableConverter),
        registry.register(TypeAliasConverter),
        registry.register(EnumConverter),
        registry.register(EnumMemberConverter),
        registry.register(TypeLiteralConverter),
        registry.register(ParameterConverter),
        registry.register(TypeParameterConverter),
    ]
}

fn reflection_kind(kind: SyntaxKind) -> Option<ReflectionKind> {
    let kind = match kind {
        SyntaxKind::Namespace => ReflectionKind::Namespace,
        SyntaxKind::Class => ReflectionKind::Class,
        SyntaxKind::Interface => ReflectionKind::Interface,
        SyntaxKind::Constructor => ReflectionKind::Constructor,
        SyntaxKind::Method => ReflectionKind::Method,
        SyntaxKind::Function => ReflectionKind::Function,
        SyntaxKind::Property => ReflectionKind::Property,
        SyntaxKind::Variable => ReflectionKind::Variable,
        SyntaxKind::TypeAlias => ReflectionKind::TypeAlias,
        SyntaxKind::Enum => ReflectionKind::Enum,
        SyntaxKind::EnumMember => ReflectionKind::EnumMember,
        SyntaxKind::TypeLiteral | SyntaxKind::FunctionType => ReflectionKind::TypeLiteral,
        SyntaxKind::Parameter => ReflectionKind::Parameter,
        SyntaxKind::TypeParameter => ReflectionKind::TypeParameter,
        SyntaxKind::SourceFile | SyntaxKind::ExportAssignment | SyntaxKind::Unknown => return None,
    };
    Some(kind)
}

/// Records that `node` could not be documented and is left out.
fn skip_malformed(cx: &mut Context<'_>, node: &Node, reason: impl Into<String>) {
    cx.warn(ConvertWarning::MalformedNode {
        kind: node.kind,
        node: node.id,
        reason: reason.into(),
    });
}

/// Whether a declaration of `kind` may merge into `existing`, another
/// declaration of the same symbol.
fn merges_into(kind: SyntaxKind, existing: &Reflection) -> bool {
    let container = matches!(
        kind,
        SyntaxKind::Namespace | SyntaxKind::Class | SyntaxKind::Interface | SyntaxKind::Enum
    );
    container && existing.children().is_some()
}

fn is_excluded(cx: &Context<'_>, node: &Node) -> bool {
    let options = cx.options();
    let flags = node.flags;
    (options.exclude_private && flags.private)
        || (options.exclude_protected && flags.protected)
        || (options.exclude_externals && flags.external)
        || (options.exclude_not_documented && node.comment.is_none())
}

fn with_metadata(mut reflection: Reflection, node: &Node, comment: Option<&str>) -> Reflection {
    reflection.flags = ReflectionFlags::from(node.flags);
    reflection.comment = comment.or(node.comment.as_deref()).and_then(Comment::parse);
    reflection
}

/// Returns the reflection documenting `node` in the active scope, creating
/// and attaching it the first time the node is seen.
///
/// A container node whose symbol already has a container reflection in the
/// same scope merges into it (a namespace or interface declared twice).
/// Otherwise a later declaration with the same name replaces the earlier
/// one, and the replaced node stays out of the project in later passes.
/// Excluded nodes yield `None` in both passes.
fn declare<'a>(
    cx: &mut Context<'a>,
    node: &'a Node,
    reflection: impl FnOnce(&str) -> Reflection,
) -> Result<Option<ReflectionId>, ConvertError> {
    if is_excluded(cx, node) {
        log::debug!("excluding {} {}", node.kind, node.display_name().unwrap_or("<anonymous>"));
        return Ok(None);
    }
    if cx.is_superseded(node.id) {
        return Ok(None);
    }
    if let Some(id) = cx.reflection_in_scope(node.id) {
        return Ok(Some(id));
    }

    let scope = cx.scope();
    if let Some(existing) = node
        .symbol
        .and_then(|symbol| cx.project().reflection_for_symbol(symbol))
        .filter(|&existing| cx.project().is_child_of(existing, scope))
        .filter(|&existing| {
            cx.project()
                .get(existing)
                .is_some_and(|r| merges_into(node.kind, r))
        })
    {
        cx.remember_node(node.id, existing);
        return Ok(Some(existing));
    }

    let name = node.name.as_deref().unwrap_or_else(|| {
        log::debug!("unnamed {} {} documented as `default`", node.kind, node.id);
        "default"
    });
    let reflection = with_metadata(reflection(name), node, None);
    let is_signature = reflection.as_signature().is_some();

    let displaced = cx.project().child_named(scope, name);
    let id = cx.register_reflection(reflection, node);
    if !cx.project_mut().add_child(scope, id) {
        cx.project_mut().remove_reflection(id);
        skip_malformed(cx, node, format!("{scope} cannot hold `{name}`"));
        return Ok(None);
    }
    if let Some(displaced) = displaced {
        cx.supersede(displaced);
        // The replaced reflection took the symbol with it.
        if let Some(symbol) = node.symbol {
            cx.project_mut().register_symbol(symbol, id);
        }
    }
    if is_signature {
        cx.trigger(Event::CreateSignature { reflection: id, node });
    } else {
        cx.trigger(Event::CreateDeclaration { reflection: id, node });
    }
    Ok(Some(id))
}

fn convert_children<'a>(
    cx: &mut Context<'a>,
    scope: ReflectionId,
    children: &'a [NodeId],
) -> Result<(), ConvertError> {
    cx.with_scope(scope, |cx| {
        for &child in children {
            cx.convert_node_id(child)?;
        }
        Ok(())
    })
}

/// Converts type parameter nodes into the active scope. Type parameters are
/// created before any type of their owner is converted so references to
/// them bind to the right owner.
fn convert_type_parameters<'a>(cx: &mut Context<'a>, nodes: &'a [NodeId]) -> Result<(), ConvertError> {
    for &node in nodes {
        cx.convert_node_id(node)?;
    }
    Ok(())
}

fn declaration_mut<'c>(
    cx: &'c mut Context<'_>,
    id: ReflectionId,
) -> Result<&'c mut DeclarationData, ConvertError> {
    cx.project_mut()
        .get_mut(id)
        .and_then(Reflection::as_declaration_mut)
        .ok_or(ConvertError::MissingReflection { id })
}

struct SourceFileConverter;

impl NodeConverter for SourceFileConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::SourceFile]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        if cx.in_first_pass() {
            cx.trigger(Event::FileBegin { node });
        }

        if !cx.module_per_file() {
            let root = cx.project().id;
            convert_children(cx, root, &node.children)?;
            return Ok(None);
        }

        let module = match cx.reflection_for_node(node.id) {
            Some(module) => module,
            None => {
                let file_name = node.file_name.as_deref().unwrap_or_default();
                let reflection = with_metadata(
                    Reflection::declaration(&utils::module_name(file_name), ReflectionKind::Module),
                    node,
                    None,
                );
                let root = cx.project().id;
                let module = cx.register_reflection(reflection, node);
                cx.project_mut().add_child(root, module);
                cx.trigger(Event::CreateDeclaration {
                    reflection: module,
                    node,
                });
                module
            }
        };
        convert_children(cx, module, &node.children)?;
        Ok(Some(module))
    }
}

struct NamespaceConverter;

impl NodeConverter for NamespaceConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::Namespace]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let Some(id) = declare(cx, node, |name| {
            Reflection::declaration(name, ReflectionKind::Namespace)
        })?
        else {
            return Ok(None);
        };
        convert_children(cx, id, &node.children)?;
        Ok(Some(id))
    }
}

/// Classes and interfaces, with their heritage relations.
struct ClassConverter;

impl NodeConverter for ClassConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::Class, SyntaxKind::Interface]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let kind = if node.kind == SyntaxKind::Class {
            ReflectionKind::Class
        } else {
            ReflectionKind::Interface
        };
        let Some(id) = declare(cx, node, |name| Reflection::declaration(name, kind))? else {
            return Ok(None);
        };

        if !cx.in_first_pass() {
            let (extended, implemented) = cx.with_scope(id, |cx| {
                convert_type_parameters(cx, &node.type_parameters)?;
                let extended = cx.convert_types(&node.extends, &[])?;
                let implemented = cx.convert_types(&node.implements, &[])?;
                Ok::<_, ConvertError>((extended, implemented))
            })?;

            add_relations(cx, id, &extended, RelationKind::Extends, RelationKind::ExtendedBy);
            add_relations(cx, id, &implemented, RelationKind::Implements, RelationKind::ImplementedBy);
            let interfaces: Vec<_> = implemented.iter().filter_map(Type::target_id).collect();
            add_implementation_relations(cx, id, &interfaces);
            let data = declaration_mut(cx, id)?;
            data.extended_types = extended;
            data.implemented_types = implemented;
        }

        convert_children(cx, id, &node.children)?;
        Ok(Some(id))
    }
}

/// Links `id` to every heritage type that resolved to a reflection, and the
/// target back to `id`.
fn add_relations(
    cx: &mut Context<'_>,
    id: ReflectionId,
    types: &[Type],
    forward: RelationKind,
    backward: RelationKind,
) {
    let project = cx.project_mut();
    for target in types.iter().filter_map(Type::target_id) {
        if let Some(relations) = project.get_mut(id).and_then(Reflection::relations_mut) {
            relations.push(Relation { kind: forward, target });
        }
        if let Some(relations) = project.get_mut(target).and_then(Reflection::relations_mut) {
            relations.push(Relation { kind: backward, target: id });
        }
    }
}

/// Marks each member of `id` that shares its name with a member of one of
/// `interfaces` as an implementation of it.
fn add_implementation_relations(cx: &mut Context<'_>, id: ReflectionId, interfaces: &[ReflectionId]) {
    let project = cx.project_mut();
    let Some(members) = project.children_of(id).cloned() else {
        return;
    };
    for &interface in interfaces {
        for (name, &member) in &members {
            let Some(target) = project.child_named(interface, name) else {
                continue;
            };
            if let Some(relations) = project.get_mut(member).and_then(Reflection::relations_mut) {
                relations.push(Relation {
                    kind: RelationKind::ImplementationOf,
                    target,
                });
            }
        }
    }
}

/// Functions, methods and constructors.
///
/// A callable with a single signature is documented by one signature
/// reflection of the callable's kind. An overloaded callable becomes a
/// declaration holding one call signature per overload.
struct CallableConverter;

impl NodeConverter for CallableConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::Function, SyntaxKind::Method, SyntaxKind::Constructor]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let Some(kind) = reflection_kind(node.kind) else {
            return Ok(None);
        };
        let signatures = cx.program().signatures_of(node);
        let overloaded = signatures.len() > 1;

        let id = if overloaded {
            declare(cx, node, |name| Reflection::declaration(name, kind))?
        } else {
            declare(cx, node, |name| Reflection::signature(name, kind))?
        };
        let Some(id) = id else {
            return Ok(None);
        };
        if cx.in_first_pass() {
            return Ok(Some(id));
        }

        match signatures {
            [] => {}
            [signature] => {
                let type_parameters = if signature.type_parameters.is_empty() {
                    &node.type_parameters
                } else {
                    &signature.type_parameters
                };
                fill_signature(cx, id, signature, type_parameters)?;
            }
            _ => {
                let filled = cx
                    .project()
                    .get(id)
                    .and_then(Reflection::as_declaration)
                    .is_some_and(|d| !d.signatures.is_empty());
                if filled {
                    return Ok(Some(id));
                }
                let name = cx.project().get(id).map(|r| r.name.clone()).unwrap_or_default();
                for signature in signatures {
                    let reflection = with_metadata(
                        Reflection::signature(&name, ReflectionKind::CallSignature),
                        node,
                        signature.comment.as_deref(),
                    );
                    let signature_id = cx.register_reflection(reflection, node);
                    cx.project_mut().add_signature(id, signature_id);
                    cx.trigger(Event::CreateSignature {
                        reflection: signature_id,
                        node,
                    });
                    fill_signature(cx, signature_id, signature, &signature.type_parameters)?;
                }
                if node.flags.has_body {
                    cx.trigger(Event::FunctionImplementation { reflection: id, node });
                }
            }
        }
        Ok(Some(id))
    }
}

/// Converts type parameters, parameters and the return type of `signature`
/// into the signature reflection `id`.
fn fill_signature<'a>(
    cx: &mut Context<'a>,
    id: ReflectionId,
    signature: &'a Signature,
    type_parameters: &'a [NodeId],
) -> Result<(), ConvertError> {
    let return_type = cx.with_scope(id, |cx| {
        convert_type_parameters(cx, type_parameters)?;
        for &parameter in &signature.parameters {
            cx.convert_node_id(parameter)?;
        }
        cx.convert_type_or(
            signature.return_type.as_ref(),
            signature.resolved_return_type.as_ref(),
        )
    })?;

    let reflection = cx
        .project_mut()
        .get_mut(id)
        .ok_or(ConvertError::MissingReflection { id })?;
    if let Some(comment) = signature.comment.as_deref().and_then(Comment::parse) {
        reflection.comment = Some(comment);
    }
    let data = reflection
        .as_signature_mut()
        .ok_or(ConvertError::MissingReflection { id })?;
    data.return_type = return_type;
    Ok(())
}

/// Properties and variables.
struct VariableConverter;

impl NodeConverter for VariableConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::Property, SyntaxKind::Variable]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let kind = if node.kind == SyntaxKind::Property {
            ReflectionKind::Property
        } else {
            ReflectionKind::Variable
        };
        let Some(id) = declare(cx, node, |name| Reflection::declaration(name, kind))? else {
            return Ok(None);
        };
        if cx.in_first_pass() {
            return Ok(Some(id));
        }

        let resolved = cx.program().type_of(node);
        let ty = cx.with_scope(id, |cx| cx.convert_type_or(node.type_node.as_ref(), resolved))?;
        let data = declaration_mut(cx, id)?;
        data.ty = ty;
        data.default_value = node.initializer.clone();
        Ok(Some(id))
    }
}

struct TypeAliasConverter;

impl NodeConverter for TypeAliasConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::TypeAlias]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let Some(id) = declare(cx, node, |name| {
            Reflection::declaration(name, ReflectionKind::TypeAlias)
        })?
        else {
            return Ok(None);
        };
        if cx.in_first_pass() {
            return Ok(Some(id));
        }

        let resolved = cx.program().type_of(node);
        let ty = cx.with_scope(id, |cx| {
            convert_type_parameters(cx, &node.type_parameters)?;
            cx.convert_type_or(node.type_node.as_ref(), resolved)
        })?;
        declaration_mut(cx, id)?.ty = ty;
        Ok(Some(id))
    }
}

struct EnumConverter;

impl NodeConverter for EnumConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::Enum]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let Some(id) = declare(cx, node, |name| Reflection::declaration(name, ReflectionKind::Enum))?
        else {
            return Ok(None);
        };
        convert_children(cx, id, &node.children)?;
        Ok(Some(id))
    }
}

struct EnumMemberConverter;

impl NodeConverter for EnumMemberConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::EnumMember]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let Some(id) = declare(cx, node, |name| {
            Reflection::declaration(name, ReflectionKind::EnumMember)
        })?
        else {
            return Ok(None);
        };
        if cx.in_first_pass() {
            return Ok(Some(id));
        }

        let resolved = cx.program().type_of(node);
        let ty = cx.with_scope(id, |cx| cx.convert_type_or(node.type_node.as_ref(), resolved))?;
        let data = declaration_mut(cx, id)?;
        data.ty = ty;
        data.default_value = node.initializer.clone();
        Ok(Some(id))
    }
}

/// Anonymous object and function types.
///
/// The inline reflection is parented to the active scope but never listed
/// among its children. It is reached through the [`Type::Reflection`] that
/// embeds it.
struct TypeLiteralConverter;

impl NodeConverter for TypeLiteralConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::TypeLiteral, SyntaxKind::FunctionType]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        let reflection = with_metadata(
            Reflection::declaration("__type", ReflectionKind::TypeLiteral),
            node,
            None,
        );
        let scope = cx.scope();
        let id = cx.register_reflection(reflection, node);
        cx.project_mut().set_parent(id, scope);
        cx.trigger(Event::CreateDeclaration { reflection: id, node });

        convert_children(cx, id, &node.children)?;
        for signature in cx.program().signatures_of(node) {
            let reflection = with_metadata(
                Reflection::signature("__type", ReflectionKind::CallSignature),
                node,
                signature.comment.as_deref(),
            );
            let signature_id = cx.register_reflection(reflection, node);
            cx.project_mut().add_signature(id, signature_id);
            cx.trigger(Event::CreateSignature {
                reflection: signature_id,
                node,
            });
            fill_signature(cx, signature_id, signature, &signature.type_parameters)?;
        }
        Ok(Some(id))
    }
}

struct ParameterConverter;

impl NodeConverter for ParameterConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::Parameter]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        if let Some(id) = cx.reflection_in_scope(node.id) {
            return Ok(Some(id));
        }
        let name = node.name.as_deref().unwrap_or("__0");
        let signature = cx.scope();
        if cx.project().get(signature).and_then(Reflection::as_signature).is_none() {
            skip_malformed(cx, node, format!("parameter `{name}` outside of a signature"));
            return Ok(None);
        }
        let reflection = with_metadata(Reflection::parameter(name), node, None);
        let id = cx.register_reflection(reflection, node);
        cx.project_mut().add_parameter(signature, id);
        cx.trigger(Event::CreateParameter { reflection: id, node });

        let resolved = cx.program().type_of(node);
        let ty = cx.with_scope(id, |cx| cx.convert_type_or(node.type_node.as_ref(), resolved))?;
        if let Some(data) = cx.project_mut().get_mut(id).and_then(Reflection::as_parameter_mut) {
            data.ty = ty;
            data.default_value = node.initializer.clone();
        }
        Ok(Some(id))
    }
}

struct TypeParameterConverter;

impl NodeConverter for TypeParameterConverter {
    fn supports(&self) -> &[SyntaxKind] {
        &[SyntaxKind::TypeParameter]
    }

    fn convert<'a>(
        &self,
        cx: &mut Context<'a>,
        node: &'a Node,
    ) -> Result<Option<ReflectionId>, ConvertError> {
        if let Some(id) = cx.reflection_in_scope(node.id) {
            return Ok(Some(id));
        }
        let Some(name) = node.name.as_deref() else {
            skip_malformed(cx, node, "type parameter has no name");
            return Ok(None);
        };
        let owner = cx.scope();
        let can_own = cx.project().get(owner).is_some_and(|r| {
            matches!(
                r.variant,
                ReflectionVariant::Declaration(_) | ReflectionVariant::Signature(_)
            )
        });
        if !can_own {
            skip_malformed(cx, node, format!("type parameter `{name}` cannot be owned by {owner}"));
            return Ok(None);
        }
        let reflection = with_metadata(Reflection::type_parameter(name), node, None);
        let id = cx.register_reflection(reflection, node);
        cx.project_mut().add_type_parameter(owner, id);
        cx.trigger(Event::CreateTypeParameter { reflection: id, node });

        // Added before conversion so `T extends Foo<T>` binds to its owner.
        let constraint = match node.constraint.as_ref() {
            Some(constraint) => cx.convert_type_or(Some(constraint), None)?,
            None => None,
        };
        let default = match node.default_type.as_ref() {
            Some(default) => cx.convert_type_or(Some(default), None)?,
            None => None,
        };
        if let Some(data) = cx
            .project_mut()
            .get_mut(id)
            .and_then(Reflection::as_type_parameter_mut)
        {
            data.constraint = constraint;
            data.default = default;
        }
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ConverterOptions;
    use crate::context::Phase;
    use crate::events::{EventBus, EventKind};
    use crate::program::{OracleType, Program, ProgramBuilder, TypeNode};
    use crate::project::ProjectReflection;
    use crate::reflection::IdRegistry;
    use crate::types::{Intrinsic, ReferenceTarget};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        converters: NodeConverterRegistry,
        events: EventBus,
        ids: IdRegistry,
        options: ConverterOptions,
    }

    impl Harness {
        fn new() -> Self {
            let mut converters = NodeConverterRegistry::new();
            register_defaults(&mut converters);
            Harness {
                converters,
                events: EventBus::new(),
                ids: IdRegistry::new(),
                options: ConverterOptions::default(),
            }
        }

        /// Runs both passes over `file` and returns the project.
        fn run(&mut self, program: &Program, file: NodeId) -> ProjectReflection {
            let project = ProjectReflection::new(self.ids.next_id(), "test");
            let mut cx = Context::new(
                program,
                &self.converters,
                &mut self.events,
                &mut self.ids,
                &self.options,
                project,
            );
            for phase in [Phase::FirstPass, Phase::SecondPass] {
                cx.set_phase(phase);
                cx.convert_node_id(file).unwrap();
            }
            cx.finish().0
        }
    }

    fn child(project: &ProjectReflection, path: &str) -> ReflectionId {
        let ids = project.find_by_full_name(path);
        assert_eq!(ids.len(), 1, "expected exactly one `{path}`");
        ids[0]
    }

    #[test]
    fn test_class_with_method_and_property() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let class = builder.declare(file, SyntaxKind::Class, "A");
        let method = builder.declare(class, SyntaxKind::Method, "m");
        builder.signature(method, Signature::returning(TypeNode::keyword("number")));
        let property = builder.declare(class, SyntaxKind::Property, "p");
        builder.node_mut(property).type_node = Some(TypeNode::keyword("string"));
        builder.node_mut(property).comment = Some("The p.".to_string());
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let a = child(&project, "A");
        assert_eq!(project.children.len(), 1);

        let m = project.get(child(&project, "A.m")).unwrap();
        assert_eq!(m.kind, ReflectionKind::Method);
        assert_eq!(m.parent, Some(a));
        assert_eq!(
            m.as_signature().unwrap().return_type,
            Some(Type::intrinsic(Intrinsic::Number))
        );

        let p = project.get(child(&project, "A.p")).unwrap();
        assert_eq!(p.ty(), Some(&Type::intrinsic(Intrinsic::String)));
        assert_eq!(p.comment.as_ref().unwrap().summary, "The p.");
    }

    #[test]
    fn test_overloads_become_call_signatures() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let f = builder.declare(file, SyntaxKind::Function, "parse");
        let text = builder.parameter("text", TypeNode::keyword("string"));
        let bytes = builder.parameter("bytes", TypeNode::keyword("number"));
        builder
            .signature(f, Signature::returning(TypeNode::keyword("string")).with_parameters(vec![text]))
            .signature(f, Signature::returning(TypeNode::keyword("number")).with_parameters(vec![bytes]));
        builder.node_mut(f).flags.has_body = true;
        let program = builder.build();

        let implementations = Rc::new(RefCell::new(0));
        let mut harness = Harness::new();
        let seen = Rc::clone(&implementations);
        harness
            .events
            .subscribe(EventKind::FunctionImplementation, move |_, _| *seen.borrow_mut() += 1);
        let project = harness.run(&program, file);

        let parse = project.get(child(&project, "parse")).unwrap();
        let signatures = &parse.as_declaration().unwrap().signatures;
        assert_eq!(signatures.len(), 2);
        let first = project.get(signatures[0]).unwrap();
        assert_eq!(first.kind, ReflectionKind::CallSignature);
        let parameter = project.get(first.as_signature().unwrap().parameters[0]).unwrap();
        assert_eq!(parameter.name, "text");
        assert_eq!(parameter.ty(), Some(&Type::intrinsic(Intrinsic::String)));
        assert_eq!(*implementations.borrow(), 1);
    }

    #[test]
    fn test_heritage_relations_both_ways() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let base = builder.declare(file, SyntaxKind::Class, "Base");
        let derived = builder.declare(file, SyntaxKind::Class, "Derived");
        let base_symbol = builder.symbol_of(base);
        builder.node_mut(derived).extends = vec![TypeNode::reference("Base", base_symbol)];
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let base = child(&project, "Base");
        let derived = child(&project, "Derived");
        assert_eq!(
            project.get(derived).unwrap().relations(),
            &[Relation {
                kind: RelationKind::Extends,
                target: base
            }]
        );
        assert_eq!(
            project.get(base).unwrap().relations(),
            &[Relation {
                kind: RelationKind::ExtendedBy,
                target: derived
            }]
        );
    }

    #[test]
    fn test_members_implementing_interface_members() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let shape = builder.declare(file, SyntaxKind::Interface, "Shape");
        let shape_area = builder.declare(shape, SyntaxKind::Method, "area");
        builder.signature(shape_area, Signature::returning(TypeNode::keyword("number")));
        let shape_symbol = builder.symbol_of(shape);
        let square = builder.declare(file, SyntaxKind::Class, "Square");
        builder.node_mut(square).implements = vec![TypeNode::reference("Shape", shape_symbol)];
        let area = builder.declare(square, SyntaxKind::Method, "area");
        builder.signature(area, Signature::returning(TypeNode::keyword("number")));
        builder.declare(square, SyntaxKind::Property, "side");
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let interface_area = child(&project, "Shape.area");
        assert_eq!(
            project.get(child(&project, "Square.area")).unwrap().relations(),
            &[Relation {
                kind: RelationKind::ImplementationOf,
                target: interface_area
            }]
        );
        assert!(project.get(child(&project, "Square.side")).unwrap().relations().is_empty());
    }

    #[test]
    fn test_generic_alias_binds_type_parameter() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let alias = builder.declare(file, SyntaxKind::TypeAlias, "List");
        let t = builder.type_parameter(alias, "T");
        let t_symbol = builder.symbol_of(t);
        builder.node_mut(t).constraint = Some(TypeNode::keyword("object"));
        builder.node_mut(alias).type_node = Some(TypeNode::Array {
            element: Box::new(TypeNode::reference("T", t_symbol)),
        });
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let list = child(&project, "List");
        let reflection = project.get(list).unwrap();
        assert_eq!(reflection.type_parameters().len(), 1);
        assert_eq!(
            reflection.ty(),
            Some(&Type::Array {
                element: Box::new(Type::TypeParameter {
                    name: "T".to_string(),
                    owner: Some(list)
                })
            })
        );
        let t = project.get(reflection.type_parameters()[0]).unwrap();
        assert_eq!(t.types(), vec![&Type::intrinsic(Intrinsic::Object)]);
    }

    #[test]
    fn test_self_referential_interface_links_to_itself() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let node = builder.declare(file, SyntaxKind::Interface, "Tree");
        let symbol = builder.symbol_of(node);
        let children = builder.declare(node, SyntaxKind::Property, "children");
        builder.node_mut(children).type_node = Some(TypeNode::Array {
            element: Box::new(TypeNode::reference("Tree", symbol)),
        });
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let tree = child(&project, "Tree");
        let children = project.get(child(&project, "Tree.children")).unwrap();
        let Some(Type::Array { element }) = children.ty() else {
            panic!("expected an array type");
        };
        assert_eq!(element.target_id(), Some(tree));
        assert_eq!(project.find_by_full_name("Tree").len(), 1);
    }

    #[test]
    fn test_merged_namespaces_share_one_reflection() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let first = builder.declare(file, SyntaxKind::Namespace, "Util");
        builder.declare(first, SyntaxKind::Variable, "a");
        let second = builder.add_node(SyntaxKind::Namespace, Some("Util"));
        let symbol = builder.symbol_of(first);
        builder.node_mut(second).symbol = symbol;
        builder.node_mut(file).children.push(second);
        builder.declare(second, SyntaxKind::Variable, "b");
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let util = child(&project, "Util");
        let names: Vec<_> = project.children_of(util).unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_shared_type_literal_gets_members_per_use() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let literal = builder.type_literal();
        let x = builder.declare(literal, SyntaxKind::Property, "x");
        builder.node_mut(x).type_node = Some(TypeNode::keyword("number"));
        for name in ["a", "b"] {
            let variable = builder.declare(file, SyntaxKind::Variable, name);
            builder.node_mut(variable).type_node = Some(TypeNode::literal(literal));
        }
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let mut inline = Vec::new();
        for name in ["a", "b"] {
            let Some(Type::Reflection { declaration }) = project.get(child(&project, name)).unwrap().ty() else {
                panic!("`{name}` should have an inline type");
            };
            let x = project
                .child_named(*declaration, "x")
                .unwrap_or_else(|| panic!("inline type of `{name}` lost its member"));
            assert_eq!(project.get(x).unwrap().parent, Some(*declaration));
            assert_eq!(project.get(x).unwrap().ty(), Some(&Type::intrinsic(Intrinsic::Number)));
            inline.push(*declaration);
        }
        assert_ne!(inline[0], inline[1]);
    }

    #[test]
    fn test_namespace_sharing_a_function_symbol_replaces_it() {
        // function f() {} namespace f { let x }
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let function = builder.declare(file, SyntaxKind::Function, "f");
        builder.signature(function, Signature::returning(TypeNode::keyword("void")));
        let namespace = builder.add_node(SyntaxKind::Namespace, Some("f"));
        let symbol = builder.symbol_of(function);
        builder.node_mut(namespace).symbol = symbol;
        builder.node_mut(file).children.push(namespace);
        builder.declare(namespace, SyntaxKind::Variable, "x");
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let f = child(&project, "f");
        assert_eq!(project.get(f).unwrap().kind, ReflectionKind::Namespace);
        assert_eq!(project.get(child(&project, "f.x")).unwrap().parent, Some(f));
        for reflection in project.reflections() {
            assert!(reflection.parent.is_some(), "{} is detached", reflection.name);
        }
        assert_eq!(project.len(), 2);
    }

    #[test]
    fn test_parameter_and_enum_member_types_are_scoped_to_their_owner() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let options = builder.type_literal();
        builder.declare(options, SyntaxKind::Property, "flag");
        let f = builder.declare(file, SyntaxKind::Function, "configure");
        let parameter = builder.parameter("options", TypeNode::literal(options));
        builder.signature(
            f,
            Signature::returning(TypeNode::keyword("void")).with_parameters(vec![parameter]),
        );
        let shape = builder.type_literal();
        builder.declare(shape, SyntaxKind::Property, "width");
        let kind = builder.declare(file, SyntaxKind::Enum, "Kind");
        let member = builder.declare(kind, SyntaxKind::EnumMember, "Box");
        builder.node_mut(member).type_node = Some(TypeNode::literal(shape));
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let configure = project.get(child(&project, "configure")).unwrap();
        let parameter = configure.as_signature().unwrap().parameters[0];
        let Some(Type::Reflection { declaration }) = project.get(parameter).unwrap().ty() else {
            panic!("expected an inline parameter type");
        };
        assert_eq!(project.get(*declaration).unwrap().parent, Some(parameter));

        let member = child(&project, "Kind.Box");
        let Some(Type::Reflection { declaration }) = project.get(member).unwrap().ty() else {
            panic!("expected an inline member type");
        };
        assert_eq!(project.get(*declaration).unwrap().parent, Some(member));
    }

    #[test]
    fn test_exclusion_options_skip_nodes() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let class = builder.declare(file, SyntaxKind::Class, "A");
        let secret = builder.declare(class, SyntaxKind::Property, "secret");
        builder.node_mut(secret).flags.private = true;
        builder.declare(class, SyntaxKind::Property, "open");
        let program = builder.build();

        let mut harness = Harness::new();
        harness.options.exclude_private = true;
        let project = harness.run(&program, file);
        assert!(project.find_by_full_name("A.secret").is_empty());
        assert_eq!(project.find_by_full_name("A.open").len(), 1);
    }

    #[test]
    fn test_module_per_file_wraps_declarations() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("src/util/strings.ts");
        builder.declare(file, SyntaxKind::Function, "trim");
        let program = builder.build();

        let mut harness = Harness::new();
        let project = ProjectReflection::new(harness.ids.next_id(), "test");
        let mut cx = Context::new(
            &program,
            &harness.converters,
            &mut harness.events,
            &mut harness.ids,
            &harness.options,
            project,
        );
        cx.set_module_per_file(true);
        for phase in [Phase::FirstPass, Phase::SecondPass] {
            cx.set_phase(phase);
            cx.convert_node_id(file).unwrap();
        }
        let project = cx.finish().0;

        let module = child(&project, "src/util/strings");
        assert_eq!(project.get(module).unwrap().kind, ReflectionKind::Module);
        assert_eq!(project.find_by_full_name("src/util/strings.trim").len(), 1);
    }

    #[test]
    fn test_checker_type_used_without_annotation() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        let external = builder.external_symbol("Map", "lib.Map");
        let variable = builder.declare(file, SyntaxKind::Variable, "cache");
        builder.node_mut(variable).resolved_type = Some(OracleType::Object {
            symbol: Some(external),
            declaration: None,
            type_arguments: vec![OracleType::intrinsic("string")],
        });
        builder.node_mut(variable).initializer = Some("new Map()".to_string());
        let program = builder.build();

        let project = Harness::new().run(&program, file);
        let cache = project.get(child(&project, "cache")).unwrap();
        assert_eq!(
            cache.ty(),
            Some(&Type::Reference {
                name: "Map".to_string(),
                type_arguments: vec![Type::intrinsic(Intrinsic::String)],
                target: ReferenceTarget::Qualified {
                    name: "lib.Map".to_string()
                },
            })
        );
        assert_eq!(cache.as_declaration().unwrap().default_value.as_deref(), Some("new Map()"));
    }
}
