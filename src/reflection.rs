use crate::program::NodeFlags;
use crate::types::Type;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReflectionId(pub u32);

impl Display for ReflectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out reflection ids for one conversion run.
///
/// Ids strictly increase in creation order. The converter resets its
/// registry at the start of every run, so ids are only comparable within a
/// run.
#[derive(Debug, Default)]
pub struct IdRegistry {
    next: u32,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ReflectionId {
        let id = ReflectionId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to [`IdRegistry::next_id`] will return.
    pub fn peek(&self) -> ReflectionId {
        ReflectionId(self.next)
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReflectionKind {
    Project,
    Module,
    Namespace,
    Class,
    Interface,
    Constructor,
    Method,
    Function,
    Property,
    Variable,
    TypeAlias,
    Enum,
    EnumMember,
    /// The unnamed reflection behind an inline object or function type.
    TypeLiteral,
    CallSignature,
    Parameter,
    TypeParameter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionFlags {
    pub is_exported: bool,
    pub is_external: bool,
    pub is_private: bool,
    pub is_protected: bool,
    pub is_static: bool,
    pub is_optional: bool,
    pub is_abstract: bool,
    pub is_readonly: bool,
}

impl From<NodeFlags> for ReflectionFlags {
    fn from(flags: NodeFlags) -> Self {
        ReflectionFlags {
            is_exported: flags.exported,
            is_external: flags.external,
            is_private: flags.private,
            is_protected: flags.protected,
            is_static: flags.is_static,
            is_optional: flags.optional,
            is_abstract: flags.is_abstract,
            is_readonly: flags.readonly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentTag {
    pub tag: String,
    pub text: String,
}

/// A doc comment split into its summary and `@tag` blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<CommentTag>,
}

impl Comment {
    /// Parses raw comment text, with or without `/** */` delimiters.
    /// Returns `None` when nothing but whitespace remains.
    pub fn parse(raw: &str) -> Option<Comment> {
        let body = raw.trim();
        let body = body.strip_prefix("/**").unwrap_or(body);
        let body = body.strip_suffix("*/").unwrap_or(body);

        let mut comment = Comment::default();
        let mut summary = Vec::new();
        for line in body.lines() {
            let line = line.trim();
            let line = line.strip_prefix('*').map_or(line, str::trim_start);
            if let Some(tagged) = line.strip_prefix('@') {
                let (tag, text) = tagged.split_once(char::is_whitespace).unwrap_or((tagged, ""));
                comment.tags.push(CommentTag {
                    tag: tag.to_string(),
                    text: text.trim().to_string(),
                });
            } else if let Some(last) = comment.tags.last_mut() {
                if !line.is_empty() {
                    if !last.text.is_empty() {
                        last.text.push('\n');
                    }
                    last.text.push_str(line);
                }
            } else {
                summary.push(line);
            }
        }
        comment.summary = summary.join("\n").trim().to_string();

        if comment.summary.is_empty() && comment.tags.is_empty() {
            None
        } else {
            Some(comment)
        }
    }

    pub fn tag(&self, name: &str) -> Option<&CommentTag> {
        self.tags.iter().find(|t| t.tag == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    Extends,
    Implements,
    ExtendedBy,
    ImplementedBy,
    /// A signature implementing an overload set.
    ImplementationOf,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::Extends => "extends",
            RelationKind::Implements => "implements",
            RelationKind::ExtendedBy => "extended-by",
            RelationKind::ImplementedBy => "implemented-by",
            RelationKind::ImplementationOf => "implementation-of",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: ReflectionId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationData {
    pub signatures: Vec<ReflectionId>,
    #[serde(rename = "type")]
    pub ty: Option<Type>,
    pub type_parameters: Vec<ReflectionId>,
    pub children: BTreeMap<String, ReflectionId>,
    pub relations: Vec<Relation>,
    pub extended_types: Vec<Type>,
    pub implemented_types: Vec<Type>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    pub parameters: Vec<ReflectionId>,
    pub type_parameters: Vec<ReflectionId>,
    pub return_type: Option<Type>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterData {
    #[serde(rename = "type")]
    pub ty: Option<Type>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeParameterData {
    pub constraint: Option<Type>,
    pub default: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "camelCase")]
pub enum ReflectionVariant {
    Declaration(DeclarationData),
    Signature(SignatureData),
    Parameter(ParameterData),
    TypeParameter(TypeParameterData),
}

/// One node of the documentation graph.
///
/// Reflections never own each other. The project's id mapping owns every
/// reflection and `parent` is a plain back-reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: ReflectionId,
    pub name: String,
    pub kind: ReflectionKind,
    pub parent: Option<ReflectionId>,
    pub comment: Option<Comment>,
    pub flags: ReflectionFlags,
    #[serde(flatten)]
    pub variant: ReflectionVariant,
}

impl Reflection {
    fn with_variant(name: &str, kind: ReflectionKind, variant: ReflectionVariant) -> Self {
        Reflection {
            // Assigned on registration.
            id: ReflectionId(u32::MAX),
            name: name.to_string(),
            kind,
            parent: None,
            comment: None,
            flags: ReflectionFlags::default(),
            variant,
        }
    }

    pub fn declaration(name: &str, kind: ReflectionKind) -> Self {
        Self::with_variant(name, kind, ReflectionVariant::Declaration(DeclarationData::default()))
    }

    pub fn signature(name: &str, kind: ReflectionKind) -> Self {
        Self::with_variant(name, kind, ReflectionVariant::Signature(SignatureData::default()))
    }

    pub fn parameter(name: &str) -> Self {
        Self::with_variant(
            name,
            ReflectionKind::Parameter,
            ReflectionVariant::Parameter(ParameterData::default()),
        )
    }

    pub fn type_parameter(name: &str) -> Self {
        Self::with_variant(
            name,
            ReflectionKind::TypeParameter,
            ReflectionVariant::TypeParameter(TypeParameterData::default()),
        )
    }

    pub fn as_declaration(&self) -> Option<&DeclarationData> {
        match &self.variant {
            ReflectionVariant::Declaration(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_declaration_mut(&mut self) -> Option<&mut DeclarationData> {
        match &mut self.variant {
            ReflectionVariant::Declaration(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&SignatureData> {
        match &self.variant {
            ReflectionVariant::Signature(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_signature_mut(&mut self) -> Option<&mut SignatureData> {
        match &mut self.variant {
            ReflectionVariant::Signature(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_parameter_mut(&mut self) -> Option<&mut ParameterData> {
        match &mut self.variant {
            ReflectionVariant::Parameter(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_type_parameter_mut(&mut self) -> Option<&mut TypeParameterData> {
        match &mut self.variant {
            ReflectionVariant::TypeParameter(t) => Some(t),
            _ => None,
        }
    }

    /// The type this reflection documents: a declaration or parameter type,
    /// or a signature's return type.
    pub fn ty(&self) -> Option<&Type> {
        match &self.variant {
            ReflectionVariant::Declaration(d) => d.ty.as_ref(),
            ReflectionVariant::Signature(s) => s.return_type.as_ref(),
            ReflectionVariant::Parameter(p) => p.ty.as_ref(),
            ReflectionVariant::TypeParameter(_) => None,
        }
    }

    pub fn type_parameters(&self) -> &[ReflectionId] {
        match &self.variant {
            ReflectionVariant::Declaration(d) => &d.type_parameters,
            ReflectionVariant::Signature(s) => &s.type_parameters,
            _ => &[],
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, ReflectionId>> {
        self.as_declaration().map(|d| &d.children)
    }

    pub fn relations(&self) -> &[Relation] {
        match &self.variant {
            ReflectionVariant::Declaration(d) => &d.relations,
            ReflectionVariant::Signature(s) => &s.relations,
            _ => &[],
        }
    }

    pub fn relations_mut(&mut self) -> Option<&mut Vec<Relation>> {
        match &mut self.variant {
            ReflectionVariant::Declaration(d) => Some(&mut d.relations),
            ReflectionVariant::Signature(s) => Some(&mut s.relations),
            _ => None,
        }
    }

    /// Every type slot of this reflection.
    pub fn types(&self) -> Vec<&Type> {
        match &self.variant {
            ReflectionVariant::Declaration(d) => d
                .ty
                .iter()
                .chain(d.extended_types.iter())
                .chain(d.implemented_types.iter())
                .collect(),
            ReflectionVariant::Signature(s) => s.return_type.iter().collect(),
            ReflectionVariant::Parameter(p) => p.ty.iter().collect(),
            ReflectionVariant::TypeParameter(t) => t.constraint.iter().chain(t.default.iter()).collect(),
        }
    }

    pub fn types_mut(&mut self) -> Vec<&mut Type> {
        match &mut self.variant {
            ReflectionVariant::Declaration(d) => d
                .ty
                .iter_mut()
                .chain(d.extended_types.iter_mut())
                .chain(d.implemented_types.iter_mut())
                .collect(),
            ReflectionVariant::Signature(s) => s.return_type.iter_mut().collect(),
            ReflectionVariant::Parameter(p) => p.ty.iter_mut().collect(),
            ReflectionVariant::TypeParameter(t) => {
                t.constraint.iter_mut().chain(t.default.iter_mut()).collect()
            }
        }
    }

    /// Reflections owned by this one: children, signatures, parameters,
    /// type parameters and inline type reflections.
    pub fn owned_ids(&self) -> Vec<ReflectionId> {
        let mut ids = Vec::new();
        match &self.variant {
            ReflectionVariant::Declaration(d) => {
                ids.extend(d.children.values().copied());
                ids.extend(d.signatures.iter().copied());
                ids.extend(d.type_parameters.iter().copied());
            }
            ReflectionVariant::Signature(s) => {
                ids.extend(s.parameters.iter().copied());
                ids.extend(s.type_parameters.iter().copied());
            }
            ReflectionVariant::Parameter(_) | ReflectionVariant::TypeParameter(_) => {}
        }
        for ty in self.types() {
            ids.extend(ty.inline_reflections());
        }
        ids
    }

    /// Drops `id` from every member list of this reflection. Returns whether
    /// anything was removed.
    pub(crate) fn detach_member(&mut self, id: ReflectionId) -> bool {
        fn drop_from(list: &mut Vec<ReflectionId>, id: ReflectionId) -> bool {
            let before = list.len();
            list.retain(|&m| m != id);
            before != list.len()
        }

        match &mut self.variant {
            ReflectionVariant::Declaration(d) => {
                let before = d.children.len();
                d.children.retain(|_, &mut child| child != id);
                let children = before != d.children.len();
                let signatures = drop_from(&mut d.signatures, id);
                let type_parameters = drop_from(&mut d.type_parameters, id);
                children || signatures || type_parameters
            }
            ReflectionVariant::Signature(s) => {
                let parameters = drop_from(&mut s.parameters, id);
                let type_parameters = drop_from(&mut s.type_parameters, id);
                parameters || type_parameters
            }
            ReflectionVariant::Parameter(_) | ReflectionVariant::TypeParameter(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Intrinsic;

    #[test]
    fn test_ids_increase_and_restart_after_reset() {
        let mut ids = IdRegistry::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert!(a < b && b < c);

        ids.reset();
        assert_eq!(ids.next_id(), a);
    }

    #[test]
    fn test_comment_parse_summary_and_tags() {
        let raw = "/**\n * Adds two numbers.\n *\n * @param a The first.\n * @returns The sum\n *   of both.\n */";
        let comment = Comment::parse(raw).unwrap();
        assert_eq!(comment.summary, "Adds two numbers.");
        assert_eq!(comment.tags.len(), 2);
        assert_eq!(comment.tag("param").unwrap().text, "a The first.");
        assert_eq!(comment.tag("returns").unwrap().text, "The sum\nof both.");
    }

    #[test]
    fn test_comment_parse_blank_is_none() {
        assert_eq!(Comment::parse("/** */"), None);
        assert_eq!(Comment::parse("   "), None);
    }

    #[test]
    fn test_owned_ids_include_inline_types() {
        let mut reflection = Reflection::declaration("value", ReflectionKind::Property);
        let data = reflection.as_declaration_mut().unwrap();
        data.ty = Some(Type::Array {
            element: Box::new(Type::Reflection {
                declaration: ReflectionId(9),
            }),
        });
        data.children.insert("x".to_string(), ReflectionId(3));
        assert_eq!(reflection.owned_ids(), vec![ReflectionId(3), ReflectionId(9)]);
    }

    #[test]
    fn test_detach_member_from_signature() {
        let mut signature = Reflection::signature("f", ReflectionKind::Function);
        let data = signature.as_signature_mut().unwrap();
        data.parameters = vec![ReflectionId(1), ReflectionId(2)];
        data.return_type = Some(Type::intrinsic(Intrinsic::Void));

        assert!(signature.detach_member(ReflectionId(1)));
        assert!(!signature.detach_member(ReflectionId(1)));
        assert_eq!(signature.as_signature().unwrap().parameters, vec![ReflectionId(2)]);
    }
}
