//! Maps oracle type representations onto [`Type`].
//!
//! Both the written form ([`TypeNode`]) and the checker's form
//! ([`OracleType`]) are accepted. Conversion only touches the visit stack
//! when an anonymous object or function type has to be converted into an
//! inline reflection.
//!
//! A result of `Ok(None)` means this particular type could not be
//! represented; callers drop it. `Err` is reserved for faults raised by a
//! nested node converter.

use crate::context::Context;
use crate::error::ConvertError;
use crate::program::{NodeId, OracleType, SymbolId, TypeNode};
use crate::types::{Intrinsic, ReferenceTarget, Type};

#[derive(Debug, Clone, Copy)]
pub enum TypeSource<'a> {
    Node(&'a TypeNode),
    Type(&'a OracleType),
}

pub fn convert_type<'a>(
    cx: &mut Context<'a>,
    source: TypeSource<'a>,
) -> Result<Option<Type>, ConvertError> {
    match source {
        TypeSource::Node(node) => convert_type_node(cx, node),
        TypeSource::Type(ty) => convert_oracle_type(cx, ty),
    }
}

/// Converts `nodes` and `types` pairwise. Where a node entry is missing the
/// type entry at the same position is used. Entries that fail to convert
/// are left out; the batch itself only fails on a handler fault.
pub fn convert_types<'a>(
    cx: &mut Context<'a>,
    nodes: &'a [TypeNode],
    types: &'a [OracleType],
) -> Result<Vec<Type>, ConvertError> {
    let len = nodes.len().max(types.len());
    let mut result = Vec::with_capacity(len);
    for i in 0..len {
        let source = match (nodes.get(i), types.get(i)) {
            (Some(node), _) => TypeSource::Node(node),
            (None, Some(ty)) => TypeSource::Type(ty),
            (None, None) => continue,
        };
        if let Some(converted) = convert_type(cx, source)? {
            result.push(converted);
        }
    }
    Ok(result)
}

fn convert_type_node<'a>(
    cx: &mut Context<'a>,
    node: &'a TypeNode,
) -> Result<Option<Type>, ConvertError> {
    let converted = match node {
        TypeNode::Keyword { name } => intrinsic(name),
        TypeNode::Reference {
            name,
            symbol,
            type_arguments,
        } => {
            let arguments = convert_all(cx, type_arguments.iter().map(TypeSource::Node))?;
            Some(reference(cx, name, *symbol, arguments))
        }
        TypeNode::Union { types } => {
            Type::union(convert_all(cx, types.iter().map(TypeSource::Node))?)
        }
        TypeNode::Intersection { types } => {
            Type::intersection(convert_all(cx, types.iter().map(TypeSource::Node))?)
        }
        TypeNode::Array { element } => convert_type_node(cx, element)?.map(|element| Type::Array {
            element: Box::new(element),
        }),
        TypeNode::Tuple { elements } => Some(Type::Tuple {
            elements: convert_all(cx, elements.iter().map(TypeSource::Node))?,
        }),
        TypeNode::Literal { declaration } => inline_declaration(cx, *declaration)?,
        TypeNode::Conditional {
            check,
            extends,
            true_type,
            false_type,
        } => {
            let check = convert_type_node(cx, check)?;
            let extends = convert_type_node(cx, extends)?;
            let true_type = convert_type_node(cx, true_type)?;
            let false_type = convert_type_node(cx, false_type)?;
            match (check, extends, true_type, false_type) {
                (Some(check), Some(extends), Some(true_type), Some(false_type)) => {
                    Some(Type::Conditional {
                        check: Box::new(check),
                        extends: Box::new(extends),
                        true_type: Box::new(true_type),
                        false_type: Box::new(false_type),
                    })
                }
                _ => None,
            }
        }
        TypeNode::Mapped {
            parameter,
            constraint,
            template,
            readonly,
            optional,
        } => {
            let constraint = convert_type_node(cx, constraint)?;
            let template = convert_type_node(cx, template)?;
            match (constraint, template) {
                (Some(constraint), Some(template)) => Some(Type::Mapped {
                    parameter: parameter.clone(),
                    constraint: Box::new(constraint),
                    template: Box::new(template),
                    readonly: *readonly,
                    optional: *optional,
                }),
                _ => None,
            }
        }
        TypeNode::Parenthesized { inner } => convert_type_node(cx, inner)?,
        TypeNode::Unsupported { text } => {
            log::debug!("no type conversion for `{text}`");
            None
        }
    };
    Ok(converted)
}

fn convert_oracle_type<'a>(
    cx: &mut Context<'a>,
    ty: &'a OracleType,
) -> Result<Option<Type>, ConvertError> {
    let converted = match ty {
        OracleType::Intrinsic { name } => intrinsic(name),
        OracleType::Object {
            symbol: Some(symbol),
            type_arguments,
            ..
        } => {
            let arguments = convert_all(cx, type_arguments.iter().map(TypeSource::Type))?;
            let name = cx
                .program()
                .symbol(*symbol)
                .map_or_else(|| symbol.to_string(), |s| s.name.clone());
            Some(reference(cx, &name, Some(*symbol), arguments))
        }
        OracleType::Object {
            symbol: None,
            declaration: Some(declaration),
            ..
        } => inline_declaration(cx, *declaration)?,
        OracleType::Object { .. } => Some(Type::intrinsic(Intrinsic::Object)),
        OracleType::TypeParameter { name } => Some(Type::TypeParameter {
            name: name.clone(),
            owner: cx.type_parameter_owner(name),
        }),
        OracleType::Union { types } => {
            Type::union(convert_all(cx, types.iter().map(TypeSource::Type))?)
        }
        OracleType::Intersection { types } => {
            Type::intersection(convert_all(cx, types.iter().map(TypeSource::Type))?)
        }
        OracleType::Array { element } => convert_oracle_type(cx, element)?.map(|element| Type::Array {
            element: Box::new(element),
        }),
        OracleType::Tuple { elements } => Some(Type::Tuple {
            elements: convert_all(cx, elements.iter().map(TypeSource::Type))?,
        }),
        OracleType::Unknown { text } => {
            log::debug!("no type conversion for checker type `{text}`");
            None
        }
    };
    Ok(converted)
}

fn convert_all<'a>(
    cx: &mut Context<'a>,
    sources: impl Iterator<Item = TypeSource<'a>>,
) -> Result<Vec<Type>, ConvertError> {
    let mut converted = Vec::new();
    for source in sources {
        if let Some(ty) = convert_type(cx, source)? {
            converted.push(ty);
        }
    }
    Ok(converted)
}

fn intrinsic(name: &str) -> Option<Type> {
    let intrinsic = Intrinsic::from_name(name);
    if intrinsic.is_none() {
        log::debug!("`{name}` is not an intrinsic type");
    }
    intrinsic.map(Type::intrinsic)
}

/// Builds a reference to a named type.
///
/// Symbol identity decides first: type parameter symbols bind to the
/// nearest owner, symbols with a reflection link to it, other internal
/// symbols stay pending until resolution and external symbols become
/// qualified references. Without a symbol, a name declared as a type
/// parameter in scope binds to it; otherwise the name is looked up among
/// the project's full names and linked only if exactly one reflection
/// matches.
fn reference(cx: &Context<'_>, name: &str, symbol: Option<SymbolId>, type_arguments: Vec<Type>) -> Type {
    let target = match symbol.and_then(|s| cx.program().symbol(s)) {
        Some(info) if info.is_type_parameter => {
            return Type::TypeParameter {
                name: info.name.clone(),
                owner: cx.type_parameter_owner(&info.name),
            };
        }
        Some(info) => match cx.project().reflection_for_symbol(info.id) {
            Some(id) => ReferenceTarget::Reflection { id },
            None if info.external => ReferenceTarget::Qualified {
                name: info.qualified_name.clone(),
            },
            None => ReferenceTarget::Symbol {
                symbol: info.id,
                qualified_name: info.qualified_name.clone(),
            },
        },
        None => {
            if type_arguments.is_empty() {
                if let Some(owner) = cx.type_parameter_owner(name) {
                    return Type::TypeParameter {
                        name: name.to_string(),
                        owner: Some(owner),
                    };
                }
            }
            match cx.project().find_by_full_name(name).as_slice() {
                [id] => ReferenceTarget::Reflection { id: *id },
                _ => ReferenceTarget::Qualified {
                    name: name.to_string(),
                },
            }
        }
    };
    Type::Reference {
        name: name.to_string(),
        type_arguments,
        target,
    }
}

/// Converts an anonymous object or function declaration into an inline
/// reflection. A declaration that is already being converted (a recursive
/// anonymous type) degrades to the `object` intrinsic.
fn inline_declaration<'a>(
    cx: &mut Context<'a>,
    declaration: NodeId,
) -> Result<Option<Type>, ConvertError> {
    let Some(node) = cx.lookup_node(declaration) else {
        return Ok(None);
    };
    if cx.is_visiting(node.id) {
        return Ok(Some(Type::intrinsic(Intrinsic::Object)));
    }
    Ok(cx
        .convert_node(node)?
        .map(|declaration| Type::Reflection { declaration }))
}
