use crate::program::SymbolId;
use crate::reflection::ReflectionId;
use serde::Serialize;
use std::fmt::{self, Display};

/// Built-in types with no declaration of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Intrinsic {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Boolean,
    Number,
    BigInt,
    String,
    Symbol,
    Object,
    This,
}

impl Intrinsic {
    /// Maps an oracle keyword to its intrinsic, if it is one.
    pub fn from_name(name: &str) -> Option<Self> {
        let intrinsic = match name {
            "any" => Intrinsic::Any,
            "unknown" => Intrinsic::Unknown,
            "never" => Intrinsic::Never,
            "void" => Intrinsic::Void,
            "undefined" => Intrinsic::Undefined,
            "null" => Intrinsic::Null,
            "boolean" => Intrinsic::Boolean,
            "number" => Intrinsic::Number,
            "bigint" => Intrinsic::BigInt,
            "string" => Intrinsic::String,
            "symbol" => Intrinsic::Symbol,
            "object" => Intrinsic::Object,
            "this" => Intrinsic::This,
            _ => return None,
        };
        Some(intrinsic)
    }

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::Any => "any",
            Intrinsic::Unknown => "unknown",
            Intrinsic::Never => "never",
            Intrinsic::Void => "void",
            Intrinsic::Undefined => "undefined",
            Intrinsic::Null => "null",
            Intrinsic::Boolean => "boolean",
            Intrinsic::Number => "number",
            Intrinsic::BigInt => "bigint",
            Intrinsic::String => "string",
            Intrinsic::Symbol => "symbol",
            Intrinsic::Object => "object",
            Intrinsic::This => "this",
        }
    }
}

/// Where a [`Type::Reference`] points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReferenceTarget {
    /// A reflection of this project.
    Reflection { id: ReflectionId },
    /// A symbol with no reflection yet. Linked or demoted to `Qualified`
    /// when resolution starts.
    Symbol {
        symbol: SymbolId,
        qualified_name: String,
    },
    /// Declared outside the project, or severed from a removed reflection.
    Qualified { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Type {
    Intrinsic {
        name: Intrinsic,
    },
    Reference {
        name: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        type_arguments: Vec<Type>,
        target: ReferenceTarget,
    },
    Union {
        types: Vec<Type>,
    },
    Intersection {
        types: Vec<Type>,
    },
    Array {
        element: Box<Type>,
    },
    Tuple {
        elements: Vec<Type>,
    },
    /// An anonymous object or function type. The unnamed reflection is owned
    /// by the reflection that holds this type.
    Reflection {
        declaration: ReflectionId,
    },
    TypeParameter {
        name: String,
        /// The reflection declaring the parameter.
        owner: Option<ReflectionId>,
    },
    Conditional {
        check: Box<Type>,
        extends: Box<Type>,
        true_type: Box<Type>,
        false_type: Box<Type>,
    },
    Mapped {
        parameter: String,
        constraint: Box<Type>,
        template: Box<Type>,
        readonly: bool,
        optional: bool,
    },
}

impl Type {
    pub fn intrinsic(intrinsic: Intrinsic) -> Self {
        Type::Intrinsic { name: intrinsic }
    }

    pub fn reference(name: &str, target: ReferenceTarget) -> Self {
        Type::Reference {
            name: name.to_string(),
            type_arguments: Vec::new(),
            target,
        }
    }

    /// Builds a union, flattening nested unions. Returns `None` for an empty
    /// member list and the member itself when only one remains.
    pub fn union(types: Vec<Type>) -> Option<Type> {
        let mut flat = Vec::with_capacity(types.len());
        for ty in types {
            match ty {
                Type::Union { types } => flat.extend(types),
                other => flat.push(other),
            }
        }
        collapse(flat, |types| Type::Union { types })
    }

    /// Same as [`Type::union`] for intersections.
    pub fn intersection(types: Vec<Type>) -> Option<Type> {
        let mut flat = Vec::with_capacity(types.len());
        for ty in types {
            match ty {
                Type::Intersection { types } => flat.extend(types),
                other => flat.push(other),
            }
        }
        collapse(flat, |types| Type::Intersection { types })
    }

    /// The reflection this type references, if linked.
    pub fn target_id(&self) -> Option<ReflectionId> {
        match self {
            Type::Reference {
                target: ReferenceTarget::Reflection { id },
                ..
            } => Some(*id),
            _ => None,
        }
    }

    /// Calls `f` on this type and every nested type, outermost first.
    pub fn visit(&self, f: &mut impl FnMut(&Type)) {
        f(self);
        match self {
            Type::Reference { type_arguments, .. } => {
                type_arguments.iter().for_each(|t| t.visit(f));
            }
            Type::Union { types } | Type::Intersection { types } => {
                types.iter().for_each(|t| t.visit(f));
            }
            Type::Tuple { elements } => elements.iter().for_each(|t| t.visit(f)),
            Type::Array { element } => element.visit(f),
            Type::Conditional {
                check,
                extends,
                true_type,
                false_type,
            } => {
                check.visit(f);
                extends.visit(f);
                true_type.visit(f);
                false_type.visit(f);
            }
            Type::Mapped {
                constraint,
                template,
                ..
            } => {
                constraint.visit(f);
                template.visit(f);
            }
            Type::Intrinsic { .. } | Type::Reflection { .. } | Type::TypeParameter { .. } => {}
        }
    }

    /// Mutable counterpart of [`Type::visit`]. `f` may replace the node it is
    /// given; the replacement's children are visited afterwards.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Type)) {
        f(self);
        match self {
            Type::Reference { type_arguments, .. } => {
                type_arguments.iter_mut().for_each(|t| t.visit_mut(f));
            }
            Type::Union { types } | Type::Intersection { types } => {
                types.iter_mut().for_each(|t| t.visit_mut(f));
            }
            Type::Tuple { elements } => elements.iter_mut().for_each(|t| t.visit_mut(f)),
            Type::Array { element } => element.visit_mut(f),
            Type::Conditional {
                check,
                extends,
                true_type,
                false_type,
            } => {
                check.visit_mut(f);
                extends.visit_mut(f);
                true_type.visit_mut(f);
                false_type.visit_mut(f);
            }
            Type::Mapped {
                constraint,
                template,
                ..
            } => {
                constraint.visit_mut(f);
                template.visit_mut(f);
            }
            Type::Intrinsic { .. } | Type::Reflection { .. } | Type::TypeParameter { .. } => {}
        }
    }

    /// Ids of inline reflections nested anywhere in this type.
    pub fn inline_reflections(&self) -> Vec<ReflectionId> {
        let mut ids = Vec::new();
        self.visit(&mut |t| {
            if let Type::Reflection { declaration } = t {
                ids.push(*declaration);
            }
        });
        ids
    }
}

fn collapse(mut types: Vec<Type>, wrap: impl FnOnce(Vec<Type>) -> Type) -> Option<Type> {
    match types.len() {
        0 => None,
        1 => types.pop(),
        _ => Some(wrap(types)),
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Intrinsic { name } => f.write_str(name.name()),
            Type::Reference {
                name,
                type_arguments,
                ..
            } => {
                write!(f, "{name}")?;
                if !type_arguments.is_empty() {
                    write!(f, "<")?;
                    write_joined(f, type_arguments, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Union { types } => write_joined(f, types, " | "),
            Type::Intersection { types } => write_joined(f, types, " & "),
            Type::Array { element } => match element.as_ref() {
                Type::Union { .. } | Type::Intersection { .. } => write!(f, "({element})[]"),
                _ => write!(f, "{element}[]"),
            },
            Type::Tuple { elements } => {
                write!(f, "[")?;
                write_joined(f, elements, ", ")?;
                write!(f, "]")
            }
            Type::Reflection { .. } => f.write_str("object"),
            Type::TypeParameter { name, .. } => f.write_str(name),
            Type::Conditional {
                check,
                extends,
                true_type,
                false_type,
            } => write!(f, "{check} extends {extends} ? {true_type} : {false_type}"),
            Type::Mapped {
                parameter,
                constraint,
                template,
                readonly,
                optional,
            } => {
                let readonly = if *readonly { "readonly " } else { "" };
                let optional = if *optional { "?" } else { "" };
                write!(f, "{{ {readonly}[{parameter} in {constraint}]{optional}: {template} }}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, types: &[Type], separator: &str) -> fmt::Result {
    for (i, t) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> Type {
        Type::intrinsic(Intrinsic::Number)
    }

    fn string() -> Type {
        Type::intrinsic(Intrinsic::String)
    }

    #[test]
    fn test_single_member_union_collapses() {
        assert_eq!(Type::union(vec![number()]), Some(number()));
        assert_eq!(Type::intersection(vec![string()]), Some(string()));
        assert_eq!(Type::union(Vec::new()), None);
    }

    #[test]
    fn test_nested_unions_flatten() {
        let inner = Type::union(vec![number(), string()]).unwrap();
        let outer = Type::union(vec![inner, Type::intrinsic(Intrinsic::Null)]).unwrap();
        assert_eq!(
            outer,
            Type::Union {
                types: vec![number(), string(), Type::intrinsic(Intrinsic::Null)]
            }
        );
        assert_eq!(outer.to_string(), "number | string | null");
    }

    #[test]
    fn test_display_array_of_union_is_parenthesized() {
        let ty = Type::Array {
            element: Box::new(Type::union(vec![number(), string()]).unwrap()),
        };
        assert_eq!(ty.to_string(), "(number | string)[]");
    }

    #[test]
    fn test_inline_reflections_are_collected() {
        let ty = Type::Tuple {
            elements: vec![
                Type::Reflection {
                    declaration: ReflectionId(4),
                },
                Type::Array {
                    element: Box::new(Type::Reflection {
                        declaration: ReflectionId(7),
                    }),
                },
            ],
        };
        assert_eq!(ty.inline_reflections(), vec![ReflectionId(4), ReflectionId(7)]);
    }
}
