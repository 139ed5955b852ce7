use crate::project::ProjectReflection;
use crate::reflection::{ReflectionId, RelationKind};
use crate::types::{Intrinsic, ReferenceTarget, Type};
use serde::Serialize;
use std::fmt::{self, Display};

/// What kind of link the dangling sweep cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DanglingKind {
    /// A `Type::Reference` targeting a removed reflection; demoted to a
    /// qualified-name reference.
    TypeReference,
    /// An inline object type whose reflection was removed; replaced by the
    /// `object` intrinsic.
    InlineType,
    /// A type parameter whose owner was removed; the owner link is cleared.
    TypeParameterOwner,
    Relation(RelationKind),
    /// A child, signature, parameter or type parameter entry with no
    /// reflection behind it.
    Member,
}

impl Display for DanglingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingKind::TypeReference => f.write_str("type reference"),
            DanglingKind::InlineType => f.write_str("inline type"),
            DanglingKind::TypeParameterOwner => f.write_str("type parameter owner"),
            DanglingKind::Relation(kind) => write!(f, "{kind} relation"),
            DanglingKind::Member => f.write_str("member entry"),
        }
    }
}

/// One link removed by [`ProjectReflection::remove_dangling_references`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// The reflection holding the link.
    pub origin: ReflectionId,
    /// The missing reflection it pointed at.
    pub target: ReflectionId,
    pub kind: DanglingKind,
}

impl Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from reflection {} to missing reflection {}",
            self.kind, self.origin, self.target
        )
    }
}

impl ProjectReflection {
    /// Links every pending symbol reference to the reflection documenting
    /// that symbol. Symbols without a reflection become qualified-name
    /// references. Returns the number of references linked.
    pub fn link_symbol_references(&mut self) -> usize {
        let symbols = self.symbol_table().clone();
        let mut linked = 0;
        for reflection in self.reflections_mut() {
            for ty in reflection.types_mut() {
                ty.visit_mut(&mut |t| {
                    if let Type::Reference { target, .. } = t {
                        if let ReferenceTarget::Symbol {
                            symbol,
                            qualified_name,
                        } = target
                        {
                            *target = match symbols.get(symbol) {
                                Some(&id) => {
                                    linked += 1;
                                    ReferenceTarget::Reflection { id }
                                }
                                None => ReferenceTarget::Qualified {
                                    name: std::mem::take(qualified_name),
                                },
                            };
                        }
                    }
                });
            }
        }
        linked
    }

    /// Cuts every link to a reflection that is no longer registered.
    ///
    /// Running the sweep on its own output changes nothing and returns an
    /// empty list.
    pub fn remove_dangling_references(&mut self) -> Vec<DanglingReference> {
        let live: std::collections::HashSet<ReflectionId> = self.ids().into_iter().collect();
        let project_id = self.id;
        let exists = |id: ReflectionId| id == project_id || live.contains(&id);
        let mut cut = Vec::new();

        let before = self.children.len();
        self.children.retain(|_, id| live.contains(id));
        if before != self.children.len() {
            log::debug!("dropped {} dangling top-level children", before - self.children.len());
        }

        for reflection in self.reflections_mut() {
            let origin = reflection.id;

            for ty in reflection.types_mut() {
                ty.visit_mut(&mut |t| match t {
                    Type::Reference { name, target, .. } => {
                        if let ReferenceTarget::Reflection { id } = *target {
                            if !exists(id) {
                                cut.push(DanglingReference {
                                    origin,
                                    target: id,
                                    kind: DanglingKind::TypeReference,
                                });
                                *target = ReferenceTarget::Qualified { name: name.clone() };
                            }
                        }
                    }
                    Type::Reflection { declaration } if !exists(*declaration) => {
                        cut.push(DanglingReference {
                            origin,
                            target: *declaration,
                            kind: DanglingKind::InlineType,
                        });
                        *t = Type::intrinsic(Intrinsic::Object);
                    }
                    Type::TypeParameter { owner, .. } => {
                        if let Some(id) = owner.filter(|&id| !exists(id)) {
                            cut.push(DanglingReference {
                                origin,
                                target: id,
                                kind: DanglingKind::TypeParameterOwner,
                            });
                            *owner = None;
                        }
                    }
                    _ => {}
                });
            }

            if let Some(relations) = reflection.relations_mut() {
                relations.retain(|relation| {
                    let keep = exists(relation.target);
                    if !keep {
                        cut.push(DanglingReference {
                            origin,
                            target: relation.target,
                            kind: DanglingKind::Relation(relation.kind),
                        });
                    }
                    keep
                });
            }

            for member in reflection.owned_ids() {
                if !exists(member) && reflection.detach_member(member) {
                    cut.push(DanglingReference {
                        origin,
                        target: member,
                        kind: DanglingKind::Member,
                    });
                }
            }
        }

        cut
    }
}
