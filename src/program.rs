//! The materialized Program Oracle input: source nodes, symbols, type
//! representations and diagnostics.
//!
//! The converter never parses or type-checks anything itself. Everything it
//! knows about a program comes through [`ProgramOracle`], and [`Program`] is
//! the in-memory implementation, loadable from a JSON snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// The kind tag of an oracle node. Node converters are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyntaxKind {
    /// A whole source file; the entry-point unit.
    SourceFile,
    /// A namespace or nested module block.
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
    Parameter,
    TypeParameter,
    /// An anonymous object type written inline, `{ a: string }`.
    TypeLiteral,
    /// An anonymous function type written inline, `(a: string) => void`.
    FunctionType,
    /// `export = value` and similar statements with no documentation shape.
    ExportAssignment,
    /// Anything the oracle could not classify.
    Unknown,
}

impl Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyntaxKind::SourceFile => "SourceFile",
            SyntaxKind::Namespace => "Namespace",
            SyntaxKind::Class => "Class",
            SyntaxKind::Interface => "Interface",
            SyntaxKind::Constructor => "Constructor",
            SyntaxKind::Method => "Method",
            SyntaxKind::Function => "Function",
            SyntaxKind::Property => "Property",
            SyntaxKind::Variable => "Variable",
            SyntaxKind::TypeAlias => "TypeAlias",
            SyntaxKind::Enum => "Enum",
            SyntaxKind::EnumMember => "EnumMember",
            SyntaxKind::Parameter => "Parameter",
            SyntaxKind::TypeParameter => "TypeParameter",
            SyntaxKind::TypeLiteral => "TypeLiteral",
            SyntaxKind::FunctionType => "FunctionType",
            SyntaxKind::ExportAssignment => "ExportAssignment",
            SyntaxKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Modifier bits reported by the oracle for a declaration node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeFlags {
    pub exported: bool,
    /// The declaration lives outside the documented sources.
    pub external: bool,
    pub private: bool,
    pub protected: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub optional: bool,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub readonly: bool,
    /// The callable has an implementation body, not only overload signatures.
    pub has_body: bool,
}

/// A declared call signature of a callable node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Signature {
    pub parameters: Vec<NodeId>,
    pub type_parameters: Vec<NodeId>,
    pub return_type: Option<TypeNode>,
    pub resolved_return_type: Option<OracleType>,
    pub comment: Option<String>,
}

impl Signature {
    pub fn returning(return_type: TypeNode) -> Self {
        Signature {
            return_type: Some(return_type),
            ..Signature::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<NodeId>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: SyntaxKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
    /// Set on `SourceFile` nodes only.
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub flags: NodeFlags,
    /// Statements of a file or namespace, members of a class, interface,
    /// enum or type literal.
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub type_parameters: Vec<NodeId>,
    #[serde(default)]
    pub signatures: Vec<Signature>,
    /// The written type annotation, or the body of a type alias.
    #[serde(default)]
    pub type_node: Option<TypeNode>,
    /// The checker's view of the node's type.
    #[serde(default)]
    pub resolved_type: Option<OracleType>,
    /// `extends` constraint of a type parameter.
    #[serde(default)]
    pub constraint: Option<TypeNode>,
    /// Default of a type parameter.
    #[serde(default)]
    pub default_type: Option<TypeNode>,
    #[serde(default)]
    pub initializer: Option<String>,
    #[serde(default)]
    pub extends: Vec<TypeNode>,
    #[serde(default)]
    pub implements: Vec<TypeNode>,
}

impl Node {
    pub fn new(id: NodeId, kind: SyntaxKind) -> Self {
        Node {
            id,
            kind,
            name: None,
            symbol: None,
            file_name: None,
            comment: None,
            flags: NodeFlags::default(),
            children: Vec::new(),
            type_parameters: Vec::new(),
            signatures: Vec::new(),
            type_node: None,
            resolved_type: None,
            constraint: None,
            default_type: None,
            initializer: None,
            extends: Vec::new(),
            implements: Vec::new(),
        }
    }

    /// A printable name for warnings, falling back to the file name.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.file_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub id: SymbolId,
    pub name: String,
    /// Dotted path from the module root, `Outer.Inner.member`.
    pub qualified_name: String,
    #[serde(default)]
    pub declarations: Vec<NodeId>,
    #[serde(default)]
    pub is_type_parameter: bool,
    /// Declared outside the documented sources.
    #[serde(default)]
    pub external: bool,
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeNode {
    Keyword {
        name: String,
    },
    Reference {
        name: String,
        #[serde(default)]
        symbol: Option<SymbolId>,
        #[serde(default)]
        type_arguments: Vec<TypeNode>,
    },
    Union {
        types: Vec<TypeNode>,
    },
    Intersection {
        types: Vec<TypeNode>,
    },
    Array {
        element: Box<TypeNode>,
    },
    Tuple {
        elements: Vec<TypeNode>,
    },
    /// An inline `TypeLiteral` or `FunctionType` declaration node.
    Literal {
        declaration: NodeId,
    },
    Conditional {
        check: Box<TypeNode>,
        extends: Box<TypeNode>,
        true_type: Box<TypeNode>,
        false_type: Box<TypeNode>,
    },
    Mapped {
        parameter: String,
        constraint: Box<TypeNode>,
        template: Box<TypeNode>,
        #[serde(default)]
        readonly: bool,
        #[serde(default)]
        optional: bool,
    },
    Parenthesized {
        inner: Box<TypeNode>,
    },
    /// A construct the oracle reports verbatim; never convertible.
    Unsupported {
        text: String,
    },
}

impl TypeNode {
    pub fn keyword(name: &str) -> Self {
        TypeNode::Keyword {
            name: name.to_string(),
        }
    }

    pub fn reference(name: &str, symbol: Option<SymbolId>) -> Self {
        TypeNode::Reference {
            name: name.to_string(),
            symbol,
            type_arguments: Vec::new(),
        }
    }

    pub fn literal(declaration: NodeId) -> Self {
        TypeNode::Literal { declaration }
    }
}

/// A type as resolved by the checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OracleType {
    Intrinsic {
        name: String,
    },
    /// A class, interface or anonymous object type. Anonymous types carry no
    /// symbol and point at their declaration node.
    Object {
        #[serde(default)]
        symbol: Option<SymbolId>,
        #[serde(default)]
        declaration: Option<NodeId>,
        #[serde(default)]
        type_arguments: Vec<OracleType>,
    },
    TypeParameter {
        name: String,
    },
    Union {
        types: Vec<OracleType>,
    },
    Intersection {
        types: Vec<OracleType>,
    },
    Array {
        element: Box<OracleType>,
    },
    Tuple {
        elements: Vec<OracleType>,
    },
    Unknown {
        text: String,
    },
}

impl OracleType {
    pub fn intrinsic(name: &str) -> Self {
        OracleType::Intrinsic {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
    Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default)]
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Diagnostic {
    pub fn error(code: u32, message: &str) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.to_string(),
            file_name: None,
        }
    }
}

/// Everything the converter asks of the external semantic provider.
pub trait ProgramOracle {
    fn diagnostics(&self) -> &[Diagnostic];

    /// Finds the source file node for a normalized (`/`-separated) path.
    fn source_file(&self, file_name: &str) -> Option<&Node>;

    fn node(&self, id: NodeId) -> Option<&Node>;

    fn symbol(&self, id: SymbolId) -> Option<&SymbolInfo>;

    fn type_of<'n>(&self, node: &'n Node) -> Option<&'n OracleType> {
        node.resolved_type.as_ref()
    }

    fn signatures_of<'n>(&self, node: &'n Node) -> &'n [Signature] {
        &node.signatures
    }
}

/// An in-memory oracle snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    node_index: HashMap<NodeId, usize>,
    #[serde(skip)]
    symbol_index: HashMap<SymbolId, usize>,
}

impl Program {
    pub fn new(nodes: Vec<Node>, symbols: Vec<SymbolInfo>, diagnostics: Vec<Diagnostic>) -> Self {
        let mut program = Program {
            nodes,
            symbols,
            diagnostics,
            node_index: HashMap::new(),
            symbol_index: HashMap::new(),
        };
        program.reindex();
        program
    }

    /// Loads a snapshot previously written with [`Program::to_json`].
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if the input is not a valid snapshot.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        let mut program: Program = serde_json::from_str(source)?;
        program.reindex();
        Ok(program)
    }

    /// # Errors
    /// Returns a `serde_json::Error` if reading fails or the input is not a
    /// valid snapshot.
    pub fn from_reader(reader: impl Read) -> Result<Self, serde_json::Error> {
        let mut program: Program = serde_json::from_reader(reader)?;
        program.reindex();
        Ok(program)
    }

    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn symbols(&self) -> &[SymbolInfo] {
        &self.symbols
    }

    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        self.symbol_index = self
            .symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();
    }
}

impl ProgramOracle for Program {
    fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn source_file(&self, file_name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| {
            n.kind == SyntaxKind::SourceFile && n.file_name.as_deref() == Some(file_name)
        })
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    fn symbol(&self, id: SymbolId) -> Option<&SymbolInfo> {
        self.symbol_index.get(&id).map(|&i| &self.symbols[i])
    }
}

/// Assembles a [`Program`] in code. Node ids are handed out in creation
/// order and every method expects ids it produced itself.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    nodes: Vec<Node>,
    symbols: Vec<SymbolInfo>,
    diagnostics: Vec<Diagnostic>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_file(&mut self, file_name: &str) -> NodeId {
        let id = self.add_node(SyntaxKind::SourceFile, None);
        self.node_mut(id).file_name = Some(file_name.to_string());
        id
    }

    /// Adds a node with no symbol that is not attached anywhere.
    pub fn add_node(&mut self, kind: SyntaxKind, name: Option<&str>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = Node::new(id, kind);
        node.name = name.map(str::to_string);
        self.nodes.push(node);
        id
    }

    /// Adds a named declaration with its own symbol, not attached anywhere.
    pub fn detached(&mut self, kind: SyntaxKind, name: &str) -> NodeId {
        let id = self.add_node(kind, Some(name));
        let symbol = self.new_symbol(name, name.to_string(), id, false);
        self.node_mut(id).symbol = Some(symbol);
        id
    }

    /// Adds a named declaration as the last child of `parent`.
    pub fn declare(&mut self, parent: NodeId, kind: SyntaxKind, name: &str) -> NodeId {
        let qualified_name = match self.qualified_name_of(parent) {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        };
        let id = self.add_node(kind, Some(name));
        let symbol = self.new_symbol(name, qualified_name, id, false);
        self.node_mut(id).symbol = Some(symbol);
        self.node_mut(parent).children.push(id);
        id
    }

    pub fn type_parameter(&mut self, owner: NodeId, name: &str) -> NodeId {
        let id = self.add_node(SyntaxKind::TypeParameter, Some(name));
        let symbol = self.new_symbol(name, name.to_string(), id, true);
        self.node_mut(id).symbol = Some(symbol);
        self.node_mut(owner).type_parameters.push(id);
        id
    }

    pub fn parameter(&mut self, name: &str, type_node: TypeNode) -> NodeId {
        let id = self.detached(SyntaxKind::Parameter, name);
        self.node_mut(id).type_node = Some(type_node);
        id
    }

    /// Adds an anonymous `TypeLiteral` node whose members are declared with
    /// [`ProgramBuilder::declare`].
    pub fn type_literal(&mut self) -> NodeId {
        self.add_node(SyntaxKind::TypeLiteral, None)
    }

    pub fn signature(&mut self, node: NodeId, signature: Signature) -> &mut Self {
        self.node_mut(node).signatures.push(signature);
        self
    }

    /// Registers a symbol declared outside the documented sources.
    pub fn external_symbol(&mut self, name: &str, qualified_name: &str) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            id,
            name: name.to_string(),
            qualified_name: qualified_name.to_string(),
            declarations: Vec::new(),
            is_type_parameter: false,
            external: true,
        });
        id
    }

    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.nodes.get(node.0 as usize).and_then(|n| n.symbol)
    }

    /// # Panics
    /// Panics if `id` was not produced by this builder.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn diagnostic(&mut self, diagnostic: Diagnostic) -> &mut Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn build(self) -> Program {
        Program::new(self.nodes, self.symbols, self.diagnostics)
    }

    fn qualified_name_of(&self, node: NodeId) -> Option<String> {
        let symbol = self.symbol_of(node)?;
        self.symbols
            .get(symbol.0 as usize)
            .map(|s| s.qualified_name.clone())
    }

    fn new_symbol(
        &mut self,
        name: &str,
        qualified_name: String,
        declaration: NodeId,
        is_type_parameter: bool,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            id,
            name: name.to_string(),
            qualified_name,
            declarations: vec![declaration],
            is_type_parameter,
            external: false,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_qualifies_nested_symbols() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("src/index.ts");
        let ns = builder.declare(file, SyntaxKind::Namespace, "Outer");
        let class = builder.declare(ns, SyntaxKind::Class, "Inner");
        let program = builder.build();

        let node = program.node(class).unwrap();
        let symbol = program.symbol(node.symbol.unwrap()).unwrap();
        assert_eq!(symbol.qualified_name, "Outer.Inner");
        assert_eq!(program.source_file("src/index.ts").unwrap().children, vec![ns]);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_lookups() {
        let mut builder = ProgramBuilder::new();
        let file = builder.source_file("a.ts");
        builder.declare(file, SyntaxKind::Variable, "x");
        let json = builder.build().to_json().unwrap();

        let program = Program::from_json(&json).unwrap();
        assert!(program.source_file("a.ts").is_some());
        assert_eq!(program.node(NodeId(1)).unwrap().name.as_deref(), Some("x"));
        assert_eq!(program.symbol(SymbolId(0)).unwrap().name, "x");
    }

    #[test]
    fn test_type_node_tagging() {
        let json = r#"{ "kind": "array", "element": { "kind": "keyword", "name": "string" } }"#;
        let node: TypeNode = serde_json::from_str(json).unwrap();
        assert_eq!(
            node,
            TypeNode::Array {
                element: Box::new(TypeNode::keyword("string"))
            }
        );
    }
}
