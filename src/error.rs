use crate::program::{Diagnostic as OracleDiagnostic, NodeId, SyntaxKind};
use crate::reflection::ReflectionId;
use crate::resolver::DanglingReference;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ConvertError {
    #[error("compilation failed with {} semantic error(s)", .errors.len())]
    #[diagnostic(
        code(converter::compilation_failed),
        help("The program oracle reported errors. No project is produced until they are fixed.")
    )]
    Semantic {
        #[related]
        errors: Vec<SemanticError>,
    },

    #[error("node {node} is referenced but missing from the program")]
    #[diagnostic(
        code(converter::missing_node),
        help("The program oracle handed out a node id it cannot resolve.")
    )]
    MissingNode { node: NodeId },

    #[error("reflection {id} is missing from the project")]
    #[diagnostic(code(converter::missing_reflection))]
    MissingReflection { id: ReflectionId },

    #[error("converter for {kind} failed: {message}")]
    #[diagnostic(code(converter::handler_failed))]
    Handler { kind: SyntaxKind, message: String },
}

/// An error-severity diagnostic reported by the program oracle.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("{}error {code}: {message}", .file_name.as_deref().map(|f| format!("{f}: ")).unwrap_or_default())]
#[diagnostic(code(converter::semantic_error))]
pub struct SemanticError {
    pub code: u32,
    pub message: String,
    pub file_name: Option<String>,
}

impl From<&OracleDiagnostic> for SemanticError {
    fn from(diagnostic: &OracleDiagnostic) -> Self {
        SemanticError {
            code: diagnostic.code,
            message: diagnostic.message.clone(),
            file_name: diagnostic.file_name.clone(),
        }
    }
}

/// Conditions that skip part of the input but let the run continue.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConvertWarning {
    #[error("missing converter for node with kind {kind} ({})", .name.as_deref().unwrap_or("<anonymous>"))]
    #[diagnostic(
        code(converter::missing_converter),
        severity(Warning),
        help("Register a node converter supporting this kind, or the node is left out of the project.")
    )]
    MissingConverter { kind: SyntaxKind, name: Option<String> },

    #[error("unable to locate entry point: {path}")]
    #[diagnostic(
        code(converter::missing_entry_point),
        severity(Warning),
        help("The program oracle has no source file at this path.")
    )]
    MissingEntryPoint { path: String },

    #[error("node {node} is referenced but missing from the program")]
    #[diagnostic(
        code(converter::missing_node),
        severity(Warning),
        help("The program oracle handed out a node id it cannot resolve. The reference is skipped.")
    )]
    MissingNode { node: NodeId },

    #[error("skipped {kind} node {node}: {reason}")]
    #[diagnostic(code(converter::malformed_node), severity(Warning))]
    MalformedNode {
        kind: SyntaxKind,
        node: NodeId,
        reason: String,
    },

    #[error("pruned dangling {reference}")]
    #[diagnostic(code(converter::dangling_reference), severity(Warning))]
    DanglingReference { reference: DanglingReference },
}
