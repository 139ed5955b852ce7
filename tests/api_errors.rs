// API error path tests
// These cover semantic failures, warnings and how both render as diagnostics.

use docgraph_core::program::{Diagnostic, Severity, SyntaxKind};
use docgraph_core::{convert, ConvertError, ConvertWarning, ConverterOptions, EventKind, ProgramBuilder};
use docgraph_core::{Converter, ConverterState};
use miette::{Diagnostic as _, Report};
use std::cell::RefCell;
use std::rc::Rc;

fn failing_program() -> docgraph_core::Program {
    let mut builder = ProgramBuilder::new();
    let file = builder.source_file("src/a.ts");
    builder.declare(file, SyntaxKind::Variable, "x");
    builder
        .diagnostic(Diagnostic {
            severity: Severity::Error,
            code: 2322,
            message: "Type 'string' is not assignable to type 'number'.".to_string(),
            file_name: Some("src/a.ts".to_string()),
        })
        .diagnostic(Diagnostic::error(2304, "Cannot find name 'y'."))
        .diagnostic(Diagnostic {
            severity: Severity::Message,
            code: 6385,
            message: "'x' is deprecated.".to_string(),
            file_name: None,
        });
    builder.build()
}

#[test]
fn test_api_semantic_errors_abort_without_project() {
    let result = convert(&failing_program(), &["src/a.ts".to_string()], ConverterOptions::default());
    match result {
        Err(ConvertError::Semantic { errors }) => {
            let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
            assert_eq!(codes, vec![2322, 2304]);
            assert_eq!(
                errors[0].to_string(),
                "src/a.ts: error 2322: Type 'string' is not assignable to type 'number'."
            );
        }
        Err(other) => panic!("Expected a semantic error, got {other}"),
        Ok(_) => panic!("Expected a semantic error, got a project"),
    }
}

#[test]
fn test_api_failed_run_never_resolves_or_ends() {
    let mut converter = Converter::with_default_converters(ConverterOptions::default());
    let fired = Rc::new(RefCell::new(Vec::new()));
    for kind in [EventKind::FileBegin, EventKind::ResolveBegin, EventKind::Resolve, EventKind::End] {
        let fired = Rc::clone(&fired);
        converter.subscribe(kind, move |_, event| fired.borrow_mut().push(event.kind()));
    }

    assert!(converter.convert(&failing_program(), &["src/a.ts".to_string()]).is_err());
    assert!(fired.borrow().is_empty());
    assert_eq!(converter.state(), ConverterState::Failed);
}

#[test]
fn test_api_semantic_error_renders_as_report() {
    let error = convert(&failing_program(), &["src/a.ts".to_string()], ConverterOptions::default())
        .unwrap_err();
    assert_eq!(
        error.code().map(|c| c.to_string()).as_deref(),
        Some("converter::compilation_failed")
    );

    let rendered = format!("{:?}", Report::from(error));
    assert!(rendered.contains("compilation failed with 2 semantic error(s)"));
    assert!(rendered.contains("Cannot find name 'y'."));
}

#[test]
fn test_api_warnings_are_not_errors() {
    let mut builder = ProgramBuilder::new();
    let file = builder.source_file("src/a.ts");
    builder.declare(file, SyntaxKind::Unknown, "weird");
    builder.diagnostic(Diagnostic {
        severity: Severity::Warning,
        code: 6133,
        message: "'weird' is declared but its value is never read.".to_string(),
        file_name: None,
    });
    let program = builder.build();

    let mut converter = Converter::with_default_converters(ConverterOptions::default());
    let entries = ["src/a.ts".to_string(), r"src\missing.ts".to_string()];
    let project = converter.convert(&program, &entries).unwrap();
    assert!(project.is_empty());

    let warnings = converter.warnings();
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w.severity() == Some(miette::Severity::Warning)));
    assert_eq!(
        warnings[0],
        ConvertWarning::MissingEntryPoint {
            path: r"src\missing.ts".to_string()
        }
    );
    assert_eq!(warnings[0].to_string(), r"unable to locate entry point: src\missing.ts");
}

#[test]
fn test_api_empty_entry_points() {
    let program = ProgramBuilder::new().build();
    let project = convert(&program, &[], ConverterOptions::default()).unwrap();
    assert!(project.is_empty());
    assert!(project.children.is_empty());
}

#[test]
fn test_api_only_json_entry_points() {
    let mut builder = ProgramBuilder::new();
    builder.source_file("tsconfig.json");
    let program = builder.build();

    let mut converter = Converter::with_default_converters(ConverterOptions::default());
    let project = converter.convert(&program, &["tsconfig.json".to_string()]).unwrap();
    assert!(project.is_empty());
    assert!(converter.warnings().is_empty());
}
