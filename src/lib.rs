//! Compiler front-end for a small Pascal-like imperative language.
//!
//! Source text is lexed, parsed into a typed AST, and translated by a
//! syntax-directed code generator into three-address code with backpatched
//! short-circuit control flow. The result renders as a C translation unit
//! that executes the original program when compiled against a C toolchain
//! supporting computed goto.
//!
//! # Compile
//!
//! ```
//! use minipascal::compile;
//!
//! let result = compile("PROGRAM p VAR x: INTEGER; BEGIN x := 1 + 2 END");
//! assert!(result.c_source.is_some());
//! assert!(result.diagnostics.is_empty());
//! ```
//!
//! # Parse only
//!
//! ```
//! use minipascal::parse;
//!
//! let result = parse("PROGRAM p BEGIN x := 1 END");
//! assert!(result.ast.is_some());
//! ```

use miette::Report;

pub mod ast;
pub mod codegen;
pub mod diag;
pub mod emit;
pub mod ir;
pub mod lexer;
pub mod parser;

// Re-export syntax foundation types.
pub use ast::{Program, Span};

// Re-export lexer types for convenience.
pub use diag::{Diag, DiagLabel, DiagSeverity, LabelRole};
pub use lexer::token::{Token, TokenKind, TokenValue};
pub use lexer::{Lexer, LexerResult, tokenize};

// Re-export parser types for convenience.
pub use parser::{ParseOutcome, ParseTree, Parser, StartSymbol};

// Re-export code generation and emission types for convenience.
pub use codegen::{CodegenOutcome, generate, generate_tree};
pub use emit::{render_c, render_listing};
pub use ir::TacUnit;

/// Result of parsing with rendered diagnostics.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed program AST, or `None` if parsing failed.
    pub ast: Option<Program>,
    /// The grammar reduction trace.
    pub reductions: Vec<String>,
    /// Combined lexer and parser diagnostics.
    pub diagnostics: Vec<Report>,
}

/// Parses source text end-to-end (lexing + parsing).
///
/// This guarantees parser input comes from the lexer and merges
/// diagnostics from both phases.
pub fn parse(source: &str) -> ParseResult {
    let lexed = lexer::tokenize(source);
    let outcome = Parser::new(&lexed.tokens).parse();

    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(outcome.diagnostics.iter().cloned());
    let reductions = outcome.reductions;
    let ast = match outcome.tree {
        Some(ParseTree::Program(program)) => Some(program),
        _ => None,
    };

    let source_file = diag::SourceFile::new(source);
    ParseResult {
        ast,
        reductions,
        diagnostics: diag::convert_diagnostics_to_reports(&diagnostics, &source_file),
    }
}

/// Result of a full compilation with rendered diagnostics.
#[derive(Debug)]
pub struct CompileResult {
    /// The generated intermediate code, if compilation succeeded.
    pub unit: Option<TacUnit>,
    /// The rendered C translation unit, if compilation succeeded.
    pub c_source: Option<String>,
    /// Combined diagnostics from every phase.
    pub diagnostics: Vec<Report>,
}

/// Compiles source text to a C translation unit.
///
/// Runs the whole pipeline: lexing, parsing, semantic analysis with code
/// generation, and C rendering. Any error diagnostic leaves `c_source`
/// empty.
pub fn compile(source: &str) -> CompileResult {
    compile_internal(source, false)
}

/// Compiles with relaxed semantic analysis: undeclared identifiers are
/// auto-inserted instead of reported. Intended for testing fragments.
pub fn compile_relaxed(source: &str) -> CompileResult {
    compile_internal(source, true)
}

fn compile_internal(source: &str, relaxed: bool) -> CompileResult {
    let source_file = diag::SourceFile::new(source);

    let lexed = lexer::tokenize(source);
    let outcome = Parser::new(&lexed.tokens).parse();

    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(outcome.diagnostics);

    let Some(ParseTree::Program(program)) = outcome.tree else {
        return CompileResult {
            unit: None,
            c_source: None,
            diagnostics: diag::convert_diagnostics_to_reports(&diagnostics, &source_file),
        };
    };

    let generated = codegen::generate(&program, relaxed);
    diagnostics.extend(generated.diagnostics);

    let has_errors = diag::has_errors(&diagnostics);
    let unit = generated.unit.filter(|_| !has_errors);
    let c_source = unit.as_ref().map(emit::render_c);

    CompileResult {
        unit,
        c_source,
        diagnostics: diag::convert_diagnostics_to_reports(&diagnostics, &source_file),
    }
}
