//! Command-line compiler driver.
//!
//! For an input `foo.pas` the driver writes `foo.tokens`,
//! `foo.reductions`, `foo.syntax.dot`, and, when code generation runs,
//! `foo.symbols` and `foo.compiled` into the output directory.
//! Diagnostics print to stderr; the exit code is nonzero when any error
//! was reported.

use clap::{Parser as ArgParser, ValueEnum};
use minipascal::ast::dot;
use minipascal::diag::{self, Diag, SourceFile};
use minipascal::lexer::token::TokenKind;
use minipascal::parser::{ParseTree, Parser, StartSymbol};
use minipascal::{codegen, emit, lexer};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, ArgParser)]
#[command(
    name = "minipascalc",
    version,
    about = "Compiler for a small Pascal-like language, emitting C via three-address code"
)]
struct Args {
    /// Source file to compile.
    input: PathBuf,

    /// Directory where the output artifacts are written.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Print the grammar reduction trace to stderr.
    #[arg(long)]
    debug: bool,

    /// Auto-insert undeclared identifiers instead of reporting them.
    #[arg(long)]
    semantic_analysis_relaxed: bool,

    /// Grammar start symbol. Fragment starts (statement, expression) are
    /// for debugging and produce a TAC listing instead of a C program.
    #[arg(long, value_enum, default_value_t = StartArg::Program)]
    start: StartArg,

    /// Stop after parsing and skip code generation.
    #[arg(long)]
    skip_code_generation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StartArg {
    Program,
    Statement,
    Expression,
}

impl From<StartArg> for StartSymbol {
    fn from(start: StartArg) -> Self {
        match start {
            StartArg::Program => StartSymbol::Program,
            StartArg::Statement => StartSymbol::Statement,
            StartArg::Expression => StartSymbol::Expression,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> miette::Result<bool> {
    let source = fs::read_to_string(&args.input)
        .map_err(|error| miette::miette!("cannot read {}: {error}", args.input.display()))?;
    fs::create_dir_all(&args.output)
        .map_err(|error| miette::miette!("cannot create {}: {error}", args.output.display()))?;

    let stem = args
        .input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("out");
    let artifact = |extension: &str| args.output.join(format!("{stem}.{extension}"));

    let mut diagnostics: Vec<Diag> = Vec::new();

    // Lexing.
    let lexed = lexer::tokenize(&source);
    diagnostics.extend(lexed.diagnostics.iter().cloned());
    let token_dump: String = lexed
        .tokens
        .iter()
        .filter(|token| token.kind != TokenKind::Eof)
        .map(|token| format!("{token}\n"))
        .collect();
    write_file(&artifact("tokens"), &token_dump)?;

    // Parsing.
    let outcome = Parser::new(&lexed.tokens).parse_start(args.start.into());
    diagnostics.extend(outcome.diagnostics.iter().cloned());
    if args.debug {
        for reduction in &outcome.reductions {
            eprintln!("{reduction}");
        }
    }
    let reduction_dump: String = outcome
        .reductions
        .iter()
        .map(|reduction| format!("{reduction}\n"))
        .collect();
    write_file(&artifact("reductions"), &reduction_dump)?;

    let Some(tree) = &outcome.tree else {
        report_diagnostics(&source, &args.input, &diagnostics);
        return Ok(false);
    };

    let dot_text = match tree {
        ParseTree::Program(program) => dot::program_to_dot(program),
        ParseTree::Statement(statement) => dot::statement_to_dot(statement),
        ParseTree::Expression(expression) => dot::expression_to_dot(expression),
    };
    write_file(&artifact("syntax.dot"), &dot_text)?;

    // Code generation and emission.
    if !args.skip_code_generation {
        let generated = codegen::generate_tree(tree, args.semantic_analysis_relaxed);
        diagnostics.extend(generated.diagnostics.iter().cloned());

        if let Some(unit) = &generated.unit {
            write_file(&artifact("symbols"), &unit.tables.dump(unit.tables.root()))?;
            let compiled = match tree {
                ParseTree::Program(_) => emit::render_c(unit),
                _ => emit::render_listing(unit),
            };
            write_file(&artifact("compiled"), &compiled)?;
        }
    }

    report_diagnostics(&source, &args.input, &diagnostics);
    Ok(!diag::has_errors(&diagnostics))
}

fn report_diagnostics(source: &str, input: &Path, diagnostics: &[Diag]) {
    if diagnostics.is_empty() {
        return;
    }
    let source_file = SourceFile::with_name(source, input.display().to_string());
    for report in diag::convert_diagnostics_to_reports(diagnostics, &source_file) {
        eprintln!("{report:?}");
    }
}

fn write_file(path: &Path, contents: &str) -> miette::Result<()> {
    fs::write(path, contents)
        .map_err(|error| miette::miette!("cannot write {}: {error}", path.display()))
}
