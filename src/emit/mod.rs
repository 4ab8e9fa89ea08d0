//! C emission.
//!
//! Renders a generated [`TacUnit`] as a compilable C translation unit.
//! Program-scope names render directly; procedure-scope names render
//! through the current activation record. Calls allocate records on the
//! heap and store a computed-goto return address (`&&label`), which the
//! matching return jumps through after restoring the caller's record.

use crate::ast::{ArithmeticOperator, RelationalOperator, UnaryOperator};
use crate::ir::symbol_table::{DataType, EntryId, EntryType, ScopeId, SymbolTables};
use crate::ir::tac::{Label, Tac, TargetId};
use crate::ir::TacUnit;
use std::fmt::Write;

/// Renders the unit as a complete C translation unit.
pub fn render_c(unit: &TacUnit) -> String {
    let mut out = String::new();
    for instruction in &unit.instructions {
        render_instruction(&mut out, unit, instruction);
    }
    out
}

/// Renders the unit as a bare instruction listing (fragment mode).
///
/// Fragments are for debugging only; they use the same line syntax as the
/// full rendering but carry no preamble, so the result is not compilable.
pub fn render_listing(unit: &TacUnit) -> String {
    render_c(unit)
}

fn render_instruction(out: &mut String, unit: &TacUnit, instruction: &Tac) {
    let tables = &unit.tables;
    match instruction {
        Tac::Label(label) => {
            let _ = writeln!(out, "{label}: ;");
        }
        Tac::BinaryAssignment { op, lhs, rhs, dst } => {
            let _ = writeln!(
                out,
                "{} = {} {} {};",
                place(tables, *dst),
                place(tables, *lhs),
                arithmetic_c(*op),
                place(tables, *rhs)
            );
        }
        Tac::UnaryAssignment { op, operand, dst } => {
            let _ = writeln!(
                out,
                "{} = {}{};",
                place(tables, *dst),
                unary_c(*op),
                place(tables, *operand)
            );
        }
        Tac::BareAssignment { src, dst } => {
            let _ = writeln!(out, "{} = {};", place(tables, *dst), place(tables, *src));
        }
        Tac::ConditionalJump { op, lhs, rhs, target } => {
            let _ = writeln!(
                out,
                "if ({} {} {}) goto {};",
                place(tables, *lhs),
                relational_c(*op),
                place(tables, *rhs),
                target_label(unit, *target)
            );
        }
        Tac::UnconditionalJump { target } => {
            let _ = writeln!(out, "goto {};", target_label(unit, *target));
        }
        Tac::Print { place: value } => {
            let format = match tables.entry(*value).data_type {
                DataType::Real => "%f",
                _ => "%d",
            };
            let _ = writeln!(out, "printf(\"{format}\\n\", {});", place(tables, *value));
        }
        Tac::BeginProgram => {
            out.push_str("#include <stdio.h>\n");
            out.push_str("#include <stdlib.h>\n");
            out.push_str("#include <string.h>\n");
            out.push('\n');
            out.push_str("int main() {\n");
            out.push_str("void* current_activation_record = NULL, *tmp_activation_record = NULL;\n");
        }
        Tac::EndProgram => {
            out.push_str("}\n");
        }
        Tac::Definition { entry } => {
            let definition = tables.entry(*entry);
            let _ = writeln!(
                out,
                "{} {};",
                c_type(definition.data_type),
                definition.token.lexeme
            );
        }
        Tac::TemporaryDefinition { data_type, count } => {
            let _ = writeln!(
                out,
                "{} temporary_{}[{count}] = {{0}};",
                c_type(*data_type),
                data_type.name()
            );
        }
        Tac::ActivationRecordDefinition { procedure } => {
            render_activation_record(out, tables, *procedure);
        }
        Tac::Call {
            procedure,
            return_label,
        } => {
            render_call(out, tables, *procedure, *return_label);
        }
        Tac::Return { procedure } => {
            render_return(out, tables, *procedure);
        }
    }
}

fn render_activation_record(out: &mut String, tables: &SymbolTables, procedure: ScopeId) {
    let scope = tables.scope(procedure);
    let name = &scope.header.lexeme;

    let _ = writeln!(out, "struct activation_record_{name} {{");
    let _ = writeln!(out, "struct activation_record_{name}* control_link;");
    out.push_str("void* return_address;\n");

    if !scope.parameters.is_empty() {
        out.push_str("struct {\n");
        for &parameter in &scope.parameters {
            let entry = tables.entry(parameter);
            let _ = writeln!(out, "{} {};", c_type(entry.data_type), entry.token.lexeme);
        }
        out.push_str("} parameters;\n");
    }

    let locals: Vec<EntryId> = scope
        .entries()
        .iter()
        .copied()
        .filter(|&id| tables.entry(id).entry_type == EntryType::Declaration)
        .collect();
    if !locals.is_empty() {
        out.push_str("struct {\n");
        for local in locals {
            let entry = tables.entry(local);
            let _ = writeln!(out, "{} {};", c_type(entry.data_type), entry.token.lexeme);
        }
        out.push_str("} locals;\n");
    }

    for data_type in [DataType::Integer, DataType::Real] {
        let count = scope.max_count_of_temporary(data_type);
        if count > 0 {
            let _ = writeln!(
                out,
                "{} temporary_{}[{count}];",
                c_type(data_type),
                data_type.name()
            );
        }
    }

    out.push_str("};\n");
    let _ = writeln!(
        out,
        "typedef struct activation_record_{name} ActivationRecord_{name};"
    );
    let _ = writeln!(
        out,
        "typedef ActivationRecord_{name}* ActivationRecordPtr_{name};"
    );
}

fn render_call(out: &mut String, tables: &SymbolTables, procedure: ScopeId, return_label: Label) {
    let name = &tables.scope(procedure).header.lexeme;
    let _ = writeln!(
        out,
        "tmp_activation_record = malloc(sizeof(ActivationRecord_{name}));"
    );
    let _ = writeln!(
        out,
        "memset(tmp_activation_record, 0, sizeof(ActivationRecord_{name}));"
    );
    let _ = writeln!(
        out,
        "((ActivationRecordPtr_{name})tmp_activation_record)->control_link = current_activation_record;"
    );
    let _ = writeln!(
        out,
        "((ActivationRecordPtr_{name})tmp_activation_record)->return_address = &&{return_label};"
    );
    out.push_str("current_activation_record = tmp_activation_record;\n");
}

fn render_return(out: &mut String, tables: &SymbolTables, procedure: ScopeId) {
    let name = &tables.scope(procedure).header.lexeme;
    out.push_str("tmp_activation_record = current_activation_record;\n");
    let _ = writeln!(
        out,
        "current_activation_record = (void*)((ActivationRecordPtr_{name})tmp_activation_record)->control_link;"
    );
    out.push_str("{\n");
    let _ = writeln!(
        out,
        "void* return_address = ((ActivationRecordPtr_{name})tmp_activation_record)->return_address;"
    );
    out.push_str("free(tmp_activation_record);\n");
    out.push_str("goto *return_address;\n");
    out.push_str("}\n");
}

/// Renders an entry at a use site.
///
/// Constants render as their literal text. Program-scope names render
/// directly; procedure-scope names go through the current activation
/// record's parameters, locals, or temporary arrays.
fn place(tables: &SymbolTables, id: EntryId) -> String {
    let entry = tables.entry(id);
    if entry.entry_type == EntryType::Constant {
        return entry.token.lexeme.to_string();
    }

    let scope = tables.scope(entry.scope);
    if scope.is_program_scope() {
        match entry.entry_type {
            EntryType::Temporary => format!(
                "temporary_{}[{}]",
                entry.data_type.name(),
                entry.temporary_index() - 1
            ),
            _ => entry.token.lexeme.to_string(),
        }
    } else {
        let common = format!(
            "((ActivationRecordPtr_{})current_activation_record)->",
            scope.header.lexeme
        );
        match entry.entry_type {
            EntryType::Temporary => format!(
                "{common}temporary_{}[{}]",
                entry.data_type.name(),
                entry.temporary_index() - 1
            ),
            EntryType::Parameter => format!("({common}parameters).{}", entry.token.lexeme),
            _ => format!("({common}locals).{}", entry.token.lexeme),
        }
    }
}

fn target_label(unit: &TacUnit, target: TargetId) -> Label {
    unit.targets
        .get(target)
        .expect("all jump targets are patched before rendering")
}

fn c_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Integer => "int",
        DataType::Real => "double",
        DataType::Boolean => "char",
    }
}

fn arithmetic_c(op: ArithmeticOperator) -> &'static str {
    match op {
        ArithmeticOperator::Plus => "+",
        ArithmeticOperator::Minus => "-",
        ArithmeticOperator::Times => "*",
        ArithmeticOperator::Divide | ArithmeticOperator::Div => "/",
        ArithmeticOperator::Mod => "%",
    }
}

fn relational_c(op: RelationalOperator) -> &'static str {
    match op {
        RelationalOperator::Lt => "<",
        RelationalOperator::Gt => ">",
        RelationalOperator::Eq => "==",
        RelationalOperator::NotEq => "!=",
        RelationalOperator::LtEq => "<=",
        RelationalOperator::GtEq => ">=",
    }
}

fn unary_c(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Plus => "+",
        UnaryOperator::Minus => "-",
        UnaryOperator::Not => "!",
    }
}
