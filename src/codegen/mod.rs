//! Intermediate code generation.
//!
//! A syntax-directed translator over the AST. Numeric expressions
//! synthesize an address (`place`) and a type; boolean expressions
//! synthesize truelist/falselist jump sets that are backpatched once their
//! targets are known; statements synthesize the nextlist of jumps to their
//! textual successor. Semantic failures accumulate as diagnostics and the
//! run fails at the end, so one pass reports every problem.

use crate::ast::{
    ArithmeticOperator, BinaryOperator, Declaration, Expression, LogicalOperator, Procedure,
    Program, RelationalOperator, Span, Statement, TypeName, UnaryOperator,
};
use crate::diag::{self, Diag};
use crate::ir::symbol_table::{DataType, EntryId, EntryType, ScopeId, SymbolTables};
use crate::ir::tac::{JumpTargets, Label, Tac, TargetId};
use crate::ir::TacUnit;
use crate::lexer::token::{Token, TokenKind, TokenValue};
use crate::parser::ParseTree;
use std::fmt;

/// Outcome of code generation, always carrying diagnostics.
///
/// The unit is produced only when no error was reported; warnings (for
/// example shadowing) are allowed alongside a successful unit.
#[derive(Debug)]
pub struct CodegenOutcome {
    /// The generated intermediate code, if generation succeeded.
    pub unit: Option<TacUnit>,
    /// All diagnostics collected during generation.
    pub diagnostics: Vec<Diag>,
}

impl CodegenOutcome {
    /// Returns true if generation produced a unit.
    pub fn is_success(&self) -> bool {
        self.unit.is_some()
    }
}

/// Generates three-address code for a whole program.
pub fn generate(program: &Program, relaxed: bool) -> CodegenOutcome {
    let mut generator = CodeGenerator::new(SymbolTables::new(program.name.clone()), relaxed);
    generator.visit_program(program);
    generator.finish()
}

/// Generates three-address code for any parse tree.
///
/// Statement and expression fragments translate against a synthetic root
/// scope; their leftover jump lists are patched to a final label so the
/// listing contains no unresolved targets. Fragment output is a TAC
/// listing for debugging, never a runnable translation unit.
pub fn generate_tree(tree: &ParseTree, relaxed: bool) -> CodegenOutcome {
    match tree {
        ParseTree::Program(program) => generate(program, relaxed),
        ParseTree::Statement(statement) => {
            let mut generator = fragment_generator(relaxed);
            let pending = generator.visit_statement(statement);
            generator.close_fragment(pending);
            generator.finish()
        }
        ParseTree::Expression(expression) => {
            let mut generator = fragment_generator(relaxed);
            let attrs = generator.visit_expression(expression);
            generator.free_if_temporary(attrs.place);
            let mut pending = attrs.truelist;
            pending.extend(attrs.falselist);
            generator.close_fragment(pending);
            generator.finish()
        }
    }
}

fn fragment_generator(relaxed: bool) -> CodeGenerator {
    let header = Token::new(TokenKind::Id, "fragment", 0, 0..0);
    CodeGenerator::new(SymbolTables::new(header), relaxed)
}

fn data_type_of(type_name: TypeName) -> DataType {
    match type_name {
        TypeName::Integer => DataType::Integer,
        TypeName::Real => DataType::Real,
    }
}

/// Attributes synthesized for one expression node.
#[derive(Debug, Default)]
struct ExprAttrs {
    /// The address holding the expression's value, for numeric expressions.
    place: Option<EntryId>,
    /// The synthesized type.
    data_type: Option<DataType>,
    /// Unpatched jumps taken when the expression evaluates true.
    truelist: Vec<TargetId>,
    /// Unpatched jumps taken when the expression evaluates false.
    falselist: Vec<TargetId>,
}

struct CodeGenerator {
    tables: SymbolTables,
    current_scope: ScopeId,
    instructions: Vec<Tac>,
    targets: JumpTargets,
    next_label: u32,
    diagnostics: Vec<Diag>,
    relaxed: bool,
}

impl CodeGenerator {
    fn new(tables: SymbolTables, relaxed: bool) -> Self {
        let current_scope = tables.root();
        Self {
            tables,
            current_scope,
            instructions: Vec::new(),
            targets: JumpTargets::new(),
            next_label: 0,
            diagnostics: Vec::new(),
            relaxed,
        }
    }

    fn finish(self) -> CodegenOutcome {
        let CodeGenerator {
            tables,
            instructions,
            targets,
            diagnostics,
            ..
        } = self;
        if diag::has_errors(&diagnostics) {
            CodegenOutcome {
                unit: None,
                diagnostics,
            }
        } else {
            CodegenOutcome {
                unit: Some(TacUnit {
                    instructions,
                    targets,
                    tables,
                }),
                diagnostics,
            }
        }
    }

    // ------------------------------------------------------------------
    // Emission primitives
    // ------------------------------------------------------------------

    fn new_label(&mut self) -> Label {
        self.next_label += 1;
        Label(self.next_label)
    }

    fn emit(&mut self, instruction: Tac) {
        self.instructions.push(instruction);
    }

    /// 1-based index of the next instruction slot.
    ///
    /// Control flow never references quad indices (labels do that job);
    /// this is only an anchor for later definition insertions.
    fn next_quad(&self) -> usize {
        self.instructions.len() + 1
    }

    /// Inserts an instruction at a list index, shifting later code.
    ///
    /// Safe with respect to backpatching: jump lists hold target-arena
    /// indices, not quad indices.
    fn insert_instruction(&mut self, index: usize, instruction: Tac) {
        self.instructions.insert(index, instruction);
    }

    /// Allocates a fresh label and emits it at the current position.
    fn emit_label_here(&mut self) -> Label {
        let label = self.new_label();
        self.emit(Tac::Label(label));
        label
    }

    /// Emits an unconditional jump to an already-known label.
    fn emit_jump_to(&mut self, label: Label) {
        let target = self.targets.resolved(label);
        self.emit(Tac::UnconditionalJump { target });
    }

    /// Fills every jump in `list` with `label`.
    fn backpatch(&mut self, list: &[TargetId], label: Label) {
        for &target in list {
            self.targets.patch(target, label);
        }
    }

    fn free_if_temporary(&mut self, place: Option<EntryId>) {
        if let Some(place) = place {
            let entry = self.tables.entry(place);
            if entry.entry_type == EntryType::Temporary {
                let data_type = entry.data_type;
                self.tables.free_temporary(self.current_scope, data_type);
            }
        }
    }

    fn report(&mut self, warning: Option<Diag>) {
        if let Some(diag) = warning {
            self.diagnostics.push(diag);
        }
    }

    // ------------------------------------------------------------------
    // Name resolution
    // ------------------------------------------------------------------

    fn resolve_variable(&mut self, token: &Token) -> Option<EntryId> {
        if let Some(entry) = self.tables.lookup_entry(self.current_scope, &token.lexeme) {
            return Some(entry);
        }
        if self.relaxed {
            let (entry, warning) = self.tables.insert_entry(
                self.current_scope,
                token.clone(),
                DataType::Real,
                EntryType::Declaration,
            );
            self.report(warning);
            return Some(entry);
        }
        self.diagnostics.push(
            Diag::error(format!(
                "identifier '{}' used before declaration",
                token.lexeme
            ))
            .with_primary_label(token.span.clone(), "not declared")
            .with_code("semantic::undeclared"),
        );
        None
    }

    fn resolve_procedure(&mut self, token: &Token) -> Option<ScopeId> {
        if let Some(procedure) = self.tables.lookup_procedure(self.current_scope, &token.lexeme) {
            return Some(procedure);
        }
        if self.relaxed {
            let (procedure, warning) = self
                .tables
                .insert_procedure(self.current_scope, token.clone());
            self.report(warning);
            return Some(procedure);
        }
        self.diagnostics.push(
            Diag::error(format!(
                "procedure '{}' called before definition",
                token.lexeme
            ))
            .with_primary_label(token.span.clone(), "not defined")
            .with_code("semantic::undeclared_procedure"),
        );
        None
    }

    fn insert_constant(&mut self, token: &Token, data_type: DataType) -> EntryId {
        let (entry, _) = self.tables.insert_entry(
            self.current_scope,
            token.clone(),
            data_type,
            EntryType::Constant,
        );
        entry
    }

    fn synthetic_constant(&mut self, value: i64) -> EntryId {
        let token = Token::with_value(
            TokenKind::IntConst,
            format!("{value}").as_str(),
            TokenValue::Int(value),
            0,
            0..0,
        );
        self.insert_constant(&token, DataType::Integer)
    }

    // ------------------------------------------------------------------
    // Type checks
    // ------------------------------------------------------------------

    fn require_arithmetic_operand(&mut self, attrs: &ExprAttrs, span: Span, op: impl fmt::Display) {
        if let Some(data_type) = attrs.data_type
            && !data_type.is_arithmetic()
        {
            self.diagnostics.push(
                Diag::error(format!("operator '{op}' requires arithmetic operands"))
                    .with_primary_label(span, format!("this operand has type {data_type}"))
                    .with_code("semantic::nonarithmetic_operand"),
            );
        }
    }

    fn require_boolean_operand(&mut self, attrs: &ExprAttrs, span: Span, op: impl fmt::Display) {
        if let Some(data_type) = attrs.data_type
            && data_type != DataType::Boolean
        {
            self.diagnostics.push(
                Diag::error(format!("operator '{op}' requires boolean operands"))
                    .with_primary_label(span, format!("this operand has type {data_type}"))
                    .with_code("semantic::nonboolean_operand"),
            );
        }
    }

    fn require_boolean_condition(&mut self, attrs: &ExprAttrs, span: Span, construct: &str) {
        if let Some(data_type) = attrs.data_type
            && data_type != DataType::Boolean
        {
            self.diagnostics.push(
                Diag::error(format!("condition of {construct} must be boolean"))
                    .with_primary_label(span, format!("this condition has type {data_type}"))
                    .with_code("semantic::nonboolean_condition"),
            );
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn visit_expression(&mut self, expression: &Expression) -> ExprAttrs {
        match expression {
            Expression::Binary { op, lhs, rhs, .. } => match op {
                BinaryOperator::Arithmetic(op) => {
                    let left = self.visit_expression(lhs);
                    let right = self.visit_expression(rhs);
                    self.arithmetic_expression(*op, left, lhs, right, rhs)
                }
                BinaryOperator::Relational(op) => {
                    let left = self.visit_expression(lhs);
                    let right = self.visit_expression(rhs);
                    self.relational_expression(*op, left, lhs, right, rhs)
                }
                BinaryOperator::Logical(op) => {
                    let left = self.visit_expression(lhs);
                    // The marker between the operands is the patch target
                    // for the left list that continues into the right
                    // operand: falselist for OR, truelist for AND.
                    let marker = self.emit_label_here();
                    let right = self.visit_expression(rhs);
                    self.logical_expression(*op, left, lhs, right, rhs, marker)
                }
            },
            Expression::Unary { op, operand, .. } => self.visit_unary(*op, operand),
            Expression::Terminal(token) => self.visit_terminal(token),
        }
    }

    fn arithmetic_expression(
        &mut self,
        op: ArithmeticOperator,
        left: ExprAttrs,
        lhs: &Expression,
        right: ExprAttrs,
        rhs: &Expression,
    ) -> ExprAttrs {
        self.require_arithmetic_operand(&left, lhs.span(), op);
        self.require_arithmetic_operand(&right, rhs.span(), op);

        self.free_if_temporary(left.place);
        self.free_if_temporary(right.place);

        let result_type =
            if left.data_type == Some(DataType::Real) || right.data_type == Some(DataType::Real) {
                DataType::Real
            } else {
                DataType::Integer
            };
        let dst = self.tables.new_temporary(self.current_scope, result_type);

        if let (Some(lhs), Some(rhs)) = (left.place, right.place) {
            self.emit(Tac::BinaryAssignment { op, lhs, rhs, dst });
        }

        ExprAttrs {
            place: Some(dst),
            data_type: Some(result_type),
            ..Default::default()
        }
    }

    fn relational_expression(
        &mut self,
        op: RelationalOperator,
        left: ExprAttrs,
        lhs: &Expression,
        right: ExprAttrs,
        rhs: &Expression,
    ) -> ExprAttrs {
        self.require_arithmetic_operand(&left, lhs.span(), op);
        self.require_arithmetic_operand(&right, rhs.span(), op);

        self.free_if_temporary(left.place);
        self.free_if_temporary(right.place);

        let mut attrs = ExprAttrs {
            data_type: Some(DataType::Boolean),
            ..Default::default()
        };
        if let (Some(lhs), Some(rhs)) = (left.place, right.place) {
            let on_true = self.targets.placeholder();
            self.emit(Tac::ConditionalJump {
                op,
                lhs,
                rhs,
                target: on_true,
            });
            let on_false = self.targets.placeholder();
            self.emit(Tac::UnconditionalJump { target: on_false });
            attrs.truelist = vec![on_true];
            attrs.falselist = vec![on_false];
        }
        attrs
    }

    fn logical_expression(
        &mut self,
        op: LogicalOperator,
        left: ExprAttrs,
        lhs: &Expression,
        right: ExprAttrs,
        rhs: &Expression,
        marker: Label,
    ) -> ExprAttrs {
        self.require_boolean_operand(&left, lhs.span(), op);
        self.require_boolean_operand(&right, rhs.span(), op);

        let mut attrs = ExprAttrs {
            data_type: Some(DataType::Boolean),
            ..Default::default()
        };
        match op {
            LogicalOperator::Or => {
                self.backpatch(&left.falselist, marker);
                attrs.truelist = left.truelist;
                attrs.truelist.extend(right.truelist);
                attrs.falselist = right.falselist;
            }
            LogicalOperator::And => {
                self.backpatch(&left.truelist, marker);
                attrs.truelist = right.truelist;
                attrs.falselist = left.falselist;
                attrs.falselist.extend(right.falselist);
            }
        }
        attrs
    }

    fn visit_unary(&mut self, op: UnaryOperator, operand_expr: &Expression) -> ExprAttrs {
        let operand = self.visit_expression(operand_expr);
        match op {
            UnaryOperator::Not => {
                self.require_boolean_operand(&operand, operand_expr.span(), op);
                ExprAttrs {
                    place: None,
                    data_type: Some(DataType::Boolean),
                    truelist: operand.falselist,
                    falselist: operand.truelist,
                }
            }
            UnaryOperator::Plus | UnaryOperator::Minus => {
                self.require_arithmetic_operand(&operand, operand_expr.span(), op);
                self.free_if_temporary(operand.place);

                // Identity plus still allocates a result temporary.
                let result_type = operand
                    .data_type
                    .filter(|data_type| data_type.is_arithmetic())
                    .unwrap_or(DataType::Integer);
                let dst = self.tables.new_temporary(self.current_scope, result_type);
                if let Some(operand) = operand.place {
                    self.emit(Tac::UnaryAssignment { op, operand, dst });
                }
                ExprAttrs {
                    place: Some(dst),
                    data_type: Some(result_type),
                    ..Default::default()
                }
            }
        }
    }

    fn visit_terminal(&mut self, token: &Token) -> ExprAttrs {
        match token.kind {
            TokenKind::Id => match self.resolve_variable(token) {
                Some(entry) => ExprAttrs {
                    place: Some(entry),
                    data_type: Some(self.tables.entry(entry).data_type),
                    ..Default::default()
                },
                None => ExprAttrs::default(),
            },
            TokenKind::IntConst => {
                let place = self.insert_constant(token, DataType::Integer);
                ExprAttrs {
                    place: Some(place),
                    data_type: Some(DataType::Integer),
                    ..Default::default()
                }
            }
            TokenKind::RealConst => {
                let place = self.insert_constant(token, DataType::Real);
                ExprAttrs {
                    place: Some(place),
                    data_type: Some(DataType::Real),
                    ..Default::default()
                }
            }
            TokenKind::True => {
                let place = self.insert_constant(token, DataType::Boolean);
                let target = self.targets.placeholder();
                self.emit(Tac::UnconditionalJump { target });
                ExprAttrs {
                    place: Some(place),
                    data_type: Some(DataType::Boolean),
                    truelist: vec![target],
                    falselist: Vec::new(),
                }
            }
            TokenKind::False => {
                let place = self.insert_constant(token, DataType::Boolean);
                let target = self.targets.placeholder();
                self.emit(Tac::UnconditionalJump { target });
                ExprAttrs {
                    place: Some(place),
                    data_type: Some(DataType::Boolean),
                    truelist: Vec::new(),
                    falselist: vec![target],
                }
            }
            _ => ExprAttrs::default(),
        }
    }

    /// Turns a boolean expression's jump lists into a stored value.
    ///
    /// Emits the diamond `Lt: dst = 1; goto Le; Lf: dst = 0; Le:` with the
    /// truelist patched to `Lt` and the falselist to `Lf`, leaving a plain
    /// numeric attribute in a fresh temporary.
    fn materialize_boolean_value(&mut self, attrs: ExprAttrs, data_type: DataType) -> ExprAttrs {
        let dst = self.tables.new_temporary(self.current_scope, data_type);

        let true_marker = self.emit_label_here();
        self.backpatch(&attrs.truelist, true_marker);
        let one = self.synthetic_constant(1);
        self.emit(Tac::BareAssignment { src: one, dst });
        let exit = self.targets.placeholder();
        self.emit(Tac::UnconditionalJump { target: exit });

        let false_marker = self.emit_label_here();
        self.backpatch(&attrs.falselist, false_marker);
        let zero = self.synthetic_constant(0);
        self.emit(Tac::BareAssignment { src: zero, dst });

        let end_marker = self.emit_label_here();
        self.targets.patch(exit, end_marker);

        ExprAttrs {
            place: Some(dst),
            data_type: Some(data_type),
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn visit_statement(&mut self, statement: &Statement) -> Vec<TargetId> {
        match statement {
            Statement::Compound { statements, .. } => {
                let mut next = Vec::new();
                for child in statements {
                    if !next.is_empty() {
                        let marker = self.emit_label_here();
                        self.backpatch(&next, marker);
                    }
                    next = self.visit_statement(child);
                }
                next
            }
            Statement::Assignment { target, value, .. } => self.visit_assignment(target, value),
            Statement::If {
                condition, body, ..
            } => {
                let cond = self.visit_expression(condition);
                self.require_boolean_condition(&cond, condition.span(), "IF");
                let marker = self.emit_label_here();
                let body_next = self.visit_statement(body);
                self.backpatch(&cond.truelist, marker);

                let mut next = cond.falselist;
                next.extend(body_next);
                next
            }
            Statement::IfElse {
                condition,
                then_body,
                else_body,
                ..
            } => {
                let cond = self.visit_expression(condition);
                self.require_boolean_condition(&cond, condition.span(), "IF");
                let then_marker = self.emit_label_here();
                let then_next = self.visit_statement(then_body);
                let exit = self.targets.placeholder();
                self.emit(Tac::UnconditionalJump { target: exit });
                let else_marker = self.emit_label_here();
                let else_next = self.visit_statement(else_body);

                self.backpatch(&cond.truelist, then_marker);
                self.backpatch(&cond.falselist, else_marker);

                let mut next = then_next;
                next.extend(else_next);
                next.push(exit);
                next
            }
            Statement::While {
                condition, body, ..
            } => {
                let condition_marker = self.emit_label_here();
                let cond = self.visit_expression(condition);
                self.require_boolean_condition(&cond, condition.span(), "WHILE");
                let body_marker = self.emit_label_here();
                let body_next = self.visit_statement(body);

                self.backpatch(&body_next, condition_marker);
                self.backpatch(&cond.truelist, body_marker);
                self.emit_jump_to(condition_marker);

                cond.falselist
            }
            Statement::ProcedureCall {
                name, arguments, ..
            } => self.visit_call(name, arguments),
            Statement::Print { value, .. } => {
                let mut attrs = self.visit_expression(value);
                if attrs.data_type == Some(DataType::Boolean) {
                    attrs = self.materialize_boolean_value(attrs, DataType::Integer);
                }
                if let Some(place) = attrs.place {
                    self.emit(Tac::Print { place });
                }
                self.free_if_temporary(attrs.place);
                Vec::new()
            }
        }
    }

    fn visit_assignment(&mut self, target: &Token, value: &Expression) -> Vec<TargetId> {
        let mut attrs = self.visit_expression(value);
        let entry = self.resolve_variable(target);
        let destination_type = entry.map(|entry| self.tables.entry(entry).data_type);

        // A boolean rvalue is consumed for its value: thread its jump
        // lists through 1/0 stores into a temporary of the destination's
        // type before the final assignment.
        if attrs.data_type == Some(DataType::Boolean) {
            let data_type = destination_type
                .filter(|data_type| data_type.is_arithmetic())
                .unwrap_or(DataType::Integer);
            attrs = self.materialize_boolean_value(attrs, data_type);
        }

        if let (Some(expected), Some(actual)) = (destination_type, attrs.data_type)
            && expected != actual
        {
            self.diagnostics.push(
                Diag::error(format!(
                    "type mismatch in assignment to '{}'",
                    target.lexeme
                ))
                .with_primary_label(value.span(), format!("this value has type {actual}"))
                .with_secondary_label(target.span.clone(), format!("declared as {expected}"))
                .with_code("semantic::assignment_type_mismatch"),
            );
        }

        if let (Some(src), Some(dst)) = (attrs.place, entry) {
            self.emit(Tac::BareAssignment { src, dst });
        }
        self.free_if_temporary(attrs.place);
        Vec::new()
    }

    fn visit_call(&mut self, name: &Token, arguments: &[Expression]) -> Vec<TargetId> {
        let mut evaluated: Vec<(ExprAttrs, Span)> = Vec::new();
        for argument in arguments {
            let mut attrs = self.visit_expression(argument);
            if attrs.data_type == Some(DataType::Boolean) {
                attrs = self.materialize_boolean_value(attrs, DataType::Integer);
            }
            evaluated.push((attrs, argument.span()));
        }

        let Some(procedure) = self.resolve_procedure(name) else {
            for (attrs, _) in &evaluated {
                self.free_if_temporary(attrs.place);
            }
            return Vec::new();
        };

        let parameters = self.tables.scope(procedure).parameters.clone();
        if parameters.len() != evaluated.len() {
            self.diagnostics.push(
                Diag::error(format!(
                    "procedure '{}' expects {} argument(s), {} given",
                    name.lexeme,
                    parameters.len(),
                    evaluated.len()
                ))
                .with_primary_label(name.span.clone(), "in this call")
                .with_code("semantic::arity_mismatch"),
            );
        }

        let return_label = self.new_label();
        self.emit(Tac::Call {
            procedure,
            return_label,
        });

        for (index, (attrs, span)) in evaluated.iter().enumerate() {
            if let Some(&parameter) = parameters.get(index) {
                let expected = self.tables.entry(parameter).data_type;
                if let Some(actual) = attrs.data_type
                    && actual != expected
                {
                    self.diagnostics.push(
                        Diag::error(format!(
                            "argument {} of call to '{}' has type {actual}, expected {expected}",
                            index + 1,
                            name.lexeme
                        ))
                        .with_primary_label(span.clone(), "mismatched argument")
                        .with_code("semantic::argument_type_mismatch"),
                    );
                }
                if let Some(src) = attrs.place {
                    self.emit(Tac::BareAssignment {
                        src,
                        dst: parameter,
                    });
                }
            }
            self.free_if_temporary(attrs.place);
        }

        if let Some(begin) = self.tables.scope(procedure).begin_code_label {
            self.emit_jump_to(begin);
        }
        self.emit(Tac::Label(return_label));
        Vec::new()
    }

    // ------------------------------------------------------------------
    // Declarative nodes
    // ------------------------------------------------------------------

    fn insert_declarations(&mut self, declarations: &[Declaration], entry_type: EntryType) {
        for declaration in declarations {
            let data_type = data_type_of(declaration.type_name);
            for identifier in &declaration.identifiers {
                let (entry, warning) = self.tables.insert_entry(
                    self.current_scope,
                    identifier.clone(),
                    data_type,
                    entry_type,
                );
                self.report(warning);
                if entry_type == EntryType::Parameter {
                    self.tables
                        .scope_mut(self.current_scope)
                        .parameters
                        .push(entry);
                }
            }
        }
    }

    fn visit_procedure(&mut self, procedure: &Procedure) {
        let (scope, warning) = self
            .tables
            .insert_procedure(self.current_scope, procedure.name.clone());
        self.report(warning);

        let begin = self.emit_label_here();
        self.tables.scope_mut(scope).begin_code_label = Some(begin);

        let enclosing = self.current_scope;
        self.current_scope = scope;

        self.insert_declarations(&procedure.parameters, EntryType::Parameter);
        self.insert_declarations(&procedure.declarations, EntryType::Declaration);

        let body_next = self.visit_statement(&procedure.body);

        // The activation-record layout is complete only now that the body
        // has allocated its temporaries; its definition belongs ahead of
        // all code, right after the translation-unit preamble.
        self.insert_instruction(1, Tac::ActivationRecordDefinition { procedure: scope });

        if !body_next.is_empty() {
            let end_marker = self.emit_label_here();
            self.backpatch(&body_next, end_marker);
        }
        self.emit(Tac::Return { procedure: scope });

        self.current_scope = enclosing;
    }

    fn visit_program(&mut self, program: &Program) {
        self.emit(Tac::BeginProgram);

        self.insert_declarations(&program.declarations, EntryType::Declaration);
        let root = self.tables.root();
        let declared: Vec<EntryId> = self
            .tables
            .scope(root)
            .entries()
            .iter()
            .copied()
            .filter(|&id| self.tables.entry(id).entry_type == EntryType::Declaration)
            .collect();
        for entry in declared {
            self.emit(Tac::Definition { entry });
        }

        // Procedure bodies are emitted ahead of the main code; execution
        // starts past them.
        let over_procedures = self.targets.placeholder();
        self.emit(Tac::UnconditionalJump {
            target: over_procedures,
        });

        for procedure in &program.procedures {
            self.visit_procedure(procedure);
        }

        let begin_marker = self.emit_label_here();
        self.backpatch(&[over_procedures], begin_marker);

        let body_index = self.next_quad() - 1;
        let body_next = self.visit_statement(&program.body);

        let mut insert_at = body_index;
        for data_type in [DataType::Integer, DataType::Real] {
            let count = self.tables.scope(root).max_count_of_temporary(data_type);
            if count > 0 {
                self.insert_instruction(insert_at, Tac::TemporaryDefinition { data_type, count });
                insert_at += 1;
            }
        }

        if !body_next.is_empty() {
            let end_marker = self.emit_label_here();
            self.backpatch(&body_next, end_marker);
        }
        self.emit(Tac::EndProgram);
    }

    fn close_fragment(&mut self, pending: Vec<TargetId>) {
        if !pending.is_empty() {
            let end_marker = self.emit_label_here();
            self.backpatch(&pending, end_marker);
        }
    }
}
