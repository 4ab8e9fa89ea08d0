//! Graphviz DOT rendering of the syntax tree.
//!
//! The driver writes this text next to the other compilation artifacts; an
//! external `dot(1)` run turns it into an image. Node labels follow the
//! `tag (leaf)` convention of the tree dump.

use crate::ast::{Declaration, Expression, Procedure, Program, Statement};

/// Renders a whole program as a DOT graph.
pub fn program_to_dot(program: &Program) -> String {
    let mut builder = DotBuilder::new();
    let root = builder.node(&format!("program ({})", program.name.lexeme));

    let decls = builder.child(root, "declarations");
    for decl in &program.declarations {
        builder.declaration(decls, decl);
    }

    let procs = builder.child(root, "procedures");
    for procedure in &program.procedures {
        builder.procedure(procs, procedure);
    }

    builder.statement(root, &program.body);
    builder.finish()
}

/// Renders a single statement as a DOT graph (fragment mode).
pub fn statement_to_dot(statement: &Statement) -> String {
    let mut builder = DotBuilder::new();
    let root = builder.node("statement");
    builder.statement(root, statement);
    builder.finish()
}

/// Renders a single expression as a DOT graph (fragment mode).
pub fn expression_to_dot(expression: &Expression) -> String {
    let mut builder = DotBuilder::new();
    let root = builder.node("expression");
    builder.expression(root, expression);
    builder.finish()
}

struct DotBuilder {
    lines: Vec<String>,
    next_id: usize,
}

impl DotBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            next_id: 0,
        }
    }

    fn node(&mut self, label: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.lines
            .push(format!("  n{id} [label=\"{}\"];", escape(label)));
        id
    }

    fn edge(&mut self, parent: usize, child: usize) {
        self.lines.push(format!("  n{parent} -- n{child};"));
    }

    fn child(&mut self, parent: usize, label: &str) -> usize {
        let id = self.node(label);
        self.edge(parent, id);
        id
    }

    fn declaration(&mut self, parent: usize, decl: &Declaration) {
        let id = self.child(parent, &format!("declaration ({})", decl.type_name));
        for identifier in &decl.identifiers {
            self.child(id, &format!("id ({})", identifier.lexeme));
        }
    }

    fn procedure(&mut self, parent: usize, procedure: &Procedure) {
        let id = self.child(parent, &format!("procedure ({})", procedure.name.lexeme));
        let params = self.child(id, "parameters");
        for decl in &procedure.parameters {
            self.declaration(params, decl);
        }
        let decls = self.child(id, "declarations");
        for decl in &procedure.declarations {
            self.declaration(decls, decl);
        }
        self.statement(id, &procedure.body);
    }

    fn statement(&mut self, parent: usize, statement: &Statement) {
        match statement {
            Statement::Compound { statements, .. } => {
                let id = self.child(parent, "compound_statement");
                for child in statements {
                    self.statement(id, child);
                }
            }
            Statement::Assignment { target, value, .. } => {
                let id = self.child(parent, &format!("assignment ({})", target.lexeme));
                self.expression(id, value);
            }
            Statement::If { condition, body, .. } => {
                let id = self.child(parent, "if_statement");
                self.expression(id, condition);
                self.statement(id, body);
            }
            Statement::IfElse {
                condition,
                then_body,
                else_body,
                ..
            } => {
                let id = self.child(parent, "if_else_statement");
                self.expression(id, condition);
                self.statement(id, then_body);
                self.statement(id, else_body);
            }
            Statement::While { condition, body, .. } => {
                let id = self.child(parent, "while_statement");
                self.expression(id, condition);
                self.statement(id, body);
            }
            Statement::ProcedureCall { name, arguments, .. } => {
                let id = self.child(parent, &format!("procedure_call ({})", name.lexeme));
                let args = self.child(id, "arguments");
                for argument in arguments {
                    self.expression(args, argument);
                }
            }
            Statement::Print { value, .. } => {
                let id = self.child(parent, "print_statement");
                self.expression(id, value);
            }
        }
    }

    fn expression(&mut self, parent: usize, expression: &Expression) {
        match expression {
            Expression::Binary { op, lhs, rhs, .. } => {
                let id = self.child(parent, &format!("binary_expression ({op})"));
                self.expression(id, lhs);
                self.expression(id, rhs);
            }
            Expression::Unary { op, operand, .. } => {
                let id = self.child(parent, &format!("unary_expression ({op})"));
                self.expression(id, operand);
            }
            Expression::Terminal(token) => {
                self.child(
                    parent,
                    &format!("identifier_or_constant ({})", token.lexeme),
                );
            }
        }
    }

    fn finish(self) -> String {
        let mut out = String::from("graph \"Syntax Tree\" {\n");
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
