//! Symbol tables: lexical scopes, entries, and temporary bookkeeping.
//!
//! Scopes form a tree rooted at the program scope, one child per procedure.
//! Scopes and entries live in arenas and reference each other through
//! `ScopeId` / `EntryId` indices, so entries can point back at their owning
//! scope without ownership cycles.

use crate::diag::Diag;
use crate::ir::tac::Label;
use crate::lexer::token::{Token, TokenKind, TokenValue};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt;

/// The data types known to the type system.
///
/// BOOLEAN is not user-declarable; it only arises as the synthesized type of
/// relational and logical expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Real,
    Boolean,
}

impl DataType {
    /// Byte width of a value of this type.
    pub fn width(self) -> u32 {
        match self {
            DataType::Integer => 4,
            DataType::Real => 8,
            DataType::Boolean => 1,
        }
    }

    /// The canonical uppercase name, used in temporary lexemes and dumps.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Real => "REAL",
            DataType::Boolean => "BOOLEAN",
        }
    }

    /// Returns true for the numeric types.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, DataType::Integer | DataType::Real)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How an entry came to exist in its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Declared in a VAR section.
    Declaration,
    /// A formal procedure parameter.
    Parameter,
    /// A generator-allocated temporary.
    Temporary,
    /// A literal constant.
    Constant,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Declaration => write!(f, "DECLARATION"),
            EntryType::Parameter => write!(f, "PARAMETER"),
            EntryType::Temporary => write!(f, "TEMPORARY"),
            EntryType::Constant => write!(f, "CONSTANT"),
        }
    }
}

/// Index of a scope in the symbol-table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Returns the raw index value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Index of an entry in the symbol-table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

impl EntryId {
    /// Returns the raw index value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// A single identifier occurrence in a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The defining token (synthetic for temporaries).
    pub token: Token,
    /// Byte offset within the owning scope.
    pub offset: u32,
    /// Byte width of the entry's type.
    pub width: u32,
    /// The entry's data type.
    pub data_type: DataType,
    /// How the entry came to exist.
    pub entry_type: EntryType,
    /// The owning scope.
    pub scope: ScopeId,
}

impl Entry {
    /// One-line description, used by the symbol-table dump.
    pub fn describe(&self) -> String {
        format!(
            "Entry(token: {}, offset: {}, width: {}, data_type: {}, entry_type: {})",
            self.token, self.offset, self.width, self.data_type, self.entry_type
        )
    }

    /// The 1-based temporary slot index, meaningful for TEMPORARY entries.
    pub fn temporary_index(&self) -> u32 {
        match self.token.value {
            TokenValue::Int(n) => n as u32,
            _ => 0,
        }
    }
}

/// Per-type counters for live and high-water temporary counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TemporaryCounters {
    integer: u32,
    real: u32,
}

impl TemporaryCounters {
    fn get(&self, data_type: DataType) -> u32 {
        match data_type {
            DataType::Real => self.real,
            _ => self.integer,
        }
    }

    fn get_mut(&mut self, data_type: DataType) -> &mut u32 {
        match data_type {
            DataType::Real => &mut self.real,
            _ => &mut self.integer,
        }
    }
}

/// One lexical scope: the program itself or a single procedure.
#[derive(Debug, Clone)]
pub struct Scope {
    /// The identifier naming the scope.
    pub header: Token,
    /// The enclosing scope, or `None` for the program scope.
    pub parent: Option<ScopeId>,
    /// Entries in insertion order; shadowing replaces in place.
    entries: Vec<EntryId>,
    entries_by_name: HashMap<SmolStr, EntryId>,
    /// Child procedure scopes in insertion order.
    procedures: Vec<ScopeId>,
    procedures_by_name: HashMap<SmolStr, ScopeId>,
    /// The procedure's formal parameters, in declaration order.
    pub parameters: Vec<EntryId>,
    next_available_temporary: TemporaryCounters,
    max_count_of_temporary: TemporaryCounters,
    /// Next free byte offset for declared entries.
    pub offset: u32,
    /// The label marking the procedure's entry point.
    pub begin_code_label: Option<Label>,
}

impl Scope {
    fn new(header: Token, parent: Option<ScopeId>) -> Self {
        Self {
            header,
            parent,
            entries: Vec::new(),
            entries_by_name: HashMap::new(),
            procedures: Vec::new(),
            procedures_by_name: HashMap::new(),
            parameters: Vec::new(),
            next_available_temporary: TemporaryCounters::default(),
            max_count_of_temporary: TemporaryCounters::default(),
            offset: 0,
            begin_code_label: None,
        }
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }

    /// Child procedure scopes in insertion order.
    pub fn procedures(&self) -> &[ScopeId] {
        &self.procedures
    }

    /// The count of currently live temporaries of the given type.
    pub fn next_available_temporary(&self, data_type: DataType) -> u32 {
        self.next_available_temporary.get(data_type)
    }

    /// The high-water mark of temporaries of the given type.
    pub fn max_count_of_temporary(&self, data_type: DataType) -> u32 {
        self.max_count_of_temporary.get(data_type)
    }

    /// Returns true if this is the program (root) scope.
    pub fn is_program_scope(&self) -> bool {
        self.parent.is_none()
    }
}

/// The tree of symbol tables for one compilation.
#[derive(Debug, Clone)]
pub struct SymbolTables {
    scopes: Vec<Scope>,
    entries: Vec<Entry>,
}

impl SymbolTables {
    /// Creates the table tree with a root scope named by `header`.
    pub fn new(header: Token) -> Self {
        Self {
            scopes: vec![Scope::new(header, None)],
            entries: Vec::new(),
        }
    }

    /// The program (root) scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Returns a reference to a scope.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Returns a mutable reference to a scope.
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// Returns a reference to an entry.
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.0]
    }

    /// Inserts an identifier into `scope`.
    ///
    /// Re-inserting a CONSTANT with the same lexeme is idempotent: the
    /// existing entry is returned unchanged and no warning is produced.
    /// Any other collision replaces the previous mapping and yields a
    /// shadowing warning.
    pub fn insert_entry(
        &mut self,
        scope: ScopeId,
        token: Token,
        data_type: DataType,
        entry_type: EntryType,
    ) -> (EntryId, Option<Diag>) {
        let lexeme = token.lexeme.clone();
        let mut replaced = None;
        let mut warning = None;

        if let Some(&existing) = self.scopes[scope.0].entries_by_name.get(&lexeme) {
            let entry = &self.entries[existing.0];
            if entry.entry_type == EntryType::Constant {
                return (existing, None);
            }
            warning = Some(
                Diag::warning(format!(
                    "'{lexeme}' shadows an earlier declaration in the same scope"
                ))
                .with_primary_label(token.span.clone(), "redeclared here")
                .with_secondary_label(entry.token.span.clone(), "first declared here")
                .with_code("semantic::shadowed_declaration"),
            );
            replaced = Some(existing);
        }

        let offset = self.scopes[scope.0].offset;
        let width = data_type.width();
        let id = EntryId(self.entries.len());
        self.entries.push(Entry {
            token,
            offset,
            width,
            data_type,
            entry_type,
            scope,
        });

        let owner = &mut self.scopes[scope.0];
        owner.offset += width;
        owner.entries_by_name.insert(lexeme, id);
        match replaced {
            Some(old) => {
                if let Some(slot) = owner.entries.iter_mut().find(|slot| **slot == old) {
                    *slot = id;
                }
            }
            None => owner.entries.push(id),
        }

        (id, warning)
    }

    /// Inserts a procedure into `scope`, creating a fresh child scope.
    pub fn insert_procedure(&mut self, scope: ScopeId, token: Token) -> (ScopeId, Option<Diag>) {
        let lexeme = token.lexeme.clone();
        let mut replaced = None;
        let mut warning = None;

        if let Some(&existing) = self.scopes[scope.0].procedures_by_name.get(&lexeme) {
            warning = Some(
                Diag::warning(format!(
                    "procedure '{lexeme}' shadows an earlier definition in the same scope"
                ))
                .with_primary_label(token.span.clone(), "redefined here")
                .with_secondary_label(
                    self.scopes[existing.0].header.span.clone(),
                    "first defined here",
                )
                .with_code("semantic::shadowed_procedure"),
            );
            replaced = Some(existing);
        }

        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(token, Some(scope)));

        let owner = &mut self.scopes[scope.0];
        owner.procedures_by_name.insert(lexeme, id);
        match replaced {
            Some(old) => {
                if let Some(slot) = owner.procedures.iter_mut().find(|slot| **slot == old) {
                    *slot = id;
                }
            }
            None => owner.procedures.push(id),
        }

        (id, warning)
    }

    /// Looks up an identifier starting at `from` and walking the parent
    /// chain, reading each scope under inspection.
    pub fn lookup_entry(&self, from: ScopeId, lexeme: &str) -> Option<EntryId> {
        let mut current = Some(from);
        while let Some(scope) = current {
            if let Some(&id) = self.scopes[scope.0].entries_by_name.get(lexeme) {
                return Some(id);
            }
            current = self.scopes[scope.0].parent;
        }
        None
    }

    /// Looks up a procedure by the same parent-chain walk.
    pub fn lookup_procedure(&self, from: ScopeId, lexeme: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(scope) = current {
            if let Some(&id) = self.scopes[scope.0].procedures_by_name.get(lexeme) {
                return Some(id);
            }
            current = self.scopes[scope.0].parent;
        }
        None
    }

    /// Allocates a temporary of `data_type` in `scope`.
    ///
    /// Raises the live count; when it passes the high-water mark a fresh
    /// entry `temporary_<TYPE>_<n>` is created, otherwise the entry for the
    /// recycled slot is returned. Temporaries do not advance the scope
    /// offset; they are indexed by the high-water mark instead.
    pub fn new_temporary(&mut self, scope: ScopeId, data_type: DataType) -> EntryId {
        debug_assert!(data_type.is_arithmetic());
        let owner = &mut self.scopes[scope.0];
        let next = owner.next_available_temporary.get_mut(data_type);
        *next += 1;
        let n = *next;
        let lexeme = SmolStr::new(format!("temporary_{}_{}", data_type.name(), n));

        let max = owner.max_count_of_temporary.get_mut(data_type);
        if n > *max {
            *max = n;
            let token = Token::with_value(
                TokenKind::Id,
                lexeme.clone(),
                TokenValue::Int(i64::from(n)),
                0,
                0..0,
            );
            let id = EntryId(self.entries.len());
            self.entries.push(Entry {
                token,
                offset: 0,
                width: data_type.width(),
                data_type,
                entry_type: EntryType::Temporary,
                scope,
            });
            let owner = &mut self.scopes[scope.0];
            owner.entries_by_name.insert(lexeme, id);
            owner.entries.push(id);
            id
        } else {
            *self.scopes[scope.0]
                .entries_by_name
                .get(&lexeme)
                .expect("recycled temporary slot has an entry")
        }
    }

    /// Releases the most recently allocated temporary of `data_type`.
    ///
    /// The entry persists; its slot is reused by the next allocation.
    pub fn free_temporary(&mut self, scope: ScopeId, data_type: DataType) {
        let next = self.scopes[scope.0]
            .next_available_temporary
            .get_mut(data_type);
        *next = next.saturating_sub(1);
    }

    /// Renders the scope tree rooted at `scope` in the dump format written
    /// to the `.symbols` artifact.
    pub fn dump(&self, scope: ScopeId) -> String {
        let mut lines = Vec::new();
        self.dump_into(scope, 0, &mut lines);
        lines.join("\n")
    }

    fn dump_into(&self, scope: ScopeId, depth: usize, lines: &mut Vec<String>) {
        let indent = "\t".repeat(depth);
        let sc = &self.scopes[scope.0];
        lines.push(format!("{indent}SymbolTable(header: {}):", sc.header));
        for &entry_id in &sc.entries {
            let entry = &self.entries[entry_id.0];
            lines.push(format!(
                "{indent}\tentry: {} -> {}",
                entry.token.lexeme,
                entry.describe()
            ));
        }
        for &child in &sc.procedures {
            lines.push(format!(
                "{indent}\tprocedure: {} -> ",
                self.scopes[child.0].header.lexeme
            ));
            self.dump_into(child, depth + 2, lines);
        }
    }
}
