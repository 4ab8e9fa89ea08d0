//! Intermediate representation: symbol tables and three-address code.
//!
//! The code generator produces a [`TacUnit`] pairing the instruction list
//! with the symbol-table tree it references; the C emitter consumes both
//! together.

pub mod symbol_table;
pub mod tac;

pub use symbol_table::{DataType, Entry, EntryId, EntryType, Scope, ScopeId, SymbolTables};
pub use tac::{JumpTargets, Label, Tac, TargetId};

/// The generated intermediate code for one compilation.
#[derive(Debug, Clone)]
pub struct TacUnit {
    /// The ordered instruction list.
    pub instructions: Vec<Tac>,
    /// Jump-target slots referenced by the instructions.
    pub targets: JumpTargets,
    /// The symbol-table tree the instructions address into.
    pub tables: SymbolTables,
}

impl TacUnit {
    /// Returns the targets of jump instructions that were never patched.
    ///
    /// A fully generated program has none; this exists for validation and
    /// tests.
    pub fn unpatched_jumps(&self) -> Vec<TargetId> {
        self.instructions
            .iter()
            .filter_map(Tac::jump_target)
            .filter(|id| self.targets.get(*id).is_none())
            .collect()
    }
}
