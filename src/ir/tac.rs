//! Three-address code: instructions, labels, and jump targets.
//!
//! Instructions accumulate in a single ordered list. Jump targets live in a
//! separate arena addressed by [`TargetId`], so backpatching mutates a
//! stable slot even when definition instructions are later inserted ahead
//! of already-emitted code. Each slot is written exactly once.

use crate::ast::{ArithmeticOperator, RelationalOperator, UnaryOperator};
use crate::ir::symbol_table::{DataType, EntryId, ScopeId};
use std::fmt;

/// A code label, rendered as `l<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// Index of a jump-target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    /// Returns the raw index value.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Arena of jump-target slots.
///
/// A slot starts unresolved (`None`) and is filled exactly once by
/// backpatching, or is born resolved when the target is already known.
#[derive(Debug, Clone, Default)]
pub struct JumpTargets {
    slots: Vec<Option<Label>>,
}

impl JumpTargets {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an unresolved slot.
    pub fn placeholder(&mut self) -> TargetId {
        self.slots.push(None);
        TargetId(self.slots.len() - 1)
    }

    /// Allocates a slot already resolved to `label`.
    pub fn resolved(&mut self, label: Label) -> TargetId {
        self.slots.push(Some(label));
        TargetId(self.slots.len() - 1)
    }

    /// Fills an unresolved slot. Each slot is patched at most once.
    pub fn patch(&mut self, id: TargetId, label: Label) {
        debug_assert!(
            self.slots[id.0].is_none(),
            "jump target patched more than once"
        );
        self.slots[id.0] = Some(label);
    }

    /// Returns the label a slot resolves to, if it has been patched.
    pub fn get(&self, id: TargetId) -> Option<Label> {
        self.slots[id.0]
    }

    /// Number of slots in the arena.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the arena holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A three-address instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Tac {
    /// `dst = lhs op rhs`
    BinaryAssignment {
        op: ArithmeticOperator,
        lhs: EntryId,
        rhs: EntryId,
        dst: EntryId,
    },

    /// `dst = op operand`
    UnaryAssignment {
        op: UnaryOperator,
        operand: EntryId,
        dst: EntryId,
    },

    /// `dst = src`
    BareAssignment { src: EntryId, dst: EntryId },

    /// `if (lhs relop rhs) goto target`
    ConditionalJump {
        op: RelationalOperator,
        lhs: EntryId,
        rhs: EntryId,
        target: TargetId,
    },

    /// `goto target`
    UnconditionalJump { target: TargetId },

    /// `l<n>:`
    Label(Label),

    /// Runtime output of one value.
    Print { place: EntryId },

    /// Activation-record setup for a procedure call; control continues at
    /// the callee's begin label and returns to `return_label`.
    Call {
        procedure: ScopeId,
        return_label: Label,
    },

    /// Activation-record teardown and computed-goto return.
    Return { procedure: ScopeId },

    /// Translation-unit preamble.
    BeginProgram,

    /// Translation-unit close.
    EndProgram,

    /// Program-scope variable definition.
    Definition { entry: EntryId },

    /// Program-scope temporary array definition.
    TemporaryDefinition { data_type: DataType, count: u32 },

    /// Activation-record struct and typedefs for a procedure.
    ActivationRecordDefinition { procedure: ScopeId },
}

impl Tac {
    /// Returns the jump-target slot of this instruction, if it is a jump.
    pub fn jump_target(&self) -> Option<TargetId> {
        match self {
            Tac::ConditionalJump { target, .. } | Tac::UnconditionalJump { target } => {
                Some(*target)
            }
            _ => None,
        }
    }
}
