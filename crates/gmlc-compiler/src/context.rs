//! Enclosing control-flow constructs during code generation.

use gmlc_asm::DataType;

use crate::builder::LabelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Loop,
    /// Holds its discriminant of the given type on the stack.
    Switch(DataType),
    /// Holds an open instance environment.
    With,
}

/// Break and continue targets of one construct, and whether they were used.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub kind: ContextKind,
    pub break_label: LabelId,
    pub continue_label: Option<LabelId>,
    pub break_used: bool,
    pub continue_used: bool,
}

/// Innermost construct last.
#[derive(Debug, Default)]
pub(crate) struct Contexts {
    stack: Vec<Context>,
}

impl Contexts {
    pub(crate) fn push(&mut self, kind: ContextKind, break_label: LabelId, continue_label: Option<LabelId>) {
        self.stack.push(Context { kind, break_label, continue_label, break_used: false, continue_used: false });
    }

    pub(crate) fn pop(&mut self) -> Option<Context> {
        self.stack.pop()
    }

    /// `break` leaves the innermost construct of any kind, so a loop nested in
    /// a switch or `with` takes the break before the switch or `with` does.
    pub(crate) fn break_target(&mut self) -> Option<LabelId> {
        let ctx = self.stack.last_mut()?;
        ctx.break_used = true;
        Some(ctx.break_label)
    }

    /// `continue` goes to the innermost construct that can continue.
    pub(crate) fn continue_target(&mut self) -> Option<LabelId> {
        let ctx = self.stack.iter_mut().rev().find(|c| c.continue_label.is_some())?;
        ctx.continue_used = true;
        ctx.continue_label
    }

    pub(crate) fn can_continue(&self) -> bool {
        self.stack.iter().any(|c| c.continue_label.is_some())
    }

    /// Switches and withs that an early exit must clean up, innermost first.
    pub(crate) fn held(&self) -> impl Iterator<Item = ContextKind> + '_ {
        self.stack.iter().rev().map(|c| c.kind).filter(|k| *k != ContextKind::Loop)
    }
}
