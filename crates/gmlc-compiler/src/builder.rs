//! Instruction buffer with deferred label resolution.
//!
//! Labels are plain ids handed out while generating code. Placing a label
//! attaches it to the next instruction written, so several labels can share
//! one line. Names are only given out by [`CodeWriter::finish`], and only to
//! positions some jump actually targets, so unused labels never show up in
//! the output.

use std::collections::{HashMap, HashSet};

use gmlc_asm::{Assembly, BranchKind, Instruction, Line, LocalVar, FUNC_END};

pub(crate) type LabelId = usize;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Jump {
    Branch(BranchKind),
    PushEnv,
    PopEnv,
}

enum Op {
    Code(Instruction),
    Jump(Jump, LabelId),
    Comment(String),
}

struct Item {
    labels: Vec<LabelId>,
    op: Op,
}

#[derive(Default)]
pub(crate) struct CodeWriter {
    items: Vec<Item>,
    pending: Vec<LabelId>,
    next_label: LabelId,
}

impl CodeWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_label(&mut self) -> LabelId {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub(crate) fn emit(&mut self, i: Instruction) {
        self.push(Op::Code(i));
    }

    pub(crate) fn jump(&mut self, kind: Jump, target: LabelId) {
        self.push(Op::Jump(kind, target));
    }

    pub(crate) fn branch(&mut self, kind: BranchKind, target: LabelId) {
        self.jump(Jump::Branch(kind), target);
    }

    /// Attaches `label` to the next instruction.
    pub(crate) fn place(&mut self, label: LabelId) {
        self.pending.push(label);
    }

    /// Comments never carry labels; pending labels wait for the next instruction.
    pub(crate) fn comment(&mut self, text: impl Into<String>) {
        self.items.push(Item { labels: Vec::new(), op: Op::Comment(text.into()) });
    }

    fn push(&mut self, op: Op) {
        let labels = std::mem::take(&mut self.pending);
        self.items.push(Item { labels, op });
    }

    pub(crate) fn finish(self, locals: Vec<LocalVar>) -> Assembly {
        let referenced: HashSet<LabelId> = self
            .items
            .iter()
            .filter_map(|item| match item.op {
                Op::Jump(_, target) => Some(target),
                _ => None,
            })
            .collect();

        let mut names: HashMap<LabelId, String> = HashMap::new();
        let mut line_labels = Vec::with_capacity(self.items.len());
        let mut counter = 0;
        for item in &self.items {
            let used: Vec<LabelId> = item.labels.iter().copied().filter(|l| referenced.contains(l)).collect();
            if used.is_empty() {
                line_labels.push(None);
                continue;
            }
            let name = format!("l_{}", counter);
            counter += 1;
            for label in used {
                names.insert(label, name.clone());
            }
            line_labels.push(Some(name));
        }

        let resolve = |id: LabelId| names.get(&id).cloned().unwrap_or_else(|| FUNC_END.to_string());
        let lines = self
            .items
            .into_iter()
            .zip(line_labels)
            .map(|(item, label)| match item.op {
                Op::Comment(text) => Line::Comment(text),
                Op::Code(instruction) => Line::Code { label, instruction },
                Op::Jump(kind, target) => {
                    let target = resolve(target);
                    let instruction = match kind {
                        Jump::Branch(b) => Instruction::Branch(b, target),
                        Jump::PushEnv => Instruction::PushEnv(target),
                        Jump::PopEnv => Instruction::PopEnv(target),
                    };
                    Line::Code { label, instruction }
                }
            })
            .collect();

        Assembly { locals, lines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmlc_asm::DataType;

    #[test]
    fn only_targeted_labels_are_named() {
        let mut code = CodeWriter::new();
        let unused = code.new_label();
        let target = code.new_label();
        code.place(unused);
        code.emit(Instruction::PushInt(1));
        code.branch(BranchKind::IfTrue, target);
        code.place(target);
        code.emit(Instruction::PopZ(DataType::Int32));

        let asm = code.finish(Vec::new());
        let text: Vec<String> = asm.lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(text, ["push.i 1", "bt l_0", "l_0: popz.i"]);
    }

    #[test]
    fn labels_sharing_a_line_share_a_name() {
        let mut code = CodeWriter::new();
        let a = code.new_label();
        let b = code.new_label();
        code.branch(BranchKind::Always, a);
        code.branch(BranchKind::Always, b);
        code.comment("between");
        code.place(a);
        code.place(b);
        code.emit(Instruction::Exit(DataType::Int32));

        let text: Vec<String> = code.finish(Vec::new()).lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(text, ["b l_0", "b l_0", "; between", "l_0: exit.i"]);
    }

    #[test]
    fn unplaced_labels_fall_back_to_function_end() {
        let mut code = CodeWriter::new();
        let end = code.new_label();
        code.branch(BranchKind::IfFalse, end);
        code.place(end);

        let asm = code.finish(Vec::new());
        assert_eq!(asm.lines.len(), 1);
        assert_eq!(asm.lines[0].to_string(), "bf func_end");
    }
}
