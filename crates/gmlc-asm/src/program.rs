//! A finished routine: local declarations and label-resolved lines.

use std::fmt;

use crate::instruction::Instruction;

/// Name of the branch target used when a label resolves past the last
/// instruction.
pub const FUNC_END: &str = "func_end";

/// `.localvar <slot> <name> <id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub slot: usize,
    pub name: String,
    pub id: u32,
}

impl fmt::Display for LocalVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".localvar {} {} {}", self.slot, self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Code { label: Option<String>, instruction: Instruction },
    /// `; message`, left in place of code that could not be generated.
    Comment(String),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Code { label: Some(label), instruction } => write!(f, "{}: {}", label, instruction),
            Line::Code { label: None, instruction } => write!(f, "{}", instruction),
            Line::Comment(text) => write!(f, "; {}", text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub locals: Vec<LocalVar>,
    pub lines: Vec<Line>,
}

impl Assembly {
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.lines.iter().filter_map(|line| match line {
            Line::Code { instruction, .. } => Some(instruction),
            Line::Comment(_) => None,
        })
    }

    /// Labels placed in the output, in order.
    pub fn labels(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Code { label: Some(label), .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Comment(text) => Some(text.as_str()),
            Line::Code { .. } => None,
        })
    }

    /// Every output line, starting with the `.localvar` block.
    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.locals.len() + self.lines.len() + 1);
        out.push(".localvar 0 arguments".to_string());
        out.extend(self.locals.iter().map(|l| l.to_string()));
        out.extend(self.lines.iter().map(|l| l.to_string()));
        out
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::BranchKind;
    use crate::types::DataType;

    #[test]
    fn renders_locals_before_code() {
        let asm = Assembly {
            locals: vec![LocalVar { slot: 1, name: "i".into(), id: 1 }],
            lines: vec![
                Line::Code { label: None, instruction: Instruction::PushInt(70000) },
                Line::Comment("Division by zero.".into()),
                Line::Code {
                    label: Some("l_0".into()),
                    instruction: Instruction::Branch(BranchKind::Always, FUNC_END.into()),
                },
                Line::Code { label: None, instruction: Instruction::PopZ(DataType::Variable) },
            ],
        };
        assert_eq!(
            asm.to_string(),
            ".localvar 0 arguments\n.localvar 1 i 1\npush.i 70000\n; Division by zero.\nl_0: b func_end\npopz.v\n"
        );
        assert_eq!(asm.labels(), ["l_0"]);
        assert_eq!(asm.instructions().count(), 3);
        assert_eq!(asm.comments().collect::<Vec<_>>(), ["Division by zero."]);
    }
}
