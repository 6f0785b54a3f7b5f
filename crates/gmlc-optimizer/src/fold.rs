//! Constant folding for operators.

use std::cmp::Ordering;

use gmlc_syntax::{BinaryOp, Constant, Expr, ExprKind, Location, LogicalOp, UnaryOp};

use crate::Optimizer;

/// Longest string a `count * "text"` fold may produce; longer products stay unfolded.
const MAX_REPEATED_LEN: usize = 1 << 20;

impl<'a> Optimizer<'a> {
    /// Folds leading constant operands left to right, stopping at the first
    /// pair that cannot be folded.
    pub(crate) fn fold_binary(&mut self, first: Expr, rest: Vec<(BinaryOp, Expr)>, location: Option<Location>) -> Expr {
        if !self.fold {
            return Expr::new(ExprKind::Binary { first: Box::new(first), rest }, location);
        }
        let mut first = first;
        let mut remaining = Vec::new();
        let mut operands = rest.into_iter();
        while let Some((op, rhs)) = operands.next() {
            let folded = match (first.as_constant(), rhs.as_constant()) {
                (Some(l), Some(r)) => self.fold_pair(op, l, r, rhs.location),
                _ => None,
            };
            if let Some(value) = folded {
                first = Expr::constant(value, first.location);
                continue;
            }
            remaining.push((op, rhs));
            remaining.extend(operands);
            break;
        }
        if remaining.is_empty() {
            first
        } else {
            Expr::new(ExprKind::Binary { first: Box::new(first), rest: remaining }, location)
        }
    }

    fn fold_pair(&mut self, op: BinaryOp, l: &Constant, r: &Constant, location: Option<Location>) -> Option<Constant> {
        use BinaryOp::*;

        let folded = match op {
            Add => match (l, r) {
                (Constant::String(a), Constant::String(b)) => Constant::String(format!("{}{}", a, b)),
                _ => arith(l, r, |a, b| a + b, i64::wrapping_add)?,
            },
            Sub => arith(l, r, |a, b| a - b, i64::wrapping_sub)?,
            Mul => match (l, r) {
                (Constant::Number { value, .. }, Constant::String(s)) => {
                    let count = (*value as i32).max(0) as usize;
                    match s.len().checked_mul(count) {
                        Some(len) if len <= MAX_REPEATED_LEN => Constant::String(s.repeat(count)),
                        _ => return None,
                    }
                }
                _ => arith(l, r, |a, b| a * b, i64::wrapping_mul)?,
            },
            Div => {
                if let Some((a, b)) = doubles(l, r) {
                    if b == 0.0 {
                        return self.zero_divisor("Division by zero.", location);
                    }
                    Constant::number(a / b)
                } else {
                    let (a, b) = mixed(l, r)?;
                    if b == 0 {
                        return self.zero_divisor("Division by zero.", location);
                    }
                    Constant::Int64(a.wrapping_div(b))
                }
            }
            IntDiv => {
                if let Some((a, b)) = doubles(l, r) {
                    let (a, b) = (a as i32, b as i32);
                    if b == 0 {
                        return self.zero_divisor("Division by zero.", location);
                    }
                    Constant::number(a.wrapping_div(b) as f64)
                } else {
                    let (a, b) = mixed(l, r)?;
                    if b == 0 {
                        return self.zero_divisor("Division by zero.", location);
                    }
                    Constant::Int64(a.wrapping_div(b))
                }
            }
            Mod => {
                if let Some((a, b)) = doubles(l, r) {
                    if b as i32 == 0 {
                        return self.zero_divisor("Modulo by zero.", location);
                    }
                    Constant::number(a % b)
                } else {
                    let (a, b) = mixed(l, r)?;
                    if b == 0 {
                        return self.zero_divisor("Modulo by zero.", location);
                    }
                    Constant::Int64(a.wrapping_rem(b))
                }
            }
            BitOr => bits(l, r, |a, b| a | b)?,
            BitAnd => bits(l, r, |a, b| a & b)?,
            BitXor => bits(l, r, |a, b| a ^ b)?,
            Shl => bits(l, r, |a, b| a.wrapping_shl(b as i32 as u32))?,
            Shr => bits(l, r, |a, b| a.wrapping_shr(b as i32 as u32))?,
            Xor => {
                let (a, b) = (l.as_f64()?, r.as_f64()?);
                Constant::Int64(i64::from((a >= 0.5) ^ (b >= 0.5)))
            }
            Eq | Ne | Lt | Le | Gt | Ge => {
                let diff = difference(l, r)?;
                Constant::boolean(match op {
                    Eq => diff == 0.0,
                    Ne => diff != 0.0,
                    Lt => diff < 0.0,
                    Le => diff <= 0.0,
                    Gt => diff > 0.0,
                    _ => diff >= 0.0,
                })
            }
        };
        Some(folded)
    }

    fn zero_divisor(&mut self, message: &str, location: Option<Location>) -> Option<Constant> {
        self.report(message, location);
        None
    }

    pub(crate) fn fold_logical(&mut self, op: LogicalOp, operands: Vec<Expr>, location: Option<Location>) -> Expr {
        if !self.fold {
            return Expr::new(ExprKind::Logical { op, operands }, location);
        }
        let mut operands = operands;
        while operands.len() >= 2 {
            let pair = operands[0]
                .as_constant()
                .and_then(Constant::as_f64)
                .zip(operands[1].as_constant().and_then(Constant::as_f64));
            let Some((a, b)) = pair else {
                break;
            };
            let value = match op {
                LogicalOp::And => a >= 0.5 && b >= 0.5,
                LogicalOp::Or => a >= 0.5 || b >= 0.5,
            };
            let folded = Expr::constant(Constant::number(if value { 1.0 } else { 0.0 }), operands[0].location);
            operands.remove(0);
            operands[0] = folded;
        }
        if operands.len() == 1 {
            if let Some(only) = operands.pop() {
                return only;
            }
        }
        Expr::new(ExprKind::Logical { op, operands }, location)
    }

    pub(crate) fn fold_unary(&mut self, op: UnaryOp, operand: Expr, location: Option<Location>) -> Expr {
        let folded = match (op, operand.as_constant().filter(|_| self.fold)) {
            (UnaryOp::Not, Some(Constant::Number { value, .. })) => {
                Some(Constant::number(if *value >= 0.5 { 0.0 } else { 1.0 }))
            }
            (UnaryOp::Not, Some(Constant::Int64(v))) => Some(Constant::Int64(i64::from((*v as f64) < 0.5))),
            (UnaryOp::BitNot, Some(Constant::Number { value, .. })) => Some(Constant::number(!(*value as i64) as f64)),
            (UnaryOp::BitNot, Some(Constant::Int64(v))) => Some(Constant::Int64(!v)),
            (UnaryOp::Negate, Some(Constant::Number { value, .. })) => Some(Constant::number(-value)),
            (UnaryOp::Negate, Some(Constant::Int64(v))) => Some(Constant::Int64(v.wrapping_neg())),
            _ => None,
        };
        match folded {
            Some(value) => Expr::constant(value, location),
            None => Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, location),
        }
    }
}

/// Both operands are doubles.
fn doubles(l: &Constant, r: &Constant) -> Option<(f64, f64)> {
    match (l, r) {
        (Constant::Number { value: a, .. }, Constant::Number { value: b, .. }) => Some((*a, *b)),
        _ => None,
    }
}

/// At least one Int64 operand; doubles are truncated.
fn mixed(l: &Constant, r: &Constant) -> Option<(i64, i64)> {
    match (l, r) {
        (Constant::Int64(a), Constant::Int64(b)) => Some((*a, *b)),
        (Constant::Number { value, .. }, Constant::Int64(b)) => Some((*value as i64, *b)),
        (Constant::Int64(a), Constant::Number { value, .. }) => Some((*a, *value as i64)),
        _ => None,
    }
}

fn arith(l: &Constant, r: &Constant, double: fn(f64, f64) -> f64, int: fn(i64, i64) -> i64) -> Option<Constant> {
    if let Some((a, b)) = doubles(l, r) {
        return Some(Constant::number(double(a, b)));
    }
    mixed(l, r).map(|(a, b)| Constant::Int64(int(a, b)))
}

fn bits(l: &Constant, r: &Constant, op: fn(i64, i64) -> i64) -> Option<Constant> {
    let (a, b) = doubles(l, r)
        .map(|(a, b)| (a as i64, b as i64))
        .or_else(|| mixed(l, r))?;
    Some(Constant::Int64(op(a, b)))
}

/// Sign of `l - r` as used by the comparison operators.
fn difference(l: &Constant, r: &Constant) -> Option<f64> {
    if let (Constant::String(a), Constant::String(b)) = (l, r) {
        return Some(match a.cmp(b) {
            Ordering::Less => -1.0,
            Ordering::Equal => 0.0,
            Ordering::Greater => 1.0,
        });
    }
    if let Some((a, b)) = doubles(l, r) {
        return Some(a - b);
    }
    mixed(l, r).map(|(a, b)| a.wrapping_sub(b) as f64)
}
