//! Compile-time evaluation of pure conversion functions.

use gmlc_syntax::{Call, Constant, Expr, ExprKind, Location};

use crate::Optimizer;

impl<'a> Optimizer<'a> {
    /// Replaces `string`, `real`, `int64`, `chr` and `ord` calls on a single
    /// constant argument with their result.
    pub(crate) fn fold_call(&mut self, call: Call, location: Option<Location>) -> Expr {
        let folded = match (call.name.as_str(), call.args.as_slice()) {
            (name, [arg]) if self.fold => match arg.as_constant() {
                Some(value) => self.evaluate(name, value, arg.location),
                None => None,
            },
            _ => None,
        };
        match folded {
            Some(value) => Expr::constant(value, location),
            None => Expr::new(ExprKind::Call(call), location),
        }
    }

    fn evaluate(&mut self, name: &str, arg: &Constant, location: Option<Location>) -> Option<Constant> {
        let value = match (name, arg) {
            ("string", Constant::Number { value, .. }) => Constant::String(value.to_string()),
            ("string", Constant::Int64(v)) => Constant::String(v.to_string()),
            ("string", Constant::String(s)) => Constant::String(s.clone()),
            ("real", Constant::Number { value, .. }) => Constant::number(*value),
            ("real", Constant::Int64(v)) => Constant::number(*v as f64),
            ("real", Constant::String(s)) => match s.trim().parse::<f64>() {
                Ok(v) => Constant::number(v),
                Err(_) => {
                    self.report("Cannot convert non-number string to a number.", location);
                    Constant::number(0.0)
                }
            },
            ("int64", Constant::Number { value, .. }) => Constant::Int64(round_half_even(*value)),
            ("int64", Constant::Int64(v)) => Constant::Int64(*v),
            ("chr", Constant::Number { value, .. }) => Constant::String(utf16_char(round_half_even(*value) as u16)),
            ("chr", Constant::Int64(v)) => Constant::String(utf16_char(*v as u16)),
            ("ord", Constant::String(s)) => Constant::number(s.encode_utf16().next().map_or(0.0, f64::from)),
            ("ord", _) => Constant::number(0.0),
            _ => return None,
        };
        Some(value)
    }
}

/// Rounds to the nearest integer, ties to even.
fn round_half_even(value: f64) -> i64 {
    let truncated = value.trunc();
    if (value - truncated).abs() == 0.5 && (truncated as i64) % 2 == 0 {
        truncated as i64
    } else {
        value.round() as i64
    }
}

fn utf16_char(unit: u16) -> String {
    String::from_utf16_lossy(&[unit])
}
