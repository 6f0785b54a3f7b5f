//! Operand types of the target machine.

use std::fmt;

/// Type suffix of an instruction operand.
///
/// Discriminants are the machine's raw type ids. `Int16` only appears as a
/// suffix (`pushi.e`, `push.e`, `break.e`); it is never the type of a value
/// on the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Double = 0,
    Float = 1,
    Int32 = 2,
    Int64 = 3,
    Boolean = 4,
    Variable = 5,
    String = 6,
    Int16 = 0x0f,
}

impl DataType {
    pub fn suffix(self) -> char {
        match self {
            DataType::Double => 'd',
            DataType::Float => 'f',
            DataType::Int32 => 'i',
            DataType::Int64 => 'l',
            DataType::Boolean => 'b',
            DataType::Variable => 'v',
            DataType::String => 's',
            DataType::Int16 => 'e',
        }
    }

    /// Dominance rank used to pick the result type of a binary operation.
    pub fn bias(self) -> u8 {
        match self {
            DataType::Float | DataType::Int32 | DataType::Boolean | DataType::String | DataType::Int16 => 0,
            DataType::Double | DataType::Int64 => 1,
            DataType::Variable => 2,
        }
    }

    /// Result type of an arithmetic or bitwise operation on `a` and `b`.
    ///
    /// ```rust
    /// use gmlc_asm::DataType;
    ///
    /// assert_eq!(DataType::promote(DataType::Int32, DataType::Double), DataType::Double);
    /// assert_eq!(DataType::promote(DataType::Boolean, DataType::Int32), DataType::Int32);
    /// assert_eq!(DataType::promote(DataType::Int64, DataType::Variable), DataType::Variable);
    /// ```
    pub fn promote(a: DataType, b: DataType) -> DataType {
        if a.bias() == b.bias() {
            if (a as u8) <= (b as u8) { a } else { b }
        } else if a.bias() > b.bias() {
            a
        } else {
            b
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}
