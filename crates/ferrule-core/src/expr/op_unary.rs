use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,

    /// Converts the operand to the node's type
    Convert,

    IsNull,
}

impl UnaryOp {
    pub fn is_convert(self) -> bool {
        matches!(self, Self::Convert)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Not => "!".fmt(f),
            Self::Negate => "-".fmt(f),
            Self::Convert => "convert".fmt(f),
            Self::IsNull => "is_null".fmt(f),
        }
    }
}

impl fmt::Debug for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
