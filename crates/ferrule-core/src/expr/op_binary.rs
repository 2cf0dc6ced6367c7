use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAlso,
    OrElse,
    Coalesce,
    Assign,
}

impl BinaryOp {
    /// Returns `true` for operators that evaluate to a boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::AndAlso | Self::OrElse)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Rem
        )
    }

    pub fn is_assign(self) -> bool {
        matches!(self, Self::Assign)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;

        match self {
            Add => "+".fmt(f),
            Sub => "-".fmt(f),
            Mul => "*".fmt(f),
            Div => "/".fmt(f),
            Rem => "%".fmt(f),
            Eq => "==".fmt(f),
            Ne => "!=".fmt(f),
            Lt => "<".fmt(f),
            Le => "<=".fmt(f),
            Gt => ">".fmt(f),
            Ge => ">=".fmt(f),
            AndAlso => "&&".fmt(f),
            OrElse => "||".fmt(f),
            Coalesce => "??".fmt(f),
            Assign => "=".fmt(f),
        }
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
