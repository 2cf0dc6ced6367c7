use super::{Expr, ExprKind, Type};
use by_address::ByAddress;
use std::{fmt, sync::Arc};

/// A jump target. Like [`Param`](super::Param), labels have identity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LabelTarget {
    inner: ByAddress<Arc<LabelInner>>,
}

#[derive(Debug)]
struct LabelInner {
    name: String,
    ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GotoKind {
    Goto,
    Return,
    Break,
    Continue,
}

/// Transfers control to `target`, carrying an optional value.
#[derive(Debug, Clone)]
pub struct ExprGoto {
    pub kind: GotoKind,
    pub target: LabelTarget,
    pub value: Option<Expr>,
}

impl LabelTarget {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            inner: ByAddress(Arc::new(LabelInner {
                name: name.into(),
                ty,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ty(&self) -> &Type {
        &self.inner.ty
    }
}

impl Expr {
    pub fn goto(kind: GotoKind, target: &LabelTarget, value: Option<Expr>) -> Self {
        Expr::from_parts(
            Type::Unit,
            ExprKind::Goto(ExprGoto {
                kind,
                target: target.clone(),
                value,
            }),
        )
    }

    pub fn break_with(target: &LabelTarget, value: impl Into<Self>) -> Self {
        Expr::goto(GotoKind::Break, target, Some(value.into()))
    }
}

impl fmt::Debug for LabelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.ty())
    }
}

impl fmt::Display for GotoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Goto => "goto",
            Self::Return => "return",
            Self::Break => "break",
            Self::Continue => "continue",
        };
        f.write_str(name)
    }
}
