use super::{Expr, ExprKind, Type};
use by_address::ByAddress;
use std::{fmt, sync::Arc};

/// A lambda parameter or block variable.
///
/// Parameters have identity: two parameters with the same name and type are
/// still different parameters. Cloning a `Param` keeps its identity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Param {
    inner: ByAddress<Arc<ParamInner>>,
}

#[derive(Debug)]
struct ParamInner {
    name: String,
    ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            inner: ByAddress(Arc::new(ParamInner {
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

    /// Returns a new parameter with the same type and a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.ty().clone())
    }
}

impl Expr {
    pub fn parameter(param: &Param) -> Self {
        Expr::from_parts(param.ty().clone(), ExprKind::Parameter(param.clone()))
    }
}

impl From<&Param> for Expr {
    fn from(value: &Param) -> Self {
        Expr::parameter(value)
    }
}

impl From<Param> for Expr {
    fn from(value: Param) -> Self {
        Expr::parameter(&value)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.ty())
    }
}
