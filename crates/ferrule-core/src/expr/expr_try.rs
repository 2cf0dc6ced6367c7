use super::{Expr, ExprKind, Param};

#[derive(Debug, Clone)]
pub struct ExprTry {
    pub body: Expr,
    pub catch: Option<ExprCatch>,
    pub finally: Option<Expr>,
}

/// Handles any error raised by the body. When `param` is set it is bound to
/// the error message.
#[derive(Debug, Clone)]
pub struct ExprCatch {
    pub param: Option<Param>,
    pub body: Expr,
}

impl Expr {
    pub fn try_catch(body: impl Into<Self>, catch: Option<ExprCatch>, finally: Option<Expr>) -> Self {
        let body = body.into();
        Expr::from_parts(
            body.ty().clone(),
            ExprKind::Try(ExprTry {
                body,
                catch,
                finally,
            }),
        )
    }
}
