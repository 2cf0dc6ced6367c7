use super::{Expr, ExprKind, Param, Type};

/// A function literal.
///
/// Parameters are matched positionally when lambdas are compared, so
/// `x => x.name` and `y => y.name` are the same lambda.
#[derive(Debug, Clone)]
pub struct ExprLambda {
    pub params: Vec<Param>,
    pub body: Expr,
}

impl ExprLambda {
    pub fn param(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }
}

impl Expr {
    pub fn lambda(params: Vec<Param>, body: impl Into<Self>) -> Self {
        let body = body.into();
        let ty = Type::func(
            params.iter().map(|param| param.ty().clone()).collect(),
            body.ty().clone(),
        );
        Expr::from_parts(ty, ExprKind::Lambda(ExprLambda { params, body }))
    }

    /// Builds a one-parameter lambda, handing the parameter to `body`.
    pub fn lambda1(name: &str, ty: Type, body: impl FnOnce(Expr) -> Expr) -> Self {
        let param = Param::new(name, ty);
        let body = body(Expr::parameter(&param));
        Expr::lambda(vec![param], body)
    }
}
