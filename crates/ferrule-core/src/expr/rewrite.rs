use super::{
    Expr, ExprBinaryOp, ExprBlock, ExprCall, ExprCatch, ExprConditional, ExprGoto, ExprIndex,
    ExprInvoke, ExprKind, ExprLabel, ExprLambda, ExprLoop, ExprMember, ExprNew, ExprNewArray,
    ExprSwitch, ExprThrow, ExprTry, ExprTypeIs, ExprUnaryOp, Param, SwitchCase,
};
use crate::Result;
use std::collections::HashMap;

/// A rebuilding pass over an expression tree.
///
/// The default implementation rewrites children and returns the original
/// node when none of them changed.
pub trait Rewrite {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        rewrite_expr(self, expr)
    }
}

pub fn rewrite_expr<R>(r: &mut R, expr: &Expr) -> Result<Expr>
where
    R: Rewrite + ?Sized,
{
    expr.rewrite_children(r)
}

impl Expr {
    /// Rewrites every direct child with `r`.
    ///
    /// Returns `self` (the same node) when every child came back unchanged.
    pub fn rewrite_children<R>(&self, r: &mut R) -> Result<Expr>
    where
        R: Rewrite + ?Sized,
    {
        let mut cx = Children { r, changed: false };

        let kind = match self.kind() {
            ExprKind::Binary(expr) => ExprKind::Binary(ExprBinaryOp {
                op: expr.op,
                lhs: cx.one(&expr.lhs)?,
                rhs: cx.one(&expr.rhs)?,
            }),
            ExprKind::Unary(expr) => ExprKind::Unary(ExprUnaryOp {
                op: expr.op,
                operand: cx.one(&expr.operand)?,
            }),
            ExprKind::Conditional(expr) => ExprKind::Conditional(ExprConditional {
                test: cx.one(&expr.test)?,
                if_true: cx.one(&expr.if_true)?,
                if_false: cx.one(&expr.if_false)?,
            }),
            ExprKind::Constant(_)
            | ExprKind::Default
            | ExprKind::Parameter(_) => return Ok(self.clone()),
            ExprKind::Member(expr) => ExprKind::Member(ExprMember {
                target: cx.one(&expr.target)?,
                name: expr.name.clone(),
            }),
            ExprKind::Call(expr) => ExprKind::Call(ExprCall {
                method: expr.method.clone(),
                target: cx.opt(expr.target.as_ref())?,
                args: cx.all(&expr.args)?,
            }),
            ExprKind::New(expr) => ExprKind::New(ExprNew {
                args: cx.all(&expr.args)?,
                members: expr.members.clone(),
            }),
            ExprKind::NewArray(expr) => ExprKind::NewArray(ExprNewArray {
                items: cx.all(&expr.items)?,
            }),
            ExprKind::Lambda(expr) => ExprKind::Lambda(ExprLambda {
                params: expr.params.clone(),
                body: cx.one(&expr.body)?,
            }),
            ExprKind::Block(expr) => ExprKind::Block(ExprBlock {
                variables: expr.variables.clone(),
                exprs: cx.all(&expr.exprs)?,
            }),
            ExprKind::Try(expr) => ExprKind::Try(ExprTry {
                body: cx.one(&expr.body)?,
                catch: match &expr.catch {
                    Some(catch) => Some(ExprCatch {
                        param: catch.param.clone(),
                        body: cx.one(&catch.body)?,
                    }),
                    None => None,
                },
                finally: cx.opt(expr.finally.as_ref())?,
            }),
            ExprKind::Switch(expr) => {
                let value = cx.one(&expr.value)?;
                let mut cases = Vec::with_capacity(expr.cases.len());
                for case in &expr.cases {
                    cases.push(SwitchCase {
                        tests: cx.all(&case.tests)?,
                        body: cx.one(&case.body)?,
                    });
                }
                ExprKind::Switch(ExprSwitch {
                    value,
                    cases,
                    default: cx.opt(expr.default.as_ref())?,
                })
            }
            ExprKind::Index(expr) => ExprKind::Index(ExprIndex {
                target: cx.one(&expr.target)?,
                index: cx.one(&expr.index)?,
            }),
            ExprKind::Invoke(expr) => ExprKind::Invoke(ExprInvoke {
                func: cx.one(&expr.func)?,
                args: cx.all(&expr.args)?,
            }),
            ExprKind::Loop(expr) => ExprKind::Loop(ExprLoop {
                body: cx.one(&expr.body)?,
                break_label: expr.break_label.clone(),
                continue_label: expr.continue_label.clone(),
            }),
            ExprKind::Goto(expr) => ExprKind::Goto(ExprGoto {
                kind: expr.kind,
                target: expr.target.clone(),
                value: cx.opt(expr.value.as_ref())?,
            }),
            ExprKind::Label(expr) => ExprKind::Label(ExprLabel {
                target: expr.target.clone(),
                default: cx.opt(expr.default.as_ref())?,
            }),
            ExprKind::TypeIs(expr) => ExprKind::TypeIs(ExprTypeIs {
                operand: cx.one(&expr.operand)?,
                model: expr.model,
            }),
            ExprKind::Throw(expr) => ExprKind::Throw(ExprThrow {
                exception: expr.exception.clone(),
                value: cx.opt(expr.value.as_ref())?,
            }),
            ExprKind::Extension(extension) => {
                return Ok(extension
                    .rewrite_children(&mut DynRewrite(cx.r))?
                    .unwrap_or_else(|| self.clone()));
            }
        };

        if cx.changed {
            Ok(Expr::from_parts(self.ty().clone(), kind))
        } else {
            Ok(self.clone())
        }
    }

    /// Rewrites the tree top-down with `f`.
    ///
    /// Where `f` returns a replacement, the replacement is used as is and its
    /// children are not visited. Elsewhere the children are rewritten.
    pub fn transform<F>(&self, f: F) -> Result<Expr>
    where
        F: FnMut(&Expr) -> Result<Option<Expr>>,
    {
        Transform { f }.rewrite_expr(self)
    }

    /// Replaces every reference to a mapped parameter.
    pub fn replace_params(&self, map: &HashMap<Param, Expr>) -> Result<Expr> {
        if map.is_empty() {
            return Ok(self.clone());
        }

        self.transform(|expr| {
            Ok(expr
                .as_parameter()
                .and_then(|param| map.get(param))
                .cloned())
        })
    }
}

struct Children<'a, R: ?Sized> {
    r: &'a mut R,
    changed: bool,
}

impl<R: Rewrite + ?Sized> Children<'_, R> {
    fn one(&mut self, expr: &Expr) -> Result<Expr> {
        let rewritten = self.r.rewrite_expr(expr)?;
        if !Expr::ptr_eq(&rewritten, expr) {
            self.changed = true;
        }
        Ok(rewritten)
    }

    fn opt(&mut self, expr: Option<&Expr>) -> Result<Option<Expr>> {
        expr.map(|expr| self.one(expr)).transpose()
    }

    fn all(&mut self, exprs: &[Expr]) -> Result<Vec<Expr>> {
        exprs.iter().map(|expr| self.one(expr)).collect()
    }
}

struct Transform<F> {
    f: F,
}

impl<F> Rewrite for Transform<F>
where
    F: FnMut(&Expr) -> Result<Option<Expr>>,
{
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        match (self.f)(expr)? {
            Some(replacement) => Ok(replacement),
            None => rewrite_expr(self, expr),
        }
    }
}

/// Adapts a possibly unsized rewriter into a `dyn Rewrite`.
struct DynRewrite<'a, R: ?Sized>(&'a mut R);

impl<R: Rewrite + ?Sized> Rewrite for DynRewrite<'_, R> {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        self.0.rewrite_expr(expr)
    }
}

/// Rewrites `exprs` with `r`, reporting whether any of them changed. Used by
/// extension nodes to implement [`Extension::rewrite_children`].
///
/// [`Extension::rewrite_children`]: super::Extension::rewrite_children
pub fn rewrite_all(r: &mut dyn Rewrite, exprs: &[&Expr]) -> Result<Option<Vec<Expr>>> {
    let mut changed = false;
    let mut ret = Vec::with_capacity(exprs.len());

    for expr in exprs {
        let rewritten = r.rewrite_expr(expr)?;
        if !Expr::ptr_eq(&rewritten, expr) {
            changed = true;
        }
        ret.push(rewritten);
    }

    Ok(changed.then_some(ret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Type;

    struct Identity;

    impl Rewrite for Identity {}

    #[test]
    fn identity_rewrite_preserves_every_node() {
        let x = Param::new("x", Type::I32);
        let tree = Expr::lambda(
            vec![x.clone()],
            Expr::condition(
                Expr::gt(&x, 1),
                Expr::add(&x, 2),
                Expr::block(vec![], vec![Expr::negate(&x)]),
            ),
        );

        let rewritten = Identity.rewrite_expr(&tree).unwrap();
        assert!(Expr::ptr_eq(&tree, &rewritten));
    }

    #[test]
    fn changed_leaf_rebuilds_only_its_spine() {
        let x = Param::new("x", Type::I32);
        let untouched = Expr::negate(&x);
        let tree = Expr::record(vec![untouched.clone(), Expr::constant(1)]);

        let rewritten = tree
            .transform(|expr| {
                Ok(match expr.as_constant() {
                    Some(_) => Some(Expr::constant(2)),
                    None => None,
                })
            })
            .unwrap();

        assert!(!Expr::ptr_eq(&tree, &rewritten));
        let new = rewritten.as_new().unwrap();
        assert!(Expr::ptr_eq(&new.args[0], &untouched));
        assert_eq!(new.args[1].as_constant(), Some(&crate::expr::Value::I32(2)));
    }

    #[test]
    fn replace_params_substitutes_references() {
        let x = Param::new("x", Type::I32);
        let tree = Expr::add(&x, &x);
        let map = HashMap::from([(x.clone(), Expr::constant(5))]);

        let replaced = tree.replace_params(&map).unwrap();
        assert_eq!(replaced.eval_const().unwrap(), crate::expr::Value::I32(10));
    }
}
