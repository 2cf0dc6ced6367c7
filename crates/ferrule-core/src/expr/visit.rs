#![allow(unused_variables)]

use super::{
    Expr, ExprBinaryOp, ExprBlock, ExprCall, ExprConditional, ExprConstant, ExprGoto, ExprIndex,
    ExprInvoke, ExprKind, ExprLabel, ExprLambda, ExprLoop, ExprMember, ExprNew, ExprNewArray,
    ExprSwitch, ExprThrow, ExprTry, ExprTypeIs, ExprUnaryOp, Extension, Param,
};

pub trait Visit {
    fn visit_expr(&mut self, i: &Expr) {
        visit_expr(self, i);
    }

    fn visit_expr_binary_op(&mut self, i: &ExprBinaryOp) {
        visit_expr_binary_op(self, i);
    }

    fn visit_expr_block(&mut self, i: &ExprBlock) {
        visit_expr_block(self, i);
    }

    fn visit_expr_call(&mut self, i: &ExprCall) {
        visit_expr_call(self, i);
    }

    fn visit_expr_conditional(&mut self, i: &ExprConditional) {
        visit_expr_conditional(self, i);
    }

    fn visit_expr_constant(&mut self, i: &ExprConstant) {
        visit_expr_constant(self, i);
    }

    fn visit_expr_extension(&mut self, i: &dyn Extension) {
        visit_expr_extension(self, i);
    }

    fn visit_expr_goto(&mut self, i: &ExprGoto) {
        visit_expr_goto(self, i);
    }

    fn visit_expr_index(&mut self, i: &ExprIndex) {
        visit_expr_index(self, i);
    }

    fn visit_expr_invoke(&mut self, i: &ExprInvoke) {
        visit_expr_invoke(self, i);
    }

    fn visit_expr_label(&mut self, i: &ExprLabel) {
        visit_expr_label(self, i);
    }

    fn visit_expr_lambda(&mut self, i: &ExprLambda) {
        visit_expr_lambda(self, i);
    }

    fn visit_expr_loop(&mut self, i: &ExprLoop) {
        visit_expr_loop(self, i);
    }

    fn visit_expr_member(&mut self, i: &ExprMember) {
        visit_expr_member(self, i);
    }

    fn visit_expr_new(&mut self, i: &ExprNew) {
        visit_expr_new(self, i);
    }

    fn visit_expr_new_array(&mut self, i: &ExprNewArray) {
        visit_expr_new_array(self, i);
    }

    fn visit_expr_parameter(&mut self, i: &Param) {}

    fn visit_expr_switch(&mut self, i: &ExprSwitch) {
        visit_expr_switch(self, i);
    }

    fn visit_expr_throw(&mut self, i: &ExprThrow) {
        visit_expr_throw(self, i);
    }

    fn visit_expr_try(&mut self, i: &ExprTry) {
        visit_expr_try(self, i);
    }

    fn visit_expr_type_is(&mut self, i: &ExprTypeIs) {
        visit_expr_type_is(self, i);
    }

    fn visit_expr_unary_op(&mut self, i: &ExprUnaryOp) {
        visit_expr_unary_op(self, i);
    }
}

impl<V: Visit + ?Sized> Visit for &mut V {
    fn visit_expr(&mut self, i: &Expr) {
        Visit::visit_expr(&mut **self, i);
    }

    fn visit_expr_binary_op(&mut self, i: &ExprBinaryOp) {
        Visit::visit_expr_binary_op(&mut **self, i);
    }

    fn visit_expr_block(&mut self, i: &ExprBlock) {
        Visit::visit_expr_block(&mut **self, i);
    }

    fn visit_expr_call(&mut self, i: &ExprCall) {
        Visit::visit_expr_call(&mut **self, i);
    }

    fn visit_expr_conditional(&mut self, i: &ExprConditional) {
        Visit::visit_expr_conditional(&mut **self, i);
    }

    fn visit_expr_constant(&mut self, i: &ExprConstant) {
        Visit::visit_expr_constant(&mut **self, i);
    }

    fn visit_expr_extension(&mut self, i: &dyn Extension) {
        Visit::visit_expr_extension(&mut **self, i);
    }

    fn visit_expr_goto(&mut self, i: &ExprGoto) {
        Visit::visit_expr_goto(&mut **self, i);
    }

    fn visit_expr_index(&mut self, i: &ExprIndex) {
        Visit::visit_expr_index(&mut **self, i);
    }

    fn visit_expr_invoke(&mut self, i: &ExprInvoke) {
        Visit::visit_expr_invoke(&mut **self, i);
    }

    fn visit_expr_label(&mut self, i: &ExprLabel) {
        Visit::visit_expr_label(&mut **self, i);
    }

    fn visit_expr_lambda(&mut self, i: &ExprLambda) {
        Visit::visit_expr_lambda(&mut **self, i);
    }

    fn visit_expr_loop(&mut self, i: &ExprLoop) {
        Visit::visit_expr_loop(&mut **self, i);
    }

    fn visit_expr_member(&mut self, i: &ExprMember) {
        Visit::visit_expr_member(&mut **self, i);
    }

    fn visit_expr_new(&mut self, i: &ExprNew) {
        Visit::visit_expr_new(&mut **self, i);
    }

    fn visit_expr_new_array(&mut self, i: &ExprNewArray) {
        Visit::visit_expr_new_array(&mut **self, i);
    }

    fn visit_expr_parameter(&mut self, i: &Param) {
        Visit::visit_expr_parameter(&mut **self, i);
    }

    fn visit_expr_switch(&mut self, i: &ExprSwitch) {
        Visit::visit_expr_switch(&mut **self, i);
    }

    fn visit_expr_throw(&mut self, i: &ExprThrow) {
        Visit::visit_expr_throw(&mut **self, i);
    }

    fn visit_expr_try(&mut self, i: &ExprTry) {
        Visit::visit_expr_try(&mut **self, i);
    }

    fn visit_expr_type_is(&mut self, i: &ExprTypeIs) {
        Visit::visit_expr_type_is(&mut **self, i);
    }

    fn visit_expr_unary_op(&mut self, i: &ExprUnaryOp) {
        Visit::visit_expr_unary_op(&mut **self, i);
    }
}

pub fn visit_expr<V>(v: &mut V, node: &Expr)
where
    V: Visit + ?Sized,
{
    match node.kind() {
        ExprKind::Binary(expr) => v.visit_expr_binary_op(expr),
        ExprKind::Unary(expr) => v.visit_expr_unary_op(expr),
        ExprKind::Conditional(expr) => v.visit_expr_conditional(expr),
        ExprKind::Constant(expr) => v.visit_expr_constant(expr),
        ExprKind::Default => {}
        ExprKind::Member(expr) => v.visit_expr_member(expr),
        ExprKind::Call(expr) => v.visit_expr_call(expr),
        ExprKind::New(expr) => v.visit_expr_new(expr),
        ExprKind::NewArray(expr) => v.visit_expr_new_array(expr),
        ExprKind::Lambda(expr) => v.visit_expr_lambda(expr),
        ExprKind::Parameter(param) => v.visit_expr_parameter(param),
        ExprKind::Block(expr) => v.visit_expr_block(expr),
        ExprKind::Try(expr) => v.visit_expr_try(expr),
        ExprKind::Switch(expr) => v.visit_expr_switch(expr),
        ExprKind::Index(expr) => v.visit_expr_index(expr),
        ExprKind::Invoke(expr) => v.visit_expr_invoke(expr),
        ExprKind::Loop(expr) => v.visit_expr_loop(expr),
        ExprKind::Goto(expr) => v.visit_expr_goto(expr),
        ExprKind::Label(expr) => v.visit_expr_label(expr),
        ExprKind::TypeIs(expr) => v.visit_expr_type_is(expr),
        ExprKind::Throw(expr) => v.visit_expr_throw(expr),
        ExprKind::Extension(extension) => v.visit_expr_extension(&**extension),
    }
}

pub fn visit_expr_binary_op<V>(v: &mut V, node: &ExprBinaryOp)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.lhs);
    v.visit_expr(&node.rhs);
}

pub fn visit_expr_block<V>(v: &mut V, node: &ExprBlock)
where
    V: Visit + ?Sized,
{
    for expr in &node.exprs {
        v.visit_expr(expr);
    }
}

pub fn visit_expr_call<V>(v: &mut V, node: &ExprCall)
where
    V: Visit + ?Sized,
{
    if let Some(target) = &node.target {
        v.visit_expr(target);
    }

    for arg in &node.args {
        v.visit_expr(arg);
    }
}

pub fn visit_expr_conditional<V>(v: &mut V, node: &ExprConditional)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.test);
    v.visit_expr(&node.if_true);
    v.visit_expr(&node.if_false);
}

pub fn visit_expr_constant<V>(v: &mut V, node: &ExprConstant)
where
    V: Visit + ?Sized,
{
}

pub fn visit_expr_extension<V>(v: &mut V, node: &dyn Extension)
where
    V: Visit + ?Sized,
{
    node.visit_children(&mut DynVisit(v));
}

pub fn visit_expr_goto<V>(v: &mut V, node: &ExprGoto)
where
    V: Visit + ?Sized,
{
    if let Some(value) = &node.value {
        v.visit_expr(value);
    }
}

pub fn visit_expr_index<V>(v: &mut V, node: &ExprIndex)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.target);
    v.visit_expr(&node.index);
}

pub fn visit_expr_invoke<V>(v: &mut V, node: &ExprInvoke)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.func);
    for arg in &node.args {
        v.visit_expr(arg);
    }
}

pub fn visit_expr_label<V>(v: &mut V, node: &ExprLabel)
where
    V: Visit + ?Sized,
{
    if let Some(default) = &node.default {
        v.visit_expr(default);
    }
}

pub fn visit_expr_lambda<V>(v: &mut V, node: &ExprLambda)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.body);
}

pub fn visit_expr_loop<V>(v: &mut V, node: &ExprLoop)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.body);
}

pub fn visit_expr_member<V>(v: &mut V, node: &ExprMember)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.target);
}

pub fn visit_expr_new<V>(v: &mut V, node: &ExprNew)
where
    V: Visit + ?Sized,
{
    for arg in &node.args {
        v.visit_expr(arg);
    }
}

pub fn visit_expr_new_array<V>(v: &mut V, node: &ExprNewArray)
where
    V: Visit + ?Sized,
{
    for item in &node.items {
        v.visit_expr(item);
    }
}

pub fn visit_expr_switch<V>(v: &mut V, node: &ExprSwitch)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.value);
    for case in &node.cases {
        for test in &case.tests {
            v.visit_expr(test);
        }
        v.visit_expr(&case.body);
    }
    if let Some(default) = &node.default {
        v.visit_expr(default);
    }
}

pub fn visit_expr_throw<V>(v: &mut V, node: &ExprThrow)
where
    V: Visit + ?Sized,
{
    if let Some(value) = &node.value {
        v.visit_expr(value);
    }
}

pub fn visit_expr_try<V>(v: &mut V, node: &ExprTry)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.body);
    if let Some(catch) = &node.catch {
        v.visit_expr(&catch.body);
    }
    if let Some(finally) = &node.finally {
        v.visit_expr(finally);
    }
}

pub fn visit_expr_type_is<V>(v: &mut V, node: &ExprTypeIs)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.operand);
}

pub fn visit_expr_unary_op<V>(v: &mut V, node: &ExprUnaryOp)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.operand);
}

/// Calls `f` on every expression of the tree, parents before children.
pub fn for_each_expr<F>(node: &Expr, f: F)
where
    F: FnMut(&Expr),
{
    struct ForEach<F> {
        f: F,
    }

    impl<F> Visit for ForEach<F>
    where
        F: FnMut(&Expr),
    {
        fn visit_expr(&mut self, node: &Expr) {
            (self.f)(node);
            visit_expr(self, node);
        }
    }

    ForEach { f }.visit_expr(node);
}

/// Returns `true` if any expression of the tree satisfies `f`.
pub fn any_expr<F>(node: &Expr, mut f: F) -> bool
where
    F: FnMut(&Expr) -> bool,
{
    let mut found = false;
    for_each_expr(node, |expr| {
        if !found && f(expr) {
            found = true;
        }
    });
    found
}

/// Adapts a possibly unsized visitor into a `dyn Visit`.
struct DynVisit<'a, V: ?Sized>(&'a mut V);

impl<V: Visit + ?Sized> Visit for DynVisit<'_, V> {
    fn visit_expr(&mut self, i: &Expr) {
        Visit::visit_expr(&mut *self.0, i);
    }

    fn visit_expr_binary_op(&mut self, i: &ExprBinaryOp) {
        Visit::visit_expr_binary_op(&mut *self.0, i);
    }

    fn visit_expr_block(&mut self, i: &ExprBlock) {
        Visit::visit_expr_block(&mut *self.0, i);
    }

    fn visit_expr_call(&mut self, i: &ExprCall) {
        Visit::visit_expr_call(&mut *self.0, i);
    }

    fn visit_expr_conditional(&mut self, i: &ExprConditional) {
        Visit::visit_expr_conditional(&mut *self.0, i);
    }

    fn visit_expr_constant(&mut self, i: &ExprConstant) {
        Visit::visit_expr_constant(&mut *self.0, i);
    }

    fn visit_expr_extension(&mut self, i: &dyn Extension) {
        Visit::visit_expr_extension(&mut *self.0, i);
    }

    fn visit_expr_goto(&mut self, i: &ExprGoto) {
        Visit::visit_expr_goto(&mut *self.0, i);
    }

    fn visit_expr_index(&mut self, i: &ExprIndex) {
        Visit::visit_expr_index(&mut *self.0, i);
    }

    fn visit_expr_invoke(&mut self, i: &ExprInvoke) {
        Visit::visit_expr_invoke(&mut *self.0, i);
    }

    fn visit_expr_label(&mut self, i: &ExprLabel) {
        Visit::visit_expr_label(&mut *self.0, i);
    }

    fn visit_expr_lambda(&mut self, i: &ExprLambda) {
        Visit::visit_expr_lambda(&mut *self.0, i);
    }

    fn visit_expr_loop(&mut self, i: &ExprLoop) {
        Visit::visit_expr_loop(&mut *self.0, i);
    }

    fn visit_expr_member(&mut self, i: &ExprMember) {
        Visit::visit_expr_member(&mut *self.0, i);
    }

    fn visit_expr_new(&mut self, i: &ExprNew) {
        Visit::visit_expr_new(&mut *self.0, i);
    }

    fn visit_expr_new_array(&mut self, i: &ExprNewArray) {
        Visit::visit_expr_new_array(&mut *self.0, i);
    }

    fn visit_expr_parameter(&mut self, i: &Param) {
        Visit::visit_expr_parameter(&mut *self.0, i);
    }

    fn visit_expr_switch(&mut self, i: &ExprSwitch) {
        Visit::visit_expr_switch(&mut *self.0, i);
    }

    fn visit_expr_throw(&mut self, i: &ExprThrow) {
        Visit::visit_expr_throw(&mut *self.0, i);
    }

    fn visit_expr_try(&mut self, i: &ExprTry) {
        Visit::visit_expr_try(&mut *self.0, i);
    }

    fn visit_expr_type_is(&mut self, i: &ExprTypeIs) {
        Visit::visit_expr_type_is(&mut *self.0, i);
    }

    fn visit_expr_unary_op(&mut self, i: &ExprUnaryOp) {
        Visit::visit_expr_unary_op(&mut *self.0, i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Type, Value};
    use std::any::Any;

    /// An extension node wrapping two children.
    #[derive(Debug)]
    struct Pair(Expr, Expr);

    impl Extension for Pair {
        fn name(&self) -> &str {
            "pair"
        }

        fn ty(&self) -> Type {
            Type::Any
        }

        fn visit_children(&self, visit: &mut dyn Visit) {
            visit.visit_expr(&self.0);
            visit.visit_expr(&self.1);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn extension_children_are_visited() {
        let inner = Expr::extension(Pair(Expr::constant(1), Expr::constant(2)));
        let tree = Expr::add(Expr::extension(Pair(inner, Expr::constant(3))), 4);

        let mut constants = vec![];
        for_each_expr(&tree, |expr| {
            if let Some(value) = expr.as_constant() {
                constants.push(value.clone());
            }
        });

        assert_eq!(
            constants,
            [Value::I32(1), Value::I32(2), Value::I32(3), Value::I32(4)]
        );
        assert!(any_expr(&tree, |expr| expr.is::<Pair>()));
    }
}
