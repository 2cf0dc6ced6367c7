use super::{Expr, ExprKind, LabelTarget, Param, Value};
use crate::{schema::DescriptorKind, Error, Result};
use std::{
    collections::{hash_map::DefaultHasher, HashMap, HashSet},
    hash::{Hash, Hasher},
};

/// Structural equality over expression trees.
///
/// Node kind, static type and payload are compared recursively. Lambda and
/// block parameters are matched positionally: `x => x.name` equals
/// `y => y.name`. Parameters not bound inside the compared trees compare by
/// name and type.
#[derive(Debug, Default)]
pub struct ExprComparer {
    /// Left parameter to its right partner, for the binders in scope.
    scope: HashMap<Param, Param>,

    /// Right parameters currently bound by a binder in scope.
    bound_right: HashSet<Param>,

    labels: HashMap<LabelTarget, LabelTarget>,
}

/// Structural hashing consistent with [`ExprComparer`].
///
/// Names of parameters bound inside the tree are never hashed, so trees
/// that differ only by a consistent renaming of lambda parameters hash
/// equal.
#[derive(Debug)]
pub struct ExprHasher {
    state: DefaultHasher,
    bound: HashSet<Param>,
}

impl ExprComparer {
    /// Compares two trees.
    ///
    /// Fails when a parameter instance is bound by two unrelated binders
    /// in the same comparison, or when an extension node does not support
    /// comparison.
    pub fn equals(a: &Expr, b: &Expr) -> Result<bool> {
        ExprComparer::default().equals_expr(a, b)
    }

    pub fn equals_expr(&mut self, a: &Expr, b: &Expr) -> Result<bool> {
        if Expr::ptr_eq(a, b) && self.scope.is_empty() {
            return Ok(true);
        }

        if a.node_type() != b.node_type() || a.ty() != b.ty() {
            return Ok(false);
        }

        match (a.kind(), b.kind()) {
            (ExprKind::Binary(a), ExprKind::Binary(b)) => Ok(a.op == b.op
                && self.equals_expr(&a.lhs, &b.lhs)?
                && self.equals_expr(&a.rhs, &b.rhs)?),
            (ExprKind::Unary(a), ExprKind::Unary(b)) => {
                Ok(a.op == b.op && self.equals_expr(&a.operand, &b.operand)?)
            }
            (ExprKind::Conditional(a), ExprKind::Conditional(b)) => Ok(self
                .equals_expr(&a.test, &b.test)?
                && self.equals_expr(&a.if_true, &b.if_true)?
                && self.equals_expr(&a.if_false, &b.if_false)?),
            (ExprKind::Constant(a), ExprKind::Constant(b)) => Ok(a.value.same_as(&b.value)),
            (ExprKind::Default, ExprKind::Default) => Ok(true),
            (ExprKind::Member(a), ExprKind::Member(b)) => {
                Ok(a.name == b.name && self.equals_expr(&a.target, &b.target)?)
            }
            (ExprKind::Call(a), ExprKind::Call(b)) => Ok(a.method == b.method
                && self.equals_opt(a.target.as_ref(), b.target.as_ref())?
                && self.equals_all(&a.args, &b.args)?),
            (ExprKind::New(a), ExprKind::New(b)) => {
                Ok(a.members == b.members && self.equals_all(&a.args, &b.args)?)
            }
            (ExprKind::NewArray(a), ExprKind::NewArray(b)) => self.equals_all(&a.items, &b.items),
            (ExprKind::Lambda(a), ExprKind::Lambda(b)) => {
                self.scoped(&a.params, &b.params, |cmp| cmp.equals_expr(&a.body, &b.body))
            }
            (ExprKind::Parameter(a), ExprKind::Parameter(b)) => Ok(self.equals_param(a, b)),
            (ExprKind::Block(a), ExprKind::Block(b)) => {
                self.scoped(&a.variables, &b.variables, |cmp| cmp.equals_all(&a.exprs, &b.exprs))
            }
            (ExprKind::Try(a), ExprKind::Try(b)) => {
                if !self.equals_expr(&a.body, &b.body)?
                    || !self.equals_opt(a.finally.as_ref(), b.finally.as_ref())?
                {
                    return Ok(false);
                }
                match (&a.catch, &b.catch) {
                    (None, None) => Ok(true),
                    (Some(a), Some(b)) => match (&a.param, &b.param) {
                        (None, None) => self.equals_expr(&a.body, &b.body),
                        (Some(pa), Some(pb)) => self.scoped(
                            std::slice::from_ref(pa),
                            std::slice::from_ref(pb),
                            |cmp| cmp.equals_expr(&a.body, &b.body),
                        ),
                        _ => Ok(false),
                    },
                    _ => Ok(false),
                }
            }
            (ExprKind::Switch(a), ExprKind::Switch(b)) => {
                if a.cases.len() != b.cases.len()
                    || !self.equals_expr(&a.value, &b.value)?
                    || !self.equals_opt(a.default.as_ref(), b.default.as_ref())?
                {
                    return Ok(false);
                }
                for (a, b) in a.cases.iter().zip(&b.cases) {
                    if !self.equals_all(&a.tests, &b.tests)? || !self.equals_expr(&a.body, &b.body)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (ExprKind::Index(a), ExprKind::Index(b)) => Ok(self.equals_expr(&a.target, &b.target)?
                && self.equals_expr(&a.index, &b.index)?),
            (ExprKind::Invoke(a), ExprKind::Invoke(b)) => {
                Ok(self.equals_expr(&a.func, &b.func)? && self.equals_all(&a.args, &b.args)?)
            }
            (ExprKind::Loop(a), ExprKind::Loop(b)) => Ok(self
                .equals_label_opt(a.break_label.as_ref(), b.break_label.as_ref())
                && self.equals_label_opt(a.continue_label.as_ref(), b.continue_label.as_ref())
                && self.equals_expr(&a.body, &b.body)?),
            (ExprKind::Goto(a), ExprKind::Goto(b)) => Ok(a.kind == b.kind
                && self.equals_label(&a.target, &b.target)
                && self.equals_opt(a.value.as_ref(), b.value.as_ref())?),
            (ExprKind::Label(a), ExprKind::Label(b)) => Ok(self.equals_label(&a.target, &b.target)
                && self.equals_opt(a.default.as_ref(), b.default.as_ref())?),
            (ExprKind::TypeIs(a), ExprKind::TypeIs(b)) => {
                Ok(a.model == b.model && self.equals_expr(&a.operand, &b.operand)?)
            }
            (ExprKind::Throw(a), ExprKind::Throw(b)) => Ok(a.exception == b.exception
                && self.equals_opt(a.value.as_ref(), b.value.as_ref())?),
            (ExprKind::Extension(a), ExprKind::Extension(b)) => {
                if a.name() != b.name() {
                    return Ok(false);
                }
                a.eq_extension(&**b, self)
            }
            _ => Err(Error::unhandled_node(a.node_type().to_string())),
        }
    }

    pub fn equals_all(&mut self, a: &[Expr], b: &[Expr]) -> Result<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (a, b) in a.iter().zip(b) {
            if !self.equals_expr(a, b)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn equals_opt(&mut self, a: Option<&Expr>, b: Option<&Expr>) -> Result<bool> {
        match (a, b) {
            (None, None) => Ok(true),
            (Some(a), Some(b)) => self.equals_expr(a, b),
            _ => Ok(false),
        }
    }

    fn equals_param(&self, a: &Param, b: &Param) -> bool {
        match self.scope.get(a) {
            Some(partner) => partner == b,
            // A free parameter never equals one bound on the other side.
            None if self.bound_right.contains(b) => false,
            None => a == b || (a.name() == b.name() && a.ty() == b.ty()),
        }
    }

    fn equals_label(&mut self, a: &LabelTarget, b: &LabelTarget) -> bool {
        if a.ty() != b.ty() {
            return false;
        }
        match self.labels.get(a) {
            Some(partner) => partner == b,
            None => {
                self.labels.insert(a.clone(), b.clone());
                true
            }
        }
    }

    fn equals_label_opt(&mut self, a: Option<&LabelTarget>, b: Option<&LabelTarget>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.equals_label(a, b),
            _ => false,
        }
    }

    /// Binds `a[i]` to `b[i]` while comparing the binder's body.
    fn scoped<F>(&mut self, a: &[Param], b: &[Param], f: F) -> Result<bool>
    where
        F: FnOnce(&mut Self) -> Result<bool>,
    {
        if a.len() != b.len() {
            return Ok(false);
        }

        let mut added = Vec::with_capacity(a.len());

        for (pa, pb) in a.iter().zip(b) {
            if pa.ty() != pb.ty() {
                self.unbind(&added);
                return Ok(false);
            }

            match self.scope.get(pa) {
                Some(partner) if partner != pb => {
                    self.unbind(&added);
                    return Err(Error::invalid_shape(format!(
                        "lambda parameter `{}` is reused across unrelated lambdas",
                        pa.name()
                    )));
                }
                Some(_) => {
                    self.unbind(&added);
                    return Err(Error::invalid_shape(format!(
                        "lambda parameter `{}` is rebound by a nested lambda",
                        pa.name()
                    )));
                }
                None => {
                    self.scope.insert(pa.clone(), pb.clone());
                    self.bound_right.insert(pb.clone());
                    added.push(pa.clone());
                }
            }
        }

        let ret = f(self);
        self.unbind(&added);
        ret
    }

    fn unbind(&mut self, params: &[Param]) {
        for param in params {
            if let Some(partner) = self.scope.remove(param) {
                self.bound_right.remove(&partner);
            }
        }
    }
}

impl ExprHasher {
    pub fn new() -> Self {
        Self {
            state: DefaultHasher::new(),
            bound: HashSet::new(),
        }
    }

    /// Hashes a tree.
    pub fn hash(expr: &Expr) -> Result<u64> {
        let mut hasher = ExprHasher::new();
        hasher.hash_expr(expr)?;
        Ok(hasher.finish())
    }

    pub fn finish(&self) -> u64 {
        self.state.finish()
    }

    pub fn write<T: Hash + ?Sized>(&mut self, value: &T) {
        value.hash(&mut self.state);
    }

    pub fn hash_expr(&mut self, expr: &Expr) -> Result<()> {
        self.write(&expr.node_type());
        self.write(expr.ty());

        match expr.kind() {
            ExprKind::Binary(e) => {
                self.write(&e.op);
                self.hash_expr(&e.lhs)?;
                self.hash_expr(&e.rhs)?;
            }
            ExprKind::Unary(e) => {
                self.write(&e.op);
                self.hash_expr(&e.operand)?;
            }
            ExprKind::Conditional(e) => {
                self.hash_expr(&e.test)?;
                self.hash_expr(&e.if_true)?;
                self.hash_expr(&e.if_false)?;
            }
            ExprKind::Constant(e) => self.hash_value(&e.value),
            ExprKind::Default => {}
            ExprKind::Member(e) => {
                self.write(&e.name);
                self.hash_expr(&e.target)?;
            }
            ExprKind::Call(e) => {
                self.write(&e.method);
                self.write(&e.target.is_some());
                if let Some(target) = &e.target {
                    self.hash_expr(target)?;
                }
                self.hash_all(&e.args)?;
            }
            ExprKind::New(e) => {
                self.write(&e.members);
                self.hash_all(&e.args)?;
            }
            ExprKind::NewArray(e) => self.hash_all(&e.items)?,
            ExprKind::Lambda(e) => {
                self.write(&e.params.len());
                self.bind(&e.params, |hasher| hasher.hash_expr(&e.body))?;
            }
            ExprKind::Parameter(param) => {
                if !self.bound.contains(param) {
                    self.write(param.name());
                }
            }
            ExprKind::Block(e) => {
                self.write(&e.variables.len());
                self.bind(&e.variables, |hasher| hasher.hash_all(&e.exprs))?;
            }
            ExprKind::Try(e) => {
                self.hash_expr(&e.body)?;
                self.write(&e.catch.is_some());
                if let Some(catch) = &e.catch {
                    match &catch.param {
                        Some(param) => self.bind(std::slice::from_ref(param), |hasher| {
                            hasher.hash_expr(&catch.body)
                        })?,
                        None => self.hash_expr(&catch.body)?,
                    }
                }
                self.hash_opt(e.finally.as_ref())?;
            }
            ExprKind::Switch(e) => {
                self.hash_expr(&e.value)?;
                self.write(&e.cases.len());
                for case in &e.cases {
                    self.hash_all(&case.tests)?;
                    self.hash_expr(&case.body)?;
                }
                self.hash_opt(e.default.as_ref())?;
            }
            ExprKind::Index(e) => {
                self.hash_expr(&e.target)?;
                self.hash_expr(&e.index)?;
            }
            ExprKind::Invoke(e) => {
                self.hash_expr(&e.func)?;
                self.hash_all(&e.args)?;
            }
            ExprKind::Loop(e) => self.hash_expr(&e.body)?,
            ExprKind::Goto(e) => {
                self.write(&e.kind);
                self.write(e.target.ty());
                self.hash_opt(e.value.as_ref())?;
            }
            ExprKind::Label(e) => {
                self.write(e.target.ty());
                self.hash_opt(e.default.as_ref())?;
            }
            ExprKind::TypeIs(e) => {
                self.write(&e.model);
                self.hash_expr(&e.operand)?;
            }
            ExprKind::Throw(e) => {
                self.write(&e.exception);
                self.hash_opt(e.value.as_ref())?;
            }
            ExprKind::Extension(e) => {
                self.write(e.name());
                e.hash_extension(self)?;
            }
        }

        Ok(())
    }

    pub fn hash_all(&mut self, exprs: &[Expr]) -> Result<()> {
        self.write(&exprs.len());
        for expr in exprs {
            self.hash_expr(expr)?;
        }
        Ok(())
    }

    pub fn hash_opt(&mut self, expr: Option<&Expr>) -> Result<()> {
        self.write(&expr.is_some());
        match expr {
            Some(expr) => self.hash_expr(expr),
            None => Ok(()),
        }
    }

    /// Hashes a constant value. Consistent with [`Value::same_as`].
    pub fn hash_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.write(&0u8),
            Value::Bool(v) => {
                self.write(&1u8);
                self.write(v);
            }
            // Integers compare across widths, so both hash as i64.
            Value::I32(v) => {
                self.write(&2u8);
                self.write(&i64::from(*v));
            }
            Value::I64(v) => {
                self.write(&2u8);
                self.write(v);
            }
            Value::F64(v) => {
                self.write(&3u8);
                self.write(&v.to_bits());
            }
            Value::String(v) => {
                self.write(&4u8);
                self.write(v);
            }
            Value::List(items) | Value::Record(items) => {
                self.write(&5u8);
                self.write(&items.len());
                for item in items {
                    self.hash_value(item);
                }
            }
            Value::Model(model) => {
                self.write(&6u8);
                self.write(&model.schema().id());
                self.write(&model.id());
            }
            Value::Descriptor(descriptor) => {
                self.write(&7u8);
                self.write(&descriptor.schema().id());
                match descriptor.kind() {
                    DescriptorKind::Field(id) => self.write(id),
                    DescriptorKind::Navigation { model, index } => {
                        self.write(model);
                        self.write(index);
                    }
                    DescriptorKind::Key(model) => self.write(model),
                }
            }
            Value::Object(object) => {
                self.write(&8u8);
                self.write(&object.model());
            }
            Value::Buffer(buffer) => {
                self.write(&9u8);
                self.write(&buffer.len());
            }
            Value::Entry(_) | Value::Function(_) | Value::Context => self.write(&10u8),
        }
    }

    fn bind<F>(&mut self, params: &[Param], f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let added: Vec<_> = params
            .iter()
            .filter(|param| self.bound.insert((*param).clone()))
            .cloned()
            .collect();
        for param in params {
            self.write(param.ty());
        }
        let ret = f(self);
        for param in &added {
            self.bound.remove(param);
        }
        ret
    }
}

impl Default for ExprHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
