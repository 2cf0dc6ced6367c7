mod optimize;
pub use optimize::{optimize, LiftedConstants};

use crate::LiftContext;
use ferrule_core::{
    expr::{
        rewrite, Expr, ExprComparer, ExprHasher, ExprKind, Extension, Method, Param, Printer,
        Rewrite, Type, Value, Visit,
    },
    schema::ModelRef,
    Error, Result,
};
use heck::ToSnakeCase;
use std::{
    any::Any,
    collections::{HashMap, HashSet},
};
use tracing::trace;

/// A value that is known only once a schema is at hand, such as the handle
/// of a model or of one of its fields.
///
/// The resolver is a lambda over the lift context. Resolvers are pure and
/// look handles up by name, so a plan holding liftable constants can be
/// reused with any lift context for the same schema.
#[derive(Debug, Clone)]
pub struct LiftableConstant {
    resolver: Expr,
    name: String,
    ty: Type,
}

/// A lifted slot: a named variable and the body computing its value from
/// the lift context and from earlier slots.
#[derive(Debug, Clone)]
pub struct LiftedConstant {
    param: Param,
    body: Expr,
}

/// Replaces liftable constants with variables and records their resolvers.
#[derive(Debug)]
pub struct ConstantLifter {
    lift_context: Param,
    slots: Vec<LiftedConstant>,
}

impl LiftableConstant {
    /// Wraps `resolver`, which must be a lambda taking the lift context.
    pub fn new(resolver: Expr, name: impl Into<String>, ty: Type) -> Result<Expr> {
        let well_formed = resolver
            .as_lambda()
            .is_some_and(|lambda| lambda.params.len() == 1 && *lambda.params[0].ty() == Type::LiftContext);

        if !well_formed {
            return Err(Error::invalid_shape(format!(
                "the resolver of a liftable constant must take exactly the lift context; found `{}`",
                Printer::print(&resolver)
            )));
        }

        Ok(Expr::extension(LiftableConstant {
            resolver,
            name: name.into(),
            ty,
        }))
    }

    /// The handle of `model`, resolved by name.
    pub fn model(model: &ModelRef) -> Expr {
        Self::lookup(Type::TypeDescriptor, |lift_context| {
            Expr::find_model(lift_context, model.name())
        })
    }

    /// The handle of a field of `model`.
    pub fn field(model: &ModelRef, field: &str) -> Expr {
        Self::lookup(Type::Descriptor, |lift_context| {
            Expr::find_field(Expr::find_model(lift_context, model.name()), field)
        })
    }

    pub fn navigation(model: &ModelRef, navigation: &str) -> Expr {
        Self::lookup(Type::Descriptor, |lift_context| {
            Expr::find_navigation(Expr::find_model(lift_context, model.name()), navigation)
        })
    }

    /// The handle of the primary key of `model`.
    pub fn primary_key(model: &ModelRef) -> Expr {
        Self::lookup(Type::Descriptor, |lift_context| {
            Expr::find_primary_key(Expr::find_model(lift_context, model.name()))
        })
    }

    fn lookup(ty: Type, body: impl FnOnce(Expr) -> Expr) -> Expr {
        let lift_context = Param::new("lift_context", Type::LiftContext);
        let body = body(Expr::parameter(&lift_context));

        Expr::extension(LiftableConstant {
            name: name_hint(&body),
            resolver: Expr::lambda(vec![lift_context], body),
            ty,
        })
    }

    pub fn resolver(&self) -> &Expr {
        &self.resolver
    }

    /// The preferred name of the variable the constant is lifted into.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the resolver.
    pub fn resolve(&self, cx: &LiftContext) -> Result<Value> {
        match self.resolver.eval(cx)? {
            Value::Function(resolver) => resolver.call(cx, vec![Value::Context]),
            other => Err(Error::invalid_shape(format!(
                "the resolver of `{}` evaluated to {}",
                self.name,
                other.kind_name()
            ))),
        }
    }
}

impl Extension for LiftableConstant {
    fn name(&self) -> &str {
        "liftable_constant"
    }

    fn ty(&self) -> Type {
        self.ty.clone()
    }

    fn visit_children(&self, visit: &mut dyn Visit) {
        visit.visit_expr(&self.resolver);
    }

    fn rewrite_children(&self, r: &mut dyn Rewrite) -> Result<Option<Expr>> {
        Ok(rewrite::rewrite_all(r, &[&self.resolver])?
            .and_then(|mut children| children.pop())
            .map(|resolver| {
                Expr::extension(LiftableConstant {
                    resolver,
                    name: self.name.clone(),
                    ty: self.ty.clone(),
                })
            }))
    }

    fn print(&self, printer: &mut Printer) {
        printer.text("lift(");
        printer.expr(&self.resolver);
        printer.text(")");
    }

    fn eq_extension(&self, other: &dyn Extension, comparer: &mut ExprComparer) -> Result<bool> {
        let Some(other) = other.as_any().downcast_ref::<LiftableConstant>() else {
            return Ok(false);
        };
        Ok(self.ty == other.ty && comparer.equals_expr(&self.resolver, &other.resolver)?)
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(&self.ty);
        hasher.hash_expr(&self.resolver)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl LiftedConstant {
    pub fn new(param: Param, body: Expr) -> Self {
        Self { param, body }
    }

    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn name(&self) -> &str {
        self.param.name()
    }

    pub fn ty(&self) -> &Type {
        self.param.ty()
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }
}

/// Resolves every liftable constant in `expr` and embeds the result.
pub fn inline_constants(expr: &Expr, cx: &LiftContext) -> Result<Expr> {
    expr.transform(|expr| {
        let Some(constant) = expr.downcast_ref::<LiftableConstant>() else {
            return Ok(None);
        };
        let value = constant.resolve(cx)?;
        trace!(name = constant.name(), %value, "inlined liftable constant");
        Ok(Some(Expr::constant_typed(value, constant.ty.clone())))
    })
}

impl ConstantLifter {
    pub fn new() -> Self {
        Self {
            lift_context: Param::new("lift_context", Type::LiftContext),
            slots: vec![],
        }
    }

    /// The parameter every recorded resolver body refers to.
    pub fn lift_context(&self) -> &Param {
        &self.lift_context
    }

    pub fn slots(&self) -> &[LiftedConstant] {
        &self.slots
    }

    /// Replaces every liftable constant in `expr` with a fresh variable and
    /// records the variable with its resolver body.
    pub fn lift(&mut self, expr: &Expr) -> Result<Expr> {
        let lift_context = self.lift_context.clone();
        let slots = &mut self.slots;

        expr.transform(|expr| {
            let Some(constant) = expr.downcast_ref::<LiftableConstant>() else {
                return Ok(None);
            };
            let Some(resolver) = constant.resolver.as_lambda() else {
                return Err(Error::invalid_shape("liftable constant without a resolver lambda"));
            };

            let mut substitution = HashMap::new();
            if let Some(param) = resolver.param(0) {
                substitution.insert(param.clone(), Expr::parameter(&lift_context));
            }
            let body = resolver.body.replace_params(&substitution)?;

            let param = Param::new(constant.name.clone(), constant.ty.clone());
            slots.push(LiftedConstant::new(param.clone(), body));
            Ok(Some(Expr::parameter(&param)))
        })
    }

    /// Optimizes the recorded slots and applies the resulting renames and
    /// redirections to `exprs`.
    pub fn finish(
        self,
        exprs: &[Expr],
        reserved: &HashSet<String>,
    ) -> Result<(LiftedConstants, Vec<Expr>)> {
        let lifted = optimize(&self.lift_context, self.slots, reserved)?;
        let exprs = exprs
            .iter()
            .map(|expr| expr.replace_params(lifted.substitutions()))
            .collect::<Result<Vec<_>>>()?;
        Ok((lifted, exprs))
    }
}

impl Default for ConstantLifter {
    fn default() -> Self {
        Self::new()
    }
}

/// A readable variable name for a resolver body: `customer_model` for a
/// model lookup, `name_field` for a field lookup and so on.
pub(crate) fn name_hint(body: &Expr) -> String {
    let ExprKind::Call(call) = body.kind() else {
        return "lifted".to_string();
    };
    let name = call
        .args
        .first()
        .and_then(Expr::as_constant)
        .and_then(Value::as_str)
        .map(|name| name.to_snake_case());

    match (&call.method, name) {
        (Method::FindModel, Some(name)) => format!("{name}_model"),
        (Method::FindField, Some(name)) => format!("{name}_field"),
        (Method::FindNavigation, Some(name)) => format!("{name}_navigation"),
        (Method::FindPrimaryKey, _) => {
            let owner = match call.target.as_ref() {
                Some(target) => match target.as_parameter() {
                    Some(param) => param.name().to_string(),
                    None => name_hint(target),
                },
                None => String::new(),
            };
            match owner.strip_suffix("_model") {
                Some(model) => format!("{model}_key"),
                None => "key".to_string(),
            }
        }
        _ => "lifted".to_string(),
    }
}

#[cfg(test)]
mod tests;
