use super::{
    BinaryOp, Exception, Expr, ExprKind, ExprLambda, GotoKind, LabelTarget, Method, Object, Param,
    Type, UnaryOp, Value,
};
use crate::{
    schema::{DescriptorKind, Schema},
    tracking::StateManager,
    Error, Result,
};
use indexmap::IndexMap;
use std::{cmp::Ordering, collections::HashMap, fmt, sync::Arc};

/// The services an evaluation can reach.
///
/// Compiled plans run against a query context that provides all of them;
/// lift resolvers run against a context that only provides the schema.
pub trait Runtime {
    fn schema(&self) -> Option<&Arc<Schema>> {
        None
    }

    fn parameter(&self, name: &str) -> Result<Value> {
        Err(Error::expression_evaluation_failed(format!(
            "parameter `{name}` is not available in this context"
        )))
    }

    fn add_parameter(&self, name: &str, value: Value) -> Result<()> {
        let _ = value;
        Err(Error::expression_evaluation_failed(format!(
            "cannot add parameter `{name}` in this context"
        )))
    }

    fn state_manager(&self) -> Option<&dyn StateManager> {
        None
    }
}

/// A function value: an evaluated lambda with the variables it captured.
#[derive(Clone)]
pub struct Closure {
    inner: Arc<ClosureInner>,
}

struct ClosureInner {
    params: Vec<Param>,
    body: Expr,
    captured: HashMap<Param, Value>,
}

struct ConstRuntime;

impl Runtime for ConstRuntime {}

/// How evaluation leaves an expression other than by producing a value.
enum Unwind {
    Error(Error),
    Jump { target: LabelTarget, value: Value },
}

type Flow<T> = std::result::Result<T, Unwind>;

impl From<Error> for Unwind {
    fn from(value: Error) -> Self {
        Unwind::Error(value)
    }
}

struct Interpreter<'a> {
    runtime: &'a dyn Runtime,
    frames: Vec<HashMap<Param, Value>>,
}

impl Expr {
    /// Evaluates the expression against `runtime`.
    pub fn eval(&self, runtime: &dyn Runtime) -> Result<Value> {
        self.eval_with(runtime, HashMap::new())
    }

    /// Evaluates the expression with some parameters bound.
    pub fn eval_with(&self, runtime: &dyn Runtime, bindings: HashMap<Param, Value>) -> Result<Value> {
        let mut interp = Interpreter {
            runtime,
            frames: vec![bindings],
        };
        interp.run(self)
    }

    /// Evaluates an expression that needs no runtime services.
    pub fn eval_const(&self) -> Result<Value> {
        self.eval(&ConstRuntime)
    }
}

impl Closure {
    pub fn arity(&self) -> usize {
        self.inner.params.len()
    }

    /// Calls the function.
    pub fn call(&self, runtime: &dyn Runtime, args: Vec<Value>) -> Result<Value> {
        if args.len() != self.inner.params.len() {
            return Err(Error::expression_evaluation_failed(format!(
                "function expects {} arguments, got {}",
                self.inner.params.len(),
                args.len()
            )));
        }

        let locals = self.inner.params.iter().cloned().zip(args).collect();

        let mut interp = Interpreter {
            runtime,
            frames: vec![self.inner.captured.clone(), locals],
        };
        interp.run(&self.inner.body)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Closure::ptr_eq(self, other)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.inner.params)
            .finish()
    }
}

fn failed(message: impl Into<String>) -> Unwind {
    Unwind::Error(Error::expression_evaluation_failed(message))
}

impl Interpreter<'_> {
    fn run(&mut self, expr: &Expr) -> Result<Value> {
        match self.eval(expr) {
            Ok(value) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            Err(Unwind::Jump { target, .. }) => Err(Error::expression_evaluation_failed(
                format!("jump to label `{}` escaped its scope", target.name()),
            )),
        }
    }

    fn lookup(&self, param: &Param) -> Flow<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(param) {
                return Ok(value.clone());
            }
        }
        Err(failed(format!("unbound parameter `{}`", param.name())))
    }

    fn assign(&mut self, param: &Param, value: Value) -> Flow<()> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(param) {
                *slot = value;
                return Ok(());
            }
        }
        Err(failed(format!("assignment to unbound variable `{}`", param.name())))
    }

    fn schema(&self) -> Flow<&Arc<Schema>> {
        self.runtime
            .schema()
            .ok_or_else(|| failed("no schema is available in this context"))
    }

    fn state_manager(&self) -> Flow<&dyn StateManager> {
        self.runtime
            .state_manager()
            .ok_or_else(|| failed("change tracking is not available in this context"))
    }

    fn eval(&mut self, expr: &Expr) -> Flow<Value> {
        match expr.kind() {
            ExprKind::Binary(e) => self.eval_binary(e.op, &e.lhs, &e.rhs),
            ExprKind::Unary(e) => {
                let operand = self.eval(&e.operand)?;
                match e.op {
                    UnaryOp::Not => Ok(Value::Bool(!operand.to_bool()?)),
                    UnaryOp::Negate => match operand {
                        Value::I32(v) => v
                            .checked_neg()
                            .map(Value::I32)
                            .ok_or_else(|| failed("integer overflow")),
                        Value::I64(v) => v
                            .checked_neg()
                            .map(Value::I64)
                            .ok_or_else(|| failed("integer overflow")),
                        Value::F64(v) => Ok(Value::F64(-v)),
                        other => Err(failed(format!("cannot negate {}", other.kind_name()))),
                    },
                    UnaryOp::IsNull => Ok(Value::Bool(operand.is_null())),
                    UnaryOp::Convert => convert(operand, expr.ty()),
                }
            }
            ExprKind::Conditional(e) => {
                if self.eval(&e.test)?.to_bool()? {
                    self.eval(&e.if_true)
                } else {
                    self.eval(&e.if_false)
                }
            }
            ExprKind::Constant(e) => Ok(e.value.clone()),
            ExprKind::Default => Ok(expr.ty().default_value()),
            ExprKind::Member(e) => {
                let target = self.eval(&e.target)?;
                member(&target, &e.name, e.target.ty())
            }
            ExprKind::Call(e) => {
                if let Method::Queryable(method) = &e.method {
                    return Err(failed(format!(
                        "sequence operator `{method}` must be translated before execution"
                    )));
                }
                let target = match &e.target {
                    Some(target) => Some(self.eval(target)?),
                    None => None,
                };
                let mut args = Vec::with_capacity(e.args.len());
                for arg in &e.args {
                    args.push(self.eval(arg)?);
                }
                self.eval_call(&e.method, target, args, expr.ty())
            }
            ExprKind::New(e) => {
                let mut args = Vec::with_capacity(e.args.len());
                for arg in &e.args {
                    args.push(self.eval(arg)?);
                }
                match expr.ty() {
                    Type::Model(id) => {
                        let name = match self.runtime.schema() {
                            Some(schema) => schema.model(*id).name.clone(),
                            None => format!("model#{}", id.0),
                        };
                        let fields: IndexMap<_, _> = e.members.iter().cloned().zip(args).collect();
                        Ok(Value::Object(Object::new(*id, name, fields)))
                    }
                    _ => Ok(Value::Record(args)),
                }
            }
            ExprKind::NewArray(e) => {
                let mut items = Vec::with_capacity(e.items.len());
                for item in &e.items {
                    items.push(self.eval(item)?);
                }
                Ok(Value::List(items))
            }
            ExprKind::Lambda(e) => Ok(Value::Function(self.closure(e))),
            ExprKind::Parameter(param) => self.lookup(param),
            ExprKind::Block(e) => {
                let frame = e
                    .variables
                    .iter()
                    .map(|variable| (variable.clone(), variable.ty().default_value()))
                    .collect();
                self.frames.push(frame);
                let ret = self.eval_sequence(&e.exprs, expr.ty());
                self.frames.pop();
                ret
            }
            ExprKind::Try(e) => {
                let mut ret = self.eval(&e.body);

                if let (Err(Unwind::Error(err)), Some(catch)) = (&ret, &e.catch) {
                    let mut frame = HashMap::new();
                    if let Some(param) = &catch.param {
                        frame.insert(param.clone(), Value::String(err.to_string()));
                    }
                    self.frames.push(frame);
                    ret = self.eval(&catch.body);
                    self.frames.pop();
                }

                if let Some(finally) = &e.finally {
                    self.eval(finally)?;
                }

                ret
            }
            ExprKind::Switch(e) => {
                let value = self.eval(&e.value)?;
                for case in &e.cases {
                    for test in &case.tests {
                        if self.eval(test)?.same_as(&value) {
                            return self.eval(&case.body);
                        }
                    }
                }
                match &e.default {
                    Some(default) => self.eval(default),
                    None => Ok(expr.ty().default_value()),
                }
            }
            ExprKind::Index(e) => {
                let target = self.eval(&e.target)?;
                let index = self.eval(&e.index)?.to_usize()?;
                let item = match &target {
                    Value::List(items) | Value::Record(items) => items.get(index),
                    Value::Buffer(buffer) => buffer.columns().get(index),
                    other => {
                        return Err(failed(format!("cannot index into {}", other.kind_name())))
                    }
                };
                item.cloned()
                    .ok_or_else(|| failed(format!("index {index} out of range")))
            }
            ExprKind::Invoke(e) => {
                let func = self.eval(&e.func)?;
                let mut args = Vec::with_capacity(e.args.len());
                for arg in &e.args {
                    args.push(self.eval(arg)?);
                }
                match func {
                    Value::Function(closure) => Ok(closure.call(self.runtime, args)?),
                    other => Err(failed(format!("cannot invoke {}", other.kind_name()))),
                }
            }
            ExprKind::Loop(e) => loop {
                match self.eval(&e.body) {
                    Ok(_) => {}
                    Err(Unwind::Jump { target, value }) => {
                        if Some(&target) == e.break_label.as_ref() {
                            return Ok(value);
                        } else if Some(&target) == e.continue_label.as_ref() {
                            continue;
                        } else {
                            return Err(Unwind::Jump { target, value });
                        }
                    }
                    Err(err) => return Err(err),
                }
            },
            ExprKind::Goto(e) => {
                let value = match &e.value {
                    Some(value) if e.kind != GotoKind::Continue => self.eval(value)?,
                    _ => Value::Null,
                };
                Err(Unwind::Jump {
                    target: e.target.clone(),
                    value,
                })
            }
            ExprKind::Label(e) => match &e.default {
                Some(default) => self.eval(default),
                None => Ok(e.target.ty().default_value()),
            },
            ExprKind::TypeIs(e) => {
                let operand = self.eval(&e.operand)?;
                let Value::Object(object) = operand else {
                    return Ok(Value::Bool(false));
                };
                let is = match self.runtime.schema() {
                    Some(schema) => schema.is_assignable(object.model(), e.model),
                    None => object.model() == e.model,
                };
                Ok(Value::Bool(is))
            }
            ExprKind::Throw(e) => {
                let value = match &e.value {
                    Some(value) => Some(self.eval(value)?),
                    None => None,
                };
                Err(Unwind::Error(e.exception.to_error(value.as_ref())))
            }
            ExprKind::Extension(extension) => Err(Unwind::Error(Error::unhandled_node(format!(
                "{} (extension nodes must be lowered before evaluation)",
                extension.name()
            )))),
        }
    }

    /// Evaluates a block body, resuming after a label when a jump targets
    /// one of the block's own labels.
    fn eval_sequence(&mut self, exprs: &[Expr], ty: &Type) -> Flow<Value> {
        let mut pos = 0;
        let mut last = ty.default_value();

        while pos < exprs.len() {
            match self.eval(&exprs[pos]) {
                Ok(value) => {
                    last = value;
                    pos += 1;
                }
                Err(Unwind::Jump { target, value }) => {
                    let landing = exprs.iter().position(|expr| match expr.kind() {
                        ExprKind::Label(label) => label.target == target,
                        _ => false,
                    });

                    match landing {
                        Some(landing) => {
                            last = value;
                            pos = landing + 1;
                        }
                        None => return Err(Unwind::Jump { target, value }),
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Ok(last)
    }

    fn closure(&self, lambda: &ExprLambda) -> Closure {
        let mut captured = HashMap::new();
        for frame in &self.frames {
            for (param, value) in frame {
                captured.insert(param.clone(), value.clone());
            }
        }

        Closure {
            inner: Arc::new(ClosureInner {
                params: lambda.params.clone(),
                body: lambda.body.clone(),
                captured,
            }),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Flow<Value> {
        match op {
            BinaryOp::Assign => {
                let Some(param) = lhs.as_parameter() else {
                    return Err(failed("the target of an assignment must be a variable"));
                };
                let value = self.eval(rhs)?;
                self.assign(param, value.clone())?;
                Ok(value)
            }
            BinaryOp::AndAlso => {
                if !self.eval(lhs)?.to_bool()? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(rhs)?.to_bool()?))
            }
            BinaryOp::OrElse => {
                if self.eval(lhs)?.to_bool()? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(rhs)?.to_bool()?))
            }
            BinaryOp::Coalesce => {
                let lhs = self.eval(lhs)?;
                if lhs.is_null() {
                    self.eval(rhs)
                } else {
                    Ok(lhs)
                }
            }
            BinaryOp::Eq => {
                let (lhs, rhs) = (self.eval(lhs)?, self.eval(rhs)?);
                Ok(Value::Bool(lhs.same_as(&rhs)))
            }
            BinaryOp::Ne => {
                let (lhs, rhs) = (self.eval(lhs)?, self.eval(rhs)?);
                Ok(Value::Bool(!lhs.same_as(&rhs)))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (lhs, rhs) = (self.eval(lhs)?, self.eval(rhs)?);
                // Comparisons involving null are false.
                if lhs.is_null() || rhs.is_null() {
                    return Ok(Value::Bool(false));
                }
                let ordering = compare(&lhs, &rhs)?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                let (lhs, rhs) = (self.eval(lhs)?, self.eval(rhs)?);
                Ok(arithmetic(op, lhs, rhs)?)
            }
        }
    }

    fn eval_call(
        &mut self,
        method: &Method,
        target: Option<Value>,
        args: Vec<Value>,
        ty: &Type,
    ) -> Flow<Value> {
        let mut args = args.into_iter();
        let mut arg = |name: &str| {
            args.next()
                .ok_or_else(|| failed(format!("missing argument `{name}` for `{}`", method.name())))
        };

        match method {
            Method::Queryable(method) => Err(failed(format!(
                "sequence operator `{method}` must be translated before execution"
            ))),
            Method::Property(name) => {
                let target = arg("target")?;
                member(&target, name, &Type::Any)
            }
            Method::Contains => {
                let list = target.ok_or_else(|| failed("`contains` requires a target"))?;
                let value = arg("value")?;
                match list {
                    Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item.same_as(&value)))),
                    Value::Null => Ok(Value::Bool(false)),
                    other => Err(failed(format!("cannot search {}", other.kind_name()))),
                }
            }
            Method::ReadValue => {
                let Some(Value::Buffer(buffer)) = target else {
                    return Err(failed("`read_value` requires a value buffer"));
                };
                let index = arg("index")?.to_usize()?;
                Ok(convert(buffer.read(index)?.clone(), ty)?)
            }
            Method::GetParameter => {
                let name = arg("name")?;
                let name = name.as_str().ok_or_else(|| failed("parameter name must be a string"))?;
                Ok(self.runtime.parameter(name)?)
            }
            Method::AddParameter => {
                let name = arg("name")?;
                let value = arg("value")?;
                let name = name.as_str().ok_or_else(|| failed("parameter name must be a string"))?;
                self.runtime.add_parameter(name, value)?;
                Ok(Value::Null)
            }
            Method::FindModel => {
                let name = arg("name")?;
                let name = name.as_str().ok_or_else(|| failed("model name must be a string"))?;
                Ok(Value::Model(self.schema()?.find_model_ref(name)?))
            }
            Method::FindField | Method::FindNavigation | Method::FindPrimaryKey => {
                let Some(Value::Model(model)) = target else {
                    return Err(failed(format!("`{}` requires a type descriptor", method.name())));
                };
                let descriptor = match method {
                    Method::FindPrimaryKey => model.find_primary_key()?,
                    Method::FindField => {
                        let name = arg("name")?;
                        model.find_field(name.as_str().unwrap_or_default())?
                    }
                    _ => {
                        let name = arg("name")?;
                        model.find_navigation(name.as_str().unwrap_or_default())?
                    }
                };
                Ok(Value::Descriptor(descriptor))
            }
            Method::TryGetEntry => {
                let key = arg("key")?;
                let key_values = arg("key_values")?;
                let throw_on_null = arg("throw_on_null")?.to_bool()?;

                let Value::Descriptor(key) = key else {
                    return Err(failed("`try_get_entry` requires a key descriptor"));
                };
                if !matches!(key.kind(), DescriptorKind::Key(_)) {
                    return Err(failed(format!("`{key}` is not a key descriptor")));
                }
                let key_values = match key_values {
                    Value::Record(values) | Value::List(values) => values,
                    value => vec![value],
                };

                let (entry, has_null_key) =
                    self.state_manager()?.try_get_entry(&key, &key_values, throw_on_null)?;
                Ok(Value::Record(vec![
                    entry.map(Value::Entry).unwrap_or(Value::Null),
                    Value::Bool(has_null_key),
                ]))
            }
            Method::StartTracking => {
                let model = arg("model")?;
                let instance = arg("instance")?;
                let shadow = arg("shadow")?;
                let Value::Model(model) = model else {
                    return Err(failed("`start_tracking` requires a type descriptor"));
                };
                let entry = self.state_manager()?.start_tracking(&model, instance, shadow)?;
                Ok(Value::Entry(entry))
            }
            Method::EntryInstance => match target {
                Some(Value::Entry(entry)) => Ok(entry.instance().clone()),
                _ => Err(failed("`instance` requires a tracking entry")),
            },
        }
    }
}

fn member(target: &Value, name: &str, target_ty: &Type) -> Flow<Value> {
    match target {
        Value::Object(object) => object
            .get(name)
            .cloned()
            .ok_or_else(|| failed(format!("`{}` has no member `{name}`", object.model_name()))),
        Value::Record(items) if *target_ty == Type::MaterializationContext => {
            let index = match name {
                "value_buffer" => 0,
                "context" => 1,
                _ => return Err(failed(format!("materialization context has no member `{name}`"))),
            };
            items
                .get(index)
                .cloned()
                .ok_or_else(|| failed("malformed materialization context"))
        }
        Value::Entry(entry) if name == "instance" => Ok(entry.instance().clone()),
        Value::Null => Err(failed(format!("null reference reading member `{name}`"))),
        other => Err(failed(format!("{} has no member `{name}`", other.kind_name()))),
    }
}

fn convert(value: Value, ty: &Type) -> Flow<Value> {
    let converted = match (value, ty) {
        (Value::Null, _) => Value::Null,
        (Value::I32(v), Type::I64) => Value::I64(i64::from(v)),
        (Value::I32(v), Type::F64) => Value::F64(f64::from(v)),
        (Value::I64(v), Type::I32) => {
            Value::I32(i32::try_from(v).map_err(|_| failed(format!("{v} does not fit in i32")))?)
        }
        (Value::I64(v), Type::F64) => Value::F64(v as f64),
        (value, ty) if ty.admits(&value) => value,
        (value, ty) => return Err(failed(format!("cannot convert {} to {ty}", value.kind_name()))),
    };
    Ok(converted)
}

fn compare(lhs: &Value, rhs: &Value) -> Flow<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::F64(_), _) | (_, Value::F64(_)) => {
            let a = as_f64(lhs)?;
            let b = as_f64(rhs)?;
            a.partial_cmp(&b).ok_or_else(|| failed("cannot order NaN"))
        }
        _ => Ok(lhs.to_i64()?.cmp(&rhs.to_i64()?)),
    }
}

fn as_f64(value: &Value) -> Flow<f64> {
    match value {
        Value::F64(v) => Ok(*v),
        Value::I32(v) => Ok(f64::from(*v)),
        Value::I64(v) => Ok(*v as f64),
        other => Err(failed(format!("expected number, found {}", other.kind_name()))),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Flow<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }

    match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        (Value::I32(a), Value::I32(b)) => {
            let (a, b) = (*a, *b);
            let ret = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            ret.map(Value::I32)
                .ok_or_else(|| failed(format!("arithmetic error evaluating {a} {op} {b}")))
        }
        (Value::F64(_), _) | (_, Value::F64(_)) => {
            let (a, b) = (as_f64(&lhs)?, as_f64(&rhs)?);
            Ok(Value::F64(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
        _ => {
            let (a, b) = (lhs.to_i64()?, rhs.to_i64()?);
            let ret = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            ret.map(Value::I64)
                .ok_or_else(|| failed(format!("arithmetic error evaluating {a} {op} {b}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprCatch, SwitchCase};

    #[test]
    fn arithmetic_and_short_circuit() {
        let expr = Expr::and_also(Expr::gt(Expr::add(2, 3), 4), Expr::constant(true));
        assert_eq!(expr.eval_const().unwrap(), Value::Bool(true));

        // The right-hand side would fail if it were evaluated.
        let expr = Expr::or_else(true, Expr::throw(Exception::NoElements, None, Type::Bool));
        assert_eq!(expr.eval_const().unwrap(), Value::Bool(true));
    }

    #[test]
    fn block_variables_are_assignable() {
        let x = Param::new("x", Type::I32);
        let block = Expr::block(
            vec![x.clone()],
            vec![
                Expr::assign(&x, 40),
                Expr::assign(&x, Expr::add(&x, 2)),
                Expr::parameter(&x),
            ],
        );
        assert_eq!(block.eval_const().unwrap(), Value::I32(42));
    }

    #[test]
    fn lambdas_capture_and_invoke() {
        let y = Param::new("y", Type::I32);
        let x = Param::new("x", Type::I32);
        let add_y = Expr::lambda(vec![x.clone()], Expr::add(&x, &y));
        let expr = Expr::invoke(add_y, vec![Expr::constant(1)]);

        let value = expr
            .eval_with(&ConstRuntime, HashMap::from([(y, Value::I32(10))]))
            .unwrap();
        assert_eq!(value, Value::I32(11));
    }

    #[test]
    fn switch_falls_back_to_default() {
        let switch = Expr::switch(
            Type::String,
            Expr::constant("dog"),
            vec![
                SwitchCase::new(vec![Expr::constant("cat")], "meow"),
                SwitchCase::new(vec![Expr::constant("cow")], "moo"),
            ],
            Some(Expr::constant("?")),
        );
        assert_eq!(switch.eval_const().unwrap(), Value::from("?"));
    }

    #[test]
    fn loop_breaks_with_value() {
        let i = Param::new("i", Type::I32);
        let done = LabelTarget::new("done", Type::I32);
        let expr = Expr::block(
            vec![i.clone()],
            vec![Expr::loop_(
                Expr::condition(
                    Expr::lt(&i, 5),
                    Expr::assign(&i, Expr::add(&i, 1)),
                    Expr::break_with(&done, &i),
                ),
                Some(done),
                None,
            )],
        );
        assert_eq!(expr.eval_const().unwrap(), Value::I32(5));
    }

    #[test]
    fn try_catch_binds_message() {
        let message = Param::new("message", Type::String);
        let expr = Expr::try_catch(
            Expr::throw(Exception::NoElements, None, Type::String),
            Some(ExprCatch {
                param: Some(message.clone()),
                body: Expr::parameter(&message),
            }),
            None,
        );
        assert_eq!(
            expr.eval_const().unwrap(),
            Value::from("sequence contains no elements")
        );
    }

    #[test]
    fn throw_carries_discriminator_value() {
        let expr = Expr::throw(
            Exception::UnableToDiscriminate {
                entity: "Animal".to_string(),
            },
            Some(Expr::constant("Fish")),
            Type::TypeDescriptor,
        );
        let err = expr.eval_const().unwrap_err();
        assert!(err.is_unable_to_discriminate());
        assert!(err.to_string().contains("\"Fish\""));
    }

    #[test]
    fn extensions_must_be_lowered() {
        #[derive(Debug)]
        struct Opaque;

        impl crate::expr::Extension for Opaque {
            fn name(&self) -> &str {
                "opaque"
            }

            fn ty(&self) -> Type {
                Type::I32
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        let err = Expr::extension(Opaque).eval_const().unwrap_err();
        assert!(err.is_unhandled_node());
    }
}
