use ferrule_core::{
    expr::{Closure, Expr, Param, Runtime, Value},
    tracking::{IdentityMap, StateManager},
    Error, Result, Schema,
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// A cooperative cancellation signal.
///
/// Executions check the token before pulling each row.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with a cancellation error once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::cancelled());
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The runtime context compiled queries execute against.
///
/// Holds the named parameter values, the cancellation signal and the
/// identity map of tracked instances. Cloning a context shares all three.
#[derive(Clone)]
pub struct QueryContext {
    inner: Arc<Inner>,
}

struct Inner {
    schema: Arc<Schema>,
    parameters: RwLock<HashMap<String, Value>>,
    cancellation: CancellationToken,
    state_manager: Arc<dyn StateManager>,
}

impl QueryContext {
    /// A context with an empty identity map.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_state_manager(schema, Arc::new(IdentityMap::new()))
    }

    pub fn with_state_manager(schema: Arc<Schema>, state_manager: Arc<dyn StateManager>) -> Self {
        Self {
            inner: Arc::new(Inner {
                schema,
                parameters: RwLock::new(HashMap::new()),
                cancellation: CancellationToken::new(),
                state_manager,
            }),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    /// Sets the value of a named parameter, replacing any previous value.
    pub fn add_parameter(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .parameters
            .write()
            .insert(name.into(), value.into());
    }

    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.inner.parameters.read().get(name).cloned()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancellation
    }

    pub fn state_manager(&self) -> &Arc<dyn StateManager> {
        &self.inner.state_manager
    }
}

impl Runtime for QueryContext {
    fn schema(&self) -> Option<&Arc<Schema>> {
        Some(&self.inner.schema)
    }

    fn parameter(&self, name: &str) -> Result<Value> {
        QueryContext::parameter(self, name).ok_or_else(|| {
            Error::expression_evaluation_failed(format!(
                "no value was supplied for parameter `{name}`"
            ))
        })
    }

    fn add_parameter(&self, name: &str, value: Value) -> Result<()> {
        QueryContext::add_parameter(self, name, value);
        Ok(())
    }

    fn state_manager(&self) -> Option<&dyn StateManager> {
        Some(&*self.inner.state_manager)
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("parameters", &*self.inner.parameters.read())
            .field("cancelled", &self.inner.cancellation.is_cancelled())
            .finish()
    }
}

/// The context lifted constant resolvers run against. It only resolves
/// schema handles by name.
#[derive(Debug, Clone)]
pub struct LiftContext {
    schema: Arc<Schema>,
}

impl LiftContext {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl Runtime for LiftContext {
    fn schema(&self) -> Option<&Arc<Schema>> {
        Some(&self.schema)
    }
}

/// One execution of a compiled query.
///
/// Binds the plan's context parameter to the query context and the lifted
/// slots to their resolved values. Parameters added while executing live
/// in the execution and shadow the caller's parameters; the caller's
/// context is never written. For identity resolution without tracking, it
/// carries an identity map that lives only as long as the execution.
#[derive(Clone)]
pub struct ExecutionContext {
    cx: QueryContext,
    context_param: Param,
    parameters: Arc<RwLock<HashMap<String, Value>>>,
    scoped: Option<Arc<IdentityMap>>,
    slots: HashMap<Param, Value>,
}

impl ExecutionContext {
    pub(crate) fn new(cx: QueryContext, context_param: Param, scoped_identity: bool) -> Self {
        Self {
            cx,
            context_param,
            parameters: Arc::default(),
            scoped: scoped_identity.then(|| Arc::new(IdentityMap::new())),
            slots: HashMap::new(),
        }
    }

    pub(crate) fn with_slots(mut self, slots: HashMap<Param, Value>) -> Self {
        self.slots = slots;
        self
    }

    pub fn query_context(&self) -> &QueryContext {
        &self.cx
    }

    /// Evaluates an expression of the compiled plan.
    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        expr.eval_with(self, self.bindings())
    }

    /// Evaluates a lambda of the compiled plan into a function value.
    pub fn closure(&self, lambda: &Expr) -> Result<Closure> {
        match self.eval(lambda)? {
            Value::Function(closure) => Ok(closure),
            other => Err(Error::expression_evaluation_failed(format!(
                "expected a function, found {}",
                other.kind_name()
            ))),
        }
    }

    /// Calls a lambda of the compiled plan with `args`.
    pub fn call(&self, lambda: &Expr, args: Vec<Value>) -> Result<Value> {
        self.closure(lambda)?.call(self, args)
    }

    pub fn check_cancelled(&self) -> Result<()> {
        self.cx.cancellation_token().check()
    }

    fn bindings(&self) -> HashMap<Param, Value> {
        let mut bindings = self.slots.clone();
        bindings.insert(self.context_param.clone(), Value::Context);
        bindings
    }
}

impl Runtime for ExecutionContext {
    fn schema(&self) -> Option<&Arc<Schema>> {
        Some(self.cx.schema())
    }

    fn parameter(&self, name: &str) -> Result<Value> {
        match self.parameters.read().get(name) {
            Some(value) => Ok(value.clone()),
            None => Runtime::parameter(&self.cx, name),
        }
    }

    fn add_parameter(&self, name: &str, value: Value) -> Result<()> {
        self.parameters.write().insert(name.to_string(), value);
        Ok(())
    }

    fn state_manager(&self) -> Option<&dyn StateManager> {
        match &self.scoped {
            Some(scoped) => Some(&**scoped),
            None => Runtime::state_manager(&self.cx),
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cx", &self.cx)
            .field("parameters", &*self.parameters.read())
            .field("scoped_identity", &self.scoped.is_some())
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::builder().build().unwrap())
    }

    #[test]
    fn parameters_are_shared_between_clones() {
        let cx = QueryContext::new(schema());
        let clone = cx.clone();
        clone.add_parameter("limit", 3);

        assert_eq!(cx.parameter("limit"), Some(Value::I32(3)));
        assert!(Runtime::parameter(&cx, "missing").is_err());
    }

    #[test]
    fn cancellation_is_observed_through_the_context() {
        let cx = QueryContext::new(schema());
        assert!(cx.cancellation_token().check().is_ok());

        cx.cancellation_token().cancel();
        assert!(cx.cancellation_token().check().unwrap_err().is_cancelled());
    }

    #[test]
    fn execution_parameters_shadow_the_caller() {
        let cx = QueryContext::new(schema());
        cx.add_parameter("n", 1);
        let qc = Param::new("query_context", ferrule_core::expr::Type::QueryContext);
        let exec = ExecutionContext::new(cx.clone(), qc, false);

        Runtime::add_parameter(&exec, "n", Value::I32(5)).unwrap();
        Runtime::add_parameter(&exec, "m", Value::I32(7)).unwrap();

        assert_eq!(Runtime::parameter(&exec, "n").unwrap(), Value::I32(5));
        assert_eq!(cx.parameter("n"), Some(Value::I32(1)));
        assert_eq!(cx.parameter("m"), None);
    }

    #[test]
    fn lift_context_only_resolves_schema() {
        let lift = LiftContext::new(schema());
        assert!(lift.schema().is_some());
        assert!(lift.state_manager().is_none());
        assert!(Runtime::parameter(&lift, "x").is_err());
    }
}
