use super::{
    lift::inline_constants, parameter_names, parameterize, strip_terminating_operators, CompiledQuery,
    ConstantLifter, LiftedConstants, PlanCache, PlanCacheKey, QueryRootProcessor,
    QueryableMethodTranslator, ShapedQuery, ShapedQueryCompiler,
};
use crate::{provider::Provider, Config, ConstantMode, LiftContext, TrackingBehavior};
use ferrule_core::{
    err,
    expr::{Expr, Param, Printer, Type},
    Error, Result, Schema,
};
use indexmap::IndexMap;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, instrument, trace};

/// Compiles query trees into executable plans for one schema and provider.
///
/// Plans are cached by the structure of the tree they were compiled from,
/// so recompiling an equal tree is a lookup.
#[derive(Debug)]
pub struct QueryCompiler {
    schema: Arc<Schema>,
    provider: Arc<dyn Provider>,
    config: Config,
    cache: PlanCache,
}

#[derive(Debug, Default)]
pub struct Builder {
    schema: Option<Arc<Schema>>,
    provider: Option<Arc<dyn Provider>>,
    config: Config,
}

/// State shared by the phases of one compilation.
#[derive(Debug)]
pub struct QueryCompilationContext {
    schema: Arc<Schema>,
    tracking: TrackingBehavior,
    is_async: bool,

    /// The parameter compiled code reads the query context through
    query_context: Param,

    /// Values computed from the query context before the store half runs,
    /// by name
    runtime_parameters: IndexMap<String, Expr>,

    /// Names of the parameters the caller supplies
    user_parameters: HashSet<String>,
}

impl QueryCompiler {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plan_cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Compiles `tree` with the configured tracking behavior.
    pub fn create_executor(&self, tree: &Expr, is_async: bool) -> Result<Arc<CompiledQuery>> {
        self.create_executor_with(tree, is_async, self.config.tracking)
    }

    /// Compiles `tree`, or returns the cached plan of an equal tree.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn create_executor_with(
        &self,
        tree: &Expr,
        is_async: bool,
        tracking: TrackingBehavior,
    ) -> Result<Arc<CompiledQuery>> {
        let tree = strip_terminating_operators(tree)?;

        if !self.config.cache_plans {
            return self.compile(&tree, is_async, tracking).map(Arc::new);
        }

        let key = PlanCacheKey::new(&tree, &self.schema, tracking, is_async)?;
        if let Some(plan) = self.cache.get(&key, &tree)? {
            debug!(hash = key.tree_hash(), "plan cache hit");
            return Ok(plan);
        }
        debug!(hash = key.tree_hash(), "plan cache miss");

        let plan = Arc::new(self.compile(&tree, is_async, tracking)?);
        self.cache.insert(key, tree, plan)
    }

    fn compile(
        &self,
        tree: &Expr,
        is_async: bool,
        tracking: TrackingBehavior,
    ) -> Result<CompiledQuery> {
        let provider = &*self.provider;
        let mut cx = QueryCompilationContext::new(self.schema.clone(), tracking, is_async);
        trace!(tree = %Printer::print(tree), "compiling query");

        // Preprocessing
        let expr = QueryRootProcessor::new(provider).process(tree)?;
        let expr = parameterize(&expr, cx.query_context())?;
        cx.user_parameters = parameter_names(&expr, cx.query_context());
        let expr = provider.preprocess(expr, &mut cx)?;

        // Translation
        let translated = {
            let mut translator = provider.queryable_translator(&mut cx);
            QueryableMethodTranslator::new(&mut *translator, false).translate(&expr)?
        };

        let translated = provider.postprocess(translated, &mut cx)?;
        let shaped = ShapedQuery::from_expr(&translated).ok_or_else(|| {
            Error::invalid_shape(format!(
                "postprocessing must produce a shaped query; found `{}`",
                Printer::print(&translated)
            ))
        })?;

        let compiled = ShapedQueryCompiler::new(&cx).compile(shaped)?;
        let result_ty = compiled.result_ty();

        let prologue: Vec<_> = cx
            .runtime_parameters
            .iter()
            .map(|(name, extractor)| {
                Expr::add_parameter(
                    cx.query_context(),
                    name,
                    Expr::invoke(extractor.clone(), vec![Expr::parameter(cx.query_context())]),
                )
            })
            .collect();

        let mut lifter = ConstantLifter::new();
        let lift_context = lifter.lift_context().clone();

        let mut exprs = vec![compiled.lambda().clone(), shaped.query_expression().clone()];
        exprs.extend(prologue);

        let (lifted, mut exprs) = match self.config.constant_mode {
            ConstantMode::Inline => {
                let lift = LiftContext::new(self.schema.clone());
                let exprs = exprs
                    .iter()
                    .map(|expr| inline_constants(expr, &lift))
                    .collect::<Result<Vec<_>>>()?;
                (LiftedConstants::default(), exprs)
            }
            ConstantMode::Lift => {
                let exprs = exprs
                    .iter()
                    .map(|expr| lifter.lift(expr))
                    .collect::<Result<Vec<_>>>()?;

                let mut reserved = self.config.reserved_names.clone();
                reserved.extend(cx.runtime_parameters.keys().cloned());

                let (lifted, exprs) = lifter.finish(&exprs, &reserved)?;
                debug!(slots = lifted.slots().len(), "lifted constants");
                (lifted, exprs)
            }
        };

        let prologue = exprs.split_off(2);
        let (Some(query_expression), Some(shaper)) = (exprs.pop(), exprs.pop()) else {
            return Err(err!("compiled plan is missing its shaper"));
        };

        Ok(CompiledQuery {
            query_expression,
            shaper,
            prologue,
            cardinality: compiled.cardinality(),
            is_async,
            tracking,
            lifted,
            lift_context,
            query_context: cx.query_context,
            result_ty,
            executor: provider.executor(),
        })
    }
}

impl Builder {
    pub fn schema(&mut self, schema: Arc<Schema>) -> &mut Self {
        self.schema = Some(schema);
        self
    }

    pub fn provider(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    pub fn build(&self) -> Result<QueryCompiler> {
        let schema = self
            .schema
            .clone()
            .ok_or_else(|| err!("a query compiler needs a schema"))?;
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| err!("a query compiler needs a provider"))?;

        Ok(QueryCompiler {
            schema,
            provider,
            config: self.config.clone(),
            cache: PlanCache::new(),
        })
    }
}

impl QueryCompilationContext {
    pub fn new(schema: Arc<Schema>, tracking: TrackingBehavior, is_async: bool) -> Self {
        Self {
            schema,
            tracking,
            is_async,
            query_context: Param::new("query_context", Type::QueryContext),
            runtime_parameters: IndexMap::new(),
            user_parameters: HashSet::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn tracking(&self) -> TrackingBehavior {
        self.tracking
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn query_context(&self) -> &Param {
        &self.query_context
    }

    /// Registers a value computed from the query context before the store
    /// half runs, and returns the expression reading it.
    ///
    /// `extractor` must be a lambda taking the query context. The name gets
    /// a `__` prefix and is made unique among the registered parameters and
    /// the parameters the caller supplies.
    pub fn register_runtime_parameter(&mut self, name: &str, extractor: Expr) -> Result<Expr> {
        let Some(lambda) = extractor.as_lambda() else {
            return Err(Error::invalid_shape(format!(
                "a runtime parameter extractor must be a lambda; found `{}`",
                Printer::print(&extractor)
            )));
        };
        if lambda.params.len() != 1 || *lambda.params[0].ty() != Type::QueryContext {
            return Err(Error::invalid_shape(format!(
                "the extractor of runtime parameter `{name}` must take exactly the query context"
            )));
        }

        let ty = lambda.body.ty().clone();
        let mut unique = format!("__{name}");
        let mut counter = 0;
        while self.runtime_parameters.contains_key(&unique) || self.user_parameters.contains(&unique)
        {
            unique = format!("__{name}_{counter}");
            counter += 1;
        }

        trace!(name = %unique, "registered runtime parameter");
        let read = Expr::get_parameter(&self.query_context, &unique, ty);
        self.runtime_parameters.insert(unique, extractor);
        Ok(read)
    }

    pub fn runtime_parameters(&self) -> impl Iterator<Item = (&str, &Expr)> + '_ {
        self.runtime_parameters
            .iter()
            .map(|(name, extractor)| (name.as_str(), extractor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::expr::{Method, Value};

    fn cx() -> QueryCompilationContext {
        let schema = Arc::new(Schema::builder().build().unwrap());
        QueryCompilationContext::new(schema, TrackingBehavior::NoTracking, false)
    }

    #[test]
    fn runtime_parameters_get_unique_names() {
        let mut cx = cx();
        let extractor = Expr::lambda1("qc", Type::QueryContext, |_| Expr::constant(3));

        let first = cx.register_runtime_parameter("take", extractor.clone()).unwrap();
        let second = cx.register_runtime_parameter("take", extractor).unwrap();

        let names: Vec<_> = cx.runtime_parameters().map(|(name, _)| name).collect();
        assert_eq!(names, ["__take", "__take_0"]);

        let call = second.as_call().unwrap();
        assert_eq!(call.method, Method::GetParameter);
        assert_eq!(call.args[0].as_constant(), Some(&Value::from("__take_0")));
        assert_eq!(*first.ty(), Type::I32);
    }

    #[test]
    fn runtime_parameters_avoid_caller_parameters() {
        let mut cx = cx();
        cx.user_parameters.insert("__take".to_string());
        let extractor = Expr::lambda1("qc", Type::QueryContext, |_| Expr::constant(3));

        cx.register_runtime_parameter("take", extractor).unwrap();
        let names: Vec<_> = cx.runtime_parameters().map(|(name, _)| name).collect();
        assert_eq!(names, ["__take_0"]);
    }

    #[test]
    fn extractors_must_take_the_query_context() {
        let mut cx = cx();
        let extractor = Expr::lambda1("n", Type::I32, |n| n);

        let err = cx.register_runtime_parameter("take", extractor).unwrap_err();
        assert!(err.is_invalid_shape());
        assert_eq!(cx.runtime_parameters().count(), 0);
    }

    #[test]
    fn builder_requires_schema_and_provider() {
        assert!(QueryCompiler::builder().build().is_err());
    }
}
