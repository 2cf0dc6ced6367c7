use super::{Expr, ExprKind, Method, QueryableMethod, Type};

/// A method call.
///
/// Sequence operators are static: `target` is `None` and the source is the
/// first argument.
#[derive(Debug, Clone)]
pub struct ExprCall {
    pub method: Method,
    pub target: Option<Expr>,
    pub args: Vec<Expr>,
}

impl ExprCall {
    /// The source sequence of a sequence operator call.
    pub fn source(&self) -> Option<&Expr> {
        match self.method {
            Method::Queryable(_) => self.args.first(),
            _ => None,
        }
    }

    pub fn queryable_method(&self) -> Option<QueryableMethod> {
        self.method.as_queryable()
    }
}

impl Expr {
    pub fn call(method: impl Into<Method>, target: Option<Expr>, args: Vec<Expr>, ty: Type) -> Self {
        Expr::from_parts(
            ty,
            ExprKind::Call(ExprCall {
                method: method.into(),
                target,
                args,
            }),
        )
    }

    /// Applies a sequence operator to `source` and the remaining `args`.
    pub fn queryable(method: QueryableMethod, source: Expr, args: Vec<Expr>, ty: Type) -> Self {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(source);
        all.extend(args);
        Expr::call(method, None, all, ty)
    }

    /// Reads a mapped property by name.
    pub fn property(target: impl Into<Self>, name: impl Into<String>, ty: Type) -> Self {
        Expr::call(Method::Property(name.into()), None, vec![target.into()], ty)
    }

    /// Reads column `index` of a row as `ty`.
    pub fn read_value(buffer: impl Into<Self>, index: usize, ty: Type) -> Self {
        Expr::call(
            Method::ReadValue,
            Some(buffer.into()),
            vec![Expr::constant(index as i64)],
            ty,
        )
    }

    pub fn get_parameter(context: impl Into<Self>, name: &str, ty: Type) -> Self {
        Expr::call(
            Method::GetParameter,
            Some(context.into()),
            vec![Expr::constant(name)],
            ty,
        )
    }

    pub fn add_parameter(context: impl Into<Self>, name: &str, value: impl Into<Self>) -> Self {
        Expr::call(
            Method::AddParameter,
            Some(context.into()),
            vec![Expr::constant(name), value.into()],
            Type::Unit,
        )
    }

    pub fn find_model(lift_context: impl Into<Self>, name: &str) -> Self {
        Expr::call(
            Method::FindModel,
            Some(lift_context.into()),
            vec![Expr::constant(name)],
            Type::TypeDescriptor,
        )
    }

    pub fn find_field(model: impl Into<Self>, name: &str) -> Self {
        Expr::call(
            Method::FindField,
            Some(model.into()),
            vec![Expr::constant(name)],
            Type::Descriptor,
        )
    }

    pub fn find_navigation(model: impl Into<Self>, name: &str) -> Self {
        Expr::call(
            Method::FindNavigation,
            Some(model.into()),
            vec![Expr::constant(name)],
            Type::Descriptor,
        )
    }

    pub fn find_primary_key(model: impl Into<Self>) -> Self {
        Expr::call(
            Method::FindPrimaryKey,
            Some(model.into()),
            vec![],
            Type::Descriptor,
        )
    }

    /// Probes the identity map. Evaluates to `(entry or null, has_null_key)`.
    pub fn try_get_entry(
        context: impl Into<Self>,
        key: impl Into<Self>,
        key_values: impl Into<Self>,
        throw_on_null: bool,
    ) -> Self {
        Expr::call(
            Method::TryGetEntry,
            Some(context.into()),
            vec![key.into(), key_values.into(), Expr::constant(throw_on_null)],
            Type::Record(vec![Type::Entry, Type::Bool]),
        )
    }

    pub fn start_tracking(
        context: impl Into<Self>,
        model: impl Into<Self>,
        instance: impl Into<Self>,
        shadow: impl Into<Self>,
    ) -> Self {
        Expr::call(
            Method::StartTracking,
            Some(context.into()),
            vec![model.into(), instance.into(), shadow.into()],
            Type::Entry,
        )
    }

    pub fn entry_instance(entry: impl Into<Self>, ty: Type) -> Self {
        Expr::call(Method::EntryInstance, Some(entry.into()), vec![], ty)
    }

    /// Returns the queryable method if this is a sequence operator call.
    pub fn queryable_method(&self) -> Option<QueryableMethod> {
        self.as_call()?.queryable_method()
    }
}
