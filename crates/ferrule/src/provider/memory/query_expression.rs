use ferrule_core::{
    expr::{rewrite, Expr, Extension, Printer, Rewrite, Type, Visit},
    schema::ModelId,
    Result,
};
use std::any::Any;

/// The store half of a query against the in-memory store.
///
/// A source of rows followed by the operations applied to them, in order.
/// Row functions are lambdas taking the row as a value buffer; counts and
/// items are evaluated once per execution.
#[derive(Debug, Clone)]
pub struct MemoryQueryExpression {
    source: Source,
    operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
pub enum Source {
    /// Every row stored for a hierarchy, by its root
    Table(ModelId),

    /// One single-column row per value
    Values(Vec<Expr>),

    /// One single-column row per item of a list-valued expression
    List(Expr),
}

#[derive(Debug, Clone)]
pub enum Operation {
    Filter(Expr),

    /// Stable ordering by the keys, the first key most significant
    OrderBy(Vec<OrderKey>),

    Skip(Expr),
    Take(Expr),
    SkipWhile(Expr),
    TakeWhile(Expr),
    Reverse,

    /// Drops rows whose key repeats an earlier one. Without a key, whole
    /// rows are compared.
    Distinct(Option<Expr>),

    Set {
        kind: SetKind,
        other: Expr,
        key: Option<Expr>,
    },

    /// Collapses the rows into one single-column row.
    Aggregate(Aggregate),
}

#[derive(Debug, Clone)]
pub struct OrderKey {
    pub key: Expr,
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Concat,
    Union,
    Except,
    Intersect,
}

#[derive(Debug, Clone)]
pub enum Aggregate {
    All(Expr),
    Any,
    Count,
    LongCount,
    Sum(Expr),
    Min(Expr),
    Max(Expr),
    Average(Expr),
    Contains { element: Expr, item: Expr },
}

impl MemoryQueryExpression {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            operations: vec![],
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn with(&self, operation: Operation) -> Self {
        let mut ret = self.clone();
        ret.operations.push(operation);
        ret
    }

    /// Adds `key` to the trailing ordering, if the last operation orders.
    pub fn then_by(&self, key: OrderKey) -> Option<Self> {
        let mut ret = self.clone();
        match ret.operations.last_mut() {
            Some(Operation::OrderBy(keys)) => {
                keys.push(key);
                Some(ret)
            }
            _ => None,
        }
    }

    /// Returns `true` once the rows were collapsed by an aggregate.
    pub fn is_aggregated(&self) -> bool {
        self.operations
            .iter()
            .any(|operation| matches!(operation, Operation::Aggregate(_)))
    }

    pub fn into_expr(self) -> Expr {
        Expr::extension(self)
    }

    fn children(&self) -> Vec<&Expr> {
        let mut children = vec![];

        match &self.source {
            Source::Table(_) => {}
            Source::Values(values) => children.extend(values),
            Source::List(list) => children.push(list),
        }

        for operation in &self.operations {
            match operation {
                Operation::Filter(expr)
                | Operation::Skip(expr)
                | Operation::Take(expr)
                | Operation::SkipWhile(expr)
                | Operation::TakeWhile(expr) => children.push(expr),
                Operation::OrderBy(keys) => children.extend(keys.iter().map(|key| &key.key)),
                Operation::Reverse => {}
                Operation::Distinct(key) => children.extend(key),
                Operation::Set { other, key, .. } => {
                    children.push(other);
                    children.extend(key);
                }
                Operation::Aggregate(aggregate) => match aggregate {
                    Aggregate::All(expr)
                    | Aggregate::Sum(expr)
                    | Aggregate::Min(expr)
                    | Aggregate::Max(expr)
                    | Aggregate::Average(expr) => children.push(expr),
                    Aggregate::Contains { element, item } => {
                        children.push(element);
                        children.push(item);
                    }
                    Aggregate::Any | Aggregate::Count | Aggregate::LongCount => {}
                },
            }
        }

        children
    }

    /// Rebuilds the expression with `children` in the order [`children`]
    /// yields them.
    ///
    /// [`children`]: MemoryQueryExpression::children
    fn with_children(&self, children: Vec<Expr>) -> Self {
        let mut children = children.into_iter();
        let mut ret = self.clone();
        let mut next = |expr: &mut Expr| {
            if let Some(child) = children.next() {
                *expr = child;
            }
        };

        match &mut ret.source {
            Source::Table(_) => {}
            Source::Values(values) => values.iter_mut().for_each(&mut next),
            Source::List(list) => next(list),
        }

        for operation in &mut ret.operations {
            match operation {
                Operation::Filter(expr)
                | Operation::Skip(expr)
                | Operation::Take(expr)
                | Operation::SkipWhile(expr)
                | Operation::TakeWhile(expr) => next(expr),
                Operation::OrderBy(keys) => keys.iter_mut().for_each(|key| next(&mut key.key)),
                Operation::Reverse => {}
                Operation::Distinct(key) => key.iter_mut().for_each(&mut next),
                Operation::Set { other, key, .. } => {
                    next(other);
                    key.iter_mut().for_each(&mut next);
                }
                Operation::Aggregate(aggregate) => match aggregate {
                    Aggregate::All(expr)
                    | Aggregate::Sum(expr)
                    | Aggregate::Min(expr)
                    | Aggregate::Max(expr)
                    | Aggregate::Average(expr) => next(expr),
                    Aggregate::Contains { element, item } => {
                        next(element);
                        next(item);
                    }
                    Aggregate::Any | Aggregate::Count | Aggregate::LongCount => {}
                },
            }
        }

        ret
    }
}

impl SetKind {
    fn name(self) -> &'static str {
        match self {
            SetKind::Concat => "concat",
            SetKind::Union => "union",
            SetKind::Except => "except",
            SetKind::Intersect => "intersect",
        }
    }
}

impl Aggregate {
    fn name(&self) -> &'static str {
        match self {
            Aggregate::All(_) => "all",
            Aggregate::Any => "any",
            Aggregate::Count => "count",
            Aggregate::LongCount => "long_count",
            Aggregate::Sum(_) => "sum",
            Aggregate::Min(_) => "min",
            Aggregate::Max(_) => "max",
            Aggregate::Average(_) => "average",
            Aggregate::Contains { .. } => "contains",
        }
    }
}

impl Extension for MemoryQueryExpression {
    fn name(&self) -> &str {
        "memory_query"
    }

    fn ty(&self) -> Type {
        Type::sequence(Type::ValueBuffer)
    }

    fn visit_children(&self, visit: &mut dyn Visit) {
        for child in self.children() {
            visit.visit_expr(child);
        }
    }

    fn rewrite_children(&self, r: &mut dyn Rewrite) -> Result<Option<Expr>> {
        Ok(rewrite::rewrite_all(r, &self.children())?
            .map(|children| self.with_children(children).into_expr()))
    }

    fn print(&self, printer: &mut Printer) {
        match &self.source {
            Source::Table(model) => printer.text(&format!("table({})", model.0)),
            Source::Values(values) => {
                printer.text("values[");
                printer.list(values);
                printer.text("]");
            }
            Source::List(list) => {
                printer.text("list(");
                printer.expr(list);
                printer.text(")");
            }
        }

        for operation in &self.operations {
            printer.text(".");
            match operation {
                Operation::Filter(expr) => call(printer, "filter", [expr]),
                Operation::OrderBy(keys) => {
                    printer.text("order_by(");
                    for (i, key) in keys.iter().enumerate() {
                        if i > 0 {
                            printer.text(", ");
                        }
                        printer.expr(&key.key);
                        if !key.ascending {
                            printer.text(" desc");
                        }
                    }
                    printer.text(")");
                }
                Operation::Skip(expr) => call(printer, "skip", [expr]),
                Operation::Take(expr) => call(printer, "take", [expr]),
                Operation::SkipWhile(expr) => call(printer, "skip_while", [expr]),
                Operation::TakeWhile(expr) => call(printer, "take_while", [expr]),
                Operation::Reverse => printer.text("reverse()"),
                Operation::Distinct(key) => call(printer, "distinct", key),
                Operation::Set { kind, other, key } => {
                    call(printer, kind.name(), std::iter::once(other).chain(key))
                }
                Operation::Aggregate(aggregate) => {
                    let name = aggregate.name();
                    match aggregate {
                        Aggregate::All(expr)
                        | Aggregate::Sum(expr)
                        | Aggregate::Min(expr)
                        | Aggregate::Max(expr)
                        | Aggregate::Average(expr) => call(printer, name, [expr]),
                        Aggregate::Contains { element, item } => {
                            call(printer, name, [element, item])
                        }
                        Aggregate::Any | Aggregate::Count | Aggregate::LongCount => {
                            call(printer, name, std::iter::empty())
                        }
                    }
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn call<'a>(printer: &mut Printer, name: &str, args: impl IntoIterator<Item = &'a Expr>) {
    printer.text(name);
    printer.text("(");
    for (i, arg) in args.into_iter().enumerate() {
        if i > 0 {
            printer.text(", ");
        }
        printer.expr(arg);
    }
    printer.text(")");
}
