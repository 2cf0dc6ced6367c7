use super::{Expr, ExprKind, Type};
use crate::schema::ModelId;

/// Constructs an object, record or context from its arguments.
///
/// For models, `members[i]` names the field `args[i]` initializes. Records
/// are positional and leave `members` empty.
#[derive(Debug, Clone)]
pub struct ExprNew {
    pub args: Vec<Expr>,
    pub members: Vec<String>,
}

impl Expr {
    pub fn new_model(model: ModelId, members: Vec<String>, args: Vec<Expr>) -> Self {
        debug_assert_eq!(members.len(), args.len());
        Expr::from_parts(Type::Model(model), ExprKind::New(ExprNew { args, members }))
    }

    pub fn record(args: Vec<Expr>) -> Self {
        let ty = Type::Record(args.iter().map(|arg| arg.ty().clone()).collect());
        Expr::from_parts(
            ty,
            ExprKind::New(ExprNew {
                args,
                members: vec![],
            }),
        )
    }

    /// Binds a row buffer together with the runtime context.
    pub fn materialization_context(buffer: impl Into<Self>, context: impl Into<Self>) -> Self {
        Expr::from_parts(
            Type::MaterializationContext,
            ExprKind::New(ExprNew {
                args: vec![buffer.into(), context.into()],
                members: vec!["value_buffer".to_string(), "context".to_string()],
            }),
        )
    }

    pub fn as_new(&self) -> Option<&ExprNew> {
        match self.kind() {
            ExprKind::New(new) => Some(new),
            _ => None,
        }
    }
}
