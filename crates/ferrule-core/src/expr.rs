mod eq;
pub use eq::{ExprComparer, ExprHasher};

mod eval;
pub use eval::{Closure, Runtime};

#[allow(clippy::module_inception)]
mod expr;
pub use expr::{Expr, ExprKind, NodeType};

mod expr_binary_op;
pub use expr_binary_op::ExprBinaryOp;

mod expr_block;
pub use expr_block::ExprBlock;

mod expr_call;
pub use expr_call::ExprCall;

mod expr_conditional;
pub use expr_conditional::ExprConditional;

mod expr_constant;
pub use expr_constant::ExprConstant;

mod expr_extension;
pub use expr_extension::Extension;

mod expr_goto;
pub use expr_goto::{ExprGoto, GotoKind, LabelTarget};

mod expr_index;
pub use expr_index::ExprIndex;

mod expr_invoke;
pub use expr_invoke::ExprInvoke;

mod expr_label;
pub use expr_label::ExprLabel;

mod expr_lambda;
pub use expr_lambda::ExprLambda;

mod expr_loop;
pub use expr_loop::ExprLoop;

mod expr_member;
pub use expr_member::ExprMember;

mod expr_new;
pub use expr_new::ExprNew;

mod expr_new_array;
pub use expr_new_array::ExprNewArray;

mod expr_switch;
pub use expr_switch::{ExprSwitch, SwitchCase};

mod expr_throw;
pub use expr_throw::{Exception, ExprThrow};

mod expr_try;
pub use expr_try::{ExprCatch, ExprTry};

mod expr_type_is;
pub use expr_type_is::ExprTypeIs;

mod expr_unary_op;
pub use expr_unary_op::ExprUnaryOp;

mod method;
pub use method::Method;

mod object;
pub use object::Object;

mod op_binary;
pub use op_binary::BinaryOp;

mod op_unary;
pub use op_unary::UnaryOp;

mod param;
pub use param::Param;

mod print;
pub use print::Printer;

mod queryable_method;
pub use queryable_method::QueryableMethod;

pub mod rewrite;
pub use rewrite::Rewrite;

mod ty;
pub use ty::Type;

mod value;
pub use value::{Value, ValueBuffer};

mod value_stream;
pub use value_stream::ValueStream;

pub mod visit;
pub use visit::Visit;
