use super::*;
use std::{fmt, sync::Arc};

/// An immutable expression node.
///
/// An `Expr` is a reference-counted handle: cloning it shares the node, and
/// subtrees may be shared between trees. Nodes are never mutated once built;
/// passes rebuild the path from a changed child up to the root and hand back
/// the original node wherever nothing changed, so [`Expr::ptr_eq`] is a cheap
/// "did anything change" check.
#[derive(Clone)]
pub struct Expr {
    node: Arc<Node>,
}

struct Node {
    ty: Type,
    kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Binary operation, including assignment to a variable
    Binary(ExprBinaryOp),

    /// Unary operation: not, negate, convert, is-null
    Unary(ExprUnaryOp),

    /// `test ? if_true : if_false`
    Conditional(ExprConditional),

    /// Evaluates to a constant value
    Constant(ExprConstant),

    /// The zero value of the expression's type
    Default,

    /// Reads a named member of the target
    Member(ExprMember),

    /// Calls a method
    Call(ExprCall),

    /// Constructs an object or record from arguments
    New(ExprNew),

    /// Constructs a list from items
    NewArray(ExprNewArray),

    /// A function literal
    Lambda(ExprLambda),

    /// References a lambda parameter or block variable
    Parameter(Param),

    /// A sequence of expressions with scoped variables
    Block(ExprBlock),

    /// Try / catch / finally
    Try(ExprTry),

    /// Multi-way branch on a value
    Switch(ExprSwitch),

    /// Positional access into a list, record or row
    Index(ExprIndex),

    /// Invokes a function value
    Invoke(ExprInvoke),

    /// Repeats its body until a break
    Loop(ExprLoop),

    /// Jumps to a label
    Goto(ExprGoto),

    /// A jump target
    Label(ExprLabel),

    /// Tests whether an object is an instance of a model
    TypeIs(ExprTypeIs),

    /// Raises an error
    Throw(ExprThrow),

    /// A node kind defined outside of this crate
    Extension(Arc<dyn Extension>),
}

/// The kind of an expression node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Binary,
    Unary,
    Conditional,
    Constant,
    Default,
    Member,
    Call,
    New,
    NewArray,
    Lambda,
    Parameter,
    Block,
    Try,
    Switch,
    Index,
    Invoke,
    Loop,
    Goto,
    Label,
    TypeIs,
    Throw,
    Extension,
}

impl Expr {
    /// Builds a node from its parts without checking that `ty` agrees with
    /// the payload. Prefer the typed constructors.
    pub fn from_parts(ty: Type, kind: ExprKind) -> Self {
        Self {
            node: Arc::new(Node { ty, kind }),
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.node.kind
    }

    /// The static type of the value this expression evaluates to.
    pub fn ty(&self) -> &Type {
        &self.node.ty
    }

    pub fn node_type(&self) -> NodeType {
        match &self.node.kind {
            ExprKind::Binary(_) => NodeType::Binary,
            ExprKind::Unary(_) => NodeType::Unary,
            ExprKind::Conditional(_) => NodeType::Conditional,
            ExprKind::Constant(_) => NodeType::Constant,
            ExprKind::Default => NodeType::Default,
            ExprKind::Member(_) => NodeType::Member,
            ExprKind::Call(_) => NodeType::Call,
            ExprKind::New(_) => NodeType::New,
            ExprKind::NewArray(_) => NodeType::NewArray,
            ExprKind::Lambda(_) => NodeType::Lambda,
            ExprKind::Parameter(_) => NodeType::Parameter,
            ExprKind::Block(_) => NodeType::Block,
            ExprKind::Try(_) => NodeType::Try,
            ExprKind::Switch(_) => NodeType::Switch,
            ExprKind::Index(_) => NodeType::Index,
            ExprKind::Invoke(_) => NodeType::Invoke,
            ExprKind::Loop(_) => NodeType::Loop,
            ExprKind::Goto(_) => NodeType::Goto,
            ExprKind::Label(_) => NodeType::Label,
            ExprKind::TypeIs(_) => NodeType::TypeIs,
            ExprKind::Throw(_) => NodeType::Throw,
            ExprKind::Extension(_) => NodeType::Extension,
        }
    }

    /// Returns `true` if both handles point at the same node.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.node, &b.node)
    }

    /// The zero value of `ty`.
    pub fn default_of(ty: Type) -> Self {
        Self::from_parts(ty, ExprKind::Default)
    }

    pub fn extension(extension: impl Extension) -> Self {
        let ty = extension.ty();
        Self::from_parts(ty, ExprKind::Extension(Arc::new(extension)))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(_))
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind(), ExprKind::Parameter(_))
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.kind(), ExprKind::Lambda(_))
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self.kind() {
            ExprKind::Constant(constant) => Some(&constant.value),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&Param> {
        match self.kind() {
            ExprKind::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&ExprLambda> {
        match self.kind() {
            ExprKind::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&ExprCall> {
        match self.kind() {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_unary(&self) -> Option<&ExprUnaryOp> {
        match self.kind() {
            ExprKind::Unary(unary) => Some(unary),
            _ => None,
        }
    }

    pub fn as_extension(&self) -> Option<&Arc<dyn Extension>> {
        match self.kind() {
            ExprKind::Extension(extension) => Some(extension),
            _ => None,
        }
    }

    /// Downcasts an extension node to its concrete type.
    pub fn downcast_ref<T: Extension>(&self) -> Option<&T> {
        self.as_extension()?.as_any().downcast_ref::<T>()
    }

    /// Returns `true` if this is an extension node of type `T`.
    pub fn is<T: Extension>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("Expr")
                .field("ty", &self.node.ty)
                .field("kind", &self.node.kind)
                .finish()
        } else {
            fmt::Display::fmt(self, f)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::print(self))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Unary => "unary",
            Self::Conditional => "conditional",
            Self::Constant => "constant",
            Self::Default => "default",
            Self::Member => "member",
            Self::Call => "call",
            Self::New => "new",
            Self::NewArray => "new_array",
            Self::Lambda => "lambda",
            Self::Parameter => "parameter",
            Self::Block => "block",
            Self::Try => "try",
            Self::Switch => "switch",
            Self::Index => "index",
            Self::Invoke => "invoke",
            Self::Loop => "loop",
            Self::Goto => "goto",
            Self::Label => "label",
            Self::TypeIs => "type_is",
            Self::Throw => "throw",
            Self::Extension => "extension",
        };
        f.write_str(name)
    }
}
