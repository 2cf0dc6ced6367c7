use super::{Expr, ExprKind, GotoKind, Method, Type, UnaryOp};
use std::fmt::Write;

/// Renders expression trees as readable text for diagnostics.
///
/// The output is meant for humans: it is stable enough to use in error
/// messages and tests, but nothing parses it back.
#[derive(Debug, Default)]
pub struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    pub fn print(expr: &Expr) -> String {
        let mut printer = Printer::default();
        printer.expr(expr);
        printer.out
    }

    /// Returns what was printed so far.
    pub fn into_string(self) -> String {
        self.out
    }

    pub fn text(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Prints `exprs` separated by commas.
    pub fn list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.text(", ");
            }
            self.expr(expr);
        }
    }

    pub fn expr(&mut self, expr: &Expr) {
        match expr.kind() {
            ExprKind::Binary(e) => {
                if e.op.is_assign() {
                    self.expr(&e.lhs);
                    self.text(" = ");
                    self.expr(&e.rhs);
                } else {
                    self.text("(");
                    self.expr(&e.lhs);
                    let _ = write!(self.out, " {} ", e.op);
                    self.expr(&e.rhs);
                    self.text(")");
                }
            }
            ExprKind::Unary(e) => match e.op {
                UnaryOp::Not => {
                    self.text("!");
                    self.expr(&e.operand);
                }
                UnaryOp::Negate => {
                    self.text("-");
                    self.expr(&e.operand);
                }
                UnaryOp::Convert => {
                    let _ = write!(self.out, "convert<{}>(", expr.ty());
                    self.expr(&e.operand);
                    self.text(")");
                }
                UnaryOp::IsNull => {
                    self.text("is_null(");
                    self.expr(&e.operand);
                    self.text(")");
                }
            },
            ExprKind::Conditional(e) => {
                self.text("(");
                self.expr(&e.test);
                self.text(" ? ");
                self.expr(&e.if_true);
                self.text(" : ");
                self.expr(&e.if_false);
                self.text(")");
            }
            ExprKind::Constant(e) => {
                let _ = write!(self.out, "{}", e.value);
            }
            ExprKind::Default => {
                let _ = write!(self.out, "default<{}>", expr.ty());
            }
            ExprKind::Member(e) => {
                self.expr(&e.target);
                self.text(".");
                self.text(&e.name);
            }
            ExprKind::Call(e) => match (&e.method, &e.target) {
                (Method::Queryable(method), _) => {
                    let (source, args) = e.args.split_first().map_or((None, &[][..]), |(s, a)| (Some(s), a));
                    if let Some(source) = source {
                        self.expr(source);
                        self.text(".");
                    }
                    self.text(method.name());
                    self.text("(");
                    self.list(args);
                    self.text(")");
                }
                (Method::Property(name), _) => {
                    self.text("property(");
                    self.list(&e.args);
                    let _ = write!(self.out, ", {name:?})");
                }
                (method, Some(target)) => {
                    self.expr(target);
                    self.text(".");
                    self.text(method.name());
                    self.text("(");
                    self.list(&e.args);
                    self.text(")");
                }
                (method, None) => {
                    self.text(method.name());
                    self.text("(");
                    self.list(&e.args);
                    self.text(")");
                }
            },
            ExprKind::New(e) => match expr.ty() {
                Type::Record(_) => {
                    self.text("(");
                    self.list(&e.args);
                    self.text(")");
                }
                ty => {
                    let _ = write!(self.out, "new {ty} {{ ");
                    for (i, (member, arg)) in e.members.iter().zip(&e.args).enumerate() {
                        if i > 0 {
                            self.text(", ");
                        }
                        self.text(member);
                        self.text(": ");
                        self.expr(arg);
                    }
                    self.text(" }");
                }
            },
            ExprKind::NewArray(e) => {
                self.text("[");
                self.list(&e.items);
                self.text("]");
            }
            ExprKind::Lambda(e) => {
                self.text("|");
                for (i, param) in e.params.iter().enumerate() {
                    if i > 0 {
                        self.text(", ");
                    }
                    self.text(param.name());
                }
                self.text("| ");
                self.expr(&e.body);
            }
            ExprKind::Parameter(param) => self.text(param.name()),
            ExprKind::Block(e) => {
                self.text("{");
                self.indent();
                for variable in &e.variables {
                    self.newline();
                    let _ = write!(self.out, "let {}: {};", variable.name(), variable.ty());
                }
                for (i, expr) in e.exprs.iter().enumerate() {
                    self.newline();
                    self.expr(expr);
                    if i + 1 < e.exprs.len() {
                        self.text(";");
                    }
                }
                self.dedent();
                self.newline();
                self.text("}");
            }
            ExprKind::Try(e) => {
                self.text("try ");
                self.expr(&e.body);
                if let Some(catch) = &e.catch {
                    self.text(" catch");
                    if let Some(param) = &catch.param {
                        let _ = write!(self.out, " ({})", param.name());
                    }
                    self.text(" ");
                    self.expr(&catch.body);
                }
                if let Some(finally) = &e.finally {
                    self.text(" finally ");
                    self.expr(finally);
                }
            }
            ExprKind::Switch(e) => {
                self.text("switch ");
                self.expr(&e.value);
                self.text(" {");
                self.indent();
                for case in &e.cases {
                    self.newline();
                    self.text("case ");
                    self.list(&case.tests);
                    self.text(" => ");
                    self.expr(&case.body);
                    self.text(",");
                }
                if let Some(default) = &e.default {
                    self.newline();
                    self.text("default => ");
                    self.expr(default);
                    self.text(",");
                }
                self.dedent();
                self.newline();
                self.text("}");
            }
            ExprKind::Index(e) => {
                self.expr(&e.target);
                self.text("[");
                self.expr(&e.index);
                self.text("]");
            }
            ExprKind::Invoke(e) => {
                self.text("(");
                self.expr(&e.func);
                self.text(")(");
                self.list(&e.args);
                self.text(")");
            }
            ExprKind::Loop(e) => {
                self.text("loop ");
                self.expr(&e.body);
            }
            ExprKind::Goto(e) => {
                let _ = write!(self.out, "{} '{}", e.kind, e.target.name());
                if let Some(value) = &e.value {
                    if e.kind != GotoKind::Continue {
                        self.text(" ");
                        self.expr(value);
                    }
                }
            }
            ExprKind::Label(e) => {
                let _ = write!(self.out, "'{}:", e.target.name());
                if let Some(default) = &e.default {
                    self.text(" ");
                    self.expr(default);
                }
            }
            ExprKind::TypeIs(e) => {
                self.expr(&e.operand);
                let _ = write!(self.out, " is {}", Type::Model(e.model));
            }
            ExprKind::Throw(e) => {
                let _ = write!(self.out, "throw {}", e.exception);
                if let Some(value) = &e.value {
                    self.text("(");
                    self.expr(value);
                    self.text(")");
                }
            }
            ExprKind::Extension(extension) => extension.print(self),
        }
    }
}
