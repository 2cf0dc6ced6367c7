//! Source export of compiled plans.

use super::CompiledQuery;
use ferrule_core::expr::Printer;

/// Renders `plan` as a function of the lift context and the query context.
///
/// The lifted slots come first, one `let` per slot in evaluation order,
/// followed by the prologue and by the store half paired with the shaper.
/// Slots only reference the lift context and earlier slots, so the text
/// reads top to bottom.
pub fn render_executor(plan: &CompiledQuery) -> String {
    let mut printer = Printer::default();
    printer.text(&format!(
        "|{}, {}| {{",
        plan.lift_context().name(),
        plan.query_context().name()
    ));
    printer.indent();

    for slot in plan.lifted().slots() {
        printer.newline();
        printer.text(&format!("let {}: {} = ", slot.name(), slot.ty()));
        printer.expr(slot.body());
        printer.text(";");
    }

    for statement in plan.prologue() {
        printer.newline();
        printer.expr(statement);
        printer.text(";");
    }

    printer.newline();
    printer.text("execute(");
    printer.indent();
    printer.newline();
    printer.expr(plan.query_expression());
    printer.text(",");
    printer.newline();
    printer.expr(plan.shaper());
    printer.dedent();
    printer.newline();
    printer.text(")");

    printer.dedent();
    printer.newline();
    printer.text("}");
    printer.into_string()
}
