use super::{name_hint, LiftedConstant};
use ferrule_core::{
    expr::{visit, Expr, ExprComparer, ExprHasher, ExprKind, Param, Rewrite, Visit},
    Error, Result,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The optimized slots of a lifted plan, in evaluation order, with the
/// substitutions the optimization made.
#[derive(Debug, Clone, Default)]
pub struct LiftedConstants {
    slots: Vec<LiftedConstant>,
    substitutions: HashMap<Param, Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seen {
    Once,
    Multiple,
}

struct Fragment {
    expr: Expr,
    seen: Seen,
    hoisted: Option<Param>,
}

/// Fragments of the resolver bodies, keyed by structure.
#[derive(Default)]
struct Fragments {
    buckets: HashMap<u64, Vec<usize>>,
    entries: Vec<Fragment>,

    /// Parameters a hoisted fragment may reference: the lift context and
    /// the slot variables.
    globals: HashSet<Param>,
}

impl LiftedConstants {
    pub fn slots(&self) -> &[LiftedConstant] {
        &self.slots
    }

    /// Old slot variable to its replacement, for variables that were
    /// renamed or merged into another slot.
    pub fn substitutions(&self) -> &HashMap<Param, Expr> {
        &self.substitutions
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Optimizes a list of lifted slots.
///
/// Fragments recurring across the resolver bodies are hoisted into their own
/// slots; a body identical to an earlier one is dropped and its variable
/// redirected. Names are then made unique against `reserved` and each
/// other, and every rename and redirection is applied to the surviving
/// bodies. The returned slots never reference a later slot.
pub fn optimize(
    lift_context: &Param,
    slots: Vec<LiftedConstant>,
    reserved: &HashSet<String>,
) -> Result<LiftedConstants> {
    let mut fragments = Fragments::default();
    fragments.globals.insert(lift_context.clone());
    fragments
        .globals
        .extend(slots.iter().map(|slot| slot.param.clone()));

    // Pass 1: count every fragment.
    for slot in &slots {
        let mut marker = Marker {
            fragments: &mut fragments,
            err: None,
        };
        marker.visit_expr(&slot.body);
        if let Some(err) = marker.err {
            return Err(err);
        }
    }

    // Pass 2: hoist the fragments seen more than once.
    let mut out = Vec::with_capacity(slots.len());
    let mut redirects = HashMap::new();

    for slot in slots {
        if let Some(i) = fragments.find_multiple(&slot.body)? {
            if let Some(existing) = &fragments.entries[i].hoisted {
                debug!(
                    slot = slot.name(),
                    existing = existing.name(),
                    "merged duplicate lifted constant"
                );
                redirects.insert(slot.param, existing.clone());
                continue;
            }

            // The slot itself becomes the home of the fragment.
            let body = slot.body.rewrite_children(&mut Hoister {
                fragments: &mut fragments,
                out: &mut out,
            })?;
            fragments.entries[i].hoisted = Some(slot.param.clone());
            out.push(LiftedConstant::new(slot.param, body));
            continue;
        }

        let body = Hoister {
            fragments: &mut fragments,
            out: &mut out,
        }
        .rewrite_expr(&slot.body)?;
        out.push(LiftedConstant::new(slot.param, body));
    }

    // Make names unique.
    let mut used = reserved.clone();
    let mut renames = HashMap::new();

    for slot in &mut out {
        let name = unique_name(slot.name(), &used);
        if name != slot.name() {
            let renamed = slot.param.renamed(name.clone());
            renames.insert(slot.param.clone(), renamed.clone());
            slot.param = renamed;
        }
        used.insert(name);
    }

    let mut substitutions: HashMap<Param, Expr> = renames
        .iter()
        .map(|(old, new)| (old.clone(), Expr::parameter(new)))
        .collect();
    for (old, target) in redirects {
        let target = renames.get(&target).unwrap_or(&target);
        substitutions.insert(old, Expr::parameter(target));
    }

    for slot in &mut out {
        slot.body = slot.body.replace_params(&substitutions)?;
    }

    verify_no_forward_references(lift_context, &out)?;

    Ok(LiftedConstants {
        slots: out,
        substitutions,
    })
}

/// Checks that every slot only references the lift context and slots
/// defined before it.
pub(crate) fn verify_no_forward_references(
    lift_context: &Param,
    slots: &[LiftedConstant],
) -> Result<()> {
    let mut defined = HashSet::from([lift_context.clone()]);

    for slot in slots {
        for param in free_params(&slot.body) {
            if !defined.contains(&param) {
                return Err(Error::invalid_shape(format!(
                    "lifted constant `{}` references `{}` before it is defined",
                    slot.name(),
                    param.name()
                )));
            }
        }
        defined.insert(slot.param.clone());
    }

    Ok(())
}

/// Parameters referenced by `expr` but bound outside of it.
fn free_params(expr: &Expr) -> Vec<Param> {
    let mut referenced = vec![];
    let mut bound = HashSet::new();

    visit::for_each_expr(expr, |expr| match expr.kind() {
        ExprKind::Parameter(param) => referenced.push(param.clone()),
        ExprKind::Lambda(lambda) => bound.extend(lambda.params.iter().cloned()),
        ExprKind::Block(block) => bound.extend(block.variables.iter().cloned()),
        ExprKind::Try(e) => bound.extend(e.catch.iter().filter_map(|catch| catch.param.clone())),
        _ => {}
    });

    referenced.retain(|param| !bound.contains(param));
    referenced
}

fn unique_name(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }

    let mut counter = 0;
    loop {
        let candidate = format!("{base}{counter}");
        if !used.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

impl Fragments {
    /// Returns `true` for fragments worth hoisting: anything but leaves and
    /// lambdas, and only when it references no locally bound parameter.
    fn is_candidate(&self, expr: &Expr) -> bool {
        if matches!(
            expr.kind(),
            ExprKind::Parameter(_) | ExprKind::Constant(_) | ExprKind::Lambda(_) | ExprKind::Default
        ) {
            return false;
        }
        free_params(expr)
            .iter()
            .all(|param| self.globals.contains(param))
    }

    fn find(&self, expr: &Expr) -> Result<Option<usize>> {
        let hash = ExprHasher::hash(expr)?;
        for &i in self.buckets.get(&hash).into_iter().flatten() {
            if ExprComparer::equals(&self.entries[i].expr, expr)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn find_multiple(&self, expr: &Expr) -> Result<Option<usize>> {
        if !self.is_candidate(expr) {
            return Ok(None);
        }
        Ok(self
            .find(expr)?
            .filter(|&i| self.entries[i].seen == Seen::Multiple))
    }

    /// Records an encounter. Returns `true` on the first one.
    fn record(&mut self, expr: &Expr) -> Result<bool> {
        if let Some(i) = self.find(expr)? {
            self.entries[i].seen = Seen::Multiple;
            return Ok(false);
        }

        let hash = ExprHasher::hash(expr)?;
        self.buckets.entry(hash).or_default().push(self.entries.len());
        self.entries.push(Fragment {
            expr: expr.clone(),
            seen: Seen::Once,
            hoisted: None,
        });
        Ok(true)
    }
}

/// Pass 1: marks fragments as seen once or several times. The children of
/// a repeated fragment were counted at its first encounter and are skipped.
struct Marker<'a> {
    fragments: &'a mut Fragments,
    err: Option<Error>,
}

impl Visit for Marker<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if self.err.is_some() || expr.is_lambda() {
            return;
        }

        if self.fragments.is_candidate(expr) {
            match self.fragments.record(expr) {
                Ok(true) => {}
                Ok(false) => return,
                Err(err) => {
                    self.err = Some(err);
                    return;
                }
            }
        }

        visit::visit_expr(self, expr);
    }
}

/// Pass 2: replaces repeated fragments with their hoisted variable, hoisting
/// on first encounter into a slot placed before the current one.
struct Hoister<'a> {
    fragments: &'a mut Fragments,
    out: &'a mut Vec<LiftedConstant>,
}

impl Rewrite for Hoister<'_> {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        if expr.is_lambda() {
            return Ok(expr.clone());
        }

        let Some(i) = self.fragments.find_multiple(expr)? else {
            return expr.rewrite_children(self);
        };

        if let Some(param) = &self.fragments.entries[i].hoisted {
            return Ok(Expr::parameter(param));
        }

        let body = expr.rewrite_children(self)?;
        let param = Param::new(name_hint(expr), expr.ty().clone());
        debug!(slot = param.name(), "hoisted shared lifted fragment");

        self.fragments.entries[i].hoisted = Some(param.clone());
        self.fragments.globals.insert(param.clone());
        self.out.push(LiftedConstant::new(param.clone(), body));
        Ok(Expr::parameter(&param))
    }
}
