use crate::engine::{EntityQueryRoot, InlineQueryRoot, ParameterQueryRoot, ShapedQuery};
use ferrule_core::expr::{Expr, Type};

/// The store-specific half of query translation.
///
/// The dispatcher calls one hook per sequence operator, handing over the
/// already translated source. A hook returns the translated query, or
/// `None` when the store cannot express the operator; it may record why
/// through [`take_translation_error_details`]. Hooks never fail.
///
/// Zero-or-one operators (first, last, single, element-at) receive a source
/// whose cardinality the dispatcher has already set.
///
/// [`take_translation_error_details`]: QueryableTranslator::take_translation_error_details
pub trait QueryableTranslator {
    /// Translates the set of all instances of a model.
    fn create_shaped_query(&mut self, root: &EntityQueryRoot) -> Option<ShapedQuery>;

    fn translate_inline_query_root(&mut self, root: &InlineQueryRoot) -> Option<ShapedQuery> {
        let _ = root;
        None
    }

    fn translate_parameter_query_root(&mut self, root: &ParameterQueryRoot) -> Option<ShapedQuery> {
        let _ = root;
        None
    }

    fn translate_all(&mut self, source: ShapedQuery, predicate: &Expr) -> Option<ShapedQuery>;

    fn translate_any(&mut self, source: ShapedQuery, predicate: Option<&Expr>)
        -> Option<ShapedQuery>;

    fn translate_average(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery>;

    fn translate_cast(&mut self, source: ShapedQuery, ty: &Type) -> Option<ShapedQuery>;

    fn translate_concat(&mut self, source: ShapedQuery, other: ShapedQuery) -> Option<ShapedQuery>;

    fn translate_contains(&mut self, source: ShapedQuery, item: &Expr) -> Option<ShapedQuery>;

    fn translate_count(&mut self, source: ShapedQuery, predicate: Option<&Expr>)
        -> Option<ShapedQuery>;

    fn translate_default_if_empty(
        &mut self,
        source: ShapedQuery,
        default: Option<&Expr>,
    ) -> Option<ShapedQuery>;

    fn translate_distinct(&mut self, source: ShapedQuery) -> Option<ShapedQuery>;

    fn translate_element_at(
        &mut self,
        source: ShapedQuery,
        index: &Expr,
        or_default: bool,
    ) -> Option<ShapedQuery>;

    fn translate_except(&mut self, source: ShapedQuery, other: ShapedQuery) -> Option<ShapedQuery>;

    fn translate_first_or_default(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
        result_ty: &Type,
        or_default: bool,
    ) -> Option<ShapedQuery>;

    fn translate_group_by(
        &mut self,
        source: ShapedQuery,
        key_selector: &Expr,
        element_selector: Option<&Expr>,
        result_selector: Option<&Expr>,
    ) -> Option<ShapedQuery>;

    fn translate_group_join(
        &mut self,
        outer: ShapedQuery,
        inner: ShapedQuery,
        outer_key: &Expr,
        inner_key: &Expr,
        result_selector: &Expr,
    ) -> Option<ShapedQuery>;

    fn translate_intersect(&mut self, source: ShapedQuery, other: ShapedQuery)
        -> Option<ShapedQuery>;

    fn translate_join(
        &mut self,
        outer: ShapedQuery,
        inner: ShapedQuery,
        outer_key: &Expr,
        inner_key: &Expr,
        result_selector: &Expr,
    ) -> Option<ShapedQuery>;

    fn translate_last_or_default(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
        result_ty: &Type,
        or_default: bool,
    ) -> Option<ShapedQuery>;

    fn translate_left_join(
        &mut self,
        outer: ShapedQuery,
        inner: ShapedQuery,
        outer_key: &Expr,
        inner_key: &Expr,
        result_selector: &Expr,
    ) -> Option<ShapedQuery>;

    fn translate_long_count(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
    ) -> Option<ShapedQuery>;

    fn translate_max(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery>;

    fn translate_min(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery>;

    fn translate_of_type(&mut self, source: ShapedQuery, ty: &Type) -> Option<ShapedQuery>;

    fn translate_order_by(
        &mut self,
        source: ShapedQuery,
        key_selector: &Expr,
        ascending: bool,
    ) -> Option<ShapedQuery>;

    fn translate_reverse(&mut self, source: ShapedQuery) -> Option<ShapedQuery>;

    fn translate_select(&mut self, source: ShapedQuery, selector: &Expr) -> Option<ShapedQuery>;

    fn translate_select_many(
        &mut self,
        source: ShapedQuery,
        collection_selector: &Expr,
        result_selector: Option<&Expr>,
    ) -> Option<ShapedQuery>;

    fn translate_single_or_default(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
        result_ty: &Type,
        or_default: bool,
    ) -> Option<ShapedQuery>;

    fn translate_skip(&mut self, source: ShapedQuery, count: &Expr) -> Option<ShapedQuery>;

    fn translate_skip_while(&mut self, source: ShapedQuery, predicate: &Expr)
        -> Option<ShapedQuery>;

    fn translate_sum(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery>;

    fn translate_take(&mut self, source: ShapedQuery, count: &Expr) -> Option<ShapedQuery>;

    fn translate_take_while(&mut self, source: ShapedQuery, predicate: &Expr)
        -> Option<ShapedQuery>;

    fn translate_then_by(
        &mut self,
        source: ShapedQuery,
        key_selector: &Expr,
        ascending: bool,
    ) -> Option<ShapedQuery>;

    fn translate_union(&mut self, source: ShapedQuery, other: ShapedQuery) -> Option<ShapedQuery>;

    fn translate_where(&mut self, source: ShapedQuery, predicate: &Expr) -> Option<ShapedQuery>;

    /// Gives the store a chance at a sequence reached through a member of a
    /// receiver that is not itself a translated query, such as a collection
    /// navigation.
    fn translate_member_access(
        &mut self,
        receiver: &Expr,
        member: &str,
        ty: &Type,
    ) -> Option<ShapedQuery> {
        let _ = (receiver, member, ty);
        None
    }

    /// Drains the reasons recorded by hooks that returned `None`.
    fn take_translation_error_details(&mut self) -> Vec<String> {
        vec![]
    }
}
