use ferrule_core::expr::{Expr, QueryableMethod};

/// A sequence operator call, parsed once from its method and arguments.
///
/// Arguments exclude the source. Overloads that differ only by an optional
/// predicate or selector map onto one variant.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Operator<'a> {
    All {
        predicate: &'a Expr,
    },
    Any {
        predicate: Option<&'a Expr>,
    },
    Average {
        selector: Option<&'a Expr>,
    },
    Cast,
    Concat {
        other: &'a Expr,
    },
    Contains {
        item: &'a Expr,
    },
    Count {
        predicate: Option<&'a Expr>,
    },
    DefaultIfEmpty {
        default: Option<&'a Expr>,
    },
    Distinct,
    ElementAt {
        index: &'a Expr,
        or_default: bool,
    },
    Except {
        other: &'a Expr,
    },
    First {
        predicate: Option<&'a Expr>,
        or_default: bool,
    },
    GroupBy {
        key: &'a Expr,
        element: Option<&'a Expr>,
        result: Option<&'a Expr>,
    },
    GroupJoin {
        inner: &'a Expr,
        outer_key: &'a Expr,
        inner_key: &'a Expr,
        result: &'a Expr,
    },
    Intersect {
        other: &'a Expr,
    },
    Join {
        inner: &'a Expr,
        outer_key: &'a Expr,
        inner_key: &'a Expr,
        result: &'a Expr,
    },
    Last {
        predicate: Option<&'a Expr>,
        or_default: bool,
    },
    LeftJoin {
        inner: &'a Expr,
        outer_key: &'a Expr,
        inner_key: &'a Expr,
        result: &'a Expr,
    },
    LongCount {
        predicate: Option<&'a Expr>,
    },
    Max {
        selector: Option<&'a Expr>,
    },
    Min {
        selector: Option<&'a Expr>,
    },
    OfType,
    OrderBy {
        key: &'a Expr,
        ascending: bool,
    },
    Reverse,
    Select {
        selector: &'a Expr,
    },
    SelectMany {
        collection: &'a Expr,
        result: Option<&'a Expr>,
    },
    Single {
        predicate: Option<&'a Expr>,
        or_default: bool,
    },
    Skip {
        count: &'a Expr,
    },
    SkipWhile {
        predicate: &'a Expr,
    },
    Sum {
        selector: Option<&'a Expr>,
    },
    Take {
        count: &'a Expr,
    },
    TakeWhile {
        predicate: &'a Expr,
    },
    ThenBy {
        key: &'a Expr,
        ascending: bool,
    },
    Union {
        other: &'a Expr,
    },
    Where {
        predicate: &'a Expr,
    },
}

impl<'a> Operator<'a> {
    /// Returns `None` for terminating operators and for argument counts no
    /// overload of `method` takes.
    pub(crate) fn parse(method: QueryableMethod, args: &'a [Expr]) -> Option<Operator<'a>> {
        use QueryableMethod as M;

        let operator = match (method, args) {
            (M::All, [predicate]) => Operator::All { predicate },
            (M::Any, [predicate @ ..]) if predicate.len() <= 1 => Operator::Any {
                predicate: predicate.first(),
            },
            (M::Average, [selector @ ..]) if selector.len() <= 1 => Operator::Average {
                selector: selector.first(),
            },
            (M::Cast, []) => Operator::Cast,
            (M::Concat, [other]) => Operator::Concat { other },
            (M::Contains, [item]) => Operator::Contains { item },
            (M::Count, [predicate @ ..]) if predicate.len() <= 1 => Operator::Count {
                predicate: predicate.first(),
            },
            (M::DefaultIfEmpty, [default @ ..]) if default.len() <= 1 => {
                Operator::DefaultIfEmpty {
                    default: default.first(),
                }
            }
            (M::Distinct, []) => Operator::Distinct,
            (M::ElementAt, [index]) => Operator::ElementAt {
                index,
                or_default: false,
            },
            (M::ElementAtOrDefault, [index]) => Operator::ElementAt {
                index,
                or_default: true,
            },
            (M::Except, [other]) => Operator::Except { other },
            (M::First | M::FirstOrDefault, [predicate @ ..]) if predicate.len() <= 1 => {
                Operator::First {
                    predicate: predicate.first(),
                    or_default: method == M::FirstOrDefault,
                }
            }
            (M::GroupBy, [key]) => Operator::GroupBy {
                key,
                element: None,
                result: None,
            },
            (M::GroupBy, [key, element]) => Operator::GroupBy {
                key,
                element: Some(element),
                result: None,
            },
            (M::GroupBy, [key, element, result]) => Operator::GroupBy {
                key,
                element: Some(element),
                result: Some(result),
            },
            (M::GroupJoin, [inner, outer_key, inner_key, result]) => Operator::GroupJoin {
                inner,
                outer_key,
                inner_key,
                result,
            },
            (M::Intersect, [other]) => Operator::Intersect { other },
            (M::Join, [inner, outer_key, inner_key, result]) => Operator::Join {
                inner,
                outer_key,
                inner_key,
                result,
            },
            (M::Last | M::LastOrDefault, [predicate @ ..]) if predicate.len() <= 1 => {
                Operator::Last {
                    predicate: predicate.first(),
                    or_default: method == M::LastOrDefault,
                }
            }
            (M::LeftJoin, [inner, outer_key, inner_key, result]) => Operator::LeftJoin {
                inner,
                outer_key,
                inner_key,
                result,
            },
            (M::LongCount, [predicate @ ..]) if predicate.len() <= 1 => Operator::LongCount {
                predicate: predicate.first(),
            },
            (M::Max, [selector @ ..]) if selector.len() <= 1 => Operator::Max {
                selector: selector.first(),
            },
            (M::Min, [selector @ ..]) if selector.len() <= 1 => Operator::Min {
                selector: selector.first(),
            },
            (M::OfType, []) => Operator::OfType,
            (M::OrderBy, [key]) => Operator::OrderBy {
                key,
                ascending: true,
            },
            (M::OrderByDescending, [key]) => Operator::OrderBy {
                key,
                ascending: false,
            },
            (M::Reverse, []) => Operator::Reverse,
            (M::Select, [selector]) => Operator::Select { selector },
            (M::SelectMany, [collection]) => Operator::SelectMany {
                collection,
                result: None,
            },
            (M::SelectMany, [collection, result]) => Operator::SelectMany {
                collection,
                result: Some(result),
            },
            (M::Single | M::SingleOrDefault, [predicate @ ..]) if predicate.len() <= 1 => {
                Operator::Single {
                    predicate: predicate.first(),
                    or_default: method == M::SingleOrDefault,
                }
            }
            (M::Skip, [count]) => Operator::Skip { count },
            (M::SkipWhile, [predicate]) => Operator::SkipWhile { predicate },
            (M::Sum, [selector @ ..]) if selector.len() <= 1 => Operator::Sum {
                selector: selector.first(),
            },
            (M::Take, [count]) => Operator::Take { count },
            (M::TakeWhile, [predicate]) => Operator::TakeWhile { predicate },
            (M::ThenBy, [key]) => Operator::ThenBy {
                key,
                ascending: true,
            },
            (M::ThenByDescending, [key]) => Operator::ThenBy {
                key,
                ascending: false,
            },
            (M::Union, [other]) => Operator::Union { other },
            (M::Where, [predicate]) => Operator::Where { predicate },
            _ => return None,
        };

        Some(operator)
    }

    /// The second source of a two-source operator.
    pub(crate) fn second_source(&self) -> Option<&'a Expr> {
        match *self {
            Operator::Concat { other }
            | Operator::Except { other }
            | Operator::Intersect { other }
            | Operator::Union { other } => Some(other),
            Operator::GroupJoin { inner, .. }
            | Operator::Join { inner, .. }
            | Operator::LeftJoin { inner, .. } => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::expr::Type;

    #[test]
    fn optional_predicates_share_a_variant() {
        let predicate = Expr::lambda1("x", Type::I32, |x| Expr::gt(x, 0));

        assert!(matches!(
            Operator::parse(QueryableMethod::Count, &[]),
            Some(Operator::Count { predicate: None })
        ));
        assert!(matches!(
            Operator::parse(QueryableMethod::Count, std::slice::from_ref(&predicate)),
            Some(Operator::Count { predicate: Some(_) })
        ));
        assert!(matches!(
            Operator::parse(QueryableMethod::FirstOrDefault, &[]),
            Some(Operator::First {
                predicate: None,
                or_default: true
            })
        ));
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        let arg = Expr::constant(1);
        assert!(Operator::parse(QueryableMethod::Where, &[]).is_none());
        assert!(Operator::parse(QueryableMethod::Distinct, std::slice::from_ref(&arg)).is_none());
        assert!(Operator::parse(QueryableMethod::ToList, &[]).is_none());
    }

    #[test]
    fn two_source_operators_expose_their_second_source() {
        let args = [Expr::constant(1)];
        let operator = Operator::parse(QueryableMethod::Union, &args).unwrap();
        assert!(Expr::ptr_eq(operator.second_source().unwrap(), &args[0]));

        let take = Operator::parse(QueryableMethod::Take, &args).unwrap();
        assert!(take.second_source().is_none());
    }
}
