use std::fmt;

/// The canonical sequence operators a query can be composed from.
///
/// Overloads that differ only by an optional predicate or selector share a
/// variant; the argument count of the call tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryableMethod {
    All,
    Any,
    Average,
    Cast,
    Concat,
    Contains,
    Count,
    DefaultIfEmpty,
    Distinct,
    ElementAt,
    ElementAtOrDefault,
    Except,
    First,
    FirstOrDefault,
    GroupBy,
    GroupJoin,
    Intersect,
    Join,
    Last,
    LastOrDefault,
    LeftJoin,
    LongCount,
    Max,
    Min,
    OfType,
    OrderBy,
    OrderByDescending,
    Reverse,
    Select,
    SelectMany,
    Single,
    SingleOrDefault,
    Skip,
    SkipWhile,
    Sum,
    Take,
    TakeWhile,
    ThenBy,
    ThenByDescending,
    Union,
    Where,

    /// Materializing terminators; they compose nothing into the query.
    AsEnumerable,
    ToArray,
    ToArrayAsync,
    ToList,
    ToListAsync,
}

impl QueryableMethod {
    pub fn name(self) -> &'static str {
        use QueryableMethod::*;

        match self {
            All => "all",
            Any => "any",
            Average => "average",
            Cast => "cast",
            Concat => "concat",
            Contains => "contains",
            Count => "count",
            DefaultIfEmpty => "default_if_empty",
            Distinct => "distinct",
            ElementAt => "element_at",
            ElementAtOrDefault => "element_at_or_default",
            Except => "except",
            First => "first",
            FirstOrDefault => "first_or_default",
            GroupBy => "group_by",
            GroupJoin => "group_join",
            Intersect => "intersect",
            Join => "join",
            Last => "last",
            LastOrDefault => "last_or_default",
            LeftJoin => "left_join",
            LongCount => "long_count",
            Max => "max",
            Min => "min",
            OfType => "of_type",
            OrderBy => "order_by",
            OrderByDescending => "order_by_descending",
            Reverse => "reverse",
            Select => "select",
            SelectMany => "select_many",
            Single => "single",
            SingleOrDefault => "single_or_default",
            Skip => "skip",
            SkipWhile => "skip_while",
            Sum => "sum",
            Take => "take",
            TakeWhile => "take_while",
            ThenBy => "then_by",
            ThenByDescending => "then_by_descending",
            Union => "union",
            Where => "where",
            AsEnumerable => "as_enumerable",
            ToArray => "to_array",
            ToArrayAsync => "to_array_async",
            ToList => "to_list",
            ToListAsync => "to_list_async",
        }
    }

    /// Returns `true` for operators that only materialize their source.
    pub fn is_terminating(self) -> bool {
        matches!(
            self,
            Self::AsEnumerable | Self::ToArray | Self::ToArrayAsync | Self::ToList | Self::ToListAsync
        )
    }

    /// Returns `true` for operators taking a second sequence.
    pub fn is_two_source(self) -> bool {
        matches!(
            self,
            Self::Concat
                | Self::Except
                | Self::GroupJoin
                | Self::Intersect
                | Self::Join
                | Self::LeftJoin
                | Self::Union
        )
    }
}

impl fmt::Display for QueryableMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
