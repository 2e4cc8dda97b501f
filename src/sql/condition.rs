//! Condition model: filter predicates, nested condition sets and ordering.
//!
//! These are plain values; nothing here touches a connection. Shape checks
//! (an `in` without a sequence, a `between` without two bounds) happen when a
//! set is compiled, so building a set never fails.

use crate::core::value::{IntoValue, Value};

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
    /// The field is a SQL fragment with its own `?` placeholders.
    Raw,
}

impl Comparator {
    /// SQL operator text, `None` for the comparators with custom layouts.
    pub(crate) fn operator(self) -> Option<&'static str> {
        match self {
            Comparator::Eq => Some("="),
            Comparator::Ne => Some("<>"),
            Comparator::Gt => Some(">"),
            Comparator::Ge => Some(">="),
            Comparator::Lt => Some("<"),
            Comparator::Le => Some("<="),
            Comparator::Like => Some("like"),
            Comparator::NotLike => Some("not like"),
            Comparator::In
            | Comparator::NotIn
            | Comparator::IsNull
            | Comparator::IsNotNull
            | Comparator::Between
            | Comparator::Raw => None,
        }
    }
}

/// Operand of a condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Operand {
    #[default]
    None,
    Single(Value),
    Sequence(Vec<Value>),
}

impl Operand {
    pub fn single(value: impl IntoValue) -> Self {
        Operand::Single(value.into_value())
    }

    pub fn sequence<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        Operand::Sequence(values.into_iter().map(IntoValue::into_value).collect())
    }

    /// Values in binding order.
    pub fn values(&self) -> &[Value] {
        match self {
            Operand::None => &[],
            Operand::Single(value) => std::slice::from_ref(value),
            Operand::Sequence(values) => values,
        }
    }
}

/// A single predicate: `field <comparator> operand`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    comparator: Comparator,
    operand: Operand,
}

impl Condition {
    pub fn new(field: impl Into<String>, comparator: Comparator, operand: Operand) -> Self {
        Condition {
            field: field.into(),
            comparator,
            operand,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Eq, Operand::single(value))
    }

    pub fn ne(field: impl Into<String>, value: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Ne, Operand::single(value))
    }

    pub fn gt(field: impl Into<String>, value: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Gt, Operand::single(value))
    }

    pub fn ge(field: impl Into<String>, value: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Ge, Operand::single(value))
    }

    pub fn lt(field: impl Into<String>, value: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Lt, Operand::single(value))
    }

    pub fn le(field: impl Into<String>, value: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Le, Operand::single(value))
    }

    pub fn like(field: impl Into<String>, pattern: impl IntoValue) -> Self {
        Condition::new(field, Comparator::Like, Operand::single(pattern))
    }

    pub fn not_like(field: impl Into<String>, pattern: impl IntoValue) -> Self {
        Condition::new(field, Comparator::NotLike, Operand::single(pattern))
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        Condition::new(field, Comparator::In, Operand::sequence(values))
    }

    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        Condition::new(field, Comparator::NotIn, Operand::sequence(values))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Condition::new(field, Comparator::IsNull, Operand::None)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Condition::new(field, Comparator::IsNotNull, Operand::None)
    }

    pub fn between(field: impl Into<String>, low: impl IntoValue, high: impl IntoValue) -> Self {
        Condition::new(
            field,
            Comparator::Between,
            Operand::Sequence(vec![low.into_value(), high.into_value()]),
        )
    }

    /// A free-form fragment such as `"age > ? or vip = ?"`; `values` must
    /// match its `?` count.
    pub fn raw<I, V>(fragment: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        Condition::new(fragment, Comparator::Raw, Operand::sequence(values))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }
}

/// Logical connective joining the members of a [`ConditionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connective {
    #[default]
    And,
    Or,
}

impl Connective {
    pub(crate) fn separator(self) -> &'static str {
        match self {
            Connective::And => " and ",
            Connective::Or => " or ",
        }
    }
}

/// Member of a condition set.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition(Condition),
    Group(ConditionSet),
}

/// Ordered conditions joined by one connective. Nested sets express mixed
/// and/or trees; order fixes both clause order and parameter order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionSet {
    connective: Connective,
    nodes: Vec<Node>,
}

impl ConditionSet {
    pub fn new(connective: Connective) -> Self {
        ConditionSet {
            connective,
            nodes: Vec::new(),
        }
    }

    /// Members joined with `and`.
    pub fn all() -> Self {
        ConditionSet::new(Connective::And)
    }

    /// Members joined with `or`.
    pub fn any() -> Self {
        ConditionSet::new(Connective::Or)
    }

    pub fn push(&mut self, condition: Condition) {
        self.nodes.push(Node::Condition(condition));
    }

    pub fn push_group(&mut self, group: ConditionSet) {
        self.nodes.push(Node::Group(group));
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    pub fn group(mut self, group: ConditionSet) -> Self {
        self.push_group(group);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.with(Condition::eq(field, value))
    }

    pub fn ne(self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.with(Condition::ne(field, value))
    }

    pub fn gt(self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.with(Condition::gt(field, value))
    }

    pub fn ge(self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.with(Condition::ge(field, value))
    }

    pub fn lt(self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.with(Condition::lt(field, value))
    }

    pub fn le(self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.with(Condition::le(field, value))
    }

    pub fn like(self, field: impl Into<String>, pattern: impl IntoValue) -> Self {
        self.with(Condition::like(field, pattern))
    }

    pub fn is_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        self.with(Condition::is_in(field, values))
    }

    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.with(Condition::is_null(field))
    }

    pub fn is_not_null(self, field: impl Into<String>) -> Self {
        self.with(Condition::is_not_null(field))
    }

    pub fn between(self, field: impl Into<String>, low: impl IntoValue, high: impl IntoValue) -> Self {
        self.with(Condition::between(field, low, high))
    }

    pub fn connective(&self) -> Connective {
        self.connective
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of leaf conditions, nested groups included.
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Condition(_) => 1,
                Node::Group(group) => group.len(),
            })
            .sum()
    }

    /// True when the set holds no leaf condition at any depth, so it would
    /// compile to no where clause at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        let mut set = ConditionSet::all();
        for condition in iter {
            set.push(condition);
        }
        set
    }
}

/// Sort direction for [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `order by` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        OrderBy {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        OrderBy {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}
