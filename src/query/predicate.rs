//! Row predicates produced by tenant filters.
//!
//! A [`Column`] is an opaque marker naming a column of a relation in scope
//! (a table name or a join alias). Predicates are plain data; compiling them to
//! SQL is the job of [`crate::query::sql`].

use std::collections::BTreeSet;
use std::fmt;

use super::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// Table name or alias the column is resolved against
    pub relation: String,
    pub name: String,
}

impl Column {
    pub fn new(relation: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            name: name.into(),
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        self.compare(ComparisonOp::Equal, value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        self.compare(ComparisonOp::NotEqual, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(ComparisonOp::Less, value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(ComparisonOp::Greater, value)
    }

    pub fn compare(&self, op: ComparisonOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            column: self.clone(),
            op,
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: self.clone(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            column: self.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            column: self.clone(),
            negated: true,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.name)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,          // =
    NotEqual,       // <>
    Less,           // <
    LessOrEqual,    // <=
    Greater,        // >
    GreaterOrEqual, // >=
}

impl ComparisonOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::Less => "<",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::Greater => ">",
            ComparisonOp::GreaterOrEqual => ">=",
        }
    }
}

/// Boolean row condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: Column,
        op: ComparisonOp,
        value: Value,
    },
    In {
        column: Column,
        values: Vec<Value>,
        negated: bool,
    },
    IsNull {
        column: Column,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut parts) => {
                parts.push(other);
                Predicate::Or(parts)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// OR of all predicates; a single predicate is returned without a combinator.
    pub fn any_of(mut predicates: Vec<Predicate>) -> Option<Predicate> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::Or(predicates)),
        }
    }

    /// Every column referenced anywhere in the predicate
    pub fn columns(&self) -> BTreeSet<&Column> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut BTreeSet<&'a Column>) {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull { column, .. } => {
                out.insert(column);
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    part.collect_columns(out);
                }
            }
            Predicate::Not(inner) => inner.collect_columns(out),
        }
    }
}

impl PartialOrd for Column {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Column {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.relation, &self.name).cmp(&(&other.relation, &other.name))
    }
}
