//! Typed predicate tree produced by the parser.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrMethod {
    StartsWith,
    EndsWith,
    Contains,
}

impl StrMethod {
    pub fn name(self) -> &'static str {
        match self {
            StrMethod::StartsWith => "startswith",
            StrMethod::EndsWith => "endswith",
            StrMethod::Contains => "contains",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: CmpOp,
        literal: Literal,
    },
    InList {
        field: String,
        values: Vec<Literal>,
        negated: bool,
    },
    Str {
        field: String,
        method: StrMethod,
        pattern: String,
    },
    /// `notnull()` when `negated`, `isnull()` otherwise.
    Null { field: String, negated: bool },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Every field the predicate reads.
    pub fn required_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            Predicate::Compare { field, .. }
            | Predicate::InList { field, .. }
            | Predicate::Str { field, .. }
            | Predicate::Null { field, .. } => {
                fields.insert(field.clone());
            }
            Predicate::And(left, right) | Predicate::Or(left, right) => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Predicate::Not(inner) => inner.collect_fields(fields),
        }
    }

    /// Drops top-level conjuncts that read a field for which `has_field` is
    /// false. Returns `None` when nothing is left.
    pub fn restrict_to(&self, has_field: &dyn Fn(&str) -> bool) -> Option<Predicate> {
        match self {
            Predicate::And(left, right) => {
                match (left.restrict_to(has_field), right.restrict_to(has_field)) {
                    (Some(l), Some(r)) => Some(l.and(r)),
                    (Some(only), None) | (None, Some(only)) => Some(only),
                    (None, None) => None,
                }
            }
            other => other
                .required_fields()
                .iter()
                .all(|field| has_field(field))
                .then(|| other.clone()),
        }
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &str) -> fmt::Result {
    let plain = field
        .chars()
        .all(|ch| ch.is_alphanumeric() || ch == '_')
        && field.chars().next().is_some_and(|ch| !ch.is_ascii_digit());
    if plain {
        f.write_str(field)
    } else {
        write!(f, "`{field}`")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { field, op, literal } => {
                write_field(f, field)?;
                write!(f, " {} {literal}", op.symbol())
            }
            Predicate::InList {
                field,
                values,
                negated,
            } => {
                write_field(f, field)?;
                let list = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                if *negated {
                    write!(f, " not in [{list}]")
                } else {
                    write!(f, " in [{list}]")
                }
            }
            Predicate::Str {
                field,
                method,
                pattern,
            } => {
                write_field(f, field)?;
                write!(f, ".str.{}({})", method.name(), Literal::Text(pattern.clone()))
            }
            Predicate::Null { field, negated } => {
                write_field(f, field)?;
                f.write_str(if *negated { ".notnull()" } else { ".isnull()" })
            }
            Predicate::And(left, right) => write!(f, "({left}) & ({right})"),
            Predicate::Or(left, right) => write!(f, "({left}) | ({right})"),
            Predicate::Not(inner) => write!(f, "~({inner})"),
        }
    }
}
