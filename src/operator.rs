use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::attribute_value::{AttributeValue, TypeTag};

/// The operators that may appear as keys of a condition object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Regex,
    In,
    Nin,
    Exists,
    Size,
    ElemMatch,
    Type,
    All,
    Not,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "$eq",
            Op::Ne => "$ne",
            Op::Gt => "$gt",
            Op::Gte => "$gte",
            Op::Lt => "$lt",
            Op::Lte => "$lte",
            Op::Regex => "$regex",
            Op::In => "$in",
            Op::Nin => "$nin",
            Op::Exists => "$exists",
            Op::Size => "$size",
            Op::ElemMatch => "$elemMatch",
            Op::Type => "$type",
            Op::All => "$all",
            Op::Not => "$not",
        }
    }
}

/// Returned when a `$`-prefixed key does not name a supported operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown operator: {}", self.0)
    }
}

impl FromStr for Op {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "$eq" => Op::Eq,
            "$ne" => Op::Ne,
            "$gt" => Op::Gt,
            "$gte" => Op::Gte,
            "$lt" => Op::Lt,
            "$lte" => Op::Lte,
            "$regex" => Op::Regex,
            "$in" => Op::In,
            "$nin" => Op::Nin,
            "$exists" => Op::Exists,
            "$size" => Op::Size,
            "$elemMatch" => Op::ElemMatch,
            "$type" => Op::Type,
            "$all" => Op::All,
            "$not" => Op::Not,
            _ => return Err(UnknownOperator(s.to_owned())),
        };
        Ok(op)
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orders two values when both are numbers or both are strings.
///
/// Strings compare by code point. Every other pairing, and any comparison involving NaN, is
/// unordered.
pub(crate) fn ordering(lhs: &AttributeValue, rhs: &AttributeValue) -> Option<Ordering> {
    match (lhs, rhs) {
        (AttributeValue::Number(l), AttributeValue::Number(r)) => l.partial_cmp(r),
        (AttributeValue::String(l), AttributeValue::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

pub(crate) fn ordering_op<F: Fn(Ordering) -> bool>(
    lhs: Option<&AttributeValue>,
    rhs: &AttributeValue,
    f: F,
) -> bool {
    match lhs.and_then(|l| ordering(l, rhs)) {
        Some(o) => f(o),
        None => false,
    }
}

/// Matches a `$type` operand against the tag of a possibly absent value.
pub(crate) fn type_op(value: Option<&AttributeValue>, operand: &AttributeValue) -> bool {
    match operand.as_str().map(str::parse::<TypeTag>) {
        Some(Ok(tag)) => TypeTag::of(value) == tag,
        _ => false,
    }
}

#[cfg(not(feature = "regex_cache"))]
pub(crate) fn compile_pattern(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::Regex::new(pattern)
}

#[cfg(feature = "regex_cache")]
pub(crate) use pattern_cache::compile_pattern;

#[cfg(feature = "regex_cache")]
mod pattern_cache {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use lazy_static::lazy_static;
    use log::debug;
    use regex::Regex;

    const MAX_CACHED_PATTERNS: usize = 1024;

    lazy_static! {
        static ref PATTERNS: RwLock<HashMap<String, Result<Regex, regex::Error>>> =
            RwLock::new(HashMap::new());
    }

    pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
        if let Ok(patterns) = PATTERNS.read() {
            if let Some(compiled) = patterns.get(pattern) {
                return compiled.clone();
            }
        }

        let compiled = Regex::new(pattern);

        // A poisoned lock only costs us the cache entry.
        if let Ok(mut patterns) = PATTERNS.write() {
            if patterns.len() < MAX_CACHED_PATTERNS {
                patterns.insert(pattern.to_owned(), compiled.clone());
            } else {
                debug!("pattern cache is full, not caching {:?}", pattern);
            }
        }

        compiled
    }
}
