use std::fmt::{self, Display};

use log::warn;
use serde::Serialize;

use crate::attribute_value::AttributeValue;
use crate::rule::Rule;

/// Rule and condition trees nested deeper than this are not evaluated.
///
/// This matches the recursion limit serde_json applies while parsing, so any tree deserialized
/// from JSON evaluates normally. Only trees built programmatically can exceed it.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A problem found while evaluating a rule.
///
/// Diagnostics never change the result of an evaluation beyond the documented fail-closed
/// behavior. They are reported so that callers can surface bad rules to whoever authored them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum Diagnostic {
    /// A condition object contained a `$`-prefixed key that is not a supported operator. That
    /// operator contributed `false`.
    UnknownOperator {
        /// The unrecognized key, including its `$` prefix.
        operator: String,
    },
    /// A `$regex` operand could not be compiled. The operator contributed `false`.
    InvalidPattern {
        /// The pattern as written in the rule.
        pattern: String,
        /// The compiler's description of the problem.
        error: String,
    },
    /// A combinator key (`$and`, `$or`, `$nor`, `$not`) held a value of the wrong shape. The
    /// key contributed `false`.
    MalformedRule {
        /// The combinator key.
        key: String,
        /// What the combinator accepts.
        expected: String,
    },
    /// An operator was given an operand of the wrong shape, e.g. `$in` with a string. The
    /// operator contributed `false`.
    MalformedOperand {
        /// The operator, including its `$` prefix.
        operator: String,
        /// What the operator accepts.
        expected: String,
    },
    /// A feature rule's stored condition could not be parsed as a rule. The feature rule never
    /// matches.
    InvalidCondition {
        /// The parser's description of the problem.
        error: String,
    },
    /// The rule nested deeper than [MAX_NESTING_DEPTH]. The whole evaluation returned `false`.
    NestingTooDeep {
        /// The depth limit that was exceeded.
        limit: usize,
    },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownOperator { operator } => write!(f, "Unknown operator: {}", operator),
            Diagnostic::InvalidPattern { pattern, error } => {
                write!(f, "Invalid regex for '$regex' operator ({}): {}", pattern, error)
            }
            Diagnostic::MalformedRule { key, expected } => {
                write!(f, "Malformed rule: '{}' expects {}", key, expected)
            }
            Diagnostic::MalformedOperand { operator, expected } => {
                write!(f, "Malformed operand: '{}' expects {}", operator, expected)
            }
            Diagnostic::InvalidCondition { error } => {
                write!(f, "Invalid feature rule condition: {}", error)
            }
            Diagnostic::NestingTooDeep { limit } => {
                write!(f, "Rule nesting exceeds the limit of {} levels", limit)
            }
        }
    }
}

/// Trait used by [evaluate] to report [Diagnostic]s.
///
/// Recorders are a side-channel only: the result of an evaluation does not depend on whether a
/// recorder was supplied.
pub trait DiagnosticRecorder {
    /// Record a problem found during evaluation.
    fn record(&self, diagnostic: Diagnostic);
}

/// Evaluate `rule` against `document`.
///
/// Evaluation is pure and total: it never mutates its inputs, never panics on malformed rules,
/// and resolves every internal failure to `false` for the affected condition. The caller can
/// provide an optional [DiagnosticRecorder] which will be notified of each problem found; every
/// problem is also logged at `warn` level.
pub fn evaluate(
    rule: &Rule,
    document: &AttributeValue,
    diagnostic_recorder: Option<&dyn DiagnosticRecorder>,
) -> bool {
    let mut evaluator = Evaluator::new(diagnostic_recorder);
    let result = evaluator.test_rule(rule.conditions(), document);
    evaluator.finish(result)
}

/// Test a single resolved value against a condition.
///
/// `value` is None when the attribute path did not resolve. `condition` is either an operator
/// object such as `{"$gt": 2}` or a literal compared by deep equality.
pub fn matches_condition(
    value: Option<&AttributeValue>,
    condition: &AttributeValue,
    diagnostic_recorder: Option<&dyn DiagnosticRecorder>,
) -> bool {
    let mut evaluator = Evaluator::new(diagnostic_recorder);
    let result = evaluator.matches_condition(value, condition);
    evaluator.finish(result)
}

/// State carried through one evaluation. Rule-level logic lives in [crate::rule] and
/// condition-level logic in [crate::condition]; both are methods on this type so that they can
/// recurse into each other while sharing the depth guard and the recorder.
pub(crate) struct Evaluator<'a> {
    diagnostic_recorder: Option<&'a dyn DiagnosticRecorder>,
    depth: usize,
    aborted: bool,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(diagnostic_recorder: Option<&'a dyn DiagnosticRecorder>) -> Self {
        Self {
            diagnostic_recorder,
            depth: 0,
            aborted: false,
        }
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        if let Some(recorder) = self.diagnostic_recorder {
            recorder.record(diagnostic);
        }
    }

    /// Runs `f` one nesting level deeper.
    ///
    /// Past [MAX_NESTING_DEPTH] the evaluation is aborted rather than resolved locally, since a
    /// local `false` could be inverted into a match by an enclosing `$not` or `$nor`.
    pub(crate) fn nested<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Self) -> bool,
    {
        if self.aborted {
            return false;
        }
        if self.depth >= MAX_NESTING_DEPTH {
            self.aborted = true;
            self.report(Diagnostic::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
            return false;
        }

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn finish(self, result: bool) -> bool {
        result && !self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::InMemoryDiagnosticRecorder;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use spectral::prelude::*;

    fn nested_not(levels: usize) -> AttributeValue {
        let mut condition = AttributeValue::from("hello");
        for _ in 0..levels {
            condition = AttributeValue::from(maplit::hashmap! {"$not" => condition});
        }
        condition
    }

    #[test]
    fn test_deep_nesting_is_evaluated_below_the_limit() {
        let value = AttributeValue::from("hello");
        // an even number of negations cancels out
        assert!(matches_condition(Some(&value), &nested_not(100), None));
        assert!(!matches_condition(Some(&value), &nested_not(101), None));
    }

    #[test]
    fn test_excessive_nesting_fails_closed_either_way() {
        let recorder = InMemoryDiagnosticRecorder::default();
        let value = AttributeValue::from("hello");

        for levels in [MAX_NESTING_DEPTH * 2, MAX_NESTING_DEPTH * 2 + 1] {
            assert!(!matches_condition(
                Some(&value),
                &nested_not(levels),
                Some(&recorder)
            ));
        }

        assert_that!(*recorder.diagnostics.borrow()).has_length(2);
        assert_that!(recorder.diagnostics.borrow()[0]).is_equal_to(Diagnostic::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }

    #[test]
    fn test_evaluate_without_recorder() {
        let rule: Rule = serde_json::from_value(json!({"name": {"$regx": "hello"}})).unwrap();
        let document = AttributeValue::from(json!({"name": "hello"}));
        assert!(!evaluate(&rule, &document, None));
    }

    #[test]
    fn test_diagnostic_serialization() {
        assert_json_eq!(
            serde_json::to_value(Diagnostic::UnknownOperator {
                operator: "$regx".into()
            })
            .unwrap(),
            json!({"kind": "UNKNOWN_OPERATOR", "operator": "$regx"})
        );
        assert_json_eq!(
            serde_json::to_value(Diagnostic::InvalidPattern {
                pattern: "[".into(),
                error: "unclosed".into(),
            })
            .unwrap(),
            json!({"kind": "INVALID_PATTERN", "pattern": "[", "error": "unclosed"})
        );
        assert_json_eq!(
            serde_json::to_value(Diagnostic::NestingTooDeep { limit: 128 }).unwrap(),
            json!({"kind": "NESTING_TOO_DEEP", "limit": 128})
        );
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(
            Diagnostic::UnknownOperator {
                operator: "$regx".into()
            }
            .to_string(),
            "Unknown operator: $regx"
        );
        assert_eq!(
            Diagnostic::MalformedRule {
                key: "$and".into(),
                expected: "a list of rules".into()
            }
            .to_string(),
            "Malformed rule: '$and' expects a list of rules"
        );
    }
}
