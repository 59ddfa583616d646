use std::cmp::Ordering;
use std::collections::HashMap;

use crate::attribute_value::AttributeValue;
use crate::eval::{Diagnostic, Evaluator};
use crate::operator::{compile_pattern, ordering_op, type_op, Op};

/// Returns the operator map if `condition` is an operator object: a non-empty object whose keys
/// all start with `$`. Any other value is a literal, including an object that mixes operator
/// keys with plain keys.
pub(crate) fn operator_object(condition: &AttributeValue) -> Option<&HashMap<String, AttributeValue>> {
    match condition {
        AttributeValue::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

impl<'a> Evaluator<'a> {
    pub(crate) fn matches_condition(
        &mut self,
        value: Option<&AttributeValue>,
        condition: &AttributeValue,
    ) -> bool {
        let operators = match operator_object(condition) {
            Some(operators) => operators,
            // absent never equals anything, not even null
            None => return value == Some(condition),
        };

        self.nested(|evaluator| {
            // every operator is evaluated so that each problem is reported
            let mut matched = true;
            for (name, operand) in operators {
                if !evaluator.matches_operator(name, value, operand) {
                    matched = false;
                }
            }
            matched
        })
    }

    fn matches_operator(
        &mut self,
        name: &str,
        value: Option<&AttributeValue>,
        operand: &AttributeValue,
    ) -> bool {
        let op = match name.parse::<Op>() {
            Ok(op) => op,
            Err(_) => {
                self.report(Diagnostic::UnknownOperator {
                    operator: name.to_owned(),
                });
                return false;
            }
        };

        match op {
            Op::Eq => value == Some(operand),
            Op::Ne => value != Some(operand),

            Op::Gt => ordering_op(value, operand, |o| o == Ordering::Greater),
            Op::Gte => ordering_op(value, operand, |o| o != Ordering::Less),
            Op::Lt => ordering_op(value, operand, |o| o == Ordering::Less),
            Op::Lte => ordering_op(value, operand, |o| o != Ordering::Greater),

            Op::Regex => self.regex_op(value, operand),

            Op::In => self.in_op(op, value, operand),
            Op::Nin => match operand {
                AttributeValue::Array(_) => !self.in_op(op, value, operand),
                _ => self.in_op(op, value, operand),
            },

            Op::Exists => {
                let should_exist = operand.as_bool().unwrap_or_else(|| operand.is_truthy());
                value.is_some() == should_exist
            }

            Op::Size => match value {
                Some(AttributeValue::Array(items)) => {
                    let length = AttributeValue::Number(items.len() as f64);
                    self.matches_condition(Some(&length), operand)
                }
                _ => false,
            },

            Op::ElemMatch => self.elem_match_op(value, operand),
            Op::Type => type_op(value, operand),
            Op::All => self.all_op(value, operand),
            Op::Not => !self.matches_condition(value, operand),
        }
    }

    fn malformed_operand(&self, op: Op, expected: &str) -> bool {
        self.report(Diagnostic::MalformedOperand {
            operator: op.to_string(),
            expected: expected.to_owned(),
        });
        false
    }

    fn regex_op(&self, value: Option<&AttributeValue>, operand: &AttributeValue) -> bool {
        let pattern = match operand.as_str() {
            Some(pattern) => pattern,
            None => return self.malformed_operand(Op::Regex, "a pattern string"),
        };
        let text = match value.and_then(AttributeValue::coerce_to_string) {
            Some(text) => text,
            None => return false,
        };

        match compile_pattern(pattern) {
            Ok(re) => re.is_match(&text),
            Err(e) => {
                self.report(Diagnostic::InvalidPattern {
                    pattern: pattern.to_owned(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Deep-equality membership. A non-list operand is malformed and fails closed for both `$in`
    /// and `$nin`.
    fn in_op(&self, op: Op, value: Option<&AttributeValue>, operand: &AttributeValue) -> bool {
        match (value, operand) {
            (Some(value), AttributeValue::Array(candidates)) => candidates.contains(value),
            (None, AttributeValue::Array(_)) => false,
            _ => self.malformed_operand(op, "a list of values"),
        }
    }

    fn elem_match_op(&mut self, value: Option<&AttributeValue>, operand: &AttributeValue) -> bool {
        let items = match value {
            Some(AttributeValue::Array(items)) => items,
            _ => return false,
        };

        // A plain object operand is a rule over object elements; an operator object or a
        // literal is a condition over each element.
        let rule = match operand {
            AttributeValue::Object(map) if operator_object(operand).is_none() => Some(map),
            _ => None,
        };

        for item in items {
            let matched = match (item, rule) {
                (AttributeValue::Object(_), Some(rule)) => self.test_rule(rule, item),
                _ => self.matches_condition(Some(item), operand),
            };
            if matched {
                return true;
            }
        }
        false
    }

    fn all_op(&mut self, value: Option<&AttributeValue>, operand: &AttributeValue) -> bool {
        let expected = match operand {
            AttributeValue::Array(expected) => expected,
            _ => return self.malformed_operand(Op::All, "a list of values"),
        };
        let items = match value {
            Some(AttributeValue::Array(items)) => items,
            _ => return false,
        };

        for condition in expected {
            let mut found = false;
            for item in items {
                if self.matches_condition(Some(item), condition) {
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }
}
