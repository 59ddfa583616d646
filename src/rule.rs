use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::attribute_value::{AttributeValue, TypeTag};
use crate::eval::{evaluate, Diagnostic, DiagnosticRecorder, Evaluator};
use crate::path::{resolve, Path};

/// A targeting rule: a mapping from keys to conditions, all of which must match.
///
/// Keys `$and`, `$or` and `$nor` hold lists of nested rules, and `$not` holds a single nested
/// rule. Every other key is a dotted attribute [Path] whose value is either a literal (matched by
/// deep equality) or a condition object such as `{"$gte": 18}`.
///
/// Rules are usually deserialized from JSON and then evaluated many times:
/// ```
/// # use feature_condition_evaluation::{AttributeValue, Rule};
/// # use serde_json::json;
/// let rule: Rule = serde_json::from_value(json!({
///     "$or": [{"country": "NZ"}, {"age": {"$gte": 65}}]
/// })).unwrap();
///
/// assert!(rule.test(&AttributeValue::from(json!({"country": "NZ", "age": 40}))));
/// assert!(!rule.test(&AttributeValue::from(json!({"country": "AU", "age": 40}))));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Rule {
    conditions: HashMap<String, AttributeValue>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A rule must be an object; the value had another type.
    NotAnObject(TypeTag),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotAnObject(found) => write!(f, "Rule must be an object, found {}", found),
        }
    }
}

impl std::error::Error for Error {}

impl Rule {
    pub fn new(conditions: HashMap<String, AttributeValue>) -> Self {
        Self { conditions }
    }

    /// A rule with no keys matches every document.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &HashMap<String, AttributeValue> {
        &self.conditions
    }

    /// Test `document` against this rule. See [crate::evaluate].
    pub fn test(&self, document: &AttributeValue) -> bool {
        evaluate(self, document, None)
    }

    /// Test `document` against this rule, reporting any problems to `diagnostic_recorder`.
    pub fn test_with_recorder(
        &self,
        document: &AttributeValue,
        diagnostic_recorder: &dyn DiagnosticRecorder,
    ) -> bool {
        evaluate(self, document, Some(diagnostic_recorder))
    }
}

impl From<HashMap<String, AttributeValue>> for Rule {
    fn from(conditions: HashMap<String, AttributeValue>) -> Self {
        Rule::new(conditions)
    }
}

impl TryFrom<AttributeValue> for Rule {
    type Error = Error;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::Object(conditions) => Ok(Rule::new(conditions)),
            other => Err(Error::NotAnObject(other.type_tag())),
        }
    }
}

const RULE_LIST: &str = "a list of rules";

impl<'a> Evaluator<'a> {
    pub(crate) fn test_rule(
        &mut self,
        rule: &HashMap<String, AttributeValue>,
        document: &AttributeValue,
    ) -> bool {
        self.nested(|evaluator| {
            // keys are all evaluated, so that a problem in one is reported even when another fails
            let mut matched = true;
            for (key, condition) in rule {
                if !evaluator.test_key(key, condition, document) {
                    matched = false;
                }
            }
            matched
        })
    }

    fn test_key(&mut self, key: &str, condition: &AttributeValue, document: &AttributeValue) -> bool {
        match key {
            "$and" => match self.rule_list(key, condition) {
                Some(rules) => rules.into_iter().all(|rule| self.test_rule(rule, document)),
                None => false,
            },
            // an empty $or matches, unlike the usual empty disjunction
            "$or" => match self.rule_list(key, condition) {
                Some(rules) => {
                    rules.is_empty() || rules.into_iter().any(|rule| self.test_rule(rule, document))
                }
                None => false,
            },
            "$nor" => match self.rule_list(key, condition) {
                Some(rules) => !rules.into_iter().any(|rule| self.test_rule(rule, document)),
                None => false,
            },
            "$not" => match condition {
                AttributeValue::Object(rule) => !self.test_rule(rule, document),
                _ => self.malformed_rule(key, "a rule"),
            },
            path => {
                let value = resolve(document, &Path::new(path));
                self.matches_condition(value, condition)
            }
        }
    }

    fn rule_list<'r>(
        &self,
        key: &str,
        condition: &'r AttributeValue,
    ) -> Option<Vec<&'r HashMap<String, AttributeValue>>> {
        let rules = condition
            .as_array()
            .and_then(|items| items.iter().map(AttributeValue::as_object).collect());
        if rules.is_none() {
            self.malformed_rule(key, RULE_LIST);
        }
        rules
    }

    fn malformed_rule(&self, key: &str, expected: &str) -> bool {
        self.report(Diagnostic::MalformedRule {
            key: key.to_owned(),
            expected: expected.to_owned(),
        });
        false
    }
}
