use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

use crate::attribute_value::AttributeValue;
use crate::eval::{evaluate, Diagnostic, DiagnosticRecorder, Evaluator};
use crate::rule::Rule;

/// A feature and its ordered list of targeting rules, as stored in the flag definition store.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub value_type: ValueType,
    pub default_value: String,
    #[serde(default)]
    pub rules: Vec<FeatureRule>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Boolean,
    Number,
    String,
    Json,
}

/// What a feature rule does once its condition matches.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RuleType {
    /// Serve [FeatureRule::value] to every matching document.
    Force,
    /// Serve one of [FeatureRule::rollout] according to its weights.
    Rollout,
    /// Assign one of [FeatureRule::variations] as part of an experiment.
    Experiment,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RolloutValue {
    pub value: String,
    pub weight: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub condition: RuleCondition,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub coverage: Option<f64>,
    #[serde(default)]
    pub rollout: Vec<RolloutValue>,
    #[serde(default)]
    pub variations: Vec<String>,
    #[serde(default)]
    pub tracking_key: Option<String>,
    #[serde(default)]
    pub user_id_type: Option<String>,
    #[serde(default)]
    pub experiment: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

/// A feature rule's targeting condition.
///
/// The store keeps conditions as JSON-encoded strings. They are parsed once, when the feature
/// is deserialized, and a condition that fails to parse is kept as [RuleCondition::Invalid] so
/// that one bad rule does not prevent the rest of the feature from loading.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RuleCondition {
    /// No condition was set; every document matches.
    #[default]
    Always,
    Parsed(Rule),
    /// The stored condition was not a JSON object. It never matches.
    Invalid(String),
}

impl RuleCondition {
    /// Parses a stored condition string. Blank strings mean "no condition".
    pub fn parse(condition: &str) -> Self {
        if condition.trim().is_empty() {
            return RuleCondition::Always;
        }
        match serde_json::from_str::<Rule>(condition) {
            Ok(rule) => RuleCondition::Parsed(rule),
            Err(e) => RuleCondition::Invalid(e.to_string()),
        }
    }

    pub fn matches(
        &self,
        document: &AttributeValue,
        diagnostic_recorder: Option<&dyn DiagnosticRecorder>,
    ) -> bool {
        match self {
            RuleCondition::Always => true,
            RuleCondition::Parsed(rule) => evaluate(rule, document, diagnostic_recorder),
            RuleCondition::Invalid(error) => {
                Evaluator::new(diagnostic_recorder).report(Diagnostic::InvalidCondition {
                    error: error.clone(),
                });
                false
            }
        }
    }
}

impl<'de> Deserialize<'de> for RuleCondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleConditionVisitor;

        impl<'de> Visitor<'de> for RuleConditionVisitor {
            type Value = RuleCondition;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON-encoded rule string or null")
            }

            fn visit_str<E>(self, v: &str) -> Result<RuleCondition, E>
            where
                E: de::Error,
            {
                Ok(RuleCondition::parse(v))
            }

            fn visit_none<E>(self) -> Result<RuleCondition, E>
            where
                E: de::Error,
            {
                Ok(RuleCondition::Always)
            }

            fn visit_unit<E>(self) -> Result<RuleCondition, E>
            where
                E: de::Error,
            {
                Ok(RuleCondition::Always)
            }
        }

        deserializer.deserialize_any(RuleConditionVisitor)
    }
}

impl FeatureRule {
    /// A rule applies to a document when it is enabled and its condition matches.
    pub fn matches(
        &self,
        document: &AttributeValue,
        diagnostic_recorder: Option<&dyn DiagnosticRecorder>,
    ) -> bool {
        self.enabled && self.condition.matches(document, diagnostic_recorder)
    }
}

/// The outcome of checking a document against a feature's rules.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureResult<'a> {
    /// A `force` rule matched and its value applies.
    Forced { rule_index: usize, value: &'a str },
    /// A `rollout` or `experiment` rule matched. Choosing the value requires bucketing the
    /// document, which is the caller's responsibility.
    NeedsAssignment {
        rule_index: usize,
        rule: &'a FeatureRule,
    },
    /// No rule matched; the feature's default value applies.
    Default { value: &'a str },
}

impl Feature {
    /// Returns the index and rule of the first rule that applies to `document`, if any.
    pub fn first_matching_rule(
        &self,
        document: &AttributeValue,
        diagnostic_recorder: Option<&dyn DiagnosticRecorder>,
    ) -> Option<(usize, &FeatureRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(document, diagnostic_recorder))
    }

    /// Rules are checked in order and the first one that applies decides the result.
    pub fn evaluate(
        &self,
        document: &AttributeValue,
        diagnostic_recorder: Option<&dyn DiagnosticRecorder>,
    ) -> FeatureResult<'_> {
        match self.first_matching_rule(document, diagnostic_recorder) {
            Some((rule_index, rule)) if rule.rule_type == RuleType::Force => FeatureResult::Forced {
                rule_index,
                value: &rule.value,
            },
            Some((rule_index, rule)) => FeatureResult::NeedsAssignment { rule_index, rule },
            None => FeatureResult::Default {
                value: &self.default_value,
            },
        }
    }
}
