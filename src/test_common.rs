#![cfg(test)]

use crate::eval::{Diagnostic, DiagnosticRecorder};
use crate::feature::Feature;
use maplit::hashmap;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct TestFeatures {
    features: HashMap<String, Feature>,
}

impl TestFeatures {
    pub fn new() -> Self {
        Self {
            features: hashmap! {
                "checkout-redesign".to_string() => serde_json::from_str(r#"{
                        "id": "checkout-redesign",
                        "description": "New checkout flow",
                        "valueType": "string",
                        "defaultValue": "classic",
                        "rules": [
                            {
                                "type": "force",
                                "description": "Employees always see the redesign",
                                "condition": "{\"employee\": true}",
                                "enabled": true,
                                "value": "redesign"
                            },
                            {
                                "type": "force",
                                "description": "Legacy flow for some countries",
                                "condition": "{\"country\": {\"$in\": [\"FR\", \"DE\"]}}",
                                "enabled": false,
                                "value": "legacy"
                            },
                            {
                                "type": "rollout",
                                "description": "Half of everyone else",
                                "condition": "",
                                "enabled": true,
                                "coverage": 0.5,
                                "userIdType": "anonymousId",
                                "rollout": [
                                    {"value": "classic", "weight": 0.5},
                                    {"value": "redesign", "weight": 0.5}
                                ]
                            },
                            {
                                "type": "force",
                                "description": "Never reached",
                                "condition": "{\"country\": \"FR\"}",
                                "value": "unreachable"
                            }
                        ]
                    }"#).unwrap(),
                "beta-banner".to_string() => serde_json::from_str(r#"{
                        "id": "beta-banner",
                        "valueType": "boolean",
                        "defaultValue": "false",
                        "rules": [
                            {
                                "type": "force",
                                "description": "Condition was saved half-typed",
                                "condition": "{\"plan\": ",
                                "enabled": true,
                                "value": "true"
                            },
                            {
                                "type": "experiment",
                                "description": "Beta testers",
                                "condition": "{\"tags\": {\"$all\": [\"beta\"]}}",
                                "enabled": true,
                                "trackingKey": "beta-banner-exp",
                                "userIdType": "userId",
                                "coverage": 1,
                                "variations": ["false", "true"]
                            }
                        ]
                    }"#).unwrap(),
            },
        }
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }
}

#[derive(Default)]
pub struct InMemoryDiagnosticRecorder {
    pub diagnostics: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticRecorder for InMemoryDiagnosticRecorder {
    fn record(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
