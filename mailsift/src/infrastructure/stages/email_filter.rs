// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Email Filter Stage
//!
//! Evaluates include/exclude filters over each email's header keys and
//! values, attribute keys and values, body text and MIME part headers.
//!
//! Filtering is observational: emails that a filter would drop are logged,
//! not removed. Stages reach the store only through their view, and views
//! deliberately expose no removal, so destructive filtering belongs to an
//! outer surface that owns the store.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, warn};

use mailsift_domain::services::{Stage, StageCore};
use mailsift_domain::{Email, EngineError, StageState, StoreView};

fn filter_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "filters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "fields": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "value": {
                                        "type": "string",
                                        "description": "The field to inspect (headerKey, headerVal, attributeKey, attributeVal, body, MIMEPartKey, MIMEPartVal)."
                                    },
                                    "outcome": {
                                        "type": "string",
                                        "enum": ["include", "exclude"],
                                        "description": "Whether matching emails are kept or dropped."
                                    },
                                    "filterBy": {
                                        "type": "string",
                                        "description": "Match mode: string equality or regex."
                                    },
                                    "filterVals": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "filterValue": {
                                                    "type": "string",
                                                    "description": "The value to match against."
                                                }
                                            },
                                            "required": ["filterValue"],
                                            "additionalProperties": false
                                        },
                                        "description": "A list of values to match against."
                                    }
                                },
                                "required": ["value", "outcome", "filterBy", "filterVals"],
                                "additionalProperties": false
                            },
                            "description": "A list of fields to consider for filtering."
                        }
                    },
                    "required": ["fields"],
                    "additionalProperties": false
                },
                "description": "A list of filters to apply."
            }
        },
        "required": ["filters"],
        "additionalProperties": false
    })
}

struct FieldFilter {
    field: String,
    outcome: String,
    filter_by: String,
    values: Vec<String>,
}

/// Evaluates configured filters over every email in the view.
pub struct EmailFilterStage {
    core: StageCore,
}

impl EmailFilterStage {
    pub const PLUGIN_NAME: &'static str = "EmailFilter";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, filter_schema());
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }

    /// The filterable fields of one email, keyed by field name.
    fn field_values(email: &Email) -> HashMap<String, Vec<String>> {
        let mut fields = HashMap::new();
        fields.insert("headerKey".to_string(), email.header_keys());
        fields.insert("headerVal".to_string(), email.header_values());
        fields.insert("attributeKey".to_string(), email.attribute_keys());
        fields.insert(
            "attributeVal".to_string(),
            email.attribute_values().iter().map(|v| v.to_string()).collect(),
        );
        if let Some(body) = email.body() {
            match body.parts() {
                Some(parts) => {
                    let mut bodies = Vec::new();
                    let mut part_keys = Vec::new();
                    let mut part_vals = Vec::new();
                    for part in parts {
                        bodies.push(part.content().to_string());
                        part_keys.extend(part.header_keys());
                        part_vals.extend(part.header_values());
                    }
                    fields.insert("body".to_string(), bodies);
                    fields.insert("MIMEPartKey".to_string(), part_keys);
                    fields.insert("MIMEPartVal".to_string(), part_vals);
                }
                None => {
                    fields.insert("body".to_string(), vec![body.all_data()]);
                }
            }
        }
        fields
    }

    /// Whether the filter would drop this email.
    fn would_remove(fields: &HashMap<String, Vec<String>>, filter: &FieldFilter) -> bool {
        let candidates = fields.get(&filter.field).cloned().unwrap_or_default();
        let mut match_found = false;
        for filter_value in &filter.values {
            if filter.filter_by == "string" {
                if candidates.iter().any(|candidate| candidate == filter_value) {
                    match_found = true;
                }
            } else if let Ok(pattern) = Regex::new(&format!("^(?:{})$", filter_value)) {
                if candidates.iter().any(|candidate| pattern.is_match(candidate)) {
                    match_found = true;
                }
            } else {
                warn!("invalid filter regex: {}", filter_value);
            }
        }
        (filter.outcome == "include" && !match_found) || (filter.outcome == "exclude" && match_found)
    }

    fn parse_filters(config: &Value) -> Vec<FieldFilter> {
        let mut parsed = Vec::new();
        for filter in config["filters"].as_array().cloned().unwrap_or_default() {
            for field in filter["fields"].as_array().cloned().unwrap_or_default() {
                parsed.push(FieldFilter {
                    field: field["value"].as_str().unwrap_or_default().to_string(),
                    outcome: field["outcome"].as_str().unwrap_or_default().to_string(),
                    filter_by: field["filterBy"].as_str().unwrap_or_default().to_string(),
                    values: field["filterVals"]
                        .as_array()
                        .cloned()
                        .unwrap_or_default()
                        .iter()
                        .map(|v| v["filterValue"].as_str().unwrap_or_default().to_string())
                        .collect(),
                });
            }
        }
        parsed
    }
}

impl Stage for EmailFilterStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("email filter execute called");
        self.core.transition_to(StageState::Running);
        let config = self.core.config();
        let filters = Self::parse_filters(&config);

        let mut flagged = 0usize;
        view.for_each(|email| {
            let fields = Self::field_values(email);
            if filters.iter().any(|filter| Self::would_remove(&fields, filter)) {
                info!("email {} matched a removal filter", email.content_hash());
                flagged += 1;
            }
        });
        info!("email filter flagged {} emails", flagged);
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailsift_domain::value_objects::AttributeValue;
    use mailsift_domain::ATTR_FILE_BYTES;

    fn email_with_header(key: &str, value: &str) -> Email {
        let mut email = Email::new();
        email.set_header(key, value);
        email.insert_attribute(ATTR_FILE_BYTES, AttributeValue::CharVector(b"x".to_vec()));
        email.finalize().unwrap();
        email
    }

    fn filter(field: &str, outcome: &str, filter_by: &str, values: &[&str]) -> FieldFilter {
        FieldFilter {
            field: field.to_string(),
            outcome: outcome.to_string(),
            filter_by: filter_by.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_exclude_drops_matching() {
        let email = email_with_header("From", "spam@example.com");
        let fields = EmailFilterStage::field_values(&email);
        let exclude = filter("headerVal", "exclude", "string", &["spam@example.com"]);
        assert!(EmailFilterStage::would_remove(&fields, &exclude));
    }

    #[test]
    fn test_include_drops_non_matching() {
        let email = email_with_header("From", "friend@example.com");
        let fields = EmailFilterStage::field_values(&email);
        let include = filter("headerVal", "include", "string", &["boss@example.com"]);
        assert!(EmailFilterStage::would_remove(&fields, &include));
        let include = filter("headerVal", "include", "string", &["friend@example.com"]);
        assert!(!EmailFilterStage::would_remove(&fields, &include));
    }

    #[test]
    fn test_regex_matching() {
        let email = email_with_header("Subject", "quarterly report");
        let fields = EmailFilterStage::field_values(&email);
        let exclude = filter("headerVal", "exclude", "regex", &["quarterly.*"]);
        assert!(EmailFilterStage::would_remove(&fields, &exclude));
    }
}
