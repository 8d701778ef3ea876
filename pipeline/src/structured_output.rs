//! Structured-output schemas for recon and test reports, plus the adapters
//! that recover a valid report from partially malformed model output.
//!
//! Both schemas describe the *wire* form: every key present, optionality
//! flattened to nullable, and the one field each report can't express as a
//! nested object under a strict validator (`sampleData`, `sampleRecords`,
//! `fieldCoverage`) carried as a JSON-string-typed field.

use noctua_llm::InvokeOutcome;
use noctua_types::{ReconReport, ReconReportWire, TestReport, TestReportWire};
use serde_json::{Value, json};
use thiserror::Error;

#[must_use]
pub fn recon_report_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["url", "site_name", "site_type", "pages", "api_endpoints", "anti_bot", "sample_data", "suggested_strategy"],
        "properties": {
            "url": { "type": "string" },
            "site_name": { "type": "string" },
            "site_type": { "enum": ["static_html", "spa", "api_first", "hybrid", "unknown"] },
            "pages": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["url", "purpose", "form_fields", "data_elements", "pagination"],
                    "properties": {
                        "url": { "type": "string" },
                        "purpose": { "enum": ["search", "listing", "detail", "login", "other"] },
                        "form_fields": {
                            "type": ["array", "null"],
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["name", "selector", "type", "required", "options"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "selector": { "type": "string" },
                                    "type": { "type": "string" },
                                    "required": { "type": "boolean" },
                                    "options": { "type": ["array", "null"], "items": { "type": "string" } }
                                }
                            }
                        },
                        "data_elements": { "type": ["array", "null"], "items": { "type": "string" } },
                        "pagination": {
                            "type": ["object", "null"],
                            "additionalProperties": false,
                            "required": ["type", "next_selector", "url_param_name", "url_param_start", "load_more_selector"],
                            "properties": {
                                "type": { "enum": ["next_link", "url_param", "infinite_scroll", "load_more", "none"] },
                                "next_selector": { "type": ["string", "null"] },
                                "url_param_name": { "type": ["string", "null"] },
                                "url_param_start": { "type": ["integer", "null"] },
                                "load_more_selector": { "type": ["string", "null"] }
                            }
                        }
                    }
                }
            },
            "api_endpoints": {
                "type": ["array", "null"],
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["url", "method", "content_type", "response_shape"],
                    "properties": {
                        "url": { "type": "string" },
                        "method": { "type": "string" },
                        "content_type": { "type": ["string", "null"] },
                        "response_shape": { "type": ["string", "null"] }
                    }
                }
            },
            "anti_bot": {
                "type": "object",
                "additionalProperties": false,
                "required": ["captcha", "cloudflare", "rate_limit", "requires_auth"],
                "properties": {
                    "captcha": { "type": "boolean" },
                    "cloudflare": { "type": "boolean" },
                    "rate_limit": { "type": "boolean" },
                    "requires_auth": { "type": "boolean" }
                }
            },
            "sample_data": {
                "type": ["string", "null"],
                "description": "JSON array of sample records, serialized as a string"
            },
            "suggested_strategy": { "enum": ["form_search", "listing", "api_direct", "browser_only"] }
        }
    })
}

#[must_use]
pub fn test_report_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "success", "exit_code", "timed_out", "record_count", "duration_ms",
            "schema_errors", "sample_records", "field_coverage", "stdout", "stderr"
        ],
        "properties": {
            "success": { "type": "boolean" },
            "exit_code": { "type": "integer" },
            "timed_out": { "type": "boolean" },
            "record_count": { "type": "integer", "minimum": 0 },
            "duration_ms": { "type": "integer", "minimum": 0 },
            "schema_errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["path", "message"],
                    "properties": {
                        "path": { "type": ["string", "null"] },
                        "message": { "type": "string" }
                    }
                }
            },
            "sample_records": {
                "type": ["string", "null"],
                "description": "JSON array of up to three sample records, serialized as a string"
            },
            "field_coverage": {
                "type": ["string", "null"],
                "description": "JSON object of field name -> 0-100 coverage percentage, serialized as a string"
            },
            "stdout": { "type": "string" },
            "stderr": { "type": "string" }
        }
    })
}

#[derive(Debug, Error)]
pub enum ReconValidationError {
    #[error("no structured output and no raw output to fall back on")]
    NoOutput,
    #[error("structured output did not match the recon report schema: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("recon report conversion failed: {0}")]
    Conversion(#[from] noctua_types::ReconConversionError),
}

/// Recover a validated [`ReconReport`] from an [`InvokeOutcome`]: prefer the
/// schema-validated `final_output`; otherwise parse `output` as JSON and
/// validate it the same way.
pub fn validate_recon_report(outcome: &InvokeOutcome) -> Result<ReconReport, ReconValidationError> {
    let wire: ReconReportWire = if let Some(value) = &outcome.final_output {
        serde_json::from_value(value.clone())?
    } else if let Some(raw) = &outcome.output {
        serde_json::from_str(raw)?
    } else {
        return Err(ReconValidationError::NoOutput);
    };
    Ok(ReconReport::from_wire(wire)?)
}

#[derive(Debug, Error)]
pub enum TestReportValidationError {
    #[error("no structured output and no raw output to fall back on")]
    NoOutput,
    #[error("structured output did not match the test report schema: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("test report conversion failed: {0}")]
    Conversion(#[from] noctua_types::TestReportConversionError),
}

/// Recover a validated [`TestReport`] from an [`InvokeOutcome`], with the
/// same final-output-or-parsed-fallback path as recon.
pub fn validate_test_report(outcome: &InvokeOutcome) -> Result<TestReport, TestReportValidationError> {
    let wire: TestReportWire = if let Some(value) = &outcome.final_output {
        serde_json::from_value(value.clone())?
    } else if let Some(raw) = &outcome.output {
        serde_json::from_str(raw)?
    } else {
        return Err(TestReportValidationError::NoOutput);
    };
    Ok(TestReport::from_wire(wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_with_final_output(value: Value) -> InvokeOutcome {
        InvokeOutcome {
            output: None,
            final_output: Some(value),
            messages: Vec::new(),
            num_turns: 1,
            finish_reason: "stop".to_string(),
            total_cost_usd: 0.01,
        }
    }

    fn sample_recon_wire_json() -> Value {
        serde_json::json!({
            "url": "https://example.com",
            "site_name": "Example",
            "site_type": "hybrid",
            "pages": [],
            "api_endpoints": null,
            "anti_bot": {
                "captcha": false, "cloudflare": false, "rate_limit": false, "requires_auth": false
            },
            "sample_data": null,
            "suggested_strategy": "listing"
        })
    }

    #[test]
    fn validates_from_final_output() {
        let outcome = outcome_with_final_output(sample_recon_wire_json());
        let report = validate_recon_report(&outcome).unwrap();
        assert_eq!(report.site_name, "Example");
    }

    #[test]
    fn falls_back_to_parsing_raw_output() {
        let outcome = InvokeOutcome {
            output: Some(sample_recon_wire_json().to_string()),
            final_output: None,
            messages: Vec::new(),
            num_turns: 2,
            finish_reason: "stop".to_string(),
            total_cost_usd: 0.01,
        };
        let report = validate_recon_report(&outcome).unwrap();
        assert_eq!(report.url, "https://example.com");
    }

    #[test]
    fn no_output_at_all_is_an_error() {
        let outcome = InvokeOutcome {
            output: None,
            final_output: None,
            messages: Vec::new(),
            num_turns: 1,
            finish_reason: "stop".to_string(),
            total_cost_usd: 0.0,
        };
        assert!(matches!(
            validate_recon_report(&outcome),
            Err(ReconValidationError::NoOutput)
        ));
    }

    #[test]
    fn malformed_raw_output_is_a_deserialize_error() {
        let outcome = InvokeOutcome {
            output: Some("not json at all".into()),
            final_output: None,
            messages: Vec::new(),
            num_turns: 1,
            finish_reason: "stop".to_string(),
            total_cost_usd: 0.0,
        };
        assert!(matches!(
            validate_recon_report(&outcome),
            Err(ReconValidationError::Deserialize(_))
        ));
    }

    #[test]
    fn test_report_validates_from_final_output() {
        let outcome = outcome_with_final_output(serde_json::json!({
            "success": true,
            "exit_code": 0,
            "timed_out": false,
            "record_count": 7,
            "duration_ms": 1200,
            "schema_errors": [],
            "sample_records": null,
            "field_coverage": null,
            "stdout": "ok",
            "stderr": ""
        }));
        let report = validate_test_report(&outcome).unwrap();
        assert_eq!(report.record_count, 7);
        assert!(report.success);
    }

    #[test]
    fn recon_schema_declares_every_top_level_field_required() {
        let schema = recon_report_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "sample_data"));
        assert!(required.iter().any(|v| v == "anti_bot"));
    }

    #[test]
    fn test_report_schema_declares_every_top_level_field_required() {
        let schema = test_report_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "field_coverage"));
        assert!(required.iter().any(|v| v == "sample_records"));
    }
}
