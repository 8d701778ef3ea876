//! Test report: wire form (strict structured-output schema) and internal
//! form.
//!
//! `fieldCoverage` and `sampleRecords` carry the same "arbitrary shape the
//! schema validator can't express" problem as `ReconReport::sample_data`, so
//! they travel as opaque JSON strings on the wire and are parsed into
//! idiomatic types on the way in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaErrorWire {
    pub path: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaError {
    pub path: Option<String>,
    pub message: String,
}

/// Strict-mode-safe structured-output shape for one scraper test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReportWire {
    pub success: bool,
    pub exit_code: i32,
    pub timed_out: bool,
    pub record_count: u64,
    pub duration_ms: u64,
    pub schema_errors: Vec<SchemaErrorWire>,
    /// Up to three sample records, serialized as a JSON array string.
    pub sample_records: Option<String>,
    /// Field name -> coverage percentage (0-100), serialized as a JSON
    /// object string.
    pub field_coverage: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub success: bool,
    pub exit_code: i32,
    pub timed_out: bool,
    pub record_count: u64,
    pub duration_ms: u64,
    pub schema_errors: Vec<SchemaError>,
    pub sample_records: Vec<Value>,
    pub field_coverage: HashMap<String, u8>,
    pub stdout: String,
    pub stderr: String,
}

/// Exit code reserved for a timed-out scraper run.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Error)]
pub enum TestReportConversionError {
    #[error("sample_records was not valid JSON: {0}")]
    InvalidSampleRecords(serde_json::Error),
    #[error("field_coverage was not valid JSON: {0}")]
    InvalidFieldCoverage(serde_json::Error),
}

impl TestReport {
    pub fn from_wire(wire: TestReportWire) -> Result<Self, TestReportConversionError> {
        let sample_records = wire
            .sample_records
            .as_deref()
            .map(|raw| serde_json::from_str::<Vec<Value>>(raw))
            .transpose()
            .map_err(TestReportConversionError::InvalidSampleRecords)?
            .unwrap_or_default();

        let field_coverage = wire
            .field_coverage
            .as_deref()
            .map(|raw| serde_json::from_str::<HashMap<String, u8>>(raw))
            .transpose()
            .map_err(TestReportConversionError::InvalidFieldCoverage)?
            .unwrap_or_default();

        Ok(Self {
            success: wire.success,
            exit_code: wire.exit_code,
            timed_out: wire.timed_out,
            record_count: wire.record_count,
            duration_ms: wire.duration_ms,
            schema_errors: wire
                .schema_errors
                .into_iter()
                .map(|e| SchemaError {
                    path: e.path,
                    message: e.message,
                })
                .collect(),
            sample_records,
            field_coverage,
            stdout: wire.stdout,
            stderr: wire.stderr,
        })
    }

    #[must_use]
    pub fn to_wire(&self) -> TestReportWire {
        TestReportWire {
            success: self.success,
            exit_code: self.exit_code,
            timed_out: self.timed_out,
            record_count: self.record_count,
            duration_ms: self.duration_ms,
            schema_errors: self
                .schema_errors
                .iter()
                .map(|e| SchemaErrorWire {
                    path: e.path.clone(),
                    message: e.message.clone(),
                })
                .collect(),
            sample_records: if self.sample_records.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&self.sample_records).unwrap_or_default())
            },
            field_coverage: if self.field_coverage.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&self.field_coverage).unwrap_or_default())
            },
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_exit_code_is_124() {
        assert_eq!(TIMEOUT_EXIT_CODE, 124);
    }

    #[test]
    fn round_trips_through_wire() {
        let wire = TestReportWire {
            success: true,
            exit_code: 0,
            timed_out: false,
            record_count: 7,
            duration_ms: 1200,
            schema_errors: vec![],
            sample_records: Some(r#"[{"title":"a"}]"#.into()),
            field_coverage: Some(r#"{"title":100}"#.into()),
            stdout: "ok".into(),
            stderr: String::new(),
        };

        let internal = TestReport::from_wire(wire).unwrap();
        assert_eq!(internal.record_count, 7);
        assert_eq!(internal.field_coverage.get("title"), Some(&100));

        let back = internal.to_wire();
        assert!(back.success);
        assert_eq!(back.record_count, 7);
    }

    #[test]
    fn malformed_field_coverage_is_an_error() {
        let wire = TestReportWire {
            success: false,
            exit_code: 1,
            timed_out: false,
            record_count: 0,
            duration_ms: 10,
            schema_errors: vec![],
            sample_records: None,
            field_coverage: Some("not json".into()),
            stdout: String::new(),
            stderr: "boom".into(),
        };
        assert!(TestReport::from_wire(wire).is_err());
    }
}
