//! JSON output structures for the DotVault CLI

use dotvault_engine::VerifyReport;
use serde::Serialize;

/// Envelope printed for every command under `--json`
#[derive(Debug, Serialize)]
pub struct CommandOutput<T: Serialize> {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Command-specific payload
    pub result: T,
}

/// Operation metadata
#[derive(Debug, Serialize)]
pub struct OperationMetadata {
    /// DotVault version
    pub version: String,
    /// Command name
    pub operation: String,
    /// RFC 3339 time the output was produced
    pub timestamp: String,
}

impl OperationMetadata {
    /// Metadata for `operation` stamped with the current time
    pub fn now(operation: &str) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Verification report in JSON format
#[derive(Debug, Serialize)]
pub struct VerifyReportJson {
    /// Whether every file matched
    pub clean: bool,
    /// Matching relative paths
    pub matched: Vec<String>,
    /// Relative paths whose content differs
    pub mismatched: Vec<String>,
    /// Relative paths absent from the live tree
    pub missing: Vec<String>,
}

impl From<&VerifyReport> for VerifyReportJson {
    fn from(report: &VerifyReport) -> Self {
        let strings = |paths: &[std::path::PathBuf]| {
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
        };
        Self {
            clean: report.is_clean(),
            matched: strings(&report.matched),
            mismatched: strings(&report.mismatched),
            missing: strings(&report.missing),
        }
    }
}

/// Serialize `result` inside the standard envelope
pub fn to_json<T: Serialize>(operation: &str, result: T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&CommandOutput {
        metadata: OperationMetadata::now(operation),
        result,
    })
}

/// Print `result` inside the standard envelope
pub fn print_json<T: Serialize>(operation: &str, result: T) -> anyhow::Result<()> {
    println!("{}", to_json(operation, result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotvault_types::BackupResult;
    use std::path::PathBuf;

    #[test]
    fn test_backup_result_envelope() {
        let result = BackupResult {
            success: true,
            output_path: PathBuf::from("/tmp/dots.zip"),
            total_files: 3,
            total_bytes: 120,
            ..BackupResult::default()
        };

        let json = to_json("backup", &result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["operation"], "backup");
        assert_eq!(value["result"]["total_files"], 3);
        assert_eq!(value["result"]["output_path"], "/tmp/dots.zip");
    }

    #[test]
    fn test_verify_report_json() {
        let report = VerifyReport {
            matched: vec![PathBuf::from(".bashrc")],
            mismatched: Vec::new(),
            missing: vec![PathBuf::from(".vimrc")],
        };
        let json = VerifyReportJson::from(&report);
        assert!(!json.clean);
        assert_eq!(json.missing, vec![".vimrc".to_string()]);
    }
}
