use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::backend::GenerationError;
use crate::workflows::funnel::domain::FunnelStructure;

/// Severity of a compliance finding. `Error` blocks the result from being
/// served; `Warning` rides along on the success outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One finding from the compliance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

/// Review verdict. The reviewer's internal decision logic is a black box;
/// the orchestrator only acts on severities and the optional correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub is_compliant: bool,
    #[serde(default)]
    pub issues: Vec<ComplianceIssue>,
    #[serde(default)]
    pub corrected: Option<FunnelStructure>,
}

impl ComplianceReport {
    pub fn approved() -> Self {
        Self {
            is_compliant: true,
            issues: Vec::new(),
            corrected: None,
        }
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ComplianceIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
    }
}

/// Outbound hook for the compliance/validation service.
#[async_trait]
pub trait ComplianceReviewer: Send + Sync {
    async fn review(&self, funnel: &FunnelStructure) -> Result<ComplianceReport, GenerationError>;
}

/// Reviewer for deployments without a compliance endpoint: everything passes.
#[derive(Debug, Default)]
pub struct ApproveAllReviewer;

#[async_trait]
impl ComplianceReviewer for ApproveAllReviewer {
    async fn review(&self, _funnel: &FunnelStructure) -> Result<ComplianceReport, GenerationError> {
        Ok(ComplianceReport::approved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_detection_looks_only_at_error_severity() {
        let report = ComplianceReport {
            is_compliant: false,
            issues: vec![
                ComplianceIssue {
                    severity: IssueSeverity::Warning,
                    message: "headline is close to a health claim".to_string(),
                },
                ComplianceIssue {
                    severity: IssueSeverity::Error,
                    message: "testimonial lacks disclosure".to_string(),
                },
            ],
            corrected: None,
        };

        assert!(report.has_blocking_issues());
        assert_eq!(report.warnings().count(), 1);

        let warnings_only = ComplianceReport {
            is_compliant: false,
            issues: vec![ComplianceIssue {
                severity: IssueSeverity::Warning,
                message: "long headline".to_string(),
            }],
            corrected: None,
        };
        assert!(!warnings_only.has_blocking_issues());
    }
}
