use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cumulative validation tiers; each level runs every level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidationLevel {
    Schema,
    FileExistence,
    #[serde(alias = "UnityPackages")]
    FormatSpecific,
    Full,
}

impl ValidationLevel {
    pub const ALL: [ValidationLevel; 4] = [
        ValidationLevel::Schema,
        ValidationLevel::FileExistence,
        ValidationLevel::FormatSpecific,
        ValidationLevel::Full,
    ];
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationLevel::Schema => "Schema",
            ValidationLevel::FileExistence => "FileExistence",
            ValidationLevel::FormatSpecific => "FormatSpecific",
            ValidationLevel::Full => "Full",
        };
        f.write_str(name)
    }
}

impl FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "schema" => Ok(ValidationLevel::Schema),
            "fileexistence" | "files" => Ok(ValidationLevel::FileExistence),
            "formatspecific" | "unitypackages" | "packages" => Ok(ValidationLevel::FormatSpecific),
            "full" => Ok(ValidationLevel::Full),
            _ => Err(format!(
                "unknown validation level '{}' \
                 (expected schema, file-existence, format-specific or full)",
                s
            )),
        }
    }
}

/// One validation finding. Codes are stable (`SCHEMA002`, `FILE001`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            file: None,
            line: None,
            context: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub level: ValidationLevel,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl ValidationResult {
    pub(crate) fn new(level: ValidationLevel) -> Self {
        Self {
            is_valid: true,
            level,
            errors: Vec::new(),
            warnings: Vec::new(),
            summary: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn error(&mut self, issue: ValidationIssue) {
        tracing::debug!(code = %issue.code, "{}", issue.message);
        self.errors.push(issue);
    }

    pub(crate) fn warning(&mut self, issue: ValidationIssue) {
        tracing::debug!(code = %issue.code, "{}", issue.message);
        self.warnings.push(issue);
    }

    /// Settle validity and the summary line once every level has run.
    pub(crate) fn finish(&mut self) {
        self.is_valid = self.errors.is_empty();
        self.summary = match (self.errors.len(), self.warnings.len()) {
            (0, 0) => format!("Validation passed at level {} with no issues.", self.level),
            (0, w) => format!(
                "Validation passed at level {} with {} warning(s).",
                self.level, w
            ),
            (e, w) => format!(
                "Validation failed at level {} with {} error(s) and {} warning(s).",
                self.level, e, w
            ),
        };
    }

    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .any(|issue| issue.code == code)
    }
}
