use serde::{Deserialize, Serialize};

/// Normalized job status. Raw status strings coming back from the stage
/// workers are folded into this enum at the read boundary; nothing past it
/// matches on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        // Older workers report "running" where newer ones say "processing".
        match s.to_ascii_lowercase().as_str() {
            "pending" => JobStatus::Pending,
            "processing" | "running" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        JobStatus::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pending", JobStatus::Pending)]
    #[case("processing", JobStatus::Processing)]
    #[case("running", JobStatus::Processing)]
    #[case("RUNNING", JobStatus::Processing)]
    #[case("completed", JobStatus::Completed)]
    #[case("failed", JobStatus::Failed)]
    #[case("something_else", JobStatus::Pending)]
    #[case("", JobStatus::Pending)]
    fn test_normalize_raw_status(#[case] raw: &str, #[case] expected: JobStatus) {
        assert_eq!(JobStatus::from(raw), expected);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_display_matches_stored_form() {
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!(JobStatus::from("running").to_string(), "processing");
    }
}
