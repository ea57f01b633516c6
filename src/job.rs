//! Settlement job data model.
//!
//! A batch is the ordered set of [`WorkflowJob`]s for one [`SettlementDate`].
//! Jobs are addressed by their [`JobCode`], never by the server-assigned `id`.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DateError;

/// Business date a batch applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SettlementDate(NaiveDate);

impl SettlementDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's date in the local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// The 8-digit `YYYYMMDD` form used in every backend request.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for SettlementDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits: String = trimmed.chars().filter(|c| !matches!(c, '/' | '-')).collect();
        let delimited = trimmed.len() == 10
            && (trimmed.matches('/').count() == 2 || trimmed.matches('-').count() == 2);

        if digits.len() != 8
            || !digits.chars().all(|c| c.is_ascii_digit())
            || (trimmed.len() != 8 && !delimited)
        {
            return Err(DateError::Malformed(s.to_string()));
        }

        NaiveDate::parse_from_str(&digits, "%Y%m%d")
            .map(Self)
            .map_err(|_| DateError::OutOfRange(s.to_string()))
    }
}

impl TryFrom<String> for SettlementDate {
    type Error = DateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SettlementDate> for String {
    fn from(date: SettlementDate) -> Self {
        date.compact()
    }
}

impl fmt::Display for SettlementDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y/%m/%d"))
    }
}

/// Execution key of a job within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobCode(pub u32);

impl JobCode {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobCode {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for JobCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Lifecycle state of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

impl JobState {
    /// Map the backend's status enumeration. Unknown values read as pending.
    pub fn from_wire(status: &str) -> Self {
        match status.trim() {
            "1" => Self::Running,
            "2" => Self::Completed,
            "3" => Self::Error,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of settlement work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    /// Server-assigned record identifier.
    pub id: String,
    pub code: JobCode,
    pub name: String,
    pub settlement_date: SettlementDate,
    pub planned_start: String,
    pub planned_end: String,
    /// Only ever populated from the system of record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<String>,
    pub state: JobState,
    /// Storage location of the job's downloadable output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
}

impl WorkflowJob {
    pub fn has_artifact(&self) -> bool {
        self.artifact_ref.as_deref().is_some_and(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parses_compact_form() {
        let date: SettlementDate = "20251211".parse().unwrap();
        assert_eq!(date.compact(), "20251211");
        assert_eq!(date.to_string(), "2025/12/11");
    }

    #[test]
    fn test_date_parses_delimited_forms() {
        let slashed: SettlementDate = "2025/12/11".parse().unwrap();
        let dashed: SettlementDate = "2025-12-11".parse().unwrap();
        assert_eq!(slashed, dashed);
        assert_eq!(slashed.compact(), "20251211");
    }

    #[test]
    fn test_date_rejects_malformed_input() {
        assert_eq!(
            "2025121".parse::<SettlementDate>(),
            Err(DateError::Malformed("2025121".to_string()))
        );
        assert!(matches!(
            "2025/1211".parse::<SettlementDate>(),
            Err(DateError::Malformed(_))
        ));
        assert!(matches!(
            "abcdefgh".parse::<SettlementDate>(),
            Err(DateError::Malformed(_))
        ));
    }

    #[test]
    fn test_date_rejects_impossible_day() {
        assert_eq!(
            "20250230".parse::<SettlementDate>(),
            Err(DateError::OutOfRange("20250230".to_string()))
        );
    }

    #[test]
    fn test_date_serde_uses_compact_form() {
        let date: SettlementDate = "2025/12/11".parse().unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"20251211\"");
        let back: SettlementDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn test_job_state_wire_mapping() {
        assert_eq!(JobState::from_wire("0"), JobState::Pending);
        assert_eq!(JobState::from_wire("1"), JobState::Running);
        assert_eq!(JobState::from_wire("2"), JobState::Completed);
        assert_eq!(JobState::from_wire("3"), JobState::Error);
        assert_eq!(JobState::from_wire("7"), JobState::Pending);
        assert_eq!(JobState::from_wire(""), JobState::Pending);
    }

    #[test]
    fn test_job_code_parses_and_orders() {
        let a: JobCode = "3".parse().unwrap();
        let b: JobCode = " 10 ".parse().unwrap();
        assert!(a < b);
        assert!("x".parse::<JobCode>().is_err());
    }

    #[test]
    fn test_has_artifact_ignores_empty_reference() {
        let mut job = WorkflowJob {
            id: "1".into(),
            code: JobCode(0),
            name: "clearing".into(),
            settlement_date: "20251211".parse().unwrap(),
            planned_start: "01:00".into(),
            planned_end: "02:00".into(),
            actual_start: None,
            actual_end: None,
            state: JobState::Pending,
            artifact_ref: None,
        };
        assert!(!job.has_artifact());
        job.artifact_ref = Some(String::new());
        assert!(!job.has_artifact());
        job.artifact_ref = Some("/data/out/clearing.csv".into());
        assert!(job.has_artifact());
    }
}
