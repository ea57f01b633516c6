//! Wire shapes of the settlement backend.
//!
//! Every response is wrapped in `{ statusCode, data, msg }`. The backend is
//! loose about scalar types: `id`, `jobCode` and `status` arrive either as JSON
//! numbers or as strings, so those fields decode through [`Scalar`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{BackendError, SUCCESS_STATUS};
use crate::job::{JobCode, JobState, SettlementDate, WorkflowJob};

/// Uniform response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: String,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS
    }

    /// Unwrap the payload of a successful envelope, or turn the envelope into
    /// an application error.
    pub fn into_data(self, operation: &'static str) -> Result<Value, BackendError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(BackendError::Application {
                operation,
                status_code: self.status_code,
                msg: self.msg,
            })
        }
    }
}

/// Request body shared by init, run and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// `YYYYMMDD`.
    pub settle_dt: String,
    pub job_no: u32,
}

impl JobRequest {
    /// The "all jobs" selector used by initiation and listing.
    pub const ALL_JOBS: u32 = 0;

    pub fn all(date: SettlementDate) -> Self {
        Self {
            settle_dt: date.compact(),
            job_no: Self::ALL_JOBS,
        }
    }

    pub fn single(date: SettlementDate, code: JobCode) -> Self {
        Self {
            settle_dt: date.compact(),
            job_no: code.as_u32(),
        }
    }
}

/// Request body of the file retrieval endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRequest<'a> {
    pub location: &'a str,
}

/// A JSON scalar that may be a string or a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar(pub String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Scalar(s)),
            Value::Number(n) => Ok(Scalar(n.to_string())),
            Value::Bool(b) => Ok(Scalar(b.to_string())),
            Value::Null => Ok(Scalar(String::new())),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number, found {other}"
            ))),
        }
    }
}

/// One job as the backend describes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub id: Scalar,
    pub job_name: String,
    pub job_code: Scalar,
    pub settle_dt: String,
    #[serde(default)]
    pub plan_start_time: Option<String>,
    #[serde(default)]
    pub real_start_time: Option<String>,
    #[serde(default)]
    pub plan_end_time: Option<String>,
    #[serde(default)]
    pub real_end_time: Option<String>,
    #[serde(default)]
    pub status: Option<Scalar>,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl JobDescriptor {
    /// Map into the domain record. Actual timestamps are taken verbatim.
    pub fn into_job(self) -> Result<WorkflowJob, String> {
        let code: JobCode = self
            .job_code
            .0
            .parse()
            .map_err(|_| format!("job code '{}' is not numeric", self.job_code.0))?;
        let settlement_date: SettlementDate = self
            .settle_dt
            .parse()
            .map_err(|e| format!("job {code}: {e}"))?;
        let state = self
            .status
            .map(|s| JobState::from_wire(&s.0))
            .unwrap_or_default();

        Ok(WorkflowJob {
            id: self.id.0,
            code,
            name: self.job_name,
            settlement_date,
            planned_start: self.plan_start_time.unwrap_or_default(),
            planned_end: self.plan_end_time.unwrap_or_default(),
            actual_start: self.real_start_time,
            actual_end: self.real_end_time,
            state,
            artifact_ref: self.file_path.filter(|p| !p.is_empty()),
        })
    }
}

/// Decode a descriptor list payload into domain jobs.
pub fn decode_jobs(operation: &'static str, data: Value) -> Result<Vec<WorkflowJob>, BackendError> {
    let decode_err = |message: String| BackendError::Decode { operation, message };

    if data.is_null() {
        return Ok(Vec::new());
    }
    let descriptors: Vec<JobDescriptor> =
        serde_json::from_value(data).map_err(|e| decode_err(e.to_string()))?;
    descriptors
        .into_iter()
        .map(|d| d.into_job().map_err(decode_err))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor_json(code: Value, status: Value) -> Value {
        json!({
            "id": 101,
            "jobName": "Clearing file import",
            "jobCode": code,
            "settleDt": "20251211",
            "planStartTime": "2025-12-11 01:00:00",
            "planEndTime": "2025-12-11 01:30:00",
            "status": status,
        })
    }

    #[test]
    fn test_envelope_success_sentinel() {
        let ok: Envelope = serde_json::from_value(json!({"statusCode": "00", "data": [], "msg": "ok"})).unwrap();
        let failed: Envelope = serde_json::from_value(json!({"statusCode": "01", "msg": "busy"})).unwrap();
        assert!(ok.is_success());
        assert!(!failed.is_success());

        let err = failed.into_data("run").unwrap_err();
        match err {
            BackendError::Application { status_code, msg, operation } => {
                assert_eq!(status_code, "01");
                assert_eq!(msg, "busy");
                assert_eq!(operation, "run");
            }
            other => panic!("Expected Application, got {other:?}"),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let date: SettlementDate = "2025/12/11".parse().unwrap();
        let body = serde_json::to_value(JobRequest::single(date, JobCode(3))).unwrap();
        assert_eq!(body, json!({"settleDt": "20251211", "jobNo": 3}));
        let all = serde_json::to_value(JobRequest::all(date)).unwrap();
        assert_eq!(all, json!({"settleDt": "20251211", "jobNo": 0}));
    }

    #[test]
    fn test_descriptor_accepts_numeric_and_string_scalars() {
        let jobs = decode_jobs(
            "tasks",
            json!([
                descriptor_json(json!(0), json!(2)),
                descriptor_json(json!("1"), json!("3")),
            ]),
        )
        .unwrap();
        assert_eq!(jobs[0].code, JobCode(0));
        assert_eq!(jobs[0].state, JobState::Completed);
        assert_eq!(jobs[0].id, "101");
        assert_eq!(jobs[1].code, JobCode(1));
        assert_eq!(jobs[1].state, JobState::Error);
    }

    #[test]
    fn test_descriptor_optional_fields() {
        let mut raw = descriptor_json(json!(4), json!("9"));
        raw["realStartTime"] = json!("2025-12-11 01:02:03");
        raw["filePath"] = json!("");
        let job = decode_jobs("tasks", json!([raw])).unwrap().remove(0);

        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.actual_start.as_deref(), Some("2025-12-11 01:02:03"));
        assert!(job.actual_end.is_none());
        assert!(job.artifact_ref.is_none());
        assert_eq!(job.settlement_date.to_string(), "2025/12/11");
    }

    #[test]
    fn test_missing_status_reads_as_pending() {
        let mut raw = descriptor_json(json!(1), json!(null));
        raw.as_object_mut().unwrap().remove("status");
        let job = decode_jobs("init", json!([raw])).unwrap().remove(0);
        assert_eq!(job.state, JobState::Pending);
    }

    #[test]
    fn test_non_numeric_code_is_decode_error() {
        let err = decode_jobs("tasks", json!([descriptor_json(json!("abc"), json!(0))])).unwrap_err();
        assert!(matches!(err, BackendError::Decode { operation: "tasks", .. }));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_null_payload_is_empty_batch() {
        assert!(decode_jobs("init", Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_non_list_payload_is_decode_error() {
        let err = decode_jobs("init", json!({"unexpected": true})).unwrap_err();
        assert!(err.is_transport());
    }
}
