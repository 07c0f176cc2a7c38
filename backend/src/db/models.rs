use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Doctor {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Patient {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub age: Option<i32>,
    pub contact: Option<String>,
}

/// One row of the `/results` report: a prediction joined with its patient.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResultEntry {
    pub id: i32,
    pub patient_id: i32,
    pub patient_name: String,
    pub patient_age: Option<i32>,
    pub patient_contact: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub test_type: String,
    pub result: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveResultRequest {
    pub patient_id: Option<i32>,
    /// Legacy fallback: a patient username, used when the id is absent.
    pub patient_name: Option<String>,
    #[serde(rename = "type")]
    pub test_type: String,
    pub result: String,
    #[serde(deserialize_with = "confidence_number_or_string")]
    pub confidence: f64,
}

// The frontend posts confidence either as a number or as a formatted string.
fn confidence_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_request_accepts_numeric_confidence() {
        let req: SaveResultRequest = serde_json::from_str(
            r#"{"patient_id": 3, "type": "spiral", "result": "Healthy", "confidence": 0.91}"#,
        )
        .unwrap();
        assert_eq!(req.patient_id, Some(3));
        assert_eq!(req.test_type, "spiral");
        assert!((req.confidence - 0.91).abs() < f64::EPSILON);
    }

    #[test]
    fn save_request_accepts_string_confidence() {
        let req: SaveResultRequest = serde_json::from_str(
            r#"{"patient_name": "patient", "type": "voice", "result": "Parkinson", "confidence": "87.50"}"#,
        )
        .unwrap();
        assert_eq!(req.patient_id, None);
        assert_eq!(req.patient_name.as_deref(), Some("patient"));
        assert!((req.confidence - 87.5).abs() < f64::EPSILON);
    }

    #[test]
    fn save_request_rejects_unparseable_confidence() {
        let result = serde_json::from_str::<SaveResultRequest>(
            r#"{"patient_id": 1, "type": "spiral", "result": "Healthy", "confidence": "high"}"#,
        );
        assert!(result.is_err());
    }
}
