//! Typed access to remote JSON documents.
//!
//! Remote payloads are kept as [`serde_json::Value`] trees. Fields are read
//! through [`DocumentExt`], which never assumes a field exists.

use serde::Deserialize;
use serde_json::Value;

/// Optional field accessors over a JSON object.
pub trait DocumentExt {
    fn field(&self, name: &str) -> Option<&Value>;

    fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    fn i64_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(Value::as_i64)
    }

    fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }

    /// The `id` field; numeric ids are rendered as strings.
    fn id(&self) -> Option<String> {
        match self.field("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    fn name(&self) -> Option<&str> {
        self.str_field("name")
    }
}

impl DocumentExt for Value {
    fn field(&self, name: &str) -> Option<&Value> {
        self.as_object()?.get(name)
    }
}

/// Training state of one model, as reported by the `train` sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    Success,
    Fail,
    UpToDate,
    InProgress,
    Queued,
    /// A status id this client does not recognise.
    Unknown(i64),
}

impl TrainingStatus {
    pub const fn from_id(id: i64) -> Self {
        match id {
            0 => Self::Success,
            1 => Self::Fail,
            2 => Self::UpToDate,
            3 => Self::InProgress,
            9 => Self::Queued,
            other => Self::Unknown(other),
        }
    }

    /// Whether polling has to continue for this model.
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::InProgress | Self::Queued)
    }
}

/// One entry of the training-status array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTrainingStatus {
    pub model_id: String,
    #[serde(default)]
    pub details: TrainingDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingDetails {
    #[serde(default)]
    pub status_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl ModelTrainingStatus {
    pub const fn status(&self) -> TrainingStatus {
        TrainingStatus::from_id(self.details.status_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accessors_return_none_for_missing_or_mistyped_fields() {
        let doc = json!({"id": "a1", "name": 7, "culture": "en-us"});

        assert_eq!(doc.id().as_deref(), Some("a1"));
        assert_eq!(doc.name(), None);
        assert_eq!(doc.str_field("culture"), Some("en-us"));
        assert_eq!(doc.str_field("missing"), None);
        assert_eq!(json!([1, 2]).str_field("id"), None);
    }

    #[test]
    fn numeric_ids_are_rendered_as_strings() {
        assert_eq!(json!({"id": 42}).id().as_deref(), Some("42"));
    }

    #[test]
    fn training_status_ids_map_to_states() {
        assert_eq!(TrainingStatus::from_id(0), TrainingStatus::Success);
        assert_eq!(TrainingStatus::from_id(1), TrainingStatus::Fail);
        assert!(TrainingStatus::from_id(3).is_pending());
        assert!(TrainingStatus::from_id(9).is_pending());
        assert!(!TrainingStatus::from_id(2).is_pending());
        assert_eq!(TrainingStatus::from_id(5), TrainingStatus::Unknown(5));
    }

    #[test]
    fn training_entries_deserialize_from_remote_shape() {
        let entries: Vec<ModelTrainingStatus> = serde_json::from_value(json!([
            {"modelId": "m1", "details": {"statusId": 1, "status": "Fail", "failureReason": "FewLabels"}},
            {"modelId": "m2", "details": {"statusId": 0, "status": "Success"}}
        ]))
        .expect("valid payload");

        assert_eq!(entries[0].status(), TrainingStatus::Fail);
        assert_eq!(entries[0].details.failure_reason.as_deref(), Some("FewLabels"));
        assert_eq!(entries[1].status(), TrainingStatus::Success);
    }
}
