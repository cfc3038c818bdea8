//! Display model for a diagnosis response.

use serde::Serialize;
use serde_json::Value;

/// What the caller should render after a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosisView {
    Prediction {
        disease: String,
        /// `confidence * 100`, rounded to one decimal.
        confidence_percent: f64,
        background: String,
    },
    Failure {
        message: String,
        /// Field-level messages, ordered by field name.
        field_errors: Vec<(String, String)>,
    },
}

impl DiagnosisView {
    /// Build the view from a gateway response status and JSON body.
    pub fn from_response(status: u16, body: &Value) -> Self {
        if (200..300).contains(&status) {
            if let Some(disease) = body.get("predicted_class").and_then(Value::as_str) {
                let confidence = body.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
                return DiagnosisView::Prediction {
                    disease: disease.to_string(),
                    confidence_percent: confidence_percent(confidence),
                    background: body
                        .get("gpt_background")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                };
            }
            return DiagnosisView::Failure {
                message: "Unexpected response from diagnosis service".into(),
                field_errors: Vec::new(),
            };
        }

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Diagnosis failed")
            .to_string();

        let mut field_errors: Vec<(String, String)> = body
            .get("errors")
            .and_then(Value::as_object)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|(field, msg)| {
                        msg.as_str().map(|m| (field.clone(), m.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        field_errors.sort();

        DiagnosisView::Failure {
            message,
            field_errors,
        }
    }

    /// Confidence rendered as e.g. `"87.3%"`; `None` for failures.
    pub fn confidence_label(&self) -> Option<String> {
        match self {
            DiagnosisView::Prediction {
                confidence_percent, ..
            } => Some(format!("{confidence_percent:.1}%")),
            DiagnosisView::Failure { .. } => None,
        }
    }

    pub fn is_prediction(&self) -> bool {
        matches!(self, DiagnosisView::Prediction { .. })
    }
}

fn confidence_percent(confidence: f64) -> f64 {
    (confidence * 1000.0).round() / 10.0
}
