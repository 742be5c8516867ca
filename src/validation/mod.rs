pub mod event;
pub mod registration;

use axum::{
    Json, async_trait,
    extract::FromRequest,
    http::Request,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::{db::models::api::ErrorDetail, error::AppError};

/// 验证的 JSON 提取器
///
/// Malformed bodies, unknown enum values included, and failed field rules
/// both reject with 422.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S, axum::body::Body> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<axum::body::Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, "json body rejected");
                AppError::validation("Invalid JSON format")
            })?;

        value
            .validate()
            .map_err(|errors| AppError::validation(summarize(&error_details(&errors))))?;

        Ok(ValidatedJson(value))
    }
}

/// Flattens field errors into response details, sorted by field name.
pub fn error_details(errors: &ValidationErrors) -> Vec<ErrorDetail> {
    let mut details: Vec<ErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| ErrorDetail {
                field: Some(field.to_string()),
                code: error.code.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation failed for field: {}", field)),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

fn summarize(details: &[ErrorDetail]) -> String {
    match details {
        [] => "Validation failed".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(range(min = 1, message = "Amount must be greater than zero"))]
        amount: i32,
    }

    #[test]
    fn test_error_details_and_summary() {
        let sample = Sample {
            name: String::new(),
            amount: 0,
        };
        let errors = sample.validate().unwrap_err();
        let details = error_details(&errors);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].field.as_deref(), Some("amount"));
        assert_eq!(
            summarize(&details),
            "Amount must be greater than zero (and 1 more)"
        );
    }

    #[test]
    fn test_valid_sample_passes() {
        let sample = Sample {
            name: "Tent".into(),
            amount: 100,
        };
        assert!(sample.validate().is_ok());
    }
}
