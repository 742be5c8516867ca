use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    db::models::{api::ApiResponse, auth::StaffUser, settlement::CalculateSettlementRequest},
    error::AppError,
    services::{context::RequestContext, settlements_service::SettlementsService},
};

/// The body is optional; an empty one means "use the assigned splits".
fn parse_request(body: &[u8]) -> Result<CalculateSettlementRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CalculateSettlementRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "settlement body rejected");
        AppError::validation("Invalid JSON format")
    })
}

pub async fn latest_settlement(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let settlement = SettlementsService::latest(&mut conn, event_id)?;
    Ok(Json(ApiResponse::success(
        settlement,
        "Settlement retrieved successfully",
    )))
}

// 结算（仅管理员，服务层校验）
pub async fn calculate_settlement(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload = parse_request(&body)?;
    let mut conn = state.db.get()?;
    let settlement = SettlementsService::calculate(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        &payload,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            settlement,
            "Settlement calculated successfully",
        )),
    ))
}

pub async fn settlement_history(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let history = SettlementsService::history(&mut conn, event_id)?;
    Ok(Json(ApiResponse::success(
        history,
        "Settlement history retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_uses_defaults() {
        let req = parse_request(b"").unwrap();
        assert!(req.splits.is_none());
        assert!(parse_request(b"  \n").unwrap().notes.is_none());
    }

    #[test]
    fn test_body_with_splits() {
        let id = Uuid::new_v4();
        let body = format!(
            r#"{{"splits":[{{"co_creator_id":"{}","percentage":100.0}}],"notes":"final"}}"#,
            id
        );
        let req = parse_request(body.as_bytes()).unwrap();
        let splits = req.splits.unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].co_creator_id, id);
        assert_eq!(req.notes.as_deref(), Some("final"));
    }

    #[test]
    fn test_malformed_body_is_validation_error() {
        assert!(matches!(parse_request(b"{nope"), Err(AppError::Validation { .. })));
    }
}
