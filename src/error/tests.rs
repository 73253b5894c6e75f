//! Unit tests for error module.

use super::*;
use axum::response::IntoResponse;

#[test]
fn test_error_response_serialization() {
    let response = ErrorResponse {
        error: "Something went wrong".to_string(),
        code: "INTERNAL_ERROR".to_string(),
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"error\":\"Something went wrong\""));
    assert!(json.contains("\"code\":\"INTERNAL_ERROR\""));
}

#[test]
fn test_price_not_found_display() {
    let error = ApiError::PriceNotFound("AAPL".to_string());
    assert_eq!(format!("{}", error), "No price found for symbol: AAPL");
}

#[test]
fn test_invalid_request_display() {
    let error = ApiError::InvalidRequest("Missing symbol".to_string());
    assert_eq!(format!("{}", error), "Invalid request: Missing symbol");
}

#[test]
fn test_internal_display() {
    let error = ApiError::Internal("broken pipe".to_string());
    assert_eq!(format!("{}", error), "Internal server error: broken pipe");
}

#[test]
fn test_price_not_found_maps_to_404() {
    let response = ApiError::PriceNotFound("AAPL".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_invalid_request_maps_to_400() {
    let response = ApiError::InvalidRequest("bad".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_internal_maps_to_500() {
    let response = ApiError::Internal("boom".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
