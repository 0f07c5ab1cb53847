use std::convert::Infallible;

use log::{debug, error};
use serde::Serialize;
use serde_json::{json, Value};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Response},
    Reply,
};

use crate::middleware::Unauthorized;

/// Renders an action error. Structured infos (validation, conflicts) are
/// passed through, plain ones become `{"detail": ...}`.
pub fn error_reply(e: potion::Error) -> Response {
    let status = StatusCode::from_u16(e.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let info = e.info.clone().unwrap_or_default();

    let body = serde_json::from_str::<Value>(&info)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({ "detail": info }));

    reply::with_status(reply::json(&body), status).into_response()
}

pub fn json_reply<T: Serialize>(result: Result<T, potion::Error>, status: StatusCode) -> Response {
    match result {
        Ok(value) => reply::with_status(reply::json(&value), status).into_response(),
        Err(e) => error_reply(e),
    }
}

pub fn empty_reply(result: Result<(), potion::Error>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_reply(e),
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    reply::with_status(reply::json(&json!({ "detail": message })), status).into_response()
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.find::<Unauthorized>().is_some() {
        return Ok(detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        ));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        debug!("Rejected body: {e}");
        let body = json!({ "non_field_errors": [e.to_string()] });
        return Ok(reply::with_status(reply::json(&body), StatusCode::BAD_REQUEST).into_response());
    }

    if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        return Ok(detail(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large."));
    }

    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(detail(StatusCode::LENGTH_REQUIRED, "Content-Length is required."));
    }

    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(detail(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type.",
        ));
    }

    if err.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not found."));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed."));
    }

    error!("Unhandled rejection: {err:?}");
    Ok(detail(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConflictError, NotFoundError};

    async fn body_of(response: Response) -> Value {
        let bytes = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn structured_errors_pass_through() {
        let response = error_reply(ConflictError::new("Recipe is already in favorites").into());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_of(response).await,
            json!({ "errors": "Recipe is already in favorites" })
        );
    }

    #[tokio::test]
    async fn plain_errors_become_detail() {
        let response = error_reply(NotFoundError::new("No recipe exists with specified id").into());

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_of(response).await,
            json!({ "detail": "No recipe exists with specified id" })
        );
    }

    #[tokio::test]
    async fn unauthorized_rejection_is_401() {
        let response = handle_rejection(warp::reject::custom(Unauthorized))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn empty_success_is_no_content() {
        assert_eq!(empty_reply(Ok(())).status(), StatusCode::NO_CONTENT);
    }
}
