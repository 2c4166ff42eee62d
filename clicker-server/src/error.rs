use clicker_persistence::StoreError;
use clicker_types::ErrorBody;
use thiserror::Error;
use tracing::error;
use warp::Reply;
use warp::http::StatusCode;
use warp::reply::Response;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(StoreError),

    #[error("upload failed: {0}")]
    Upload(#[from] std::io::Error),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ServerError::NotFound(format!("{} not found", what)),
            StoreError::Validation(message) => ServerError::Validation(message),
            other => ServerError::Storage(other),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Storage(_) | ServerError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        warp::reply::with_status(warp::reply::json(&ErrorBody::new(message)), status)
            .into_response()
    }
}

/// JSON body on success, `{success: false, message}` with a mapped status otherwise.
pub fn respond<T: serde::Serialize>(result: Result<T, ServerError>) -> Response {
    match result {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_status() {
        let not_found = ServerError::from(StoreError::NotFound("Clan x".to_string()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Clan x not found");

        let invalid = ServerError::from(StoreError::Validation("bad".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let conflict = ServerError::from(StoreError::Conflict {
            collection: "clans",
            key: "x".to_string(),
            attempts: 5,
        });
        assert_eq!(conflict.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response = ServerError::Upload(std::io::Error::other("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
