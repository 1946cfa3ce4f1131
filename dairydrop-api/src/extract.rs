/// Request extractors with JSON error responses
///
/// Axum's built-in `Json` and `Query` reject with plain-text bodies. These
/// wrappers turn rejections into [`ApiError`] and run `validator` rules so
/// handlers receive input that already passed validation.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has been deserialized and validated
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string parameters with a JSON 400 on malformed input
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}

/// Deserializes a string with surrounding whitespace removed
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// Deserializes an optional string, trimming it and mapping blank values to `None`
pub fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[serde(deserialize_with = "trimmed")]
        #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
        name: String,
        #[serde(default, deserialize_with = "trimmed_opt")]
        note: Option<String>,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_payload_is_trimmed() {
        let ValidatedJson(payload) =
            ValidatedJson::<Payload>::from_request(json_request(r#"{"name":"  Ghee  ","note":"   "}"#), &())
                .await
                .unwrap();

        assert_eq!(payload.name, "Ghee");
        assert_eq!(payload.note, None);
    }

    #[tokio::test]
    async fn test_whitespace_does_not_satisfy_min_length() {
        let err = ValidatedJson::<Payload>::from_request(json_request(r#"{"name":"  a  "}"#), &())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ValidationError(ref d) if d[0].field == "name"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let err = ValidatedJson::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
