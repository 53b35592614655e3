//! Request/response types for the authenticated request pipeline and the
//! transport seam they are sent through.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;

/// An outbound API call, independent of any credential.
///
/// Kept as plain data so the same request can be replayed after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidInput(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Path plus encoded query string, as used for login return targets
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

/// A response as received, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-success status into the matching `ApiError`
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Sends one request with an optional bearer credential.
///
/// Returns `Ok` for every HTTP status; `Err` only when no response was
/// received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let request = ApiRequest::get("/api/Products/search")
            .query("query", "red lamp")
            .query("page", "2");
        assert_eq!(request.path_and_query(), "/api/Products/search?query=red+lamp&page=2");
        assert_eq!(ApiRequest::get("/a").path_and_query(), "/a");
    }

    #[test]
    fn test_response_helpers() {
        let ok = ApiResponse::new(StatusCode::OK, r#"["Home","Garden"]"#);
        let categories: Vec<String> = ok.json().unwrap();
        assert_eq!(categories, vec!["Home", "Garden"]);

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, "Product not found");
        assert!(matches!(missing.error_for_status(), Err(ApiError::NotFound(_))));

        let garbled = ApiResponse::new(StatusCode::OK, "<html>");
        assert!(matches!(garbled.json::<Vec<String>>(), Err(ApiError::InvalidResponse(_))));
    }
}
