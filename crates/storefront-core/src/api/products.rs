//! Product catalogue data access. Every call goes through the
//! [`RequestAuthenticator`], so public listings stay anonymous and the
//! seller's own listings carry the session's credential.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ApiError, ApiRequest, RequestAuthenticator};
use crate::models::{
    BulkDeleteResponse, MessageResponse, PaginatedProducts, Product, ProductFilters, ProductInput,
};

/// Default number of items for featured/recent listings
const DEFAULT_LISTING_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct ProductsApi {
    authenticator: Arc<RequestAuthenticator>,
    root: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkDeleteRequest<'a> {
    product_ids: &'a [i64],
}

impl ProductsApi {
    /// `root` is the products resource path, e.g. `/api/Products`
    pub fn new(authenticator: Arc<RequestAuthenticator>, root: &str) -> Self {
        Self {
            authenticator,
            root: format!("/{}", root.trim_matches('/')),
        }
    }

    fn path(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            self.root.clone()
        } else {
            format!("{}/{}", self.root, suffix)
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.authenticator
            .send(&request)
            .await?
            .error_for_status()?
            .json()
    }

    fn check_id(id: i64) -> Result<(), ApiError> {
        if id <= 0 {
            return Err(ApiError::InvalidInput("Invalid product ID".to_string()));
        }
        Ok(())
    }

    /// All products, optionally filtered
    pub async fn list(&self, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        self.fetch(ApiRequest::get(self.path("")).queries(filters.to_query()))
            .await
    }

    pub async fn paginated(&self, filters: &ProductFilters) -> Result<PaginatedProducts, ApiError> {
        let request = ApiRequest::get(self.path("paginated"))
            .queries(filters.to_query())
            .query("paginated", "true");
        self.fetch(request).await
    }

    pub async fn get(&self, id: i64) -> Result<Product, ApiError> {
        Self::check_id(id)?;
        self.fetch(ApiRequest::get(self.path(&id.to_string()))).await
    }

    /// Listings owned by the logged-in user
    pub async fn mine(&self, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        self.fetch(ApiRequest::get(self.path("my-products")).queries(filters.to_query()))
            .await
    }

    pub async fn by_user(&self, user_id: &str, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        if user_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("User ID is required".to_string()));
        }
        let path = self.path(&format!("user/{}", encode_segment(user_id)));
        self.fetch(ApiRequest::get(path).queries(filters.to_query()))
            .await
    }

    pub async fn create(&self, product: &ProductInput) -> Result<Product, ApiError> {
        self.fetch(ApiRequest::post(self.path("")).json(product)?)
            .await
    }

    pub async fn update(&self, id: i64, product: &ProductInput) -> Result<Product, ApiError> {
        Self::check_id(id)?;
        self.fetch(ApiRequest::put(self.path(&id.to_string())).json(product)?)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<MessageResponse, ApiError> {
        Self::check_id(id)?;
        self.fetch(ApiRequest::delete(self.path(&id.to_string())))
            .await
    }

    pub async fn bulk_delete(&self, ids: &[i64]) -> Result<BulkDeleteResponse, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::InvalidInput("Product IDs are required".to_string()));
        }
        let request =
            ApiRequest::post(self.path("bulk-delete")).json(&BulkDeleteRequest { product_ids: ids })?;
        self.fetch(request).await
    }

    pub async fn categories(&self) -> Result<Vec<String>, ApiError> {
        self.fetch(ApiRequest::get(self.path("categories"))).await
    }

    pub async fn search(&self, query: &str, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Search query is required".to_string()));
        }
        let filters = ProductFilters {
            search_term: None,
            ..filters.clone()
        };
        let request = ApiRequest::get(self.path("search"))
            .query("query", query)
            .queries(filters.to_query());
        self.fetch(request).await
    }

    pub async fn by_category(&self, category: &str, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        if category.trim().is_empty() {
            return Err(ApiError::InvalidInput("Category is required".to_string()));
        }
        let filters = ProductFilters {
            category: Some(category.to_string()),
            ..filters.clone()
        };
        let path = self.path(&format!("category/{}", encode_segment(category)));
        self.fetch(ApiRequest::get(path).queries(filters.to_query()))
            .await
    }

    pub async fn featured(&self, limit: Option<u32>) -> Result<Vec<Product>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_LISTING_LIMIT);
        self.fetch(ApiRequest::get(self.path("featured")).query("limit", limit.to_string()))
            .await
    }

    pub async fn recent(&self, limit: Option<u32>) -> Result<Vec<Product>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_LISTING_LIMIT);
        self.fetch(ApiRequest::get(self.path("recent")).query("limit", limit.to_string()))
            .await
    }
}

/// Percent-encode a single path segment
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("Home Goods"), "Home%20Goods");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("plain"), "plain");
    }
}
