//! Data models exchanged with the storefront backend.
//!
//! - `LoginRequest`, `RegisterRequest`, `AuthResponse`: account endpoints
//! - `Product`, `ProductInput`, `PaginatedProducts`: product catalogue
//! - `ProductFilters`: listing query parameters

pub mod auth;
pub mod product;

pub(crate) use auth::RefreshTokenRequest;
pub use auth::{AuthResponse, LoginRequest, RegisterRequest, UserSummary};
pub use product::{
    BulkDeleteResponse, MessageResponse, PaginatedProducts, Product, ProductFilters, ProductInput,
    ProductSortColumn, SortDirection,
};
