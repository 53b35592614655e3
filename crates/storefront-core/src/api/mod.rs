//! REST API module for the storefront backend.
//!
//! - `ApiClient`: reqwest-based transport and account endpoints
//! - `RequestAuthenticator`: attaches bearer tokens, recovers from 401 via
//!   a single shared refresh, and redirects to login when that fails
//! - `PublicEndpoints`: calls that never carry a credential
//! - `ProductsApi`: product catalogue on top of the authenticated pipeline

pub mod authenticator;
pub mod client;
pub mod error;
pub mod products;
pub mod public;
pub mod transport;

pub use authenticator::{Dispatch, LoginRedirect, RequestAuthenticator};
pub use client::ApiClient;
pub use error::ApiError;
pub use products::ProductsApi;
pub use public::PublicEndpoints;
pub use transport::{ApiRequest, ApiResponse, Transport};
