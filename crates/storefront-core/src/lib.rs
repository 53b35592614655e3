//! Storefront client core.
//!
//! Session management for the storefront REST backend: durable token
//! storage, unverified token inspection, login/register/logout with a
//! single-flight refresh, and a request pipeline that attaches credentials
//! and transparently recovers from expired access tokens.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storefront;
pub mod utils;

pub use api::{ApiClient, ApiError, Dispatch, LoginRedirect, ProductsApi, RequestAuthenticator};
pub use auth::{AuthError, Claims, CredentialPair, SessionManager, SessionState, TokenStore};
pub use config::Config;
pub use storefront::Storefront;
