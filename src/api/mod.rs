//! Typed wrappers over business endpoints
//!
//! Each endpoint group borrows an [`crate::http::ApiClient`] so it shares the
//! client's session store and refresh coordinator.

pub mod user;

pub use user::{LoginRequest, LoginResponse, UserApi, UserInfo};
