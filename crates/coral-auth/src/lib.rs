//! # coral-auth
//!
//! Access-token lifecycle and authorization grants for the Coral CX platform.
//!
//! - **`AuthorizationGrant`**: async trait for obtaining an `AccessToken`
//! - **`ClientCredentialsGrant`**: the OAuth client-credentials flow with
//!   validate/reset/exchange/store/publish ordering
//! - **`UpdatedAccessToken`**: payload delivered on the optional
//!   token-updated sink, strictly after the new token is stored
//!
//! The `AccessToken` type itself lives in `coral-core` (the API client holds
//! the shared token cell) and is re-exported here.

#![deny(unsafe_code)]

pub mod client_credentials;

pub use client_credentials::{AuthorizationGrant, ClientCredentialsGrant, UpdatedAccessToken};
pub use coral_core::AccessToken;
