//! # coral-core
//!
//! Foundation types, errors, branded IDs, and the HTTP API client for the
//! Coral CX platform.
//!
//! This crate provides the shared vocabulary the other Coral crates depend on:
//!
//! - **Branded IDs**: `MemberId`, `ChannelId`, `DeploymentId` as opaque string
//!   newtypes; `ConversationId` as a validated UUID newtype
//! - **Errors**: `CoralError` hierarchy via `thiserror`, with typed `ApiError`
//!   preserving server-supplied status/code/context id
//! - **ApiClient**: reqwest wrapper with region URL layout, bearer auth from a
//!   shared token cell, and typed errors on non-2xx responses
//! - **AccessToken**: the bearer credential with absolute expiry
//! - **Organization**: the record fetched best-effort after authorize

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod ids;
pub mod organization;
pub mod token;

pub use client::ApiClient;
pub use errors::{ApiError, CoralError};
pub use ids::{ChannelId, ConversationId, DeploymentId, MemberId};
pub use organization::Organization;
pub use token::AccessToken;
