// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth service for the Corvus platform.
//!
//! Credential verification, access-token minting, multi-device refresh
//! rotation, the registration approval saga, and the bus handlers that
//! expose them on `auth.*` subjects.

pub mod events;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod registration;
pub mod repository;
pub mod service;
pub mod token_store;

pub use events::EventPublisher;
pub use handlers::AuthHandlers;
pub use jwt::{AccessClaims, JwtManager};
pub use registration::RegistrationService;
pub use repository::SqliteRepository;
pub use service::AuthService;
pub use token_store::TokenStore;
