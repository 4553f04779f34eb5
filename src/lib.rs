//! # ReWear - Community Clothing Swap Marketplace
//!
//! Backend service for a clothing-swap marketplace: members list garments,
//! browse each other's wardrobes, propose item-for-item swaps, and message
//! within a swap until it is completed.
//!
//! ## Architecture
//!
//! - **User Directory**: account records keyed by unique email, Argon2 credential hashes
//! - **Item Catalog**: owned listings with category/condition/points and attached images
//! - **Swap Ledger**: two-party proposals with a validated status state machine
//! - **Swap Messaging**: append-only message thread per swap
//! - **API Layer**: Axum router with bearer-token auth and explicit read models

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod media;
pub mod model;
pub mod view;

pub use api::{router, AppState};
pub use auth::{Claims, TokenService};
pub use config::AppConfig;
pub use database::Database;
pub use error::{Result, RewearError};
pub use media::MediaStore;
pub use model::{Category, Condition, Item, Swap, SwapMessage, SwapRole, SwapStatus, User};

pub type UserId = uuid::Uuid;
pub type ItemId = uuid::Uuid;
pub type SwapId = uuid::Uuid;
pub type MessageId = uuid::Uuid;
