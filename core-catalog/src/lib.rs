//! # Catalog Module
//!
//! Provides the audiobook catalog models and repository plus the small
//! persisted client state (liked items, listening history, balance mirrors).
//!
//! ## Overview
//!
//! The catalog lives in the remote document store and is consumed read-only
//! by the player core:
//! - [`CatalogRepository`] - listing and point lookups over catalog items
//! - [`CatalogItem`] - immutable item value for the duration of a session
//! - [`ClientStateStore`] - capped liked/history lists and entitlement mirrors
//!
//! The client state is a cache of server truth for instant UI reads. It is
//! never consulted when gating chapter access.

pub mod client_state;
pub mod error;
pub mod models;
pub mod repository;

pub use client_state::{ClientStateStore, SavedItem};
pub use error::{CatalogError, Result};
pub use models::{BookId, CatalogItem};
pub use repository::{CatalogRepository, DocumentCatalogRepository};
