//! # cmakit
//!
//! Object model and client abstractions for a remote content management API.
//!
//! This crate provides:
//! - The remote objects (content types and their fields, entries, assets,
//!   environments, spaces, locales, API keys) with their `sys` metadata
//! - The remote error payload and its categorization
//! - One narrow client trait per object kind, plus the [`LifecycleOps`]
//!   adapters used to publish and archive entries and assets
//! - [`MemoryBackend`], an in-process remote that enforces the service's
//!   consistency rules
//!
//! ## Example
//!
//! ```
//! use cmakit::{ContentType, ContentTypeClient, EnvironmentClient, Field, MemoryBackend, Sys};
//!
//! let backend = MemoryBackend::new();
//! backend.seed_space("space1", "Demo");
//! let env = EnvironmentClient::get(&backend, "space1", "master").unwrap();
//!
//! let draft = ContentType {
//!     sys: Sys::with_id("post"),
//!     name: "Post".into(),
//!     display_field: "title".into(),
//!     fields: vec![Field::new("title", "Title", "Symbol")],
//!     ..ContentType::default()
//! };
//! let created = ContentTypeClient::upsert(&backend, &env, &draft).unwrap();
//! let active = backend.activate(&env, &created).unwrap();
//! assert_eq!(active.sys.version, 2);
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::memory::MemoryBackend;
pub use backend::{
    ApiKeyClient, AssetClient, AssetLifecycle, ContentTypeClient, EntryClient, EntryLifecycle,
    EnvironmentClient, LifecycleOps, LocaleClient, SpaceClient,
};
pub use error::{ErrorCategory, ErrorResponse, RemoteError, Result};
pub use types::{
    ApiKey, ArrayItem, Asset, AssetFields, ContentType, Entry, EntryFields, Environment, Field,
    File, FileDetails, ImageDetails, Locale, Space, Sys, Validation, Versioned,
};

/// Alias matching the error type naming of sibling crates.
pub type Error = RemoteError;
