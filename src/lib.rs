//! # Strata - a headless content-management core
//!
//! Strata turns a declarative description of content lists and fields into a
//! relational schema, a GraphQL API, and a programmatic item API, with
//! access control, validation, and hooks applied uniformly on every path.
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate the schema artifacts for the demo system
//! strata generate
//!
//! # Check the committed artifacts are current
//! strata validate
//!
//! # Run a GraphQL query as a seeded user
//! strata query '{ posts { title author { name } } }' --as alice@example.com
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: list/field configuration and the initialised schema
//! - [`fields`]: field kinds and their capabilities
//! - [`access`]: access-control rules and their evaluator
//! - [`resolve`]: the resolver pipeline behind every CRUD operation
//! - [`context`]: the system factory and per-request contexts
//! - [`graphql`]: SDL printing and the executable GraphQL schema
//! - [`relational`], [`typegen`], [`artifacts`]: generated artifacts
//! - [`db`], [`assets`]: external collaborator interfaces

/// Command-line interface definitions using clap.
pub mod cli;

/// Configuration loading and management.
///
/// Handles `strata.toml` configuration files and project discovery.
pub mod config;

/// Error types and result aliases.
///
/// Defines the `StrataError` enum and `Result<T>` type alias.
pub mod error;

/// Access-control rules evaluated per operation, row, and field.
pub mod access;

/// File and image storage collaborator interfaces.
pub mod assets;

/// Generated artifacts: writing, validation, staleness reporting.
pub mod artifacts;

/// The system factory and per-request execution contexts.
pub mod context;

/// The database collaborator interface and the in-memory client.
pub mod db;

/// Field kinds: storage shape, GraphQL surface, input transforms.
pub mod fields;

/// GraphQL schema faces: the SDL printer and the executable schema.
pub mod graphql;

pub mod logging;

/// Filters, ordering, and unique-lookup structures.
pub mod query;

/// The relational schema printer.
pub mod relational;

/// The resolver pipeline: queries, mutations, hooks, masking.
pub mod resolve;

/// List and field configuration, and the schema initializer.
pub mod schema;

/// Generated Rust type definitions for declared lists.
pub mod typegen;

/// Input validation utilities.
///
/// Validates list keys, field names, and field values against declared rules.
pub mod validation;

pub use context::{Session, StrataContext, System};
pub use error::{Result, StrataError};
