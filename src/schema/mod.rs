//! List and field declaration, and its compilation into an immutable
//! initialised schema.
//!
//! Configuration is a set of [`ListConfig`] values built with explicit
//! defaults. [`initialise`] cross-references relationships, finalizes GraphQL
//! names and produces the [`InitialisedSchema`] every other component reads.
//!
//! ## Components
//!
//! - [`ListConfig`] / [`FieldConfig`]: declarative builders
//! - [`initialise`]: the list initializer (fails on invalid configuration)
//! - [`InitialisedSchema`], [`List`], [`Field`]: the compiled, read-only form

mod config;
mod initialise;
mod types;

pub use config::{
    FieldConfig, FieldUiConfig, ListConfig, ListGraphqlConfig, ListUiConfig, OmitConfig,
};
pub use initialise::initialise;
pub use types::{Field, GqlNames, InitialisedSchema, List};
