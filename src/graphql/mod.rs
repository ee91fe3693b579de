//! The GraphQL surface.
//!
//! Two faces are derived from the same initialised schema: a deterministic
//! SDL rendering (the committed artifact) and an executable schema built with
//! `async_graphql::dynamic`. Both agree field for field; the SDL printer is
//! the source of truth for naming and shape.
//!
//! Resolvers never touch the database directly. Every root field delegates
//! to the resolver pipeline, so GraphQL requests get exactly the same access
//! control, validation, and hooks as the programmatic item APIs.

mod schema;
mod sdl;

pub(crate) use schema::build_executable_schema;
pub use sdl::print_sdl;
