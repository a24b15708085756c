//! The library code for the `guides` content indexer. The architecture can be
//! generally broken down into three distinct steps:
//!
//! 1. Indexing posts from source files on disk ([`crate::indexer`], with the
//!    per-file work in [`crate::parser`])
//! 2. Deriving listings from the posts: paginated pages
//!    ([`crate::paginate`]) and per-tag listings ([`crate::tag`])
//! 3. Emitting output: routes plus their metadata artifacts
//!    ([`crate::routes`]) and syndication feeds ([`crate::feed`])
//!
//! [`crate::build::build_site`] runs all three. Indexing is the only step that
//! touches source files, and it reads them in parallel; every later step is a
//! pure transformation of the sorted post list until the final writes.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod indexer;
pub mod paginate;
pub mod parser;
pub mod post;
pub mod routes;
pub mod tag;
pub mod url;
