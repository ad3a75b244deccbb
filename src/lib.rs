//! Refs and tags for the caf version-control tool.
//!
//! Tags and branches are stored as plain files under `.caf/refs/`, `HEAD`
//! lives at `.caf/HEAD`. [`refs::resolver::RefResolver`] turns user supplied
//! ref expressions into commit ids, [`refs::tag::TagManager`] owns the tag
//! namespace, and [`commands`] exposes both to the command line.

#[macro_use]
mod macros;

pub mod commands;
pub mod error;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod utils;

pub use error::{RefError, RepositoryError, TagError};
pub use objects::{CommitId, LooseObjectStore, ObjectStore};
pub use refs::resolver::RefResolver;
pub use refs::tag::{Tag, TagManager};
pub use refs::{Namespace, RefStore};
pub use repository::Repository;
