//! Application services
//!
//! The two hierarchy consumers. Each instantiates the generic engine with its
//! own payload and hooks.

mod folder;
mod taxonomy;

pub use folder::{Folder, FolderCascade, FolderHooks, FolderService, NoCascade};
pub use taxonomy::{validate_post_type, Taxonomy, TaxonomyHooks, TaxonomyService};
