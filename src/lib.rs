//! Static memorial-site builder.
//!
//! Two Google Forms feed the site: one for written memories, one for photo
//! uploads. Their exports never agree on column names, so each is mapped onto
//! one canonical record (`normalize`), the two are appended, and the
//! favourite-menu answers are tallied (`menu`). The remaining modules fetch
//! the exports, cache photos, and write the page context.

pub mod build;
pub mod comments;
pub mod config;
pub mod content;
pub mod error;
pub mod fetch;
pub mod menu;
pub mod normalize;
pub mod photos;
pub mod render;
pub mod table;

pub use error::NormalizeError;
pub use menu::{aggregate_menu_items, VoteTally};
pub use normalize::{normalize, normalize_form, CanonicalRecord, CanonicalTable, FormKind};
pub use table::{RawTable, TableView};
