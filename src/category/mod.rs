//! Purchase categories and the lenient lookups used to display them.

mod db;
mod domain;

pub use db::{create_category, create_category_table, create_default_categories, get_all_categories};
pub use domain::{Category, CategoryId, DEFAULT_CATEGORIES, resolve_icon, resolve_label};
