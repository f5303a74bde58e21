//! Dashboard module
//!
//! Provides an overview of one week: a live calendar strip, the week's
//! purchases and a pie chart of spending by category.

mod handlers;
mod tables;

pub use handlers::{get_dashboard_page, get_dashboard_stream};
