//! Core category types and lookups.

use serde::{Deserialize, Serialize};

/// Identifier for a category, unique per user. The default categories use
/// their lowercased label, e.g. "grocery".
pub type CategoryId = String;

/// A grouping of purchases with a display glyph, e.g. "🥦 Grocery".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    pub id: CategoryId,
    pub icon: String,
    pub label: String,
}

impl Category {
    /// Create a category whose ID is the lowercased `label`.
    pub fn from_label(icon: &str, label: &str) -> Self {
        Self {
            id: label.to_lowercase(),
            icon: icon.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// The `(icon, label)` pairs every new account starts with.
pub const DEFAULT_CATEGORIES: [(&str, &str); 7] = [
    ("🍔", "Food"),
    ("🥦", "Grocery"),
    ("💊", "Health"),
    ("⭐", "Miscellaneous"),
    ("🛒", "Recreation"),
    ("🔁", "Recurring"),
    ("🚗", "Transportation"),
];

fn find<'a>(categories: &'a [Category], category_id: &str) -> Option<&'a Category> {
    categories
        .iter()
        .find(|category| category.id == category_id)
}

/// The icon of the category with `category_id`, or an empty string when no
/// such category exists.
pub fn resolve_icon(categories: &[Category], category_id: &str) -> String {
    find(categories, category_id)
        .map(|category| category.icon.clone())
        .unwrap_or_default()
}

/// The category with `category_id` formatted as "{icon} {label}", or an empty
/// string when no such category exists.
pub fn resolve_label(categories: &[Category], category_id: &str) -> String {
    find(categories, category_id)
        .map(|category| format!("{} {}", category.icon, category.label))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{Category, DEFAULT_CATEGORIES, resolve_icon, resolve_label};

    fn categories() -> Vec<Category> {
        DEFAULT_CATEGORIES
            .iter()
            .map(|(icon, label)| Category::from_label(icon, label))
            .collect()
    }

    #[test]
    fn from_label_lowercases_id() {
        let category = Category::from_label("🚗", "Transportation");

        assert_eq!(category.id, "transportation");
        assert_eq!(category.label, "Transportation");
    }

    #[test]
    fn resolves_icon_of_known_category() {
        assert_eq!(resolve_icon(&categories(), "grocery"), "🥦");
    }

    #[test]
    fn resolves_label_of_known_category() {
        assert_eq!(resolve_label(&categories(), "health"), "💊 Health");
    }

    #[test]
    fn unknown_category_resolves_to_empty_strings() {
        assert_eq!(resolve_icon(&categories(), "rent"), "");
        assert_eq!(resolve_label(&categories(), "rent"), "");
    }

    #[test]
    fn empty_lookup_table_resolves_to_empty_strings() {
        assert_eq!(resolve_icon(&[], "food"), "");
        assert_eq!(resolve_label(&[], "food"), "");
    }
}
