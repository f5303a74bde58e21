//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, DEFAULT_CATEGORIES},
};

/// Store `category` for the user with `user_id`.
pub fn create_category(
    user_id: UserID,
    category: &Category,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO category (user_id, id, icon, label) VALUES (?1, ?2, ?3, ?4);",
        (user_id.as_i64(), &category.id, &category.icon, &category.label),
    )?;

    Ok(())
}

/// Store the default categories for a newly registered user and return them.
pub fn create_default_categories(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(icon, label)| {
            let category = Category::from_label(icon, label);
            create_category(user_id, &category, connection).map(|_| category)
        })
        .collect()
}

/// Retrieve all of a user's categories ordered alphabetically by label.
pub fn get_all_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, icon, label FROM category WHERE user_id = :user_id ORDER BY label ASC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            user_id INTEGER NOT NULL,
            id TEXT NOT NULL,
            icon TEXT NOT NULL,
            label TEXT NOT NULL,
            PRIMARY KEY (user_id, id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        icon: row.get(1)?,
        label: row.get(2)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use crate::{
        auth::UserID,
        category::{Category, DEFAULT_CATEGORIES},
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{create_category, create_default_categories, get_all_categories};

    #[test]
    fn creates_default_categories() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);

        let created = create_default_categories(user.id, &connection).unwrap();
        let stored = get_all_categories(user.id, &connection).unwrap();

        assert_eq!(created.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(created, stored);
    }

    #[test]
    fn categories_are_sorted_by_label() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_category(user.id, &Category::from_label("🛒", "Zoo"), &connection).unwrap();
        create_category(user.id, &Category::from_label("🍔", "Apples"), &connection).unwrap();

        let labels: Vec<String> = get_all_categories(user.id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.label)
            .collect();

        assert_eq!(labels, vec!["Apples", "Zoo"]);
    }

    #[test]
    fn categories_are_scoped_to_user() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_default_categories(user.id, &connection).unwrap();

        let other_users_categories = get_all_categories(UserID::new(user.id.as_i64() + 1), &connection);

        assert_eq!(other_users_categories, Ok(Vec::new()));
    }

    #[test]
    fn duplicate_category_id_is_rejected() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let category = Category::from_label("🍔", "Food");
        create_category(user.id, &category, &connection).unwrap();

        assert!(create_category(user.id, &category, &connection).is_err());
    }
}
