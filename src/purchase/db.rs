//! Database operations for purchases.
//!
//! Amounts are stored as decimal TEXT, e.g. "12.50", so that no cents are lost
//! to floating point.

use std::{ops::RangeInclusive, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    auth::UserID,
    purchase::{DraftPurchase, Purchase, PurchaseId, PurchaseName},
};

/// Store `draft` for the user with `user_id` and return the stored purchase.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_purchase(
    user_id: UserID,
    draft: DraftPurchase,
    connection: &Connection,
) -> Result<Purchase, Error> {
    let id: PurchaseId = connection.query_row(
        "INSERT INTO purchase (user_id, amount, category, date, description, purchase)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id",
        (
            user_id.as_i64(),
            draft.amount.to_string(),
            &draft.category,
            draft.date,
            &draft.description,
            draft.purchase.as_ref(),
        ),
        |row| row.get(0),
    )?;

    Ok(draft.into_purchase(id))
}

/// Retrieve one of a user's purchases by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a purchase owned by the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_purchase(
    user_id: UserID,
    id: PurchaseId,
    connection: &Connection,
) -> Result<Purchase, Error> {
    let purchase = connection
        .prepare(
            "SELECT id, amount, category, date, description, purchase FROM purchase
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_purchase_row,
        )?;

    Ok(purchase)
}

/// Get a user's purchases dated within `range` (inclusive), oldest first.
///
/// Purchases on the same day are sorted by ID so that the order stays stable
/// after edits.
pub fn get_purchases_in_range(
    user_id: UserID,
    range: RangeInclusive<Date>,
    connection: &Connection,
) -> Result<Vec<Purchase>, Error> {
    connection
        .prepare(
            "SELECT id, amount, category, date, description, purchase FROM purchase
            WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
            ORDER BY date ASC, id ASC",
        )?
        .query_map(
            (user_id.as_i64(), *range.start(), *range.end()),
            map_purchase_row,
        )?
        .map(|maybe_purchase| maybe_purchase.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the purchase with `id` with the fields of `draft`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingPurchase] if the user has no purchase with `id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_purchase(
    user_id: UserID,
    id: PurchaseId,
    draft: DraftPurchase,
    connection: &Connection,
) -> Result<Purchase, Error> {
    let rows_affected = connection.execute(
        "UPDATE purchase
        SET amount = ?1, category = ?2, date = ?3, description = ?4, purchase = ?5
        WHERE id = ?6 AND user_id = ?7",
        (
            draft.amount.to_string(),
            &draft.category,
            draft.date,
            &draft.description,
            draft.purchase.as_ref(),
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingPurchase);
    }

    Ok(draft.into_purchase(id))
}

/// Delete one of a user's purchases.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingPurchase] if the user has no purchase with `id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_purchase(
    user_id: UserID,
    id: PurchaseId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM purchase WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingPurchase);
    }

    Ok(())
}

/// Create the purchase table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_purchase_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS purchase (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            purchase TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_purchase_user_date ON purchase(user_id, date);",
    )?;

    Ok(())
}

/// Map a database row to a [Purchase].
///
/// The columns must be in the order: id, amount, category, date, description, purchase.
fn map_purchase_row(row: &Row) -> Result<Purchase, rusqlite::Error> {
    let raw_amount: String = row.get(1)?;
    let amount = Decimal::from_str(&raw_amount).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
    })?;
    let raw_purchase: String = row.get(5)?;

    Ok(Purchase {
        id: row.get(0)?,
        amount,
        category: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        purchase: PurchaseName::new_unchecked(&raw_purchase),
    })
}
