//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    auth::create_user_table, category::create_category_table, purchase::create_purchase_table,
};

/// Create the tables for users, categories and purchases if they do not exist.
///
/// All tables are created in one exclusive transaction, so a database is
/// never left half initialized.
///
/// # Errors
/// Returns an error if any table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_purchase_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
