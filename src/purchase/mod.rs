//! Recording, listing, editing and deleting purchases.

mod core;
mod create_endpoint;
mod create_page;
mod db;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod form;
mod purchases_page;

pub use core::{
    DraftPurchase, DraftPurchaseBuilder, PURCHASE_NAME_MAX_LENGTH, Purchase, PurchaseId,
    PurchaseName,
};
pub use create_endpoint::create_purchase_endpoint;
pub use create_page::get_create_purchase_page;
pub use db::{
    create_purchase, create_purchase_table, delete_purchase, get_purchase,
    get_purchases_in_range, update_purchase,
};
pub use delete_endpoint::delete_purchase_endpoint;
pub use edit_endpoint::edit_purchase_endpoint;
pub use edit_page::get_edit_purchase_page;
pub use form::PurchaseForm;
pub use purchases_page::{get_purchases_page, get_purchases_stream};
