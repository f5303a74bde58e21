//! Defines the purchase models and the validation applied before a purchase is stored.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, amount::normalize_amount, category::CategoryId};

/// Database identifier for a purchase.
pub type PurchaseId = i64;

/// The maximum length of a purchase label, counted in graphemes.
pub const PURCHASE_NAME_MAX_LENGTH: usize = 80;

/// A validated short label for what was bought, e.g. "Flat white".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PurchaseName(String);

impl PurchaseName {
    /// Create a purchase name from `name` with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// This function will return an:
    /// - [Error::EmptyPurchaseName] if `name` is empty or only whitespace,
    /// - or [Error::PurchaseNameTooLong] if `name` has more than [PURCHASE_NAME_MAX_LENGTH] graphemes.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::EmptyPurchaseName);
        }

        if name.graphemes(true).count() > PURCHASE_NAME_MAX_LENGTH {
            return Err(Error::PurchaseNameTooLong(PURCHASE_NAME_MAX_LENGTH));
        }

        Ok(Self(name.to_owned()))
    }

    /// Create a purchase name without validation.
    ///
    /// The caller should ensure that the string is a valid purchase name, e.g.
    /// one that was read back from the database.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for PurchaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PurchaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// The ID assigned when the purchase was stored.
    pub id: PurchaseId,
    /// How much was spent, rounded to two decimal places.
    pub amount: Decimal,
    /// The category the purchase belongs to. May refer to a category that no
    /// longer exists.
    pub category: CategoryId,
    /// The day the purchase was made.
    pub date: Date,
    /// Optional free text notes.
    pub description: String,
    /// What was bought.
    pub purchase: PurchaseName,
}

/// A validated purchase that has not been stored yet, and so has no ID.
///
/// Create one with [DraftPurchase::build].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPurchase {
    pub amount: Decimal,
    pub category: CategoryId,
    pub date: Date,
    pub description: String,
    pub purchase: PurchaseName,
}

impl DraftPurchase {
    /// Start building a draft purchase.
    ///
    /// Shortcut for [DraftPurchaseBuilder] for discoverability.
    pub fn build(purchase: &str, amount: Decimal, date: Date) -> DraftPurchaseBuilder {
        DraftPurchaseBuilder {
            purchase: purchase.to_owned(),
            amount,
            date,
            category: CategoryId::new(),
            description: String::new(),
        }
    }

    /// Attach the ID assigned by the database, turning the draft into a stored purchase.
    pub fn into_purchase(self, id: PurchaseId) -> Purchase {
        Purchase {
            id,
            amount: self.amount,
            category: self.category,
            date: self.date,
            description: self.description,
            purchase: self.purchase,
        }
    }

    /// Whether storing this draft over `purchase` would change anything.
    pub fn differs_from(&self, purchase: &Purchase) -> bool {
        self.amount != purchase.amount
            || self.category != purchase.category
            || self.date != purchase.date
            || self.description != purchase.description
            || self.purchase != purchase.purchase
    }
}

/// The unvalidated fields of a purchase as submitted by the user.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal_macros::dec;
/// use time::macros::date;
///
/// let draft = DraftPurchase::build("Flat white", dec!(5.5), date!(2024 - 03 - 01))
///     .category("food")
///     .description("Morning coffee")
///     .finalize(date!(2024 - 03 - 01))
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DraftPurchaseBuilder {
    purchase: String,
    amount: Decimal,
    date: Date,
    category: CategoryId,
    description: String,
}

impl DraftPurchaseBuilder {
    /// Set the category of the purchase.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set the free text description of the purchase.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.trim().to_owned();
        self
    }

    /// Validate the fields and normalize the amount to two decimal places.
    ///
    /// # Errors
    ///
    /// This function will return an:
    /// - [Error::EmptyPurchaseName] or [Error::PurchaseNameTooLong] if the label is invalid,
    /// - [Error::NegativeAmount] if the amount is below zero,
    /// - or [Error::FutureDate] if the date is after `today`.
    pub fn finalize(self, today: Date) -> Result<DraftPurchase, Error> {
        let purchase = PurchaseName::new(&self.purchase)?;

        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(Error::NegativeAmount(self.amount));
        }

        if self.date > today {
            return Err(Error::FutureDate(self.date));
        }

        Ok(DraftPurchase {
            amount: normalize_amount(self.amount),
            category: self.category,
            date: self.date,
            description: self.description,
            purchase,
        })
    }
}
