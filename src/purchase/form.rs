//! The form fields shared by the create and edit purchase pages.

use maud::{Markup, html};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::Category,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    purchase::{DraftPurchase, PURCHASE_NAME_MAX_LENGTH},
};

/// The values a purchase form starts with.
pub struct PurchaseFormDefaults<'a> {
    pub purchase: Option<&'a str>,
    pub amount: Option<Decimal>,
    pub date: Date,
    pub category: Option<&'a str>,
    pub description: Option<&'a str>,
    /// The latest selectable date, i.e. today.
    pub max_date: Date,
}

pub fn purchase_form_fields(defaults: &PurchaseFormDefaults<'_>, categories: &[Category]) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{amount:.2}"));

    html! {
        div
        {
            label
                for="purchase"
                class=(FORM_LABEL_STYLE)
            {
                "Purchase"
            }

            input
                name="purchase"
                id="purchase"
                type="text"
                placeholder="Flat white"
                maxlength=(PURCHASE_NAME_MAX_LENGTH)
                required
                autofocus
                value=[defaults.purchase]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="amount"
                class=(FORM_LABEL_STYLE)
            {
                "Amount"
            }

            // w-full needed to ensure input takes the full width when prefilled with a value
            div class="input-wrapper w-full"
            {
                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    value=[amount_str.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Date"
            }

            input
                name="date"
                id="date"
                type="date"
                max=(defaults.max_date)
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="category"
                class=(FORM_LABEL_STYLE)
            {
                "Category"
            }

            select
                name="category"
                id="category"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" { "Select a category" }

                @for category in categories {
                    option
                        value=(category.id)
                        selected[defaults.category == Some(category.id.as_str())]
                    {
                        (category.icon) " " (category.label)
                    }
                }
            }
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Description"
            }

            input
                name="description"
                id="description"
                type="text"
                placeholder="Optional notes"
                value=[defaults.description]
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

/// The form data for creating or editing a purchase.
#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseForm {
    pub purchase: String,
    pub amount: Decimal,
    pub date: Date,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PurchaseForm {
    /// Validate the submitted fields against `today` in the server timezone.
    ///
    /// # Errors
    ///
    /// The same errors as [crate::purchase::DraftPurchaseBuilder::finalize].
    pub fn to_draft(&self, today: Date) -> Result<DraftPurchase, Error> {
        DraftPurchase::build(&self.purchase, self.amount, self.date)
            .category(&self.category)
            .description(self.description.as_deref().unwrap_or_default())
            .finalize(today)
    }
}
