//! The recent purchases table.

use maud::{Markup, html};

use crate::{
    category::{Category, resolve_icon},
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency},
    period::month_abbrev,
    purchase::Purchase,
};

/// Shown in place of the table when the week has no purchases.
pub(super) const NO_RECENT_PURCHASES_MESSAGE: &str = "No purchases available.";

/// Renders `purchases` in the order given, which should be newest first.
pub(super) fn recent_purchases_table(purchases: &[Purchase], categories: &[Category]) -> Markup {
    html! {
        div
        {
            h3 class="text-xl font-semibold mb-4" { "Recent Purchases" }

            @if purchases.is_empty() {
                p class="text-center text-sm text-gray-500 dark:text-gray-400 py-8"
                {
                    (NO_RECENT_PURCHASES_MESSAGE)
                }
            } @else {
                div class="overflow-x-auto rounded-lg shadow"
                {
                    table id="recent-purchases" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Purchase" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                            }
                        }

                        tbody
                        {
                            @for purchase in purchases {
                                @let icon = resolve_icon(categories, &purchase.category);

                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (month_abbrev(purchase.date.month())) " " (format!("{:02}", purchase.date.day()))
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        @if !icon.is_empty() {
                                            (icon) " "
                                        }
                                        (purchase.purchase)
                                    }
                                    td class={ (TABLE_CELL_STYLE) " text-right" }
                                    {
                                        (format_currency(purchase.amount))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
