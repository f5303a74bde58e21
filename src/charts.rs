//! ECharts visualizations of purchases.
//!
//! Charts are generated as JSON configuration with charming and rendered as a
//! container div plus an inline script that initializes ECharts.

use charming::{
    Chart,
    component::{Legend, Title},
    element::{JsFunction, Orient, Tooltip, Trigger},
    series::Pie,
};
use maud::{Markup, PreEscaped, html};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    category::Category,
    html::{HeadElement, format_currency},
    purchase::Purchase,
};

/// The ECharts library served from the static directory.
pub const ECHARTS_SCRIPT: &str = "/static/echarts.6.0.0.min.js";

/// A chart with its HTML container ID and ECharts configuration.
pub struct PageChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// How much was spent in one category over a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: Decimal,
}

impl CategoryTotal {
    /// The legend entry, e.g. "🍔 Food ($12.50)".
    pub fn legend_label(&self) -> String {
        format!(
            "{} {} ({})",
            self.category.icon,
            self.category.label,
            format_currency(self.total)
        )
    }
}

/// Sum `purchases` per category, in the order of `categories`.
///
/// Categories whose total is not above zero are left out, as are purchases
/// that refer to an unknown category.
pub fn category_totals(purchases: &[Purchase], categories: &[Category]) -> Vec<CategoryTotal> {
    categories
        .iter()
        .map(|category| CategoryTotal {
            category: category.clone(),
            total: purchases
                .iter()
                .filter(|purchase| purchase.category == category.id)
                .map(|purchase| purchase.amount)
                .sum(),
        })
        .filter(|category_total| category_total.total > Decimal::ZERO)
        .collect()
}

/// A pie chart of spending per category.
pub fn category_pie_chart(subtitle: &str, totals: &[CategoryTotal]) -> Chart {
    let data: Vec<(f64, String)> = totals
        .iter()
        .map(|category_total| {
            (
                category_total.total.to_f64().unwrap_or_default(),
                category_total.legend_label(),
            )
        })
        .collect();

    Chart::new()
        .title(Title::new().text("Total Purchases").subtext(subtitle))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().orient(Orient::Vertical).left("left").top(60))
        .series(
            Pie::new()
                .name("Total Purchases")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

/// The per-category pie chart for `purchases`, or no chart when nothing was
/// spent in a known category.
pub fn category_charts(
    subtitle: &str,
    purchases: &[Purchase],
    categories: &[Category],
) -> Vec<PageChart> {
    let totals = category_totals(purchases, categories);

    if totals.is_empty() {
        return Vec::new();
    }

    vec![PageChart {
        id: "category-chart",
        options: category_pie_chart(subtitle, &totals).to_string(),
    }]
}

/// Renders the HTML containers for charts, each followed by the script that
/// draws it.
///
/// The scripts run both on page load and when htmx swaps the charts in, so a
/// live view can replace them with fresh ones. ECharts itself must already be
/// loaded, see [chart_head_element].
///
/// `empty_message` is shown instead when there are no charts to draw.
pub fn charts_view(charts: &[PageChart], empty_message: &str) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            @if charts.is_empty() {
                p class="text-center text-sm text-gray-500 dark:text-gray-400 py-8" { (empty_message) }
            } @else {
                div class="grid grid-cols-1 gap-4"
                {
                    @for chart in charts {
                        div
                            id=(chart.id)
                            class="min-h-[380px] rounded dark:bg-gray-100"
                        {}

                        script { (chart_script(chart)) }
                    }
                }
            }
        }
    )
}

/// Initializes ECharts for `chart` with dark mode support and responsive
/// resizing.
///
/// A chart whose container has been swapped out is disposed of on the next
/// resize.
fn chart_script(chart: &PageChart) -> PreEscaped<String> {
    PreEscaped(format!(
        r#"(function() {{
            const chartDom = document.getElementById("{}");
            const chart = echarts.init(chartDom);
            const option = {};
            chart.setOption(option);

            const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
            const updateTheme = () => {{
                const isDarkMode = darkModeMediaQuery.matches;
                chart.setTheme(isDarkMode ? 'dark' : 'default');
            }};
            const resize = () => {{
                if (!chartDom.isConnected) {{
                    window.removeEventListener('resize', resize);
                    darkModeMediaQuery.removeEventListener('change', updateTheme);
                    chart.dispose();
                    return;
                }}
                chart.resize();
            }};

            window.addEventListener('resize', resize);
            darkModeMediaQuery.addEventListener('change', updateTheme);
            updateTheme();
        }})();"#,
        chart.id, chart.options
    ))
}

/// Loads ECharts for a page that shows [charts_view].
pub fn chart_head_element() -> HeadElement {
    HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned())
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        category::Category,
        purchase::{Purchase, PurchaseName},
    };

    use scraper::{Html, Selector};

    use super::{PageChart, category_charts, category_pie_chart, category_totals, charts_view};

    fn purchase(id: i64, amount: Decimal, category: &str) -> Purchase {
        Purchase {
            id,
            amount,
            category: category.to_owned(),
            date: date!(2024 - 03 - 01),
            description: String::new(),
            purchase: PurchaseName::new_unchecked("Something"),
        }
    }

    fn categories() -> Vec<Category> {
        vec![
            Category::from_label("🍔", "Food"),
            Category::from_label("🥦", "Grocery"),
            Category::from_label("🚗", "Transportation"),
        ]
    }

    #[test]
    fn sums_per_category_in_category_order() {
        let purchases = vec![
            purchase(1, dec!(7.51), "transportation"),
            purchase(2, dec!(12.50), "food"),
            purchase(3, dec!(2.49), "transportation"),
        ];

        let totals = category_totals(&purchases, &categories());

        let got: Vec<(&str, Decimal)> = totals
            .iter()
            .map(|total| (total.category.id.as_str(), total.total))
            .collect();
        assert_eq!(got, vec![("food", dec!(12.50)), ("transportation", dec!(10.00))]);
    }

    #[test]
    fn omits_categories_without_spending() {
        let purchases = vec![purchase(1, dec!(0), "grocery"), purchase(2, dec!(5), "food")];

        let totals = category_totals(&purchases, &categories());

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].category.id, "food");
    }

    #[test]
    fn omits_purchases_with_unknown_category() {
        let purchases = vec![purchase(1, dec!(5), "deleted")];

        assert!(category_totals(&purchases, &categories()).is_empty());
    }

    #[test]
    fn legend_label_shows_icon_label_and_amount() {
        let totals = category_totals(&[purchase(1, dec!(12.5), "food")], &categories());

        assert_eq!(totals[0].legend_label(), "🍔 Food ($12.50)");
    }

    #[test]
    fn pie_chart_options_contain_legend_labels() {
        let totals = category_totals(&[purchase(1, dec!(12.5), "food")], &categories());

        let options = category_pie_chart("March 2024", &totals).to_string();

        assert!(options.contains("🍔 Food ($12.50)"), "{options}");
        assert!(options.contains("Total Purchases"), "{options}");
    }

    #[test]
    fn each_chart_is_drawn_by_inline_script() {
        let view = charts_view(
            &[PageChart {
                id: "category-chart",
                options: r#"{"title":"Total Purchases"}"#.to_owned(),
            }],
            "Nothing here",
        );
        let html = Html::parse_fragment(&view.into_string());

        let container = html.select(&Selector::parse("#category-chart").unwrap()).next();
        let script: String = html
            .select(&Selector::parse("#charts script").unwrap())
            .next()
            .expect("No chart script found")
            .text()
            .collect();

        assert!(container.is_some());
        assert!(script.contains(r#"document.getElementById("category-chart")"#), "{script}");
        assert!(script.contains(r#"{"title":"Total Purchases"}"#), "{script}");
        assert!(!script.contains("DOMContentLoaded"), "{script}");
    }

    #[test]
    fn empty_message_replaces_charts() {
        let html = Html::parse_fragment(&charts_view(&[], "Nothing here").into_string());

        assert!(html.select(&Selector::parse("script").unwrap()).next().is_none());
        assert_eq!(
            html.root_element().text().collect::<String>().trim(),
            "Nothing here"
        );
    }

    #[test]
    fn category_charts_is_empty_without_spending() {
        assert!(category_charts("March 2024", &[], &categories()).is_empty());

        let charts = category_charts("March 2024", &[purchase(1, dec!(1), "food")], &categories());
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].id, "category-chart");
    }
}
