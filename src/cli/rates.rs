use anyhow::Result;
use comfy_table::{Cell, Table};

use super::ui;
use crate::core::rates::{RateProvider, RateTable};

/// Renders a rate table, sorted by currency code.
pub fn rate_table_view(rates: &RateTable) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate (1 {})", rates.base())),
    ]);

    for code in rates.currencies() {
        if let Some(rate) = rates.rate(code) {
            table.add_row(vec![Cell::new(code), ui::rate_cell(rate)]);
        }
    }

    table
}

/// Fetches and displays all rates for the given base currency.
pub async fn run(provider: &(dyn RateProvider + Send + Sync), base: &str) -> Result<()> {
    let spinner = ui::new_spinner(&format!("Fetching rates for {base}..."));
    let outcome = provider.fetch_rates(base).await;
    spinner.finish_and_clear();

    let rates = outcome?;

    println!(
        "{}\n",
        ui::style_text(
            &format!("Exchange rates for 1 {}", rates.base()),
            ui::StyleType::Title
        )
    );
    println!("{}", rate_table_view(&rates));

    if let Some(ts) = rates.last_updated() {
        println!(
            "{}",
            ui::style_text(
                &format!("Last updated: {}", ts.format("%Y-%m-%d %H:%M UTC")),
                ui::StyleType::Subtle
            )
        );
    }

    Ok(())
}
