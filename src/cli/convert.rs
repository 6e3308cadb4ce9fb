use anyhow::{Result, bail};

use super::ui;
use crate::core::convert::{Converter, RequestState};
use crate::core::rates::RateProvider;

/// Runs a single conversion: one fetch for the base currency, then render
/// the result or the failure.
pub async fn run(
    provider: &(dyn RateProvider + Send + Sync),
    amount: f64,
    from: &str,
    to: &str,
) -> Result<()> {
    let (mut converter, request) = Converter::new(amount, from, to);

    if let Some(message) = converter.validation_error() {
        bail!("{message}");
    }

    let spinner = ui::new_spinner(&format!("Fetching rates for {}...", request.base));
    let outcome = provider.fetch_rates(&request.base).await;
    spinner.finish_and_clear();

    converter.complete_fetch(&request, outcome);

    match converter.request_state() {
        RequestState::Ready => {
            let Some(result) = converter.result_text() else {
                bail!(
                    "No result for {} -> {}",
                    converter.from_currency(),
                    converter.to_currency()
                );
            };
            println!(
                "{} {} = {} {}",
                converter.amount(),
                converter.from_currency(),
                ui::style_text(&result, ui::StyleType::ResultValue),
                converter.to_currency()
            );
            Ok(())
        }
        RequestState::Failed(message) => bail!("{message}"),
        state => bail!("Unexpected request state: {state:?}"),
    }
}
