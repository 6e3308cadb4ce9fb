use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{rates, ui};
use crate::core::convert::{Converter, FetchRequest, RequestState};
use crate::core::rates::{RateProvider, RateTable};

enum Action {
    Continue,
    Fetch(FetchRequest),
    Quit,
}

type InFlightFetch = (FetchRequest, BoxFuture<'static, Result<RateTable>>);

fn start_fetch(provider: &Arc<dyn RateProvider>, request: FetchRequest) -> InFlightFetch {
    let provider = Arc::clone(provider);
    let base = request.base.clone();
    (request, async move { provider.fetch_rates(&base).await }.boxed())
}

fn print_help() {
    println!(
        "Commands:
  <amount>       set the amount to convert (e.g. 250 or 99.95)
  from <code>    set the source currency (fetches fresh rates)
  to <code>      set the target currency
  rates          list all rates for the current source currency
  retry          retry a failed rate fetch
  help           show this help
  quit           exit"
    );
}

fn print_rates(converter: &Converter) {
    match converter.rate_table() {
        Some(table) => println!("{}", rates::rate_table_view(table)),
        None => println!(
            "{}",
            ui::style_text("No rates loaded yet.", ui::StyleType::Subtle)
        ),
    }
}

fn render(converter: &Converter) {
    if let Some(message) = converter.validation_error() {
        println!("{}", ui::style_text(message, ui::StyleType::Error));
        return;
    }
    match converter.request_state() {
        RequestState::Loading => println!(
            "{}",
            ui::style_text(
                &format!("Fetching rates for {}...", converter.from_currency()),
                ui::StyleType::Subtle
            )
        ),
        RequestState::Failed(message) => {
            println!("{}", ui::style_text(message, ui::StyleType::Error));
            println!(
                "{}",
                ui::style_text("Type 'retry' to fetch again.", ui::StyleType::Subtle)
            );
        }
        RequestState::Ready => {
            if let Some(result) = converter.result_text() {
                println!(
                    "{} {} = {} {}",
                    converter.amount(),
                    converter.from_currency(),
                    ui::style_text(&result, ui::StyleType::ResultValue),
                    converter.to_currency()
                );
            }
        }
        RequestState::Idle => {}
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn apply_command(input: &str, converter: &mut Converter) -> Action {
    let mut parts = input.split_whitespace();
    let Some(head) = parts.next() else {
        return Action::Continue;
    };
    let arg = parts.next();

    match (head.to_lowercase().as_str(), arg) {
        ("quit" | "exit" | "q", _) => Action::Quit,
        ("help" | "?", _) => {
            print_help();
            Action::Continue
        }
        ("retry", _) => Action::Fetch(converter.retry()),
        ("rates", _) => {
            print_rates(converter);
            Action::Continue
        }
        ("from", Some(code)) => match converter.set_from_currency(code) {
            Some(request) => Action::Fetch(request),
            None => Action::Continue,
        },
        ("to", Some(code)) => {
            converter.set_to_currency(code);
            Action::Continue
        }
        ("from" | "to", None) => {
            println!("usage: {head} <code>");
            Action::Continue
        }
        ("amount", Some(value)) => {
            match value.parse::<f64>() {
                Ok(amount) => converter.set_amount(amount),
                Err(_) => println!("not a number: {value}"),
            }
            Action::Continue
        }
        ("amount", None) => {
            println!("usage: amount <number>");
            Action::Continue
        }
        _ => {
            match head.parse::<f64>() {
                Ok(amount) => converter.set_amount(amount),
                Err(_) => println!("unknown command: {head} (type 'help' for commands)"),
            }
            Action::Continue
        }
    }
}

/// Interactive conversion loop.
///
/// Multiplexes stdin lines with the in-flight rate fetch, so amount and
/// target edits stay responsive while rates are loading. Starting a new fetch
/// replaces the in-flight one; a completion for a superseded request is
/// discarded by the converter.
pub async fn run(provider: Arc<dyn RateProvider>, from: &str, to: &str) -> Result<()> {
    let (mut converter, initial_request) = Converter::new(1.0, from, to);
    let mut in_flight: Option<InFlightFetch> = Some(start_fetch(&provider, initial_request));

    println!("Interactive currency converter. Type 'help' for commands.");
    render(&converter);
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            outcome = async {
                match in_flight.as_mut() {
                    Some((_, fetch)) => fetch.as_mut().await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                if let Some((request, _)) = in_flight.take() {
                    converter.complete_fetch(&request, outcome);
                }
                render(&converter);
                prompt();
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match apply_command(line.trim(), &mut converter) {
                    Action::Quit => break,
                    Action::Fetch(request) => {
                        in_flight = Some(start_fetch(&provider, request));
                        render(&converter);
                        prompt();
                    }
                    Action::Continue => {
                        render(&converter);
                        prompt();
                    }
                }
            }
        }
    }

    Ok(())
}
