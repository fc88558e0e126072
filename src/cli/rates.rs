use super::ui;
use crate::core::{ExchangeRateProvider, RateSet};
use anyhow::{Context, Result};
use comfy_table::Cell;

impl RateSet {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Rate (per 1 {})", self.base)),
        ]);

        // BTreeMap iteration keeps the rows sorted by currency code
        for (code, rate) in &self.rates {
            table.add_row(vec![Cell::new(code), ui::rate_cell(*rate)]);
        }

        table.to_string()
    }

    fn title(&self) -> String {
        let as_of = self
            .as_of()
            .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());
        format!("Latest rates for {} as of {}", self.base, as_of)
    }
}

/// Splits repeated and comma separated symbol arguments into one ordered list.
pub fn normalize_symbols(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn fetch_and_display(
    provider: &dyn ExchangeRateProvider,
    base: &str,
    symbols: &[String],
) -> Result<RateSet> {
    let symbols = normalize_symbols(symbols);
    let symbol_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();

    let spinner = ui::new_spinner("Fetching latest rates...");
    let result = provider.fetch_rates(base, &symbol_refs).await;
    spinner.finish_and_clear();

    let rates = result.with_context(|| {
        if base.is_empty() {
            "Failed to fetch latest rates".to_string()
        } else {
            format!("Failed to fetch latest rates for {base}")
        }
    })?;

    println!("{}", ui::style_text(&rates.title(), ui::StyleType::Title));
    println!("{}", rates.display_as_table());
    if !rates.disclaimer.is_empty() {
        println!("{}", ui::style_text(&rates.disclaimer, ui::StyleType::Subtle));
    }

    Ok(rates)
}
