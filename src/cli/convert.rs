use super::ui;
use crate::core::ExchangeRateProvider;
use anyhow::{Context, Result};

pub fn format_conversion(amount: f64, from: &str, converted: f64, to: &str) -> String {
    format!("{amount:.2} {from} = {converted:.2} {to}")
}

pub async fn convert_and_display(
    provider: &dyn ExchangeRateProvider,
    from: &str,
    to: &str,
    amount: f64,
) -> Result<f64> {
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();

    let spinner = ui::new_spinner(&format!("Converting {from} to {to}..."));
    let result = provider.convert_now(&from, &to, amount).await;
    spinner.finish_and_clear();

    let converted = result.with_context(|| format!("Failed to convert {from} to {to}"))?;

    let line = format_conversion(amount, &from, converted, &to);
    println!("{}", ui::style_text(&line, ui::StyleType::Value));
    Ok(converted)
}
