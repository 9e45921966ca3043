//! Text and number formatting components
//!
//! Pure, in-process transformations. Each instance picks one operation via
//! its `operation` parameter; remaining parameters depend on the operation.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;

use crate::registry::{Component, ComponentSpec, IntegrationError, InvocationKind, ParamKind, ParamSpec};

/// `formatter.text`: urlencode / replace / strip_prefix over a string input.
pub struct TextFormat;

impl TextFormat {
    pub fn spec() -> ComponentSpec {
        ComponentSpec::new(
            "formatter.text",
            vec![
                ParamSpec::required("operation", ParamKind::String),
                ParamSpec::optional("input", ParamKind::String),
                ParamSpec::optional("old_value", ParamKind::String),
                ParamSpec::optional("new_value", ParamKind::String),
                ParamSpec::optional("prefix", ParamKind::String),
            ],
            vec!["formatted_text"],
            InvocationKind::Pure,
        )
    }
}

#[async_trait]
impl Component for TextFormat {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let operation = config.get("operation").map(String::as_str).unwrap_or("");
        let input = config.get("input").map(String::as_str).unwrap_or("");

        let result = match operation {
            "urlencode" => url::form_urlencoded::byte_serialize(input.as_bytes()).collect(),
            "replace" => {
                let old_value = config.get("old_value").map(String::as_str).unwrap_or("");
                let new_value = config.get("new_value").map(String::as_str).unwrap_or("");
                if old_value.is_empty() {
                    input.to_string()
                } else {
                    input.replace(old_value, new_value)
                }
            }
            "strip_prefix" => {
                let prefix = config.get("prefix").map(String::as_str).unwrap_or("");
                input.strip_prefix(prefix).unwrap_or(input).to_string()
            }
            other => {
                return Err(IntegrationError::Unsupported(format!(
                    "text operation '{}'",
                    other
                )));
            }
        };

        Ok(HashMap::from([("formatted_text".to_string(), result)]))
    }
}

/// `formatter.number`: format_currency / random_number.
pub struct NumberFormat;

impl NumberFormat {
    pub fn spec() -> ComponentSpec {
        ComponentSpec::new(
            "formatter.number",
            vec![
                ParamSpec::required("operation", ParamKind::String),
                ParamSpec::optional("amount", ParamKind::Number),
                ParamSpec::optional("currency", ParamKind::String),
                ParamSpec::optional("min_value", ParamKind::Number),
                ParamSpec::optional("max_value", ParamKind::Number),
            ],
            vec!["formatted_number"],
            InvocationKind::Pure,
        )
    }
}

#[async_trait]
impl Component for NumberFormat {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let operation = config.get("operation").map(String::as_str).unwrap_or("");

        let result = match operation {
            "format_currency" => {
                // Unparseable amounts (a placeholder that resolved to prose,
                // say) degrade to zero rather than failing the run.
                let amount: f64 = config
                    .get("amount")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0);
                let currency = config
                    .get("currency")
                    .map(|c| c.to_uppercase())
                    .unwrap_or_else(|| "USD".to_string());

                let grouped = group_thousands(amount);
                match currency.as_str() {
                    "USD" => format!("${}", grouped),
                    "EUR" => format!("\u{20ac}{}", grouped),
                    "GBP" => format!("\u{a3}{}", grouped),
                    other => format!("{} {}", grouped, other),
                }
            }
            "random_number" => {
                let min: i64 = config
                    .get("min_value")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                let max: i64 = config
                    .get("max_value")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100);
                let (min, max) = if min <= max { (min, max) } else { (0, 100) };
                rand::thread_rng().gen_range(min..=max).to_string()
            }
            other => {
                return Err(IntegrationError::Unsupported(format!(
                    "number operation '{}'",
                    other
                )));
            }
        };

        Ok(HashMap::from([("formatted_number".to_string(), result)]))
    }
}

/// `1234567.5` -> `1,234,567.50`.
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some(parts) => parts,
        None => (fixed.as_str(), "00"),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_text(config: &[(&str, &str)]) -> Result<String, IntegrationError> {
        let config: HashMap<String, String> = config
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TextFormat
            .invoke(&config)
            .await
            .map(|mut o| o.remove("formatted_text").unwrap_or_default())
    }

    async fn run_number(config: &[(&str, &str)]) -> Result<String, IntegrationError> {
        let config: HashMap<String, String> = config
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NumberFormat
            .invoke(&config)
            .await
            .map(|mut o| o.remove("formatted_number").unwrap_or_default())
    }

    #[tokio::test]
    async fn test_urlencode() {
        let out = run_text(&[("operation", "urlencode"), ("input", "hello world & more")])
            .await
            .unwrap();
        assert_eq!(out, "hello+world+%26+more");
    }

    #[tokio::test]
    async fn test_replace() {
        let out = run_text(&[
            ("operation", "replace"),
            ("input", "deploy to staging"),
            ("old_value", "staging"),
            ("new_value", "production"),
        ])
        .await
        .unwrap();
        assert_eq!(out, "deploy to production");
    }

    #[tokio::test]
    async fn test_strip_prefix_present_and_absent() {
        let out = run_text(&[
            ("operation", "strip_prefix"),
            ("input", "!deploy now"),
            ("prefix", "!deploy "),
        ])
        .await
        .unwrap();
        assert_eq!(out, "now");

        let out = run_text(&[
            ("operation", "strip_prefix"),
            ("input", "unrelated"),
            ("prefix", "!deploy "),
        ])
        .await
        .unwrap();
        assert_eq!(out, "unrelated");
    }

    #[tokio::test]
    async fn test_unknown_text_operation() {
        let err = run_text(&[("operation", "uppercase"), ("input", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_format_currency_grouping() {
        let out = run_number(&[
            ("operation", "format_currency"),
            ("amount", "1234567.5"),
            ("currency", "usd"),
        ])
        .await
        .unwrap();
        assert_eq!(out, "$1,234,567.50");
    }

    #[tokio::test]
    async fn test_format_currency_eur_gbp_and_other() {
        let eur = run_number(&[
            ("operation", "format_currency"),
            ("amount", "99.9"),
            ("currency", "EUR"),
        ])
        .await
        .unwrap();
        assert_eq!(eur, "\u{20ac}99.90");

        let gbp = run_number(&[
            ("operation", "format_currency"),
            ("amount", "0"),
            ("currency", "GBP"),
        ])
        .await
        .unwrap();
        assert_eq!(gbp, "\u{a3}0.00");

        let chf = run_number(&[
            ("operation", "format_currency"),
            ("amount", "5"),
            ("currency", "chf"),
        ])
        .await
        .unwrap();
        assert_eq!(chf, "5.00 CHF");
    }

    #[tokio::test]
    async fn test_format_currency_unparseable_amount_is_zero() {
        let out = run_number(&[("operation", "format_currency"), ("amount", "not a number")])
            .await
            .unwrap();
        assert_eq!(out, "$0.00");
    }

    #[tokio::test]
    async fn test_random_number_within_bounds() {
        for _ in 0..20 {
            let out = run_number(&[
                ("operation", "random_number"),
                ("min_value", "5"),
                ("max_value", "10"),
            ])
            .await
            .unwrap();
            let n: i64 = out.parse().unwrap();
            assert!((5..=10).contains(&n), "{} out of range", n);
        }
    }

    #[test]
    fn test_group_thousands_negative() {
        assert_eq!(group_thousands(-1234.5), "-1,234.50");
        assert_eq!(group_thousands(999.0), "999.00");
    }
}
