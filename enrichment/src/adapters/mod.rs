//! HTTP and RPC implementations of the enrichment ports.

pub mod dexscreener;
pub mod helius;
pub mod jupiter;
pub mod metaplex;
pub mod mint_supply;
pub mod moralis;
pub mod token_list;

use migration_core::Socials;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::error::ProviderError;

/// Non-empty, trimmed string field.
pub(crate) fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers arrive either as JSON numbers or as decimal strings depending on the API.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads the usual social keys off an off-chain metadata object.
pub(crate) fn socials_from(value: &Value) -> Socials {
    Socials {
        website: text(value, "website").or_else(|| text(value, "external_url")),
        twitter: text(value, "twitter"),
        telegram: text(value, "telegram"),
        discord: text(value, "discord"),
    }
}

/// Sends the request and decodes a JSON body. 404 means "no data", other
/// non-success statuses are errors.
pub(crate) async fn send_json(provider: &'static str, request: RequestBuilder) -> Result<Option<Value>, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ProviderError::Status { provider, status: status.as_u16() });
    }
    Ok(Some(response.json::<Value>().await?))
}

pub(crate) async fn get_json(provider: &'static str, client: &Client, url: &str) -> Result<Option<Value>, ProviderError> {
    send_json(provider, client.get(url)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_accepts_strings_and_numbers() {
        assert_eq!(number(&json!(1.5)), Some(1.5));
        assert_eq!(number(&json!("2500.25")), Some(2500.25));
        assert_eq!(number(&json!("n/a")), None);
        assert_eq!(number(&Value::Null), None);
    }

    #[test]
    fn test_socials_from_metadata_json() {
        let meta = json!({
            "name": "Moon",
            "external_url": "https://moon.io",
            "twitter": "https://x.com/moon",
            "telegram": "  ",
        });
        let socials = socials_from(&meta);
        assert_eq!(socials.website.as_deref(), Some("https://moon.io"));
        assert_eq!(socials.twitter.as_deref(), Some("https://x.com/moon"));
        assert!(socials.telegram.is_none());
    }
}
