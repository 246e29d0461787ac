use async_trait::async_trait;
use migration_core::{TokenProfile, Windowed};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const EMBED_COLOR: u32 = 0x2ECC71;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("discord rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Notification sink. `destination` is the platform-specific target (a channel id for Discord).
#[async_trait]
pub trait AlertDispatch: Send + Sync {
    async fn dispatch(&self, destination: &str, profile: &TokenProfile) -> Result<(), DispatchError>;
}

pub fn compact_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

/// Sub-cent prices keep their significant digits.
pub fn format_price(value: f64) -> String {
    if value == 0.0 {
        return "$0".to_string();
    }
    if value.abs() >= 1.0 {
        return format!("${:.4}", value);
    }
    let raw = format!("{:.10}", value);
    format!("${}", raw.trim_end_matches('0'))
}

fn windows<T, F: Fn(&T) -> String>(w: &Windowed<T>, f: F) -> String {
    format!("24h: {} | 6h: {} | 1h: {} | 5m: {}", f(&w.h24), f(&w.h6), f(&w.h1), f(&w.m5))
}

fn field(name: &str, value: String, inline: bool) -> Value {
    json!({ "name": name, "value": value, "inline": inline })
}

fn link_button(label: &str, url: &str) -> Value {
    json!({ "type": 2, "style": 5, "label": label, "url": url })
}

/// Channel message body: one embed plus a row of link buttons.
pub fn render_message(profile: &TokenProfile) -> Value {
    let m = &profile.market;
    let top_holders = if profile.holders.top_percentages.is_empty() {
        "N/A".to_string()
    } else {
        let parts: Vec<String> = profile.holders.top_percentages.iter().map(|p| format!("{:.2}%", p)).collect();
        format!("{} (total {:.2}%)", parts.join(" · "), profile.holders.top_total_percentage)
    };

    let fields = vec![
        field("💰 Market Cap", compact_usd(profile.market_cap), true),
        field("💵 Price", format_price(m.price_usd), true),
        field("🏦 FDV", compact_usd(m.fdv), true),
        field("💧 Liquidity", compact_usd(m.liquidity_usd), true),
        field("⏳ Age", profile.age.clone(), true),
        field("👥 Holders", profile.holders.holder_count.to_string(), true),
        field("📊 Volume", windows(&m.volume, |v| compact_usd(*v)), false),
        field("📈 Price Change", windows(&m.price_change, |v| format!("{:+.2}%", v)), false),
        field("🟢 Buys", windows(&m.buys, |v| v.to_string()), false),
        field("🔴 Sells", windows(&m.sells, |v| v.to_string()), false),
        field("🐳 Top Holders", top_holders, false),
        field("🪙 Mint", format!("`{}`", profile.mint), false),
    ];

    let mut embed = json!({
        "title": profile.title,
        "description": format!("**{}** (${}) on {}", profile.name, profile.symbol, profile.launch_pad),
        "color": EMBED_COLOR,
        "fields": fields,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Some(image) = &profile.image {
        embed["thumbnail"] = json!({ "url": image });
    }
    if !profile.link.is_empty() {
        embed["url"] = json!(profile.link);
    }

    let mut buttons = Vec::new();
    if !profile.link.is_empty() {
        buttons.push(link_button("DexScreener", &profile.link));
    }
    let s = &profile.socials;
    for (label, url) in [("Website", &s.website), ("Twitter", &s.twitter), ("Telegram", &s.telegram), ("Discord", &s.discord)] {
        if let Some(url) = url.as_deref().filter(|u| u.starts_with("http")) {
            buttons.push(link_button(label, url));
        }
    }

    let mut payload = json!({ "embeds": [embed] });
    if !buttons.is_empty() {
        payload["components"] = json!([{ "type": 1, "components": buttons }]);
    }
    payload
}

/// Posts to a channel through the REST API with a bot token.
pub struct DiscordDispatcher {
    client: Client,
    bot_token: String,
    api_base: String,
}

impl DiscordDispatcher {
    pub fn new(client: Client, bot_token: String) -> Self {
        Self { client, bot_token, api_base: DISCORD_API_BASE.to_string() }
    }
}

#[async_trait]
impl AlertDispatch for DiscordDispatcher {
    async fn dispatch(&self, destination: &str, profile: &TokenProfile) -> Result<(), DispatchError> {
        let url = format!("{}/channels/{}/messages", self.api_base, destination);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&render_message(profile))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected { status: status.as_u16(), body });
        }
        tracing::info!("📣 Alert sent for {} ({}) to channel {}", profile.symbol, profile.mint, destination);
        Ok(())
    }
}
