use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const COMMODITIES: &[&str] = &["silver", "gold", "oil", "copper", "platinum", "palladium"];
const CRYPTO: &[&str] = &["btc", "eth", "bitcoin", "ethereum"];
const ETFS: &[&str] = &["spy", "qqq", "iwm", "dia", "voo", "vti", "arkk", "xlf", "xle"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Stock,
    Commodity,
    Etf,
    Crypto,
}

impl AssetType {
    /// Best-effort classification from a ticker or plain asset name.
    pub fn detect(symbol: &str) -> Self {
        let lower = symbol.to_lowercase();
        if COMMODITIES.contains(&lower.as_str()) || symbol.ends_with("=F") {
            AssetType::Commodity
        } else if CRYPTO.contains(&lower.as_str()) || symbol.ends_with("-USD") {
            AssetType::Crypto
        } else if ETFS.contains(&lower.as_str()) {
            AssetType::Etf
        } else {
            AssetType::Stock
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Stock => write!(f, "stock"),
            AssetType::Commodity => write!(f, "commodity"),
            AssetType::Etf => write!(f, "etf"),
            AssetType::Crypto => write!(f, "crypto"),
        }
    }
}

/// Opaque reference to a rendered chart image owned by the rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartHandle {
    /// Path or URI the inference provider can attach.
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Everything the personas are allowed to know about the asset.
/// Supplied once per request and never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketDataSnapshot {
    pub symbol: String,
    #[serde(default)]
    pub asset_name: Option<String>,
    #[serde(default)]
    pub asset_type: Option<AssetType>,
    pub price: Decimal,
    #[serde(default)]
    pub technical: String,
    #[serde(default)]
    pub fundamental: String,
    #[serde(default)]
    pub news: String,
    #[serde(default)]
    pub chart: Option<ChartHandle>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl MarketDataSnapshot {
    pub fn display_name(&self) -> &str {
        self.asset_name.as_deref().unwrap_or(&self.symbol)
    }

    pub fn effective_asset_type(&self) -> AssetType {
        self.asset_type.unwrap_or_else(|| AssetType::detect(&self.symbol))
    }

    /// Names of required fields that are missing or unusable.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.symbol.trim().is_empty() {
            missing.push("symbol");
        }
        if self.price <= Decimal::ZERO {
            missing.push("price");
        }
        if self.technical.trim().is_empty()
            && self.fundamental.trim().is_empty()
            && self.news.trim().is_empty()
        {
            missing.push("technical/fundamental/news");
        }
        missing
    }
}
