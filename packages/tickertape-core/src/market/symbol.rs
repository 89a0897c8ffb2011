//! Symbol metadata as returned by `GET /data/symbol/{symbol}`.

use serde::{Deserialize, Serialize};

/// Result of a symbol info call.
///
/// The wire format uses PascalCase keys; every documented field is required
/// so schema drift surfaces as a decode error instead of silently zeroed
/// fields. The client captures the raw payload at debug level when decoding
/// fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolInfo {
    pub category: String,
    pub country: String,
    pub currency: String,
    pub description: String,
    pub display_type: i32,
    pub error: String,
    pub exchange: String,
    #[serde(rename = "ExchangeID")]
    pub exchange_id: i32,
    pub expiration_date: String,
    pub expiration_type: String,
    pub future_type: String,
    pub industry_code: String,
    pub industry_name: String,
    pub lot_size: i32,
    pub min_move: f64,
    pub name: String,
    pub option_type: String,
    pub point_value: f64,
    pub root: String,
    pub sector_name: String,
    pub strike_price: f64,
    pub underlying: String,
}
