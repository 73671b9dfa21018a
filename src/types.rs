//! Core types for the Piastrix API

use crate::{PiastrixError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Request and callback bodies: field name to JSON value
pub type Fields = serde_json::Map<String, Value>;

/// Name of the signature field
pub const SIGN_FIELD: &str = "sign";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://core.piastrix.com/";

/// Default host of the browser payment form
pub const DEFAULT_PAY_URL: &str = "https://pay.piastrix.com/";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Addresses Piastrix sends payment callbacks from
pub const DEFAULT_CALLBACK_SOURCES: [IpAddr; 8] = [
    IpAddr::V4(Ipv4Addr::new(87, 98, 145, 206)),
    IpAddr::V4(Ipv4Addr::new(51, 68, 53, 104)),
    IpAddr::V4(Ipv4Addr::new(51, 68, 53, 105)),
    IpAddr::V4(Ipv4Addr::new(51, 68, 53, 106)),
    IpAddr::V4(Ipv4Addr::new(51, 68, 53, 107)),
    IpAddr::V4(Ipv4Addr::new(91, 121, 216, 63)),
    IpAddr::V4(Ipv4Addr::new(37, 48, 108, 180)),
    IpAddr::V4(Ipv4Addr::new(37, 48, 108, 181)),
];

/// API endpoint paths, relative to the base URL
pub mod endpoints {
    pub const SHOP_BALANCE: &str = "shop_balance";
    pub const BILL_CREATE: &str = "bill/create";
    pub const INVOICE_TRY: &str = "invoice/try";
    pub const INVOICE_CREATE: &str = "invoice/create";
    pub const TRANSFER_STATUS: &str = "transfer/shop_payment_status";
    pub const TRANSFER_CREATE: &str = "transfer/create";
    pub const WITHDRAW_TRY: &str = "withdraw/try";
    pub const WITHDRAW_CREATE: &str = "withdraw/create";
    pub const CHECK_ACCOUNT: &str = "check_account";
    pub const WITHDRAW_STATUS: &str = "withdraw/status";
    pub const WITHDRAW_SHOP_PAYMENT_STATUS: &str = "withdraw/shop_payment_status";

    /// All server-to-server endpoints
    pub fn all() -> Vec<&'static str> {
        vec![
            SHOP_BALANCE,
            BILL_CREATE,
            INVOICE_TRY,
            INVOICE_CREATE,
            TRANSFER_STATUS,
            TRANSFER_CREATE,
            WITHDRAW_TRY,
            WITHDRAW_CREATE,
            CHECK_ACCOUNT,
            WITHDRAW_STATUS,
            WITHDRAW_SHOP_PAYMENT_STATUS,
        ]
    }
}

/// How the amount of a transfer is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAmountType {
    /// Amount the payee receives
    Receive,
    /// Amount written off the shop balance
    Writeoff,
}

impl TransferAmountType {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAmountType::Receive => "receive_amount",
            TransferAmountType::Writeoff => "writeoff_amount",
        }
    }
}

impl FromStr for TransferAmountType {
    type Err = PiastrixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "receive_amount" => Ok(TransferAmountType::Receive),
            "writeoff_amount" => Ok(TransferAmountType::Writeoff),
            other => Err(PiastrixError::invalid_amount_type(other)),
        }
    }
}

impl AsRef<str> for TransferAmountType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TransferAmountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the amount of a withdrawal is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawAmountType {
    /// Amount in the payment system's currency
    Ps,
    /// Amount in the shop's currency
    Shop,
}

impl WithdrawAmountType {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawAmountType::Ps => "ps_amount",
            WithdrawAmountType::Shop => "shop_amount",
        }
    }
}

impl FromStr for WithdrawAmountType {
    type Err = PiastrixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ps_amount" => Ok(WithdrawAmountType::Ps),
            "shop_amount" => Ok(WithdrawAmountType::Shop),
            other => Err(PiastrixError::invalid_amount_type(other)),
        }
    }
}

impl AsRef<str> for WithdrawAmountType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WithdrawAmountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of the browser payment form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    /// Path segment used in the pay URL
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = PiastrixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ru" => Ok(Language::Ru),
            "en" => Ok(Language::En),
            other => Err(PiastrixError::invalid_language(other)),
        }
    }
}

impl AsRef<str> for Language {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// `true` on success; anything else is a failure
    #[serde(default)]
    pub result: Value,
    /// Payload of a successful call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Vendor failure code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<Value>,
}

impl ApiResponse {
    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        self.result == Value::Bool(true)
    }

    /// Turn the envelope into its payload or a [`PiastrixError::Remote`].
    ///
    /// A successful response without `data` yields `Value::Null`.
    pub fn into_result(self) -> Result<Value> {
        if self.is_success() {
            return Ok(self.data.unwrap_or(Value::Null));
        }

        let code = self.error_code.as_ref().and_then(|code| match code {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });

        Err(PiastrixError::remote(self.message.unwrap_or_default(), code))
    }
}

/// Signed form for the browser payment page
#[derive(Debug, Clone, PartialEq)]
pub struct PayRedirect {
    /// Form action, `https://pay.piastrix.com/{lang}/pay`
    pub url: Url,
    /// Signed form fields, `sign` included
    pub form: Fields,
}

impl PayRedirect {
    /// Render an auto-submitting HTML form posting the fields to [`PayRedirect::url`]
    pub fn to_html_form(&self) -> String {
        let mut html = format!(
            "<form method=\"POST\" action=\"{}\">\n",
            escape_html(self.url.as_str())
        );

        for (name, value) in &self.form {
            html.push_str(&format!(
                "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(name),
                escape_html(&crate::crypto::canonical_string(value))
            ));
        }

        html.push_str("    <input type=\"submit\">\n</form>\n");
        html
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
