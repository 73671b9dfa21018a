//! Verification of payment callbacks sent by Piastrix
//!
//! Callbacks for bills and invoices are signed with the shop secret over
//! every non-empty field. [`CallbackVerifier::verify`] checks, in order, the
//! signature presence, the sender address, the signature itself, then the
//! amount, currency and status the shop expects.

use crate::crypto::{canonical_string, compute_signature};
use crate::types::{Fields, DEFAULT_CALLBACK_SOURCES, SIGN_FIELD};
use crate::{PiastrixError, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::debug;

/// Status value of a completed payment
pub const SUCCESS_STATUS: &str = "success";

/// Verifies inbound payment notifications
#[derive(Clone)]
pub struct CallbackVerifier {
    secret_key: String,
    allowed_sources: Vec<IpAddr>,
}

impl std::fmt::Debug for CallbackVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackVerifier")
            .field("secret_key", &"<redacted>")
            .field("allowed_sources", &self.allowed_sources)
            .finish()
    }
}

impl CallbackVerifier {
    /// Create a verifier trusting the default Piastrix callback addresses
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            allowed_sources: DEFAULT_CALLBACK_SOURCES.to_vec(),
        }
    }

    /// Replace the allow-list of callback source addresses
    pub fn with_allowed_sources(mut self, sources: impl IntoIterator<Item = IpAddr>) -> Self {
        self.allowed_sources = sources.into_iter().collect();
        self
    }

    /// Addresses callbacks are accepted from
    pub fn allowed_sources(&self) -> &[IpAddr] {
        &self.allowed_sources
    }

    /// Whether `address` is in the allow-list
    ///
    /// IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`) match their IPv4 entry.
    pub fn is_trusted_source(&self, address: &str) -> bool {
        IpAddr::from_str(address.trim())
            .map(|ip| {
                let ip = ip.to_canonical();
                self.allowed_sources
                    .iter()
                    .any(|allowed| allowed.to_canonical() == ip)
            })
            .unwrap_or(false)
    }

    /// Verify a callback received from `source_address`.
    ///
    /// Returns `Ok(())` only if the notification is signed with the shop
    /// secret and reports a successful payment of `expected_shop_amount` in
    /// `expected_shop_currency`.
    pub fn verify(
        &self,
        mut notification: Fields,
        source_address: &str,
        expected_shop_amount: Decimal,
        expected_shop_currency: u32,
    ) -> Result<()> {
        let result = self.check(
            &mut notification,
            source_address,
            expected_shop_amount,
            expected_shop_currency,
        );

        match &result {
            Ok(()) => debug!(source = source_address, "callback verified"),
            Err(e) => debug!(source = source_address, error = %e, "callback rejected"),
        }

        result
    }

    fn check(
        &self,
        notification: &mut Fields,
        source_address: &str,
        expected_shop_amount: Decimal,
        expected_shop_currency: u32,
    ) -> Result<()> {
        let received_sign = notification
            .remove(SIGN_FIELD)
            .ok_or(PiastrixError::MissingSignature)?;

        if !self.is_trusted_source(source_address) {
            return Err(PiastrixError::untrusted_source(source_address));
        }

        let required: Vec<String> = notification
            .iter()
            .filter(|(_, value)| !is_empty_value(value))
            .map(|(key, _)| key.clone())
            .collect();

        let expected_sign = compute_signature(notification, &required, &self.secret_key)?;
        if canonical_string(&received_sign) != expected_sign {
            return Err(PiastrixError::SignatureMismatch);
        }

        let amount = notification.get("shop_amount");
        if amount.and_then(parse_amount) != Some(expected_shop_amount) {
            return Err(PiastrixError::AmountMismatch {
                expected: expected_shop_amount.to_string(),
                got: describe(amount),
            });
        }

        let currency = notification.get("shop_currency");
        if currency.map(canonical_string) != Some(expected_shop_currency.to_string()) {
            return Err(PiastrixError::CurrencyMismatch {
                expected: expected_shop_currency.to_string(),
                got: describe(currency),
            });
        }

        let status = notification.get("status");
        if status.and_then(Value::as_str) != Some(SUCCESS_STATUS) {
            return Err(PiastrixError::StatusNotSuccess {
                status: describe(status),
            });
        }

        Ok(())
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

fn describe(value: Option<&Value>) -> String {
    value
        .map(canonical_string)
        .unwrap_or_else(|| "<missing>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const SECRET: &str = "SecretKey01";

    fn signed(value: Value) -> Fields {
        let mut fields = match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        };
        let required: Vec<String> = fields
            .iter()
            .filter(|(_, v)| !is_empty_value(v))
            .map(|(k, _)| k.clone())
            .collect();
        crate::crypto::sign_fields(&mut fields, &required, SECRET).unwrap();
        fields
    }

    #[test]
    fn test_empty_fields_are_not_signed() {
        let notification = signed(json!({
            "shop_amount": "10.00",
            "shop_currency": 643,
            "status": "success",
            "description": "",
            "payer_account": null,
        }));

        CallbackVerifier::new(SECRET)
            .verify(notification, "51.68.53.104", dec!(10), 643)
            .unwrap();
    }

    #[test]
    fn test_numeric_amount_compares_by_value() {
        let notification = signed(json!({
            "shop_amount": 10.5,
            "shop_currency": "643",
            "status": "success",
        }));

        CallbackVerifier::new(SECRET)
            .verify(notification, "87.98.145.206", dec!(10.50), 643)
            .unwrap();
    }

    #[test]
    fn test_unparseable_source_is_untrusted() {
        let verifier = CallbackVerifier::new(SECRET);
        assert!(!verifier.is_trusted_source("not-an-ip"));
        assert!(verifier.is_trusted_source(" 91.121.216.63 "));
    }

    #[test]
    fn test_ipv4_mapped_source_is_trusted() {
        let verifier = CallbackVerifier::new(SECRET);
        assert!(verifier.is_trusted_source("::ffff:87.98.145.206"));
        assert!(!verifier.is_trusted_source("::ffff:8.8.8.8"));

        let notification = signed(json!({
            "shop_amount": "10.00",
            "shop_currency": 643,
            "status": "success",
        }));
        verifier
            .verify(notification, "::ffff:51.68.53.107", dec!(10), 643)
            .unwrap();
    }

    #[test]
    fn test_custom_allow_list() {
        let verifier = CallbackVerifier::new(SECRET)
            .with_allowed_sources(["127.0.0.1".parse::<IpAddr>().unwrap()]);
        assert!(verifier.is_trusted_source("127.0.0.1"));
        assert!(!verifier.is_trusted_source("87.98.145.206"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", CallbackVerifier::new(SECRET));
        assert!(!debug.contains(SECRET));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!("10.00")), Some(dec!(10)));
        assert_eq!(parse_amount(&json!(3)), Some(dec!(3)));
        assert_eq!(parse_amount(&json!("ten")), None);
        assert_eq!(parse_amount(&Value::Null), None);
    }
}
