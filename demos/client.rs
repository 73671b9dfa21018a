//! Piastrix client walkthrough
//!
//! Reads `PIASTRIX_SHOP_ID` and `PIASTRIX_SECRET_KEY` (plus the optional
//! `PIASTRIX_*` overrides) from the environment, then:
//! 1. queries the shop balance,
//! 2. renders a pay-page redirect form,
//! 3. verifies a payment callback.
//!
//! Run with `cargo run --example client`.

use piastrix::{sign_fields, ClientConfig, Fields, PiastrixClient, DEFAULT_CALLBACK_SOURCES};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = ClientConfig::from_env()?;
    let client = PiastrixClient::with_config(config)?;
    println!("Piastrix client for shop {}", client.shop_id());

    match client.check_balance().await {
        Ok(balance) => println!("Balance: {}", serde_json::to_string_pretty(&balance)?),
        Err(e) => println!("Balance request failed (code {:?}): {}", e.code(), e),
    }

    let redirect = client.build_pay_redirect(dec!(100.00), 643, "order-1001", None, "en")?;
    println!("\nPay page: {}", redirect.url);
    println!("{}", redirect.to_html_form());

    // A notification as Piastrix would post it after the order above is paid.
    let mut notification: Fields = match json!({
        "shop_id": client.shop_id(),
        "shop_order_id": "order-1001",
        "shop_amount": "100.00",
        "shop_currency": 643,
        "status": "success",
        "payway": "card_rub",
        "description": "",
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let signed: Vec<String> = notification
        .iter()
        .filter(|(_, v)| v.as_str() != Some(""))
        .map(|(k, _)| k.clone())
        .collect();
    sign_fields(&mut notification, &signed, &client.config().secret_key)?;

    let source = DEFAULT_CALLBACK_SOURCES[0].to_string();
    match client.verify_callback(notification.clone(), &source, dec!(100), 643) {
        Ok(()) => println!("\nCallback from {} accepted", source),
        Err(e) => println!("\nCallback from {} rejected: {}", source, e),
    }

    // The same notification from an unknown address is refused.
    if let Err(e) = client.verify_callback(notification, "203.0.113.7", dec!(100), 643) {
        println!("Callback from 203.0.113.7 rejected: {}", e);
    }

    Ok(())
}
