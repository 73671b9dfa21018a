#![allow(dead_code)]

use piastrix::{compute_signature, ClientConfig, Fields, PiastrixClient};
use serde_json::{json, Value};

pub const SHOP_ID: &str = "112";
pub const SECRET: &str = "SecretKey01";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn client_for(server: &mockito::Server) -> PiastrixClient {
    init_tracing();
    let config = ClientConfig::new(SHOP_ID, SECRET)
        .with_base_url(&server.url())
        .unwrap();
    PiastrixClient::with_config(config).unwrap()
}

pub fn object(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Signature the client must attach to `body` for the given signed fields
pub fn expected_sign(body: &Value, required: &[&str]) -> String {
    compute_signature(&object(body.clone()), required, SECRET).unwrap()
}

/// `body` with its expected `sign` added
pub fn with_sign(body: Value, required: &[&str]) -> Value {
    let sign = expected_sign(&body, required);
    let mut fields = object(body);
    fields.insert("sign".to_string(), json!(sign));
    Value::Object(fields)
}

pub fn ok_body(data: Value) -> String {
    json!({"result": true, "data": data}).to_string()
}

/// Request matcher accepting only bodies whose `sign` is the signature over
/// exactly `required`. Fails if any of them, `now` included, is absent.
pub fn signed_over(
    required: &'static [&'static str],
) -> impl Fn(&mockito::Request) -> bool + Send + Sync + 'static {
    move |request| {
        let Ok(body) = request.body() else {
            return false;
        };
        let Ok(fields) = serde_json::from_slice::<Fields>(body) else {
            return false;
        };
        let Some(sign) = fields.get("sign").and_then(Value::as_str) else {
            return false;
        };
        compute_signature(&fields, required, SECRET).is_ok_and(|expected| expected == sign)
    }
}
