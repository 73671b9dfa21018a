//! HTTP client for the Piastrix API

use crate::callback::CallbackVerifier;
use crate::config::ClientConfig;
use crate::crypto::{merge_extra_fields, sign_fields};
use crate::types::*;
use crate::{PiastrixError, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

/// Client for the Piastrix shop API
///
/// Every call builds the vendor's field map, merges optional extra fields,
/// signs it with the shop secret and posts it as JSON.
#[derive(Debug, Clone)]
pub struct PiastrixClient {
    /// Underlying HTTP client
    client: Client,
    config: ClientConfig,
}

impl PiastrixClient {
    /// Create a client against the production API with default settings
    pub fn new(shop_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(shop_id, secret_key))
    }

    /// Create a client from an explicit configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PiastrixError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shop identifier sent with every request
    pub fn shop_id(&self) -> &str {
        &self.config.shop_id
    }

    /// Sign `fields` over `required` with the shop secret, storing `sign`.
    pub fn sign_request<I, S>(&self, fields: &mut Fields, required: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        sign_fields(fields, required, &self.config.secret_key)
    }

    /// POST `body` to `endpoint` and unwrap the response envelope.
    pub async fn invoke(&self, endpoint: &str, body: &Fields) -> Result<Value> {
        let url = self.config.base_url.join(endpoint)?;
        debug!(endpoint, shop_id = %self.config.shop_id, "sending Piastrix request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: ApiResponse = response.json().await?;
        envelope.into_result().inspect_err(|e| {
            debug!(endpoint, error = %e, "Piastrix rejected request");
        })
    }

    /// Shop balances per currency
    pub async fn check_balance(&self) -> Result<Value> {
        let fields = fields([("now", now()), ("shop_id", self.shop_id_value())]);
        self.call(endpoints::SHOP_BALANCE, fields, None, &["now", "shop_id"])
            .await
    }

    /// Create a bill the payer settles in `payer_currency`
    pub async fn create_bill(
        &self,
        payer_currency: u32,
        shop_amount: Decimal,
        shop_currency: u32,
        shop_order_id: &str,
        extra: Option<Fields>,
    ) -> Result<Value> {
        let fields = fields([
            ("payer_currency", payer_currency.into()),
            ("shop_amount", amount_value(shop_amount)),
            ("shop_currency", shop_currency.into()),
            ("shop_id", self.shop_id_value()),
            ("shop_order_id", shop_order_id.into()),
        ]);
        self.call(
            endpoints::BILL_CREATE,
            fields,
            extra,
            &[
                "payer_currency",
                "shop_amount",
                "shop_currency",
                "shop_id",
                "shop_order_id",
            ],
        )
        .await
    }

    /// Preliminary calculation of an invoice
    pub async fn invoice_try(
        &self,
        amount: Decimal,
        currency: u32,
        shop_order_id: &str,
        payway: &str,
        extra: Option<Fields>,
    ) -> Result<Value> {
        let fields = self.invoice_fields(amount, currency, shop_order_id, payway);
        self.call(endpoints::INVOICE_TRY, fields, extra, INVOICE_REQUIRED)
            .await
    }

    /// Create an invoice paid through `payway`
    pub async fn invoice(
        &self,
        amount: Decimal,
        currency: u32,
        shop_order_id: &str,
        payway: &str,
        extra: Option<Fields>,
    ) -> Result<Value> {
        let fields = self.invoice_fields(amount, currency, shop_order_id, payway);
        self.call(endpoints::INVOICE_CREATE, fields, extra, INVOICE_REQUIRED)
            .await
    }

    /// Status of a transfer by the shop's payment id
    pub async fn transfer_status(&self, shop_payment_id: &str) -> Result<Value> {
        let fields = fields([
            ("now", now()),
            ("shop_id", self.shop_id_value()),
            ("shop_payment_id", shop_payment_id.into()),
        ]);
        self.call(
            endpoints::TRANSFER_STATUS,
            fields,
            None,
            &["now", "shop_id", "shop_payment_id"],
        )
        .await
    }

    /// Transfer funds from the shop balance to a Piastrix account
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer(
        &self,
        amount: Decimal,
        amount_type: impl AsRef<str>,
        payee_account: &str,
        payee_currency: u32,
        shop_currency: u32,
        shop_payment_id: &str,
        extra: Option<Fields>,
    ) -> Result<Value> {
        let amount_type: TransferAmountType = amount_type.as_ref().parse()?;
        let fields = fields([
            ("amount", amount_value(amount)),
            ("amount_type", amount_type.as_str().into()),
            ("payee_account", payee_account.into()),
            ("payee_currency", payee_currency.into()),
            ("shop_currency", shop_currency.into()),
            ("shop_id", self.shop_id_value()),
            ("shop_payment_id", shop_payment_id.into()),
        ]);
        self.call(
            endpoints::TRANSFER_CREATE,
            fields,
            extra,
            &[
                "amount",
                "amount_type",
                "payee_account",
                "payee_currency",
                "shop_currency",
                "shop_id",
                "shop_payment_id",
            ],
        )
        .await
    }

    /// Preliminary calculation of a withdrawal
    pub async fn withdraw_try(
        &self,
        amount: Decimal,
        amount_type: impl AsRef<str>,
        payway: &str,
        shop_currency: u32,
    ) -> Result<Value> {
        let amount_type: WithdrawAmountType = amount_type.as_ref().parse()?;
        let fields = fields([
            ("amount", amount_value(amount)),
            ("amount_type", amount_type.as_str().into()),
            ("payway", payway.into()),
            ("shop_currency", shop_currency.into()),
            ("shop_id", self.shop_id_value()),
        ]);
        self.call(
            endpoints::WITHDRAW_TRY,
            fields,
            None,
            &["amount", "amount_type", "payway", "shop_currency", "shop_id"],
        )
        .await
    }

    /// Withdraw funds from the shop balance to an external account
    ///
    /// `account_details` is sent along but not signed.
    #[allow(clippy::too_many_arguments)]
    pub async fn withdraw(
        &self,
        account: &str,
        amount: Decimal,
        amount_type: impl AsRef<str>,
        payway: &str,
        shop_currency: u32,
        shop_payment_id: &str,
        account_details: Option<Value>,
        extra: Option<Fields>,
    ) -> Result<Value> {
        let amount_type: WithdrawAmountType = amount_type.as_ref().parse()?;
        let mut fields = fields([
            ("account", account.into()),
            ("amount", amount_value(amount)),
            ("amount_type", amount_type.as_str().into()),
            ("payway", payway.into()),
            ("shop_currency", shop_currency.into()),
            ("shop_id", self.shop_id_value()),
            ("shop_payment_id", shop_payment_id.into()),
        ]);
        if let Some(details) = account_details {
            fields.insert("account_details".to_string(), details);
        }
        self.call(
            endpoints::WITHDRAW_CREATE,
            fields,
            extra,
            &[
                "account",
                "amount",
                "amount_type",
                "payway",
                "shop_currency",
                "shop_id",
                "shop_payment_id",
            ],
        )
        .await
    }

    /// Check that `account` can receive a withdrawal through `payway`
    pub async fn check_account(
        &self,
        account: &str,
        amount: Decimal,
        payway: &str,
        account_details: Option<Value>,
    ) -> Result<Value> {
        let mut fields = fields([
            ("account", account.into()),
            ("amount", amount_value(amount)),
            ("payway", payway.into()),
            ("shop_id", self.shop_id_value()),
        ]);
        if let Some(details) = account_details {
            fields.insert("account_details".to_string(), details);
        }
        self.call(
            endpoints::CHECK_ACCOUNT,
            fields,
            None,
            &["account", "amount", "payway", "shop_id"],
        )
        .await
    }

    /// Status of a withdrawal by Piastrix id
    pub async fn withdraw_status_by_id(&self, withdraw_id: &str) -> Result<Value> {
        let fields = fields([
            ("now", now()),
            ("shop_id", self.shop_id_value()),
            ("withdraw_id", withdraw_id.into()),
        ]);
        self.call(
            endpoints::WITHDRAW_STATUS,
            fields,
            None,
            &["now", "shop_id", "withdraw_id"],
        )
        .await
    }

    /// Status of a withdrawal by the shop's payment id
    pub async fn withdraw_status_by_shop_payment_id(&self, shop_payment_id: &str) -> Result<Value> {
        let fields = fields([
            ("now", now()),
            ("shop_id", self.shop_id_value()),
            ("shop_payment_id", shop_payment_id.into()),
        ]);
        self.call(
            endpoints::WITHDRAW_SHOP_PAYMENT_STATUS,
            fields,
            None,
            &["now", "shop_id", "shop_payment_id"],
        )
        .await
    }

    /// Build the signed form for the browser payment page.
    ///
    /// Nothing is sent; the caller renders the form so the payer's browser
    /// posts it to [`PayRedirect::url`].
    pub fn build_pay_redirect(
        &self,
        amount: Decimal,
        currency: u32,
        shop_order_id: &str,
        extra: Option<Fields>,
        lang: impl AsRef<str>,
    ) -> Result<PayRedirect> {
        let lang: Language = lang.as_ref().parse()?;
        let fields = fields([
            ("amount", amount_value(amount)),
            ("currency", currency.into()),
            ("shop_id", self.shop_id_value()),
            ("shop_order_id", shop_order_id.into()),
        ]);
        let form = self.prepare(
            fields,
            extra,
            &["amount", "currency", "shop_id", "shop_order_id"],
        )?;
        let url = self.config.pay_url.join(&format!("{}/pay", lang))?;

        Ok(PayRedirect { url, form })
    }

    /// Verifier sharing this client's secret and callback allow-list
    pub fn callback_verifier(&self) -> CallbackVerifier {
        CallbackVerifier::new(self.config.secret_key.clone())
            .with_allowed_sources(self.config.callback_sources.iter().copied())
    }

    /// Verify a payment callback, see [`CallbackVerifier::verify`]
    pub fn verify_callback(
        &self,
        notification: Fields,
        source_address: &str,
        expected_shop_amount: Decimal,
        expected_shop_currency: u32,
    ) -> Result<()> {
        self.callback_verifier().verify(
            notification,
            source_address,
            expected_shop_amount,
            expected_shop_currency,
        )
    }

    fn invoice_fields(
        &self,
        amount: Decimal,
        currency: u32,
        shop_order_id: &str,
        payway: &str,
    ) -> Fields {
        fields([
            ("amount", amount_value(amount)),
            ("currency", currency.into()),
            ("shop_id", self.shop_id_value()),
            ("payway", payway.into()),
            ("shop_order_id", shop_order_id.into()),
        ])
    }

    fn prepare(&self, fields: Fields, extra: Option<Fields>, required: &[&str]) -> Result<Fields> {
        let mut fields = match extra {
            Some(extra) => merge_extra_fields(fields, extra)?,
            None => fields,
        };
        self.sign_request(&mut fields, required)?;
        Ok(fields)
    }

    async fn call(
        &self,
        endpoint: &str,
        fields: Fields,
        extra: Option<Fields>,
        required: &[&str],
    ) -> Result<Value> {
        let body = self.prepare(fields, extra, required)?;
        self.invoke(endpoint, &body).await
    }

    fn shop_id_value(&self) -> Value {
        Value::String(self.config.shop_id.clone())
    }
}

const INVOICE_REQUIRED: &[&str] = &["amount", "currency", "shop_id", "payway", "shop_order_id"];

fn fields<const N: usize>(entries: [(&str, Value); N]) -> Fields {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Amounts travel as strings so their scale reaches the signature unchanged.
fn amount_value(amount: Decimal) -> Value {
    Value::String(amount.to_string())
}

/// Request timestamp, local time with microseconds.
fn now() -> Value {
    Value::String(
        chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string(),
    )
}
