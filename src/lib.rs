//! # piastrix - Piastrix payment API client
//!
//! A Rust client for the Piastrix shop API: bills, invoices, transfers,
//! withdrawals, balance checks and verification of payment callbacks.
//!
//! Every request is signed with the shop secret: the values of the
//! operation's signed fields, ordered by field name, are joined with `:`,
//! suffixed with the secret and hashed with SHA-256.
//!
//! ```no_run
//! use piastrix::{PiastrixClient, TransferAmountType};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> piastrix::Result<()> {
//! let client = PiastrixClient::new("112", "SecretKey01")?;
//! let balance = client.check_balance().await?;
//! let transfer = client
//!     .transfer(
//!         Decimal::new(1050, 2),
//!         TransferAmountType::Writeoff,
//!         "payee@example.com",
//!         643,
//!         643,
//!         "payment-1",
//!         None,
//!     )
//!     .await?;
//! # let _ = (balance, transfer);
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use callback::CallbackVerifier;
pub use client::PiastrixClient;
pub use config::ClientConfig;
pub use crypto::{compute_signature, merge_extra_fields, sign_fields};
pub use error::{PiastrixError, Result};
pub use types::*;

/// Current version of the piastrix library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
