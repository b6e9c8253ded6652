use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

// ─── Event Kind ─────────────────────────────────────────────────────────────

/// The six normalized activity kinds a lending market emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    Liquidation,
    Transfer,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deposit => "DEPOSIT",
            EventKind::Withdraw => "WITHDRAW",
            EventKind::Borrow => "BORROW",
            EventKind::Repay => "REPAY",
            EventKind::Liquidation => "LIQUIDATION",
            EventKind::Transfer => "TRANSFER",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Protocol ───────────────────────────────────────────────────────────────

/// A lending protocol owning one or more markets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
}

// ─── Market ─────────────────────────────────────────────────────────────────

/// One lending pool, keyed by its contract address.
///
/// Volume fields are append-only accumulators of underlying-asset amounts,
/// one per event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    /// Owning protocol identifier.
    pub protocol: String,
    /// Decimal precision of the underlying asset.
    pub underlying_decimals: u32,
    /// Current receipt-token → underlying-asset ratio.
    pub exchange_rate: BigDecimal,
    pub deposit_volume: BigDecimal,
    pub withdraw_volume: BigDecimal,
    pub borrow_volume: BigDecimal,
    pub repay_volume: BigDecimal,
    pub liquidation_volume: BigDecimal,
    pub transfer_volume: BigDecimal,
}

impl Market {
    /// Add an underlying-asset amount to the accumulator for `kind`.
    pub fn add_volume(&mut self, kind: EventKind, amount: &BigDecimal) {
        let slot = match kind {
            EventKind::Deposit => &mut self.deposit_volume,
            EventKind::Withdraw => &mut self.withdraw_volume,
            EventKind::Borrow => &mut self.borrow_volume,
            EventKind::Repay => &mut self.repay_volume,
            EventKind::Liquidation => &mut self.liquidation_volume,
            EventKind::Transfer => &mut self.transfer_volume,
        };
        *slot = &*slot + amount;
    }

    /// Read the accumulated volume for `kind`.
    pub fn volume(&self, kind: EventKind) -> &BigDecimal {
        match kind {
            EventKind::Deposit => &self.deposit_volume,
            EventKind::Withdraw => &self.withdraw_volume,
            EventKind::Borrow => &self.borrow_volume,
            EventKind::Repay => &self.repay_volume,
            EventKind::Liquidation => &self.liquidation_volume,
            EventKind::Transfer => &self.transfer_volume,
        }
    }
}

// ─── Account ────────────────────────────────────────────────────────────────

/// A market participant, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// True once the account has ever taken a borrow.
    pub has_borrowed: bool,
    /// Times this account's position was liquidated.
    pub times_liquidated: i64,
    /// Times this account acted as the liquidator.
    pub times_liquidator: i64,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            has_borrowed: false,
            times_liquidated: 0,
            times_liquidator: 0,
        }
    }
}

// ─── Activity Record ────────────────────────────────────────────────────────

/// The normalized, write-once representation of one on-chain event.
///
/// `amount` is always expressed at the underlying asset's decimal precision
/// after truncation; `x_token_amount` carries the receipt-token side where
/// the event has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Deterministic id: `"{transaction_hash}-{log_index}"`.
    pub id: String,
    pub kind: EventKind,
    pub market: String,
    pub protocol: String,
    /// Primary participant (minter, redeemer, borrower, or sender).
    pub account: String,
    /// Transfer recipient.
    pub to: Option<String>,
    /// Repayment payer, when different from the borrower.
    pub payer: Option<String>,
    /// Liquidating account.
    pub liquidator: Option<String>,
    /// Underlying-asset amount.
    pub amount: BigDecimal,
    /// Receipt-token amount, when the event has one.
    pub x_token_amount: Option<BigDecimal>,
    /// Enclosing block timestamp, seconds.
    pub block_time: i64,
}
