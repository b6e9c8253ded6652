use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;

use crate::abi::CToken;

/// Chain position and time shared by every decoded market event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOrigin {
    pub block_number: u64,
    /// 0x-prefixed lowercase transaction hash.
    pub transaction_hash: String,
    pub log_index: u32,
    /// Block timestamp in seconds; 0 when the log carries none.
    pub block_time: i64,
}

/// Decoded cToken `Mint` — a deposit of underlying in exchange for receipt tokens.
#[derive(Debug, Clone)]
pub struct MintEvent {
    pub market_address: Address,
    pub minter: Address,
    pub mint_amount: U256,
    pub mint_tokens: U256,
    pub origin: EventOrigin,
}

/// Decoded cToken `Redeem` — receipt tokens exchanged back for underlying.
#[derive(Debug, Clone)]
pub struct RedeemEvent {
    pub market_address: Address,
    pub redeemer: Address,
    pub redeem_amount: U256,
    pub redeem_tokens: U256,
    pub origin: EventOrigin,
}

/// Decoded cToken `Borrow`.
#[derive(Debug, Clone)]
pub struct BorrowEvent {
    pub market_address: Address,
    pub borrower: Address,
    pub borrow_amount: U256,
    pub origin: EventOrigin,
}

/// Decoded cToken `RepayBorrow`. The payer may differ from the borrower.
#[derive(Debug, Clone)]
pub struct RepayEvent {
    pub market_address: Address,
    pub payer: Address,
    pub borrower: Address,
    pub repay_amount: U256,
    pub origin: EventOrigin,
}

/// Decoded cToken `LiquidateBorrow`.
#[derive(Debug, Clone)]
pub struct LiquidationEvent {
    pub market_address: Address,
    pub liquidator: Address,
    pub borrower: Address,
    pub repay_amount: U256,
    /// Market whose receipt tokens were seized as collateral.
    pub collateral_market: Address,
    pub seize_tokens: U256,
    pub origin: EventOrigin,
}

/// Decoded cToken `Transfer` of receipt tokens between accounts.
#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub market_address: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub origin: EventOrigin,
}

/// Classified cToken market event.
///
/// The six kinds are mutually exclusive variants of one dispatch; which
/// variant a log becomes is determined entirely by its event signature.
#[derive(Debug, Clone)]
pub enum CTokenEvent {
    Mint(MintEvent),
    Redeem(RedeemEvent),
    Borrow(BorrowEvent),
    Repay(RepayEvent),
    Liquidation(LiquidationEvent),
    Transfer(TransferEvent),
}

impl CTokenEvent {
    pub fn origin(&self) -> &EventOrigin {
        match self {
            CTokenEvent::Mint(e) => &e.origin,
            CTokenEvent::Redeem(e) => &e.origin,
            CTokenEvent::Borrow(e) => &e.origin,
            CTokenEvent::Repay(e) => &e.origin,
            CTokenEvent::Liquidation(e) => &e.origin,
            CTokenEvent::Transfer(e) => &e.origin,
        }
    }
}

fn origin_of(log: &Log) -> Option<EventOrigin> {
    let block_number = log.block_number?;
    let transaction_hash = log
        .transaction_hash
        .map(|h| format!("{h:#x}"))
        .unwrap_or_default();
    let log_index = log.log_index? as u32;
    let block_time = log.block_timestamp.unwrap_or_default() as i64;

    Some(EventOrigin {
        block_number,
        transaction_hash,
        log_index,
        block_time,
    })
}

/// Attempt to classify a log as one of the six mapped cToken events.
///
/// Returns `None` for logs that are not market activity (interest accrual,
/// approvals, unrelated contracts) or that lack a block number.
pub fn decode_ctoken_log(log: &Log) -> Option<CTokenEvent> {
    let origin = origin_of(log)?;
    let market_address = log.address();

    if let Ok(decoded) = log.log_decode::<CToken::Mint>() {
        let d = decoded.inner.data;
        return Some(CTokenEvent::Mint(MintEvent {
            market_address,
            minter: d.minter,
            mint_amount: d.mintAmount,
            mint_tokens: d.mintTokens,
            origin,
        }));
    }

    if let Ok(decoded) = log.log_decode::<CToken::Redeem>() {
        let d = decoded.inner.data;
        return Some(CTokenEvent::Redeem(RedeemEvent {
            market_address,
            redeemer: d.redeemer,
            redeem_amount: d.redeemAmount,
            redeem_tokens: d.redeemTokens,
            origin,
        }));
    }

    if let Ok(decoded) = log.log_decode::<CToken::Borrow>() {
        let d = decoded.inner.data;
        return Some(CTokenEvent::Borrow(BorrowEvent {
            market_address,
            borrower: d.borrower,
            borrow_amount: d.borrowAmount,
            origin,
        }));
    }

    if let Ok(decoded) = log.log_decode::<CToken::RepayBorrow>() {
        let d = decoded.inner.data;
        return Some(CTokenEvent::Repay(RepayEvent {
            market_address,
            payer: d.payer,
            borrower: d.borrower,
            repay_amount: d.repayAmount,
            origin,
        }));
    }

    if let Ok(decoded) = log.log_decode::<CToken::LiquidateBorrow>() {
        let d = decoded.inner.data;
        return Some(CTokenEvent::Liquidation(LiquidationEvent {
            market_address,
            liquidator: d.liquidator,
            borrower: d.borrower,
            repay_amount: d.repayAmount,
            collateral_market: d.cTokenCollateral,
            seize_tokens: d.seizeTokens,
            origin,
        }));
    }

    if let Ok(decoded) = log.log_decode::<CToken::Transfer>() {
        let d = decoded.inner.data;
        return Some(CTokenEvent::Transfer(TransferEvent {
            market_address,
            from: d.from,
            to: d.to,
            amount: d.amount,
            origin,
        }));
    }

    None
}
