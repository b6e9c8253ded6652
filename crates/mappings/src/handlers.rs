//! Event-to-entity mapping handlers.
//!
//! One handler per event kind, invoked synchronously by the indexing host
//! once per decoded event, in canonical chain order. Each handler resolves
//! its market, protocol, and account(s) through the [`EntityStore`], builds
//! one normalized [`ActivityRecord`], persists it, and bumps the market's
//! per-kind volume accumulator. Atomicity across those writes is the host's
//! all-or-nothing guarantee; nothing here retries or rolls back.
//!
//! The protocol is re-resolved from the market on every call rather than
//! cached. The reads are cheap and the handlers stay order-independent.

use alloy::primitives::Address;
use lendscan_core::{AppError, Settings};
use lendscan_ctoken::{
    BorrowEvent, CTokenEvent, LiquidationEvent, MintEvent, RedeemEvent, RepayEvent, TransferEvent,
};

use crate::entities::{ActivityRecord, EventKind};
use crate::ids::generate_id;
use crate::numeric::{
    RECEIPT_TOKEN_DECIMALS, big_decimal_from_u256, exponent_to_big_decimal, scale_down, truncate,
};
use crate::store::EntityStore;

/// Per-deployment parameters shared by all handlers.
#[derive(Debug, Clone)]
pub struct MappingContext {
    /// Decimal precision of the market's receipt token.
    pub receipt_token_decimals: u32,
}

impl MappingContext {
    pub fn new(receipt_token_decimals: u32) -> Self {
        Self {
            receipt_token_decimals,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.receipt_token_decimals)
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new(RECEIPT_TOKEN_DECIMALS)
    }
}

fn addr(address: &Address) -> String {
    format!("{address:#x}")
}

/// Dispatch a classified event to its handler.
pub fn handle_event(
    store: &mut dyn EntityStore,
    ctx: &MappingContext,
    event: &CTokenEvent,
) -> Result<ActivityRecord, AppError> {
    match event {
        CTokenEvent::Mint(e) => handle_mint(store, ctx, e),
        CTokenEvent::Redeem(e) => handle_redeem(store, ctx, e),
        CTokenEvent::Borrow(e) => handle_borrow(store, ctx, e),
        CTokenEvent::Repay(e) => handle_repay(store, ctx, e),
        CTokenEvent::Liquidation(e) => handle_liquidate(store, ctx, e),
        CTokenEvent::Transfer(e) => handle_transfer(store, ctx, e),
    }
}

/// `Mint` → DEPOSIT: underlying supplied, receipt tokens minted.
pub fn handle_mint(
    store: &mut dyn EntityStore,
    ctx: &MappingContext,
    event: &MintEvent,
) -> Result<ActivityRecord, AppError> {
    let market = store.get_or_create_market(&addr(&event.market_address))?;
    let protocol = store.get_or_create_protocol(&market.protocol)?;
    let account = store.get_or_create_account(&addr(&event.minter))?;

    let x_token_amount = scale_down(&event.mint_tokens, ctx.receipt_token_decimals);
    let amount = scale_down(&event.mint_amount, market.underlying_decimals);

    let record = ActivityRecord {
        id: generate_id(&event.origin),
        kind: EventKind::Deposit,
        market: market.id.clone(),
        protocol: protocol.id,
        account: account.id,
        to: None,
        payer: None,
        liquidator: None,
        amount: amount.clone(),
        x_token_amount: Some(x_token_amount),
        block_time: event.origin.block_time,
    };
    store.save_record(record.clone())?;
    store.update_market_stats(&market.id, EventKind::Deposit, &amount)?;

    tracing::debug!(id = %record.id, market = %market.id, amount = %amount, "recorded deposit");
    Ok(record)
}

/// `Redeem` → WITHDRAW: receipt tokens burned, underlying returned.
pub fn handle_redeem(
    store: &mut dyn EntityStore,
    ctx: &MappingContext,
    event: &RedeemEvent,
) -> Result<ActivityRecord, AppError> {
    let market = store.get_or_create_market(&addr(&event.market_address))?;
    let protocol = store.get_or_create_protocol(&market.protocol)?;
    let account = store.get_or_create_account(&addr(&event.redeemer))?;

    let x_token_amount = scale_down(&event.redeem_tokens, ctx.receipt_token_decimals);
    let amount = scale_down(&event.redeem_amount, market.underlying_decimals);

    let record = ActivityRecord {
        id: generate_id(&event.origin),
        kind: EventKind::Withdraw,
        market: market.id.clone(),
        protocol: protocol.id,
        account: account.id,
        to: None,
        payer: None,
        liquidator: None,
        amount: amount.clone(),
        x_token_amount: Some(x_token_amount),
        block_time: event.origin.block_time,
    };
    store.save_record(record.clone())?;
    store.update_market_stats(&market.id, EventKind::Withdraw, &amount)?;

    tracing::debug!(id = %record.id, market = %market.id, amount = %amount, "recorded withdraw");
    Ok(record)
}

/// `Borrow` → BORROW: also flags the account as a borrower (idempotent).
pub fn handle_borrow(
    store: &mut dyn EntityStore,
    _ctx: &MappingContext,
    event: &BorrowEvent,
) -> Result<ActivityRecord, AppError> {
    let market = store.get_or_create_market(&addr(&event.market_address))?;
    let protocol = store.get_or_create_protocol(&market.protocol)?;
    let account = store.get_or_create_account(&addr(&event.borrower))?;

    store.mark_account_borrowed(&account.id)?;

    let amount = scale_down(&event.borrow_amount, market.underlying_decimals);

    let record = ActivityRecord {
        id: generate_id(&event.origin),
        kind: EventKind::Borrow,
        market: market.id.clone(),
        protocol: protocol.id,
        account: account.id,
        to: None,
        payer: None,
        liquidator: None,
        amount: amount.clone(),
        x_token_amount: None,
        block_time: event.origin.block_time,
    };
    store.save_record(record.clone())?;
    store.update_market_stats(&market.id, EventKind::Borrow, &amount)?;

    tracing::debug!(id = %record.id, market = %market.id, amount = %amount, "recorded borrow");
    Ok(record)
}

/// `RepayBorrow` → REPAY: borrower is the primary account, payer secondary.
pub fn handle_repay(
    store: &mut dyn EntityStore,
    _ctx: &MappingContext,
    event: &RepayEvent,
) -> Result<ActivityRecord, AppError> {
    let market = store.get_or_create_market(&addr(&event.market_address))?;
    let protocol = store.get_or_create_protocol(&market.protocol)?;
    let account = store.get_or_create_account(&addr(&event.borrower))?;
    let payer = store.get_or_create_account(&addr(&event.payer))?;

    let amount = scale_down(&event.repay_amount, market.underlying_decimals);

    let record = ActivityRecord {
        id: generate_id(&event.origin),
        kind: EventKind::Repay,
        market: market.id.clone(),
        protocol: protocol.id,
        account: account.id,
        to: None,
        payer: Some(payer.id),
        liquidator: None,
        amount: amount.clone(),
        x_token_amount: None,
        block_time: event.origin.block_time,
    };
    store.save_record(record.clone())?;
    store.update_market_stats(&market.id, EventKind::Repay, &amount)?;

    tracing::debug!(id = %record.id, market = %market.id, amount = %amount, "recorded repay");
    Ok(record)
}

/// `LiquidateBorrow` → LIQUIDATION: bumps both liquidation counters.
pub fn handle_liquidate(
    store: &mut dyn EntityStore,
    ctx: &MappingContext,
    event: &LiquidationEvent,
) -> Result<ActivityRecord, AppError> {
    let market = store.get_or_create_market(&addr(&event.market_address))?;
    let protocol = store.get_or_create_protocol(&market.protocol)?;
    let account = store.get_or_create_account(&addr(&event.borrower))?;
    let liquidator = store.get_or_create_account(&addr(&event.liquidator))?;

    store.add_liquidation_count(&account.id, true)?;
    store.add_liquidation_count(&liquidator.id, false)?;

    let x_token_amount = scale_down(&event.seize_tokens, ctx.receipt_token_decimals);
    let amount = scale_down(&event.repay_amount, market.underlying_decimals);

    let record = ActivityRecord {
        id: generate_id(&event.origin),
        kind: EventKind::Liquidation,
        market: market.id.clone(),
        protocol: protocol.id,
        account: account.id,
        to: None,
        payer: None,
        liquidator: Some(liquidator.id),
        amount: amount.clone(),
        x_token_amount: Some(x_token_amount),
        block_time: event.origin.block_time,
    };
    store.save_record(record.clone())?;
    store.update_market_stats(&market.id, EventKind::Liquidation, &amount)?;

    tracing::debug!(id = %record.id, market = %market.id, amount = %amount, "recorded liquidation");
    Ok(record)
}

/// `Transfer` → TRANSFER of receipt tokens between accounts.
///
/// The underlying-equivalent amount is the receipt-token amount times the
/// market's current exchange rate, truncated to underlying decimals. The
/// receipt-token amount itself is stored untruncated.
pub fn handle_transfer(
    store: &mut dyn EntityStore,
    ctx: &MappingContext,
    event: &TransferEvent,
) -> Result<ActivityRecord, AppError> {
    let market = store.get_or_create_market(&addr(&event.market_address))?;
    let protocol = store.get_or_create_protocol(&market.protocol)?;
    let account = store.get_or_create_account(&addr(&event.from))?;
    let to = store.get_or_create_account(&addr(&event.to))?;

    let x_token_amount =
        big_decimal_from_u256(&event.amount) / exponent_to_big_decimal(ctx.receipt_token_decimals);
    let amount = truncate(
        &(&market.exchange_rate * &x_token_amount),
        market.underlying_decimals,
    );

    let record = ActivityRecord {
        id: generate_id(&event.origin),
        kind: EventKind::Transfer,
        market: market.id.clone(),
        protocol: protocol.id,
        account: account.id,
        to: Some(to.id),
        payer: None,
        liquidator: None,
        amount: amount.clone(),
        x_token_amount: Some(x_token_amount),
        block_time: event.origin.block_time,
    };
    store.save_record(record.clone())?;
    store.update_market_stats(&market.id, EventKind::Transfer, &amount)?;

    tracing::debug!(id = %record.id, market = %market.id, amount = %amount, "recorded transfer");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MarketDefaults, MemoryStore};
    use alloy::primitives::{U256, address};
    use bigdecimal::{BigDecimal, One};
    use lendscan_ctoken::EventOrigin;
    use std::str::FromStr;

    const MARKET: Address = address!("5d3a536e4d6dbd6114cc1ead35777bab948e3643");
    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");

    fn origin(log_index: u32) -> EventOrigin {
        EventOrigin {
            block_number: 18_000_000,
            transaction_hash: "0xfeed".into(),
            log_index,
            block_time: 1_700_000_000,
        }
    }

    /// Store whose markets default to a 6-decimal underlying, rate 1.
    fn six_decimal_store() -> MemoryStore {
        MemoryStore::new(MarketDefaults {
            protocol_id: "compound-v2".into(),
            underlying_decimals: 6,
            exchange_rate: BigDecimal::one(),
        })
    }

    fn market_id() -> String {
        format!("{MARKET:#x}")
    }

    #[test]
    fn mint_yields_deposit_with_truncated_amounts() {
        let mut store = six_decimal_store();
        // 6-decimal receipt token for this deployment.
        let ctx = MappingContext::new(6);

        let record = handle_mint(
            &mut store,
            &ctx,
            &MintEvent {
                market_address: MARKET,
                minter: ALICE,
                mint_amount: U256::from(1_000_000u64),
                mint_tokens: U256::from(1_000_000u64),
                origin: origin(0),
            },
        )
        .unwrap();

        assert_eq!(record.kind, EventKind::Deposit);
        assert_eq!(record.amount, BigDecimal::from_str("1.000000").unwrap());
        assert_eq!(
            record.x_token_amount,
            Some(BigDecimal::from_str("1.000000").unwrap())
        );
        assert_eq!(record.account, format!("{ALICE:#x}"));
        assert_eq!(record.protocol, "compound-v2");
        assert_eq!(record.block_time, 1_700_000_000);

        let market = store.market(&market_id()).unwrap();
        assert_eq!(market.deposit_volume, BigDecimal::from(1));
    }

    #[test]
    fn redeem_yields_withdraw_and_accumulates_volume() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::new(8);

        for i in 0..2 {
            handle_redeem(
                &mut store,
                &ctx,
                &RedeemEvent {
                    market_address: MARKET,
                    redeemer: ALICE,
                    redeem_amount: U256::from(2_500_000u64),
                    redeem_tokens: U256::from(200_000_000u64),
                    origin: origin(i),
                },
            )
            .unwrap();
        }

        let market = store.market(&market_id()).unwrap();
        assert_eq!(
            market.withdraw_volume,
            BigDecimal::from_str("5").unwrap()
        );
        let record = store.record("0xfeed-0").unwrap();
        assert_eq!(record.kind, EventKind::Withdraw);
        assert_eq!(record.x_token_amount, Some(BigDecimal::from(2)));
    }

    #[test]
    fn borrow_sets_flag_idempotently() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::default();

        for i in 0..2 {
            let record = handle_borrow(
                &mut store,
                &ctx,
                &BorrowEvent {
                    market_address: MARKET,
                    borrower: BOB,
                    borrow_amount: U256::from(3_000_000u64),
                    origin: origin(i),
                },
            )
            .unwrap();
            assert_eq!(record.kind, EventKind::Borrow);
            assert!(record.x_token_amount.is_none());
            // Flag stays true on the second borrow as well.
            assert!(store.account(&format!("{BOB:#x}")).unwrap().has_borrowed);
        }

        let market = store.market(&market_id()).unwrap();
        assert_eq!(market.borrow_volume, BigDecimal::from(6));
    }

    #[test]
    fn repay_records_payer_separately_from_borrower() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::default();

        let record = handle_repay(
            &mut store,
            &ctx,
            &RepayEvent {
                market_address: MARKET,
                payer: ALICE,
                borrower: BOB,
                repay_amount: U256::from(1_500_000u64),
                origin: origin(0),
            },
        )
        .unwrap();

        assert_eq!(record.kind, EventKind::Repay);
        assert_eq!(record.account, format!("{BOB:#x}"));
        assert_eq!(record.payer, Some(format!("{ALICE:#x}")));
        assert_eq!(record.amount, BigDecimal::from_str("1.5").unwrap());
    }

    #[test]
    fn liquidation_increments_both_counters() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::new(8);

        let record = handle_liquidate(
            &mut store,
            &ctx,
            &LiquidationEvent {
                market_address: MARKET,
                liquidator: ALICE,
                borrower: BOB,
                repay_amount: U256::from(9_000_000u64),
                collateral_market: MARKET,
                seize_tokens: U256::from(400_000_000u64),
                origin: origin(0),
            },
        )
        .unwrap();

        assert_eq!(record.kind, EventKind::Liquidation);
        assert_eq!(record.liquidator, Some(format!("{ALICE:#x}")));
        assert_eq!(record.x_token_amount, Some(BigDecimal::from(4)));

        let borrower = store.account(&format!("{BOB:#x}")).unwrap();
        assert_eq!(borrower.times_liquidated, 1);
        assert_eq!(borrower.times_liquidator, 0);

        let liquidator = store.account(&format!("{ALICE:#x}")).unwrap();
        assert_eq!(liquidator.times_liquidated, 0);
        assert_eq!(liquidator.times_liquidator, 1);
    }

    #[test]
    fn transfer_applies_exchange_rate_then_truncates() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::new(6);

        // Seed the market, then move the exchange rate as the host would.
        store.get_or_create_market(&market_id()).unwrap();
        store.set_exchange_rate(&market_id(), BigDecimal::from_str("1.05").unwrap());

        let record = handle_transfer(
            &mut store,
            &ctx,
            &TransferEvent {
                market_address: MARKET,
                from: ALICE,
                to: BOB,
                amount: U256::from(500_000u64),
                origin: origin(0),
            },
        )
        .unwrap();

        // truncate(500000 / 1e6 * 1.05, 6) = 0.525000
        assert_eq!(record.amount, BigDecimal::from_str("0.525000").unwrap());
        assert_eq!(
            record.x_token_amount,
            Some(BigDecimal::from_str("0.5").unwrap())
        );
        assert_eq!(record.account, format!("{ALICE:#x}"));
        assert_eq!(record.to, Some(format!("{BOB:#x}")));

        let market = store.market(&market_id()).unwrap();
        assert_eq!(
            market.transfer_volume,
            BigDecimal::from_str("0.525").unwrap()
        );
    }

    #[test]
    fn replaying_an_event_is_idempotent() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::default();

        let event = CTokenEvent::Mint(MintEvent {
            market_address: MARKET,
            minter: ALICE,
            mint_amount: U256::from(1_000_000u64),
            mint_tokens: U256::from(50_000_000u64),
            origin: origin(9),
        });

        let first = handle_event(&mut store, &ctx, &event).unwrap();
        let second = handle_event(&mut store, &ctx, &event).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, format!("0xfeed-{}", event.origin().log_index));
        // Same id, same record slot: the record set does not grow.
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn dispatch_covers_every_kind() {
        let mut store = six_decimal_store();
        let ctx = MappingContext::default();

        let events = [
            CTokenEvent::Mint(MintEvent {
                market_address: MARKET,
                minter: ALICE,
                mint_amount: U256::from(1u64),
                mint_tokens: U256::from(1u64),
                origin: origin(0),
            }),
            CTokenEvent::Redeem(RedeemEvent {
                market_address: MARKET,
                redeemer: ALICE,
                redeem_amount: U256::from(1u64),
                redeem_tokens: U256::from(1u64),
                origin: origin(1),
            }),
            CTokenEvent::Borrow(BorrowEvent {
                market_address: MARKET,
                borrower: BOB,
                borrow_amount: U256::from(1u64),
                origin: origin(2),
            }),
            CTokenEvent::Repay(RepayEvent {
                market_address: MARKET,
                payer: ALICE,
                borrower: BOB,
                repay_amount: U256::from(1u64),
                origin: origin(3),
            }),
            CTokenEvent::Liquidation(LiquidationEvent {
                market_address: MARKET,
                liquidator: ALICE,
                borrower: BOB,
                repay_amount: U256::from(1u64),
                collateral_market: MARKET,
                seize_tokens: U256::from(1u64),
                origin: origin(4),
            }),
            CTokenEvent::Transfer(TransferEvent {
                market_address: MARKET,
                from: ALICE,
                to: BOB,
                amount: U256::from(1u64),
                origin: origin(5),
            }),
        ];

        let expected = [
            EventKind::Deposit,
            EventKind::Withdraw,
            EventKind::Borrow,
            EventKind::Repay,
            EventKind::Liquidation,
            EventKind::Transfer,
        ];

        for (event, kind) in events.iter().zip(expected) {
            let record = handle_event(&mut store, &ctx, event).unwrap();
            assert_eq!(record.kind, kind);
        }
        assert_eq!(store.record_count(), 6);
    }
}
