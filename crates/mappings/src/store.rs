//! Registry interfaces over the host's storage layer.
//!
//! Handlers never touch storage directly; they go through [`EntityStore`],
//! which the indexing host implements against its own backend. Lookups are
//! lazy get-or-create, so a handler can always resolve its market and
//! accounts. [`MemoryStore`] is the in-process implementation used by tests
//! and by embedders without a durable backend.

use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, One};
use lendscan_core::{AppError, Settings};
use thiserror::Error;

use crate::entities::{Account, ActivityRecord, EventKind, Market, Protocol};

/// Failure surface of a registry backend. The mapping logic itself raises
/// no errors; only the backing store can fail.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity lookup failed: {0}")]
    Lookup(String),

    #[error("entity write failed: {0}")]
    Write(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Registry of markets, protocols, accounts, and activity records.
///
/// All entity lookups are get-or-create: an unseen market or account is
/// created with default state rather than reported as missing. Mutations
/// happen through narrow operations so a durable backend can map each one
/// to a single write.
pub trait EntityStore {
    /// Resolve a protocol by id, creating it on first encounter.
    fn get_or_create_protocol(&mut self, id: &str) -> Result<Protocol, StoreError>;

    /// Resolve a market by contract address, creating it with default state
    /// (owning protocol, default underlying decimals, exchange rate 1) on
    /// first encounter.
    fn get_or_create_market(&mut self, address: &str) -> Result<Market, StoreError>;

    /// Resolve an account by address, creating it on first encounter.
    fn get_or_create_account(&mut self, address: &str) -> Result<Account, StoreError>;

    /// Flag an account as having borrowed. Idempotent.
    fn mark_account_borrowed(&mut self, address: &str) -> Result<(), StoreError>;

    /// Increment a liquidation counter: `times_liquidated` when `liquidated`
    /// is true, `times_liquidator` otherwise.
    fn add_liquidation_count(&mut self, address: &str, liquidated: bool)
    -> Result<(), StoreError>;

    /// Add an underlying-asset amount to a market's per-kind volume
    /// accumulator.
    fn update_market_stats(
        &mut self,
        market_id: &str,
        kind: EventKind,
        amount: &BigDecimal,
    ) -> Result<(), StoreError>;

    /// Persist an activity record. Records are write-once; saving the same
    /// id again replaces it with identical content, so replays are no-ops.
    fn save_record(&mut self, record: ActivityRecord) -> Result<(), StoreError>;
}

/// Default state for markets created before their metadata is known.
#[derive(Debug, Clone)]
pub struct MarketDefaults {
    pub protocol_id: String,
    pub underlying_decimals: u32,
    pub exchange_rate: BigDecimal,
}

impl MarketDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            protocol_id: settings.protocol_id.clone(),
            underlying_decimals: settings.underlying_decimals_default,
            exchange_rate: BigDecimal::one(),
        }
    }
}

impl Default for MarketDefaults {
    fn default() -> Self {
        Self {
            protocol_id: "compound-v2".into(),
            underlying_decimals: 18,
            exchange_rate: BigDecimal::one(),
        }
    }
}

/// In-process [`EntityStore`] over ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    defaults: MarketDefaults,
    protocols: BTreeMap<String, Protocol>,
    markets: BTreeMap<String, Market>,
    accounts: BTreeMap<String, Account>,
    records: BTreeMap<String, ActivityRecord>,
}

impl MemoryStore {
    pub fn new(defaults: MarketDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.get(id)
    }

    pub fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn record(&self, id: &str) -> Option<&ActivityRecord> {
        self.records.get(id)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Overwrite a market's exchange rate, as a host would after an
    /// interest-accrual sync.
    pub fn set_exchange_rate(&mut self, market_id: &str, rate: BigDecimal) {
        if let Some(market) = self.markets.get_mut(market_id) {
            market.exchange_rate = rate;
        }
    }

    fn account_entry(&mut self, address: &str) -> &mut Account {
        self.accounts
            .entry(address.to_string())
            .or_insert_with(|| Account::new(address))
    }
}

impl EntityStore for MemoryStore {
    fn get_or_create_protocol(&mut self, id: &str) -> Result<Protocol, StoreError> {
        Ok(self
            .protocols
            .entry(id.to_string())
            .or_insert_with(|| Protocol { id: id.to_string() })
            .clone())
    }

    fn get_or_create_market(&mut self, address: &str) -> Result<Market, StoreError> {
        let defaults = self.defaults.clone();
        Ok(self
            .markets
            .entry(address.to_string())
            .or_insert_with(|| Market {
                id: address.to_string(),
                protocol: defaults.protocol_id.clone(),
                underlying_decimals: defaults.underlying_decimals,
                exchange_rate: defaults.exchange_rate.clone(),
                deposit_volume: BigDecimal::from(0),
                withdraw_volume: BigDecimal::from(0),
                borrow_volume: BigDecimal::from(0),
                repay_volume: BigDecimal::from(0),
                liquidation_volume: BigDecimal::from(0),
                transfer_volume: BigDecimal::from(0),
            })
            .clone())
    }

    fn get_or_create_account(&mut self, address: &str) -> Result<Account, StoreError> {
        Ok(self.account_entry(address).clone())
    }

    fn mark_account_borrowed(&mut self, address: &str) -> Result<(), StoreError> {
        self.account_entry(address).has_borrowed = true;
        Ok(())
    }

    fn add_liquidation_count(
        &mut self,
        address: &str,
        liquidated: bool,
    ) -> Result<(), StoreError> {
        let account = self.account_entry(address);
        if liquidated {
            account.times_liquidated += 1;
        } else {
            account.times_liquidator += 1;
        }
        Ok(())
    }

    fn update_market_stats(
        &mut self,
        market_id: &str,
        kind: EventKind,
        amount: &BigDecimal,
    ) -> Result<(), StoreError> {
        let market = self
            .markets
            .get_mut(market_id)
            .ok_or_else(|| StoreError::Lookup(format!("unknown market {market_id}")))?;
        market.add_volume(kind, amount);
        Ok(())
    }

    fn save_record(&mut self, record: ActivityRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_is_lazily_created_with_defaults() {
        let mut store = MemoryStore::new(MarketDefaults {
            protocol_id: "test-protocol".into(),
            underlying_decimals: 6,
            exchange_rate: BigDecimal::one(),
        });

        let market = store.get_or_create_market("0xmkt").unwrap();
        assert_eq!(market.protocol, "test-protocol");
        assert_eq!(market.underlying_decimals, 6);
        assert_eq!(market.exchange_rate, BigDecimal::one());
        assert_eq!(market.deposit_volume, BigDecimal::from(0));

        // Second resolve returns the same entity, not a fresh one.
        store
            .update_market_stats("0xmkt", EventKind::Deposit, &BigDecimal::from(3))
            .unwrap();
        let again = store.get_or_create_market("0xmkt").unwrap();
        assert_eq!(again.deposit_volume, BigDecimal::from(3));
    }

    #[test]
    fn account_flags_and_counters_mutate_in_place() {
        let mut store = MemoryStore::default();

        store.mark_account_borrowed("0xa").unwrap();
        store.mark_account_borrowed("0xa").unwrap();
        store.add_liquidation_count("0xa", true).unwrap();
        store.add_liquidation_count("0xb", false).unwrap();

        let a = store.account("0xa").unwrap();
        assert!(a.has_borrowed);
        assert_eq!(a.times_liquidated, 1);
        assert_eq!(a.times_liquidator, 0);

        let b = store.account("0xb").unwrap();
        assert!(!b.has_borrowed);
        assert_eq!(b.times_liquidator, 1);
    }

    #[test]
    fn stats_update_for_unknown_market_is_a_lookup_error() {
        let mut store = MemoryStore::default();
        let err = store
            .update_market_stats("0xmissing", EventKind::Borrow, &BigDecimal::from(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Lookup(_)));
    }
}
