//! Normalized event mappings for a Compound-v2-style lending market.
//!
//! The indexing host decodes cToken logs (see `lendscan-ctoken`), then calls
//! one handler per event. Each call produces a write-once [`ActivityRecord`]
//! and updates per-market volume accumulators through an [`EntityStore`]
//! registry supplied by the host.

pub mod entities;
pub mod handlers;
pub mod ids;
pub mod numeric;
pub mod store;

pub use entities::{Account, ActivityRecord, EventKind, Market, Protocol};
pub use handlers::{
    MappingContext, handle_borrow, handle_event, handle_liquidate, handle_mint, handle_redeem,
    handle_repay, handle_transfer,
};
pub use ids::generate_id;
pub use store::{EntityStore, MarketDefaults, MemoryStore, StoreError};
