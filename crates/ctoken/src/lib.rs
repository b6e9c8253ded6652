pub mod abi;
pub mod decoder;

pub use abi::CToken;
pub use decoder::{
    BorrowEvent, CTokenEvent, EventOrigin, LiquidationEvent, MintEvent, RedeemEvent, RepayEvent,
    TransferEvent, decode_ctoken_log,
};
