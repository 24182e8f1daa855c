//! Grid service API: wire types and the client seam

pub mod client;
pub mod types;

pub use client::{mock, GridApi, HttpGridApi};
pub use types::{
    BalanceResponse, BotType, ErrorBody, GridId, GridRequest, GridSnapshot, GridStatsResponse,
    Performance, PositionEntry, PriceResponse, SymbolList, TradeRecord,
};
