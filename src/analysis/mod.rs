//! Pure analysis over a record snapshot: aggregation and risk tiers.

pub mod aggregator;
pub mod risk;

pub use aggregator::{aggregate, AggregateView};
pub use risk::{classify, fill_percentage, ClassifiedRecord, RiskTier, SortKey};
