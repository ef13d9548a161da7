pub mod models;
pub mod symbol;
pub mod timeframe;
pub mod timestamp;

pub use models::{HistoryPoint, NewsItem, NormalizedAsset, Record};
pub use symbol::Symbol;
pub use timeframe::Timeframe;
pub use timestamp::UtcDateTime;
