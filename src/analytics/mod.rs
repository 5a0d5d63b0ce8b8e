pub mod compliance_analytics;
pub mod emotion_analytics;

pub use compliance_analytics::*;
pub use emotion_analytics::*;
