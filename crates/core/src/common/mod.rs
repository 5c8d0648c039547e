pub mod error;
pub mod symbol;
pub mod time;
pub mod timeframe;

pub use error::ValidationError;
pub use symbol::Symbol;
pub use timeframe::{Timeframe, TimeframeUnit};
