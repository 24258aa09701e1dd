pub mod builder;
pub mod period;
pub mod range;

pub use builder::TaskQuery;
pub use period::Period;
pub use range::DateRange;
