//! Domain types.

mod compounding;
mod date;
mod family;

pub use compounding::Compounding;
pub use date::Date;
pub use family::CurveFamily;
