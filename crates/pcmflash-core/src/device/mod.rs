//! Bus adapter abstraction

mod traits;

pub use traits::*;
