pub mod error;
pub mod filter_order;
pub mod filters;
pub mod types;

pub use error::FilterError;
pub use filter_order::FilterOrder;
pub use filters::{validate_filters, Filters};
pub use types::*;
