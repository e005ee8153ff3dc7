// handlers/catalog/mod.rs - Catalog handlers (bearer token plus permission required)
//
// Everything needs the `read` permission except DELETE, which needs `write`. The guards run first
// in every handler, before any catalog store is touched.

pub mod albums;
pub mod groups;
pub mod songs;

pub use albums::*;
pub use groups::*;
pub use songs::*;
