// handlers/mod.rs - Two-tier handler layout
//
// Public (no bearer token) → Catalog (bearer token plus `read`/`write`)
pub mod catalog;
pub mod extract;
pub mod public;
