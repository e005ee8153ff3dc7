// handlers/public/mod.rs - Public handlers (no bearer token required)
//
// Healthcheck plus the account flow that leads to a bearer token:
// register, activate, log in.

pub mod healthcheck;
pub mod tokens;
pub mod users;

pub use healthcheck::healthcheck;
pub use tokens::create_authentication_token;
pub use users::{activate_user, register_user};
