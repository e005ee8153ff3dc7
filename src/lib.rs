pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validator;

pub use routes::app;
pub use state::AppState;

#[cfg(test)]
pub mod testing;
