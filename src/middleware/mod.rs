pub mod auth;
pub mod permissions;
pub mod response;

pub use auth::{authenticate, CurrentUser};
pub use permissions::{require_activated, require_authenticated, require_permission};
pub use response::{message, ApiResponse, ApiResult};
