pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{
    AlbumRepository, AlbumStore, GroupRepository, GroupStore, Models, PermissionRepository,
    PermissionStore, SongRepository, SongStore, TokenRepository, TokenStore, UserRepository,
    UserStore,
};

use std::future::Future;
use std::time::Duration;

/// Run one database round-trip under a deadline. Nothing is retried.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(DatabaseError::from),
        Err(_) => Err(DatabaseError::Timeout(limit)),
    }
}
