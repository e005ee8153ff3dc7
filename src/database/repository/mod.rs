//! Data-access traits and their PostgreSQL implementations.
//!
//! Handlers only see the `*Store` traits through [`Models`], so tests can swap
//! in in-memory stores without a database.

pub mod albums;
pub mod groups;
pub mod permissions;
pub mod songs;
pub mod tokens;
pub mod users;

use async_trait::async_trait;
use chrono::Duration as TokenTtl;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Album, AlbumFilter, Group, GroupFilter, Permissions, Scope, Song, SongFilter, Token, User,
};
use crate::filter::{Filters, Metadata};

pub use albums::AlbumRepository;
pub use groups::GroupRepository;
pub use permissions::PermissionRepository;
pub use songs::SongRepository;
pub use tokens::TokenRepository;
pub use users::UserRepository;

#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Persists `group` and fills in the storage-assigned id.
    async fn insert(&self, group: &mut Group) -> Result<(), DatabaseError>;
    async fn get(&self, id: i64) -> Result<Group, DatabaseError>;
    async fn update(&self, group: &mut Group) -> Result<(), DatabaseError>;
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
    async fn get_all(
        &self,
        filter: &GroupFilter,
        filters: &Filters,
    ) -> Result<(Vec<Group>, Metadata), DatabaseError>;
}

#[async_trait]
pub trait AlbumStore: Send + Sync {
    async fn insert(&self, album: &mut Album) -> Result<(), DatabaseError>;
    async fn get(&self, id: i64) -> Result<Album, DatabaseError>;
    async fn update(&self, album: &mut Album) -> Result<(), DatabaseError>;
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
    async fn get_all(
        &self,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError>;
    async fn get_all_by_group(
        &self,
        group_id: i64,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError>;
}

#[async_trait]
pub trait SongStore: Send + Sync {
    async fn insert(&self, song: &mut Song) -> Result<(), DatabaseError>;
    async fn get(&self, id: i64) -> Result<Song, DatabaseError>;
    async fn update(&self, song: &mut Song) -> Result<(), DatabaseError>;
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
    async fn get_all(
        &self,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError>;
    async fn get_all_by_album(
        &self,
        album_id: i64,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fills in `id`, `created_at` and `version`.
    async fn insert(&self, user: &mut User) -> Result<(), DatabaseError>;
    /// Inserts the user, grants `permissions` and issues an activation token
    /// in one transaction. On error nothing is stored.
    async fn register(
        &self,
        user: &mut User,
        permissions: &[String],
        activation_ttl: TokenTtl,
    ) -> Result<Token, DatabaseError>;
    async fn get_by_email(&self, email: &str) -> Result<User, DatabaseError>;
    /// Optimistic update: fails with `EditConflict` when `version` is stale.
    async fn update(&self, user: &mut User) -> Result<(), DatabaseError>;
    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn new_token(&self, user_id: i64, ttl: TokenTtl, scope: Scope) -> Result<Token, DatabaseError>;
    async fn insert(&self, token: &Token) -> Result<(), DatabaseError>;
    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, DatabaseError>;
    async fn add_for_user(&self, user_id: i64, codes: &[String]) -> Result<(), DatabaseError>;
}

/// The full set of stores a request handler can reach.
#[derive(Clone)]
pub struct Models {
    pub groups: Arc<dyn GroupStore>,
    pub albums: Arc<dyn AlbumStore>,
    pub songs: Arc<dyn SongStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
}

impl Models {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            groups: Arc::new(GroupRepository::new(pool.clone(), query_timeout)),
            albums: Arc::new(AlbumRepository::new(pool.clone(), query_timeout)),
            songs: Arc::new(SongRepository::new(pool.clone(), query_timeout)),
            users: Arc::new(UserRepository::new(pool.clone(), query_timeout)),
            tokens: Arc::new(TokenRepository::new(pool.clone(), query_timeout)),
            permissions: Arc::new(PermissionRepository::new(pool, query_timeout)),
        }
    }
}

/// Empty text filters mean "no filter".
pub(crate) fn text_filter(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
