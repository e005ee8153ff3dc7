//! In-memory stores behind the same traits as the PostgreSQL repositories, so
//! handlers and routing can be exercised without a database.

use async_trait::async_trait;
use chrono::{Duration as TokenTtl, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::{generate_token, hash_password, hash_token};
use crate::config::{AppConfig, Environment};
use crate::database::models::{
    Album, AlbumFilter, Group, GroupFilter, Permissions, Scope, Song, SongFilter, Token, User,
};
use crate::database::{
    AlbumStore, DatabaseError, GroupStore, Models, PermissionStore, SongStore, TokenStore, UserStore,
};
use crate::filter::{Filters, Metadata, SortDirection};
use crate::state::AppState;

#[derive(Default)]
struct Tables {
    groups: Vec<Group>,
    albums: Vec<Album>,
    songs: Vec<Song>,
    users: Vec<User>,
    tokens: Vec<Token>,
    permissions: HashMap<i64, Vec<String>>,
    sequences: HashMap<&'static str, i64>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    list_calls: AtomicUsize,
    fail_next_registration: AtomicBool,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a user holding `permissions` and returns a live bearer token for it.
    pub fn seed_user(&self, email: &str, activated: bool, permissions: &[&str]) -> (User, String) {
        let mut tables = self.lock();
        let user = User {
            id: tables.next_id("users"),
            created_at: Utc::now(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: hash_password("pa55word!").unwrap(),
            activated,
            version: 1,
        };
        tables.users.push(user.clone());
        tables
            .permissions
            .insert(user.id, permissions.iter().map(|p| p.to_string()).collect());

        let token = generate_token(user.id, TokenTtl::hours(1), Scope::Authentication);
        let plaintext = token.plaintext.clone();
        tables.tokens.push(token);
        (user, plaintext)
    }

    /// Number of list queries (`get_all*`) served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(AtomicOrdering::SeqCst)
    }

    fn count_list_call(&self) {
        self.list_calls.fetch_add(1, AtomicOrdering::SeqCst);
    }

    /// Makes the next `register` fail after the user row was written, the
    /// way a lost connection would mid-transaction.
    pub fn fail_next_registration(&self) {
        self.fail_next_registration.store(true, AtomicOrdering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn group_count(&self) -> usize {
        self.lock().groups.len()
    }

    pub fn tokens_for(&self, user_id: i64, scope: Scope) -> usize {
        self.lock()
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.scope == scope)
            .count()
    }
}

/// Word-level match in the spirit of `plainto_tsquery('simple', …)`: every
/// query word must appear in the value, case-insensitively.
fn text_matches(value: &str, query: &Option<String>) -> bool {
    let Some(query) = query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let words = |s: &str| -> Vec<String> {
        s.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    };
    let haystack = words(value);
    words(query).iter().all(|w| haystack.contains(w))
}

fn num_matches(value: i32, wanted: Option<i32>) -> bool {
    wanted.map_or(true, |w| w == value)
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Int(i64),
    Text(String),
}

/// Sorts, pages and counts the way the list queries do, including the
/// window count reading as zero when the requested page is empty.
fn paginate<T: Clone>(
    mut rows: Vec<T>,
    filters: &Filters,
    key: impl Fn(&T, &str) -> SortValue,
    id: impl Fn(&T) -> i64,
) -> Result<(Vec<T>, Metadata), DatabaseError> {
    let order = filters.sort_order()?;
    rows.sort_by(|a, b| {
        let primary = key(a, order.column.as_str()).cmp(&key(b, order.column.as_str()));
        let primary = match order.sort {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        match primary {
            Ordering::Equal => id(a).cmp(&id(b)),
            other => other,
        }
    });

    let total = rows.len() as i64;
    let page: Vec<T> = rows
        .into_iter()
        .skip(filters.offset().max(0) as usize)
        .take(filters.limit().max(0) as usize)
        .collect();
    let total = if page.is_empty() { 0 } else { total };
    Ok((page, Metadata::calculate(total, filters.page, filters.page_size)))
}

fn group_key(g: &Group, column: &str) -> SortValue {
    match column {
        "name" => SortValue::Text(g.name.clone()),
        "num_of_members" => SortValue::Int(g.num_of_members.into()),
        _ => SortValue::Int(g.id),
    }
}

fn album_key(a: &Album, column: &str) -> SortValue {
    match column {
        "title" => SortValue::Text(a.title.clone()),
        "genre" => SortValue::Text(a.genre.clone()),
        "tracks" => SortValue::Int(a.tracks.into()),
        _ => SortValue::Int(a.id),
    }
}

fn song_key(s: &Song, column: &str) -> SortValue {
    match column {
        "title" => SortValue::Text(s.title.clone()),
        "length" => SortValue::Int(s.length.into()),
        _ => SortValue::Int(s.id),
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn insert(&self, group: &mut Group) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        group.id = tables.next_id("groups");
        tables.groups.push(group.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Group, DatabaseError> {
        self.lock()
            .groups
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, group: &mut Group) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let row = tables
            .groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or(DatabaseError::NotFound)?;
        *row = group.clone();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let before = tables.groups.len();
        tables.groups.retain(|g| g.id != id);
        if tables.groups.len() == before {
            return Err(DatabaseError::NotFound);
        }
        let orphaned: Vec<i64> = tables
            .albums
            .iter()
            .filter(|a| a.group_id == id)
            .map(|a| a.id)
            .collect();
        tables.albums.retain(|a| a.group_id != id);
        tables.songs.retain(|s| !orphaned.contains(&s.album_id));
        Ok(())
    }

    async fn get_all(
        &self,
        filter: &GroupFilter,
        filters: &Filters,
    ) -> Result<(Vec<Group>, Metadata), DatabaseError> {
        self.count_list_call();
        let rows: Vec<Group> = self
            .lock()
            .groups
            .iter()
            .filter(|g| text_matches(&g.name, &filter.name))
            .filter(|g| num_matches(g.num_of_members, filter.num_of_members))
            .cloned()
            .collect();
        paginate(rows, filters, group_key, |g: &Group| g.id)
    }
}

impl MemoryStore {
    fn albums_matching(&self, group_id: Option<i64>, filter: &AlbumFilter) -> Vec<Album> {
        self.lock()
            .albums
            .iter()
            .filter(|a| group_id.map_or(true, |id| a.group_id == id))
            .filter(|a| text_matches(&a.title, &filter.title))
            .filter(|a| text_matches(&a.genre, &filter.genre))
            .filter(|a| num_matches(a.tracks, filter.tracks))
            .cloned()
            .collect()
    }

    fn songs_matching(&self, album_id: Option<i64>, filter: &SongFilter) -> Vec<Song> {
        self.lock()
            .songs
            .iter()
            .filter(|s| album_id.map_or(true, |id| s.album_id == id))
            .filter(|s| text_matches(&s.title, &filter.title))
            .filter(|s| num_matches(s.length, filter.length))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AlbumStore for MemoryStore {
    async fn insert(&self, album: &mut Album) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        if !tables.groups.iter().any(|g| g.id == album.group_id) {
            return Err(DatabaseError::MissingReference("groupId"));
        }
        album.id = tables.next_id("album");
        tables.albums.push(album.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Album, DatabaseError> {
        self.lock()
            .albums
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, album: &mut Album) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        if !tables.groups.iter().any(|g| g.id == album.group_id) {
            return Err(DatabaseError::MissingReference("groupId"));
        }
        let row = tables
            .albums
            .iter_mut()
            .find(|a| a.id == album.id)
            .ok_or(DatabaseError::NotFound)?;
        *row = album.clone();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let before = tables.albums.len();
        tables.albums.retain(|a| a.id != id);
        if tables.albums.len() == before {
            return Err(DatabaseError::NotFound);
        }
        tables.songs.retain(|s| s.album_id != id);
        Ok(())
    }

    async fn get_all(
        &self,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError> {
        self.count_list_call();
        paginate(self.albums_matching(None, filter), filters, album_key, |a: &Album| a.id)
    }

    async fn get_all_by_group(
        &self,
        group_id: i64,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError> {
        self.count_list_call();
        paginate(self.albums_matching(Some(group_id), filter), filters, album_key, |a: &Album| a.id)
    }
}

#[async_trait]
impl SongStore for MemoryStore {
    async fn insert(&self, song: &mut Song) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        if !tables.albums.iter().any(|a| a.id == song.album_id) {
            return Err(DatabaseError::MissingReference("albumId"));
        }
        song.id = tables.next_id("songs");
        tables.songs.push(song.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Song, DatabaseError> {
        self.lock()
            .songs
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, song: &mut Song) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        if !tables.albums.iter().any(|a| a.id == song.album_id) {
            return Err(DatabaseError::MissingReference("albumId"));
        }
        let row = tables
            .songs
            .iter_mut()
            .find(|s| s.id == song.id)
            .ok_or(DatabaseError::NotFound)?;
        *row = song.clone();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let before = tables.songs.len();
        tables.songs.retain(|s| s.id != id);
        if tables.songs.len() == before {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn get_all(
        &self,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError> {
        self.count_list_call();
        paginate(self.songs_matching(None, filter), filters, song_key, |s: &Song| s.id)
    }

    async fn get_all_by_album(
        &self,
        album_id: i64,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError> {
        self.count_list_call();
        paginate(self.songs_matching(Some(album_id), filter), filters, song_key, |s: &Song| s.id)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &mut User) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DatabaseError::DuplicateEmail);
        }
        user.id = tables.next_id("users");
        user.created_at = Utc::now();
        user.version = 1;
        tables.users.push(user.clone());
        Ok(())
    }

    async fn register(
        &self,
        user: &mut User,
        permissions: &[String],
        activation_ttl: TokenTtl,
    ) -> Result<Token, DatabaseError> {
        let mut staged = user.clone();
        UserStore::insert(self, &mut staged).await?;

        if self.fail_next_registration.swap(false, AtomicOrdering::SeqCst) {
            // Rolled back.
            self.lock().users.retain(|u| u.id != staged.id);
            return Err(DatabaseError::Timeout(std::time::Duration::from_secs(3)));
        }

        PermissionStore::add_for_user(self, staged.id, permissions).await?;
        let token = TokenStore::new_token(self, staged.id, activation_ttl, Scope::Activation).await?;
        *user = staged;
        Ok(token)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        self.lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, user: &mut User) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let row = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id && u.version == user.version)
            .ok_or(DatabaseError::EditConflict)?;
        user.version += 1;
        *row = user.clone();
        Ok(())
    }

    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, DatabaseError> {
        let hash = hash_token(plaintext);
        let now = Utc::now();
        let tables = self.lock();
        let token = tables
            .tokens
            .iter()
            .find(|t| t.hash == hash && t.scope == scope && t.expiry > now)
            .ok_or(DatabaseError::NotFound)?;
        tables
            .users
            .iter()
            .find(|u| u.id == token.user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn new_token(&self, user_id: i64, ttl: TokenTtl, scope: Scope) -> Result<Token, DatabaseError> {
        let token = generate_token(user_id, ttl, scope);
        TokenStore::insert(self, &token).await?;
        Ok(token)
    }

    async fn insert(&self, token: &Token) -> Result<(), DatabaseError> {
        self.lock().tokens.push(token.clone());
        Ok(())
    }

    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), DatabaseError> {
        self.lock()
            .tokens
            .retain(|t| !(t.scope == scope && t.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, DatabaseError> {
        Ok(Permissions::from(
            self.lock().permissions.get(&user_id).cloned().unwrap_or_default(),
        ))
    }

    async fn add_for_user(&self, user_id: i64, codes: &[String]) -> Result<(), DatabaseError> {
        let mut tables = self.lock();
        let granted = tables.permissions.entry(user_id).or_default();
        for code in codes {
            if (code == "read" || code == "write") && !granted.contains(code) {
                granted.push(code.clone());
            }
        }
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.api.enable_request_logging = false;
    config.api.max_request_size_bytes = 1024;
    config
}

/// App state over a fresh in-memory store; the store is returned for seeding.
pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let models = Models {
        groups: store.clone(),
        albums: store.clone(),
        songs: store.clone(),
        users: store.clone(),
        tokens: store.clone(),
        permissions: store.clone(),
    };
    (AppState::with_models(test_config(), models), store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_match_requires_every_word() {
        assert!(text_matches("Born Pink", &Some("pink".into())));
        assert!(text_matches("Born Pink", &Some("PINK born".into())));
        assert!(!text_matches("Born Pink", &Some("pink venom".into())));
        assert!(text_matches("anything", &None));
        assert!(text_matches("anything", &Some("  ".into())));
    }

    #[tokio::test]
    async fn list_sorts_with_id_tiebreak_and_pages() {
        let store = MemoryStore::default();
        for (name, members) in [("B", 4), ("A", 4), ("C", 7)] {
            let mut g = Group { id: 0, name: name.into(), num_of_members: members };
            GroupStore::insert(&store, &mut g).await.unwrap();
        }

        let filters = Filters::new(1, 2, "num_of_members", crate::database::models::GROUP_SORT_SAFELIST);
        let (rows, meta) = GroupStore::get_all(&store, &GroupFilter::default(), &filters).await.unwrap();
        assert_eq!(rows.iter().map(|g| g.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(meta.total_records, 3);
        assert_eq!(meta.last_page, 2);

        let beyond = Filters::new(5, 2, "name", crate::database::models::GROUP_SORT_SAFELIST);
        let (rows, meta) = GroupStore::get_all(&store, &GroupFilter::default(), &beyond).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(meta, Metadata::default());
    }
}
