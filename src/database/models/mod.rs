pub mod album;
pub mod group;
pub mod song;
pub mod token;
pub mod user;

pub use album::{validate_album, Album, AlbumFilter, ALBUM_SORT_SAFELIST};
pub use group::{validate_group, Group, GroupFilter, GROUP_SORT_SAFELIST};
pub use song::{validate_song, Song, SongFilter, SONG_SORT_SAFELIST};
pub use token::{Scope, Token};
pub use user::{validate_email, validate_password_plaintext, validate_user, Permissions, User};
