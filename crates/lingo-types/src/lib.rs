//! Lingo Types - Pure type definitions
//!
//! Plain data entities shared by the store, the service layer and the HTTP
//! boundary. Nothing in here knows how it is persisted.

pub mod page;
pub mod search;
pub mod tag;
pub mod translation;
pub mod user;

pub use page::*;
pub use search::*;
pub use tag::*;
pub use translation::*;
pub use user::*;

/// Number of characters a locale code must have
pub const LOCALE_LEN: usize = 2;

/// Maximum length of a translation key
pub const MAX_KEY_LEN: usize = 255;

/// Maximum length of a tag name
pub const MAX_TAG_NAME_LEN: usize = 50;

/// Maximum length of a tag description
pub const MAX_TAG_DESCRIPTION_LEN: usize = 255;
