pub mod collection;
pub mod media;
pub mod search_result;
pub mod user;

pub use collection::{CollectionEntry, CollectionRecord};
pub use media::{MediaRecord, MediaSourceRecord};
pub use search_result::SearchResult;
pub use user::{UserDocument, UserProfile};
