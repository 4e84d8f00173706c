pub mod agent;
pub mod error;
pub mod events;
pub mod storage;
pub mod text;
pub mod types;

pub use agent::ContentAgent;
pub use error::{Error, Result};
pub use events::{Event, EventSink};
pub use storage::{ArticleStore, BrandVoiceStore, ContentStore, Storage, UserStore};
pub use types::*;

pub mod prelude {
    pub use crate::{ContentAgent, Error, Result, Storage};
    pub use crate::types::{Article, BrandVoice, Platform, ReformattedContent, User};
}
