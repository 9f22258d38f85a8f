//! Persistence for message records and extracted articles.

mod article;
mod message;
mod model;

pub use article::{ArticleRepository, ArticleStore};
pub use message::{MessageRepository, MessageStore};
pub use model::{ArticleStats, MailRecord, MessageStats, SearchPage, StoredArticle};
