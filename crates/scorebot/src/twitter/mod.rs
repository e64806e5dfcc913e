//! Platform access: mentions feed, tweet lookup and reply posting.

mod client;
mod mentions;
pub(crate) mod parser;
mod resolver;
mod types;

pub use client::{TwitterApi, TwitterClient};
pub use mentions::MentionSource;
pub use resolver::TweetResolver;
pub use types::{MentionEvent, MentionsPage, PostResult, Tweet};
