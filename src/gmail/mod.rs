/// Gmail mail provider: transport, parsing and rate-limited bulk fetch
pub mod client;
pub mod parser;
pub mod rate_limiter;
pub mod service;

pub use client::{GmailApi, GmailClient, ListRequest, MessageListPage, UserCredentials};
pub use parser::{parse_message, RawMessage};
pub use rate_limiter::SlidingWindowRateLimiter;
pub use service::GmailService;
