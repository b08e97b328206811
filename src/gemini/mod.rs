/// Gemini-backed classification and extraction stages
pub mod classifier;
pub mod client;
pub mod extractor;
pub mod schema;

pub use classifier::MessageClassifier;
pub use client::{GeminiModel, GenerativeModel};
pub use extractor::RoleExtractor;
