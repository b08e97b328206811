// Library exports for the jobtrail crate
// This allows tests and the binary to share the pipeline stages

pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod role;
pub mod store;
pub mod pipeline;

// Mail providers
pub mod email;
pub mod gmail;

// Classification and extraction over Gemini
pub mod gemini;
