//! HTTP relay between a browser client and two upstreams: an
//! OpenAI-compatible chat-completion API and the PubMed E-utilities.
//!
//! Server-held keys are injected on the way out; upstream failures come back
//! as a uniform `{error, details?}` JSON envelope.

pub mod config;
pub mod error;
pub mod http_client;
pub mod providers;
pub mod server;
