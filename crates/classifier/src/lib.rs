//! Client for the natural-language classification service.
//!
//! The pipeline treats classification as an opaque capability: given a
//! prompt, return a structured JSON payload or fail. [`Classifier`] is that
//! seam; [`ChatCompletionsClassifier`] is the production implementation
//! against an OpenAI-compatible `/chat/completions` endpoint.

pub mod client;
pub mod config;
pub mod http;

pub use client::{Classifier, ClassifierError, DynClassifier};
pub use config::ClassifierConfig;
pub use http::ChatCompletionsClassifier;
