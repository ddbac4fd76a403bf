//! Seams to external collaborators and persistence.
//!
//! The core never talks to a database, a model endpoint, or a credential
//! service directly; it goes through these traits.

pub mod backend;
pub mod history;
pub mod introspector;
pub mod language_model;
pub mod registry;

pub use backend::{QueryBackend, QueryRows};
pub use history::HistoryStore;
pub use introspector::SchemaIntrospector;
pub use language_model::LanguageModel;
pub use registry::ConnectionRegistry;
