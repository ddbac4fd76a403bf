//! # quarry-engine
//!
//! Natural-language query engine. Resolves free text to a connection and
//! table/collection, compiles it through a language model into a
//! dialect-tagged body, classifies safety and cost, and executes behind a
//! confirmation gate with per-connection limits and replayable history.

pub mod catalog;
pub mod compiler;
pub mod execution;
pub mod history;
pub mod resolver;
pub mod safety;
pub mod service;

pub use catalog::SchemaCatalog;
pub use compiler::QueryCompiler;
pub use execution::ExecutionCoordinator;
pub use history::InMemoryHistoryStore;
pub use resolver::TargetResolver;
pub use safety::SafetyClassifier;
pub use service::{Collaborators, QueryService};
