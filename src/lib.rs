//! Compile plain-English instruction documents into source code
//!
//! A `.gpt` document carries optional `@key: value` metadata followed by
//! free-form instructions. This library parses documents, works out where
//! the generated code should go, asks an external chat-completion service
//! for the code, and writes it to disk, either once or continuously as
//! documents change under a watched directory.

pub mod config;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod llm_client;
pub mod pipeline;
pub mod file_watcher;
pub mod watch_loop;
pub mod scaffold;

// Re-export common types
pub use config::CompilerConfig;
pub use error::{CompilerError, Result};
pub use parser::{parse_document, SourceDocument};
pub use resolver::{extension_for, resolve_output, ResolvedOutput};
pub use llm_client::LlmClient;
pub use pipeline::{OutputArtifact, Pipeline, PipelineOutcome};
pub use file_watcher::{FileEvent, FileEventType, FileWatcher};
pub use watch_loop::{WatchLoop, WatchOptions, WatchState};
