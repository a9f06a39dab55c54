// Momentum - Tomorrow/Later task lists with a write-through JSON store

pub mod backend;
pub mod config;
pub mod export;
pub mod filter;
pub mod focus;
pub mod stats;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use backend::{Backend, FileBackend, MemoryBackend};
pub use config::Config;
pub use filter::{Filter, Scope};
pub use focus::FocusSession;
pub use stats::Period;
pub use store::{Change, DEFAULT_STORAGE_KEY, SubscriptionId, TaskStore};
pub use task::{Task, TaskStatus};
