// src/lib.rs
pub mod backends;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fence;
pub mod launcher;
pub mod output;
pub mod session;
pub mod time;
pub mod types;
pub mod validate;

pub use backends::{Backend, SelectedBackend};
pub use cli::Args;
pub use config::ConfigResolver;
pub use engine::FetchEngine;
pub use fence::Fence;
pub use types::{FlexError, QueryDescriptor, QueryPath};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
