pub mod banner;
pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod net;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `parley::Registry`, etc.)
pub use commands::process_command;
pub use state::{
    registry::Registry,
    session::{Phase, Session},
};
