pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod filesystem;
pub mod midi_input;
pub mod setlist;
pub mod transport;

pub use app::run;
pub use cli::Cli;
pub use config::Settings;
pub use error::StartupError;
