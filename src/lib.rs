pub mod app;
pub mod completion;
pub mod config;
pub mod date_range;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod view;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::JsonFileStore;
