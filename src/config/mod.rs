pub mod load;
pub mod save;
pub mod types;

pub use types::{Config, EncoderSettings, Language, MAX_RECENT_PATHS, UserSettings};
