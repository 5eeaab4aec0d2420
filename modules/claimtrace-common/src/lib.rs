pub mod config;
pub mod error;
pub mod text;
pub mod types;
pub mod urls;

pub use config::Config;
pub use error::ClaimtraceError;
pub use text::clean_text;
pub use types::*;
pub use urls::{extract_domain, is_valid_url, normalize_url};
