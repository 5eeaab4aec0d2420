use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Language model
    pub google_api_key: String,
    pub model: String,

    // Evidence sources
    pub fact_check_api_key: String,
    pub search_api_key: String,
    pub search_cx: String,

    // Translation (optional; unset disables the capability)
    pub translate_api_key: Option<String>,

    // Crawler
    pub request_timeout_secs: u64,
    pub max_retries: u32,

    // Web server
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing. A missing
    /// model key is a deployment error, surfaced once at construction.
    pub fn from_env() -> Self {
        Self {
            google_api_key: required_env("GOOGLE_API_KEY"),
            model: env::var("CLAIMTRACE_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            fact_check_api_key: env::var("FACT_CHECK_API_KEY").unwrap_or_default(),
            search_api_key: env::var("GOOGLE_SEARCH_API_KEY").unwrap_or_default(),
            search_cx: env::var("GOOGLE_SEARCH_CX").unwrap_or_default(),
            translate_api_key: env::var("GOOGLE_TRANSLATE_API_KEY").ok(),
            request_timeout_secs: env::var("REQUEST_TIMEOUT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("REQUEST_TIMEOUT must be a number"),
            max_retries: env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("MAX_RETRIES must be a number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
