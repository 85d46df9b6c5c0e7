#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod locale;
pub mod proxy;
pub mod security;
pub mod telemetry;

pub use config::{load_from_path, Config};
pub use error::{EdgeError, Result};
pub use locale::{detect_locale, DetectionInput, LocaleDecision, LocaleMiddleware, LocaleSettings};
pub use proxy::{run, serve};
pub use security::rate_limit::{RateLimitManager, RateLimitResult, RateLimiter};
