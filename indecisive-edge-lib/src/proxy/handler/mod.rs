pub mod headers;
pub mod locale_routing;
pub mod rate_limit_validation;
pub mod request;

pub use headers::{add_forwarded_headers, set_locale_header};
pub use locale_routing::{apply_locale_routing, redirect_response};
pub use rate_limit_validation::{apply_rate_limit_headers, check_rate_limit, RateLimitCheck};
pub use request::handle_edge_request;
