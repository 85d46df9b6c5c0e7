pub mod context;
pub mod forwarding;
pub mod handler;
pub mod http_result;
pub mod server;
pub mod synthetic_response;

pub use context::EdgeContext;
pub use forwarding::{create_client, forward, HttpClient};
pub use http_result::HttpError;
pub use server::{run, serve};
