mod auth;
mod health_check;

pub use auth::{issue_tokens, refresh};
pub use health_check::health_check;
