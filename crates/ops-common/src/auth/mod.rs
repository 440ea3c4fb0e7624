//! API credential checks

mod api_token;

pub use api_token::ApiToken;
