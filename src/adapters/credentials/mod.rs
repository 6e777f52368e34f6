//! Credential adapters - token strategies and the chain that orders them.
//!
//! - `TokenSourceChain` - Ordered fallback over strategies
//! - `RefreshingOAuthStrategy` - OAuth refresh-token exchange with caching
//! - `StaticTokenStrategy` - Token from an environment variable or config
//! - `InMemoryRefreshTokenStore` / `FileRefreshTokenStore` - Refresh token persistence

mod oauth_refresh;
mod refresh_store;
mod static_token;
mod token_chain;

pub use oauth_refresh::{OAuthRefreshConfig, RefreshingOAuthStrategy, GOOGLE_TOKEN_URL};
pub use refresh_store::{FileRefreshTokenStore, InMemoryRefreshTokenStore};
pub use static_token::StaticTokenStrategy;
pub use token_chain::TokenSourceChain;
