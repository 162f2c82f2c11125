//! Authentication
//!
//! Bearer tokens are validated by an [`IdentityValidator`]; successful
//! validations are cached for a while by [`TokenCache`].

mod clock;
mod middleware;
mod token_cache;
mod validator;

pub use clock::{Clock, SystemClock};
pub use middleware::require_auth;
pub use token_cache::TokenCache;
pub use validator::{CachingValidator, GitHubValidator, IdentityValidator, UserIdentity};
