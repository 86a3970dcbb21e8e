/// Authentication module
///
/// Access token issuance, refresh token generation, hashing and the
/// verify-then-rotate protocol.

mod access_token;
mod claims;
mod refresh_token;
mod rotation;
mod service;
mod token_hash;

pub use access_token::{AccessToken, AccessTokenIssuer};
pub use claims::Claims;
pub use refresh_token::{RawRefreshToken, RefreshTokenGenerator, REFRESH_TOKEN_LENGTH};
pub use rotation::{
    IpChangeEvent, IpChangeListener, RefreshTokenStore, RefreshTokenVerifier,
    TracingIpChangeListener,
};
pub use service::{TokenPair, TokenService};
pub use token_hash::{hash_token, truncate_token, verify_token, BCRYPT_MAX_INPUT};
