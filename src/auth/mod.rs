//! Session authentication: token codec, revocation store and credential check.

pub mod clock;
pub mod codec;
pub mod credentials;
pub mod principal;
pub mod revocation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{DEFAULT_TOKEN_TTL, IssueError, TokenCodec, TokenError};
pub use credentials::{CredentialVerifier, InMemoryCredentials};
pub use principal::Principal;
pub use revocation::RevocationStore;
