// ============================
// filestation-lib/src/auth/token.rs
// ============================
//! Opaque token generation.
//!
//! Session and CSRF tokens are both minted here: 32 bytes of OS entropy,
//! base64 URL-safe encoded without padding. Collisions are not checked for;
//! at 256 bits of entropy they are not a practical concern.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// Token size in bytes (32 bytes = 256 bits of entropy)
const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure random token.
///
/// A failing entropy source aborts the process inside `OsRng`; there is no
/// recoverable error path.
pub fn generate_token() -> String {
    let mut buffer = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
