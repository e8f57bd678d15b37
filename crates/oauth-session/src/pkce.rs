//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and challenge for one authorization attempt.
//! The challenge goes into the authorize URL; the verifier is kept by the
//! session state and sent with the code exchange, proving both requests came
//! from the same party.
//!
//! The S256 method needs SHA-256, compiled in through the `s256` feature.
//! Builds without it fall back to the `plain` method (the verifier doubles
//! as the challenge) rather than refusing to authorize.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
#[cfg(feature = "s256")]
use sha2::{Digest, Sha256};

use crate::constants::VERIFIER_BYTES;

/// Code challenge method, as sent in `code_challenge_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMethod {
    #[cfg(feature = "s256")]
    S256,
    Plain,
}

impl ChallengeMethod {
    /// The strongest method this build supports.
    pub const fn strongest() -> Self {
        #[cfg(feature = "s256")]
        {
            ChallengeMethod::S256
        }
        #[cfg(not(feature = "s256"))]
        {
            ChallengeMethod::Plain
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            #[cfg(feature = "s256")]
            ChallengeMethod::S256 => "S256",
            ChallengeMethod::Plain => "plain",
        }
    }
}

/// Verifier and challenge for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceMaterial {
    pub verifier: String,
    pub challenge: String,
    pub method: ChallengeMethod,
}

impl PkceMaterial {
    /// Derive the challenge for an existing verifier with the strongest
    /// available method.
    pub fn from_verifier(verifier: String) -> Self {
        let method = ChallengeMethod::strongest();
        let challenge = compute_challenge(&verifier, method);
        Self {
            verifier,
            challenge,
            method,
        }
    }
}

/// Generate fresh PKCE material. Never cached: every call draws a new verifier.
pub fn generate() -> PkceMaterial {
    PkceMaterial::from_verifier(generate_verifier())
}

/// Generate a cryptographically random PKCE code verifier.
///
/// 32 random bytes encoded as URL-safe base64 without padding: exactly 43
/// characters from the unreserved alphabet, the minimum RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the code challenge for `verifier`.
///
/// S256: `BASE64URL(SHA256(verifier))`. Plain: the verifier itself.
pub fn compute_challenge(verifier: &str, method: ChallengeMethod) -> String {
    match method {
        #[cfg(feature = "s256")]
        ChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
        ChallengeMethod::Plain => verifier.to_string(),
    }
}
