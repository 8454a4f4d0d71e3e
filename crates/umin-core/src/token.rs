//! Confirmation tokens.
//!
//! A destructive action's confirmation prompt embeds a token that binds the
//! model, the action name and the exact selection. The resubmission carries
//! it back; no server-side conversation state is kept.

use crate::record::Filter;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, model: &str, action: &str, selection: &Filter) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("infallible: HMAC accepts keys of any length");
        mac.update(model.as_bytes());
        mac.update(b"\n");
        mac.update(action.as_bytes());
        mac.update(b"\n");
        mac.update(selection.canonical().as_bytes());
        mac
    }

    pub fn sign(&self, model: &str, action: &str, selection: &Filter) -> String {
        let tag = self.mac(model, action, selection).finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(tag)
    }

    pub fn verify(&self, model: &str, action: &str, selection: &Filter, token: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(token.trim()) else {
            return false;
        };
        self.mac(model, action, selection).verify_slice(&tag).is_ok()
    }
}

/// 32 random bytes, base64url-encoded. Used for `init` and as the
/// per-process key when no secret is configured.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
