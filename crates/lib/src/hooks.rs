//! Per-chat webhook URLs.
//!
//! A hook URL is `{public_url}/hook/{chat_id}/{signature}` where the signature is a truncated
//! HMAC-SHA256 of the chat id under the configured secret. Nothing is stored: the gateway
//! recomputes the signature on every request.

use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature length in bytes before base64 (22 URL-safe characters).
const SIGNATURE_BYTES: usize = 16;

/// Signs and verifies chat ids for hook URLs.
#[derive(Clone)]
pub struct HookSigner {
    mac: HmacSha256,
}

impl HookSigner {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            anyhow::bail!("hook secret must not be empty");
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid hook secret: {}", e))?;
        Ok(Self { mac })
    }

    /// URL-safe signature for `chat_id`.
    pub fn sign(&self, chat_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(chat_id.as_bytes());
        let digest = mac.finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(&digest[..SIGNATURE_BYTES])
    }

    /// Constant-time check of a signature taken from a hook URL.
    pub fn verify(&self, chat_id: &str, signature: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(signature.as_bytes()) else {
            return false;
        };
        if tag.len() != SIGNATURE_BYTES {
            return false;
        }
        let mut mac = self.mac.clone();
        mac.update(chat_id.as_bytes());
        mac.verify_truncated_left(&tag).is_ok()
    }

    /// Full hook URL for `chat_id` under `public_url` (no trailing slash).
    pub fn hook_url(&self, public_url: &str, chat_id: &str) -> String {
        format!(
            "{}/hook/{}/{}",
            public_url.trim_end_matches('/'),
            chat_id,
            self.sign(chat_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify() {
        let signer = HookSigner::new("s3cret").unwrap();
        let sig = signer.sign("-100123");
        assert_eq!(sig.len(), 22);
        assert!(signer.verify("-100123", &sig));
        assert!(!signer.verify("-100124", &sig));
    }

    #[test]
    fn other_secret_does_not_verify() {
        let a = HookSigner::new("one").unwrap();
        let b = HookSigner::new("two").unwrap();
        assert!(!b.verify("42", &a.sign("42")));
    }

    #[test]
    fn garbage_signatures_are_rejected() {
        let signer = HookSigner::new("s3cret").unwrap();
        assert!(!signer.verify("42", ""));
        assert!(!signer.verify("42", "not base64!"));
        assert!(!signer.verify("42", "AAAA"));
    }

    #[test]
    fn hook_url_layout() {
        let signer = HookSigner::new("s3cret").unwrap();
        let url = signer.hook_url("https://hooks.example.com/", "42");
        assert_eq!(url, format!("https://hooks.example.com/hook/42/{}", signer.sign("42")));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(HookSigner::new("  ").is_err());
    }
}
