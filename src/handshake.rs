//! Nonce challenge/response that pairs the receiver with its controller.
//!
//! The nonce only proves the peer saw the live challenge. It is not an
//! authentication secret and is compared as a plain string.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

use crate::protocol::OutboundMessage;

const NONCE_LEN: usize = 24;

#[derive(Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        let mut b = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut b);
        Self(URL_SAFE_NO_PAD.encode(b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Nonce {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Nonce {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Keep the token out of logs.
impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Nonce(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First matching response of the session.
    Accepted,
    /// Matching response from a peer that is already trusted.
    Reaffirmed,
    Rejected,
}

#[derive(Debug, Default)]
pub struct Handshake {
    nonce: Option<Nonce>,
    trusted: bool,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fresh nonce unless this session already has one.
    pub fn begin(&mut self) -> &Nonce {
        self.nonce.get_or_insert_with(Nonce::generate)
    }

    /// Like [`Handshake::begin`] but with a caller-supplied token. Ignored if
    /// the session already has a nonce.
    pub fn begin_with(&mut self, nonce: Nonce) -> &Nonce {
        self.nonce.get_or_insert(nonce)
    }

    pub fn nonce(&self) -> Option<&Nonce> {
        self.nonce.as_ref()
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Reply to `INITIAL_HELLO`. Every hello gets the same nonce so a peer
    /// that says hello twice never holds a stale challenge.
    pub fn challenge(&mut self) -> OutboundMessage {
        OutboundMessage::ChallengeRequest {
            challenge: self.begin().as_str().to_owned(),
        }
    }

    pub fn verify(&mut self, echoed: &str) -> Verdict {
        let matches = self.nonce.as_ref().is_some_and(|n| n.as_str() == echoed);
        match (matches, self.trusted) {
            (false, _) => Verdict::Rejected,
            (true, true) => Verdict::Reaffirmed,
            (true, false) => {
                self.trusted = true;
                Verdict::Accepted
            }
        }
    }
}
