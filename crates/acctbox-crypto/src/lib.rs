//! Cryptographic primitives for the acctbox account bundle protocol.
//!
//! This crate is the only place in the workspace that touches raw
//! cryptography. The bundle crate composes these primitives and never
//! calls a cipher or hash directly.
//!
//! # Modules
//!
//! - [`aead`]: XChaCha20-Poly1305 secret-box sealing
//! - [`hash`]: SHA-256 digests and constant-time comparison
//! - [`kdf`]: HKDF-SHA256 key derivation from per-user key seeds
//! - [`keys`]: Ed25519 account keypairs and Bech32 id/secret encoding

pub mod aead;
pub mod hash;
pub mod kdf;
pub mod keys;
