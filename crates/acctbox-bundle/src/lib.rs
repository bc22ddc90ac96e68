//! Versioned, split visible/secret account bundles.
//!
//! A user's accounts are stored as one parent record plus one sealed
//! record per account. The parent's visible half (revision, prev pointer,
//! account ids, modes, primary flag) is readable by the storage server;
//! names and signing secrets are sealed under the per-user key. Each
//! sealed half embeds the hash of its visible half, so tampering with
//! either is detected before any secret is trusted.
//!
//! # Pipeline
//!
//! ```text
//! encode: builder -> split -> bind -> seal -> codec -> WireRecord
//! decode: WireRecord -> codec -> open [KeySource] -> bind/merge -> Bundle
//! ```
//!
//! # Modules
//!
//! - [`model`]: in-memory bundle, entries and account records
//! - [`builder`]: fresh, imported and legacy-converted bundles
//! - [`split`]: visible/secret payload structures and the split
//! - [`binder`]: visible-hash binding and merging
//! - [`version`]: closed format-version sets
//! - [`codec`]: canonical bincode and base64 framing
//! - [`engine`]: sealing and opening envelopes
//! - [`key_source`]: per-user key lookup
//! - [`encode`] / [`decode`]: full box and unbox
//! - [`mode`]: device-mode transitions
//! - [`access`]: secret lookup and merged views
//! - [`wire`]: storage wire record

pub mod access;
pub mod binder;
pub mod builder;
pub mod codec;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod key_source;
pub mod mode;
pub mod model;
pub mod split;
pub mod version;
pub mod wire;

pub use access::{account_with_secret, secret_for, AccountWithSecret};
pub use builder::{add_account, new_from_legacy, new_from_secret, new_initial, LegacyAccount, LegacyBundle};
pub use decode::{decode, decode_and_unbox, decode_with_config};
pub use encode::{box_and_encode, encode, encode_with_config};
pub use key_source::{KeySource, MemoryKeySource};
pub use mode::{allow_all_devices, restrict_to_mobile, ModeTransition};
pub use model::{AccountBundle, AccountEntry, AccountSecret, Bundle};
pub use version::{AccountBundleVersion, BundleVersion};
pub use wire::{BoxedEncoded, WireRecord};
