//! Persistence for keyport.
//!
//! The engine only needs `get`/`set` from its durable store. This crate
//! defines that seam ([`kv::KeyValueStore`]), ships an in-memory and a
//! sled-backed implementation, and layers two typed views on top:
//!
//! - [`keyring_store::KeyringStore`] loads and saves one profile's
//!   [`KeyringState`](keyport_vault::entry::KeyringState) as JSON.
//! - [`profile::CurrentProfileResolver`] reads the current-profile pointer.

pub mod keyring_store;
pub mod kv;
pub mod profile;
pub mod sled_store;
