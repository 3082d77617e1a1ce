//! Keyring vault for keyport.
//!
//! Handles the durable side of key storage:
//!
//! - **Entries** versioned as a closed tagged union (`V2`, `V3`)
//! - **Keyring state** whose entries always share one schema version
//! - **Cipher** collaborator for opening and sealing entry blobs, with a
//!   default Argon2id + XChaCha20-Poly1305 implementation
//! - **Migration** of a whole keyring to the current schema, all or nothing
//! - **Session** lock/unlock/sign over a current-version keyring

pub mod cipher;
pub mod entry;
pub mod keyring;
pub mod migrator;
