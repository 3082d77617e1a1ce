//! Keyring file commands.
//!
//! A keyring file holds one serialized `KeyringState`. Migration reads
//! the vault passphrase from `KEYPORT_PASSPHRASE` so it never appears in
//! shell history or the process list.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use keyport_crypto::algorithm::AlgorithmRegistry;
use keyport_vault::cipher::{PassphraseCipher, VaultSecret};
use keyport_vault::entry::KeyringState;
use keyport_vault::migrator::VaultMigrator;
use zeroize::Zeroizing;

use crate::commands::read_json;
use crate::output;
use crate::GlobalOpts;

/// Environment variable holding the vault passphrase.
pub const PASSPHRASE_ENV: &str = "KEYPORT_PASSPHRASE";

#[derive(Subcommand)]
pub enum VaultAction {
    /// Show a keyring file's version and entries.
    Inspect {
        /// Keyring JSON file.
        file: PathBuf,
    },
    /// Upgrade a keyring file to the current vault version.
    Migrate {
        /// Keyring JSON file.
        file: PathBuf,
        /// Replace the file with the migrated keyring.
        #[arg(long)]
        write: bool,
    },
}

pub fn run(action: VaultAction, opts: &GlobalOpts) -> Result<(), String> {
    match action {
        VaultAction::Inspect { file } => inspect(&file, opts),
        VaultAction::Migrate { file, write } => migrate(&file, write, opts),
    }
}

fn inspect(file: &Path, opts: &GlobalOpts) -> Result<(), String> {
    let state: KeyringState = read_json(file, "keyring")?;
    print_keyring(&state, opts.json);
    Ok(())
}

fn migrate(file: &Path, write: bool, opts: &GlobalOpts) -> Result<(), String> {
    let state: KeyringState = read_json(file, "keyring")?;

    if !VaultMigrator::needs_migration(&state) {
        output::print_success(
            &format!("keyring is already {}, nothing to migrate", state.version()),
            opts.json,
        );
        return Ok(());
    }

    let passphrase = Zeroizing::new(
        std::env::var(PASSPHRASE_ENV).map_err(|_| format!("{PASSPHRASE_ENV} is not set"))?,
    );
    let secret = VaultSecret::from_passphrase(&passphrase);

    let migrator = VaultMigrator::new(
        Arc::new(PassphraseCipher::default()),
        Arc::new(AlgorithmRegistry::standard()),
    );
    let migrated = migrator
        .migrate(&state, &secret)
        .map_err(|e| e.to_string())?;

    if write {
        save_keyring(file, &migrated)?;
    }

    print_keyring(&migrated, opts.json);
    if !opts.json {
        let msg = if write {
            format!("migrated {} -> {} and saved", state.version(), migrated.version())
        } else {
            format!(
                "migrated {} -> {} (dry run, pass --write to save)",
                state.version(),
                migrated.version()
            )
        };
        output::print_success(&msg, false);
    }
    Ok(())
}

/// Writes `state` next to `path` and renames it into place.
fn save_keyring(path: &Path, state: &KeyringState) -> Result<(), String> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| format!("JSON serialization failed: {e}"))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| format!("failed to write keyring file: {e}"))?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        format!("failed to rename keyring file: {e}")
    })?;

    tracing::info!(path = %path.display(), version = %state.version(), "keyring saved");
    Ok(())
}

fn print_keyring(state: &KeyringState, json_mode: bool) {
    let entries: Vec<serde_json::Value> = state
        .entries()
        .iter()
        .map(|entry| {
            serde_json::json!({
                "id": entry.id(),
                "vaultVersion": entry.version().number(),
                "signAlgo": entry.sign_algo().map(|a| a.to_string()),
                "address": entry.address().map(|a| a.to_string()),
            })
        })
        .collect();

    if json_mode {
        let obj = serde_json::json!({
            "vaultVersion": state.version().number(),
            "booted": state.booted().to_string(),
            "current": state.is_current(),
            "entries": entries,
        });
        output::print_json_value(&obj, true);
        return;
    }

    output::print_kv("Version", &state.version().to_string());
    output::print_kv("Booted", &state.booted().to_string());
    output::print_kv("Entries", &state.entries().len().to_string());
    let rows: Vec<Vec<String>> = state
        .entries()
        .iter()
        .map(|entry| {
            vec![
                entry.id().to_string(),
                entry.version().to_string(),
                entry
                    .sign_algo()
                    .map_or_else(|| "-".to_string(), |a| a.to_string()),
                entry
                    .address()
                    .map_or_else(|| "(encrypted)".to_string(), |a| a.to_string()),
            ]
        })
        .collect();
    output::print_table(&["id", "version", "algo", "address"], &rows, false);
}
