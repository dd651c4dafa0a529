//! Atomic JSON persistence for a node's raw Ed25519 seed.
//!
//! The envelope is intentionally minimal (a version tag plus the hex-encoded
//! seed) rather than the multi-format mnemonic/root-identity key files this
//! is adapted from — this library only ever persists one kind of key.

mod error;

pub use error::KeyFileError;

use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::Path,
};

const ENVELOPE_MAGIC: &str = "corenet-keyfile-v1";

#[derive(Serialize, Deserialize)]
struct KeyFileEnvelope {
    magic: String,
    seed_hex: String,
}

/// Reads a key file written by [`write_keyfile`], returning the raw 32-byte
/// seed.
pub fn read_keyfile<P: AsRef<Path>>(path: P) -> Result<[u8; 32], KeyFileError> {
    let file = File::open(path).map_err(KeyFileError::Io)?;
    let envelope: KeyFileEnvelope =
        serde_json::from_reader(file).map_err(|e| KeyFileError::Malformed(e.to_string()))?;
    if envelope.magic != ENVELOPE_MAGIC {
        return Err(KeyFileError::Malformed(format!(
            "unrecognized key file magic {:?}",
            envelope.magic
        )));
    }
    let bytes = hex::decode(&envelope.seed_hex)
        .map_err(|e| KeyFileError::Malformed(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| KeyFileError::Malformed("seed was not 32 bytes".into()))
}

/// Atomically writes `seed` to `path`: the envelope is written to a sibling
/// temp file first and then renamed into place, so a crash mid-write never
/// leaves a half-written or truncated key file at `path`.
///
/// Refuses to overwrite a file that exists and does not already look like
/// one of this crate's own envelopes, unless `force` is set, to avoid
/// clobbering an unrelated file that happens to occupy the path.
pub fn write_keyfile<P: AsRef<Path>>(
    path: P,
    seed: &[u8; 32],
    force: bool,
) -> Result<(), KeyFileError> {
    let path = path.as_ref();
    if path.exists() && !force && read_keyfile(path).is_err() {
        return Err(KeyFileError::RefusingOverwrite);
    }

    let envelope = KeyFileEnvelope {
        magic: ENVELOPE_MAGIC.to_string(),
        seed_hex: hex::encode(seed),
    };

    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(KeyFileError::Io)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = tmp.metadata().map_err(KeyFileError::Io)?.permissions();
            perms.set_mode(0o600);
            tmp.set_permissions(perms).map_err(KeyFileError::Io)?;
        }
        let json = serde_json::to_vec(&envelope).map_err(|e| KeyFileError::Malformed(e.to_string()))?;
        tmp.write_all(&json).map_err(KeyFileError::Io)?;
        tmp.sync_all().map_err(KeyFileError::Io)?;
    }
    fs::rename(&tmp_path, path).map_err(KeyFileError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyfile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        let seed = [42u8; 32];
        write_keyfile(&path, &seed, false).unwrap();
        let read_back = read_keyfile(&path).unwrap();
        assert_eq!(seed, read_back);
    }

    #[test]
    fn read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(read_keyfile(&path).is_err());
    }

    #[test]
    fn read_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(read_keyfile(&path).is_err());
    }

    #[test]
    fn refuses_overwrite_of_foreign_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.txt");
        std::fs::write(&path, b"unrelated content").unwrap();
        let err = write_keyfile(&path, &[1u8; 32], false).unwrap_err();
        assert!(matches!(err, KeyFileError::RefusingOverwrite));
    }

    #[test]
    fn force_overwrites_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.txt");
        std::fs::write(&path, b"unrelated content").unwrap();
        write_keyfile(&path, &[1u8; 32], true).unwrap();
        assert_eq!(read_keyfile(&path).unwrap(), [1u8; 32]);
    }

    #[test]
    fn rewriting_own_keyfile_does_not_need_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        write_keyfile(&path, &[1u8; 32], false).unwrap();
        write_keyfile(&path, &[2u8; 32], false).unwrap();
        assert_eq!(read_keyfile(&path).unwrap(), [2u8; 32]);
    }
}
