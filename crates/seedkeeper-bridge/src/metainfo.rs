//! Decoding of `.torrent` payloads admitted by the in-process engine.

use bip_bencode::{BDecodeOpt, BRefAccess, BencodeRef};
use seedkeeper_torrent_core::{ClientError, ClientResult};
use sha1::{Digest, Sha1};

/// Result text for payloads that are not a usable torrent file.
pub(crate) const CORRUPT_TORRENT: &str = "invalid or corrupt torrent file";

/// Fields of a metainfo `info` dictionary the engine tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Metainfo {
    /// Hex SHA-1 of the bencoded `info` dictionary.
    pub(crate) info_hash: String,
    /// Top-level path component.
    pub(crate) name: String,
    /// Payload size summed over every file.
    pub(crate) total_size: u64,
}

impl Metainfo {
    pub(crate) fn decode(payload: &[u8]) -> ClientResult<Self> {
        let root = BencodeRef::decode(payload, BDecodeOpt::default()).map_err(|_| corrupt())?;
        let info = root
            .dict()
            .and_then(|dict| dict.lookup(b"info"))
            .ok_or_else(corrupt)?;
        let fields = info.dict().ok_or_else(corrupt)?;

        let name = fields
            .lookup(b"name")
            .and_then(BRefAccess::str)
            .filter(|name| !name.is_empty())
            .ok_or_else(corrupt)?
            .to_owned();
        let total_size = match fields.lookup(b"length") {
            Some(length) => size(length)?,
            None => match fields.lookup(b"files").and_then(BRefAccess::list) {
                Some(files) => (0..files.len())
                    .filter_map(|index| files.get(index))
                    .map(|file| {
                        file.dict()
                            .and_then(|entry| entry.lookup(b"length"))
                            .ok_or_else(corrupt)
                            .and_then(size)
                    })
                    .sum::<ClientResult<u64>>()?,
                None => return Err(corrupt()),
            },
        };

        let mut hasher = Sha1::new();
        hasher.update(info.buffer());
        Ok(Self {
            info_hash: hex::encode(hasher.finalize()),
            name,
            total_size,
        })
    }
}

fn size(value: &BencodeRef<'_>) -> ClientResult<u64> {
    value
        .int()
        .and_then(|length| u64::try_from(length).ok())
        .ok_or_else(corrupt)
}

fn corrupt() -> ClientError {
    ClientError::rejected(CORRUPT_TORRENT)
}
