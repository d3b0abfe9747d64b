//! Test fixtures and environment helpers.

use bip_bencode::{BDecodeOpt, BRefAccess, BencodeRef, ben_bytes, ben_int, ben_map};

/// Environment variable naming a live Transmission daemon (`host:port`).
pub const TRANSMISSION_ADDR_ENV: &str = "SEEDKEEPER_TRANSMISSION_ADDR";

/// Placeholder piece hash table for generated metainfo.
static PIECES: [u8; 20] = [0; 20];

/// Minimal single-file bencoded metainfo carrying `name`.
#[must_use]
pub fn sample_metainfo(name: &str) -> Vec<u8> {
    (ben_map! {
        "announce" => ben_bytes!("http://tracker.invalid/announce"),
        "info" => ben_map! {
            "length" => ben_int!(1_048_576),
            "name" => ben_bytes!(name),
            "piece length" => ben_int!(262_144),
            "pieces" => ben_bytes!(&PIECES[..])
        }
    })
    .encode()
}

/// Extract `info.name` from a bencoded metainfo payload.
#[must_use]
pub fn metainfo_name(payload: &[u8]) -> Option<String> {
    let root = BencodeRef::decode(payload, BDecodeOpt::default()).ok()?;
    let info = root.dict()?.lookup(b"info")?;
    info.dict()?.lookup(b"name")?.str().map(str::to_owned)
}

/// Returns the `host:port` of a live Transmission daemon when one is configured.
#[must_use]
pub fn transmission_addr() -> Option<(String, u16)> {
    parse_addr(std::env::var(TRANSMISSION_ADDR_ENV).ok()?.as_str())
}

fn parse_addr(value: &str) -> Option<(String, u16)> {
    let (host, port) = value.trim().rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some((host.to_owned(), port.parse().ok()?))
}
