//! ANS-104 data items: the signed binary envelope accepted by a message unit.
//!
//! Layout: signature type (u16 LE), signature, owner, target and anchor (each
//! a presence byte plus 32 bytes), tag count and tag byte length (u64 LE),
//! Avro-encoded tags, then the payload. The signature covers the SHA-384
//! deep hash of every field except the signature itself.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256, Sha384};

use super::transport::Tag;
use super::wallet::{Wallet, OWNER_LEN};
use crate::error::{BotError, Result};

/// Arweave (RSA-PSS 4096) signature type.
const SIGNATURE_TYPE_ARWEAVE: u16 = 1;

/// A signed data item ready for upload.
#[derive(Debug, Clone)]
pub struct DataItem {
    /// url-safe SHA-256 of the signature.
    pub id: String,
    pub bytes: Vec<u8>,
}

/// Sign `data` with `tags` for delivery to `target`.
pub fn sign_data_item(
    wallet: &Wallet,
    target: &[u8; 32],
    anchor: &[u8; 32],
    tags: &[Tag],
    data: &[u8],
) -> Result<DataItem> {
    let tag_bytes = encode_tags(tags);
    let signature_type = SIGNATURE_TYPE_ARWEAVE.to_string();

    let message = deep_hash_list(&[
        b"dataitem".as_slice(),
        b"1".as_slice(),
        signature_type.as_bytes(),
        wallet.owner(),
        target.as_slice(),
        anchor.as_slice(),
        tag_bytes.as_slice(),
        data,
    ]);
    let signature = wallet.sign(&message)?;
    if signature.len() != OWNER_LEN {
        return Err(BotError::Signing(format!(
            "signature is {} bytes, expected {OWNER_LEN}",
            signature.len()
        )));
    }

    let mut bytes =
        Vec::with_capacity(2 + 2 * OWNER_LEN + 2 * 33 + 16 + tag_bytes.len() + data.len());
    bytes.extend_from_slice(&SIGNATURE_TYPE_ARWEAVE.to_le_bytes());
    bytes.extend_from_slice(&signature);
    bytes.extend_from_slice(wallet.owner());
    bytes.push(1);
    bytes.extend_from_slice(target);
    bytes.push(1);
    bytes.extend_from_slice(anchor);
    bytes.extend_from_slice(&(tags.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&tag_bytes);
    bytes.extend_from_slice(data);

    Ok(DataItem {
        id: URL_SAFE_NO_PAD.encode(Sha256::digest(&signature)),
        bytes,
    })
}

/// Avro array of `{name: bytes, value: bytes}` records. No tags encodes to
/// nothing at all.
fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    if tags.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        write_bytes(&mut out, tag.name.as_bytes());
        write_bytes(&mut out, tag.value.as_bytes());
    }
    write_long(&mut out, 0);
    out
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

/// Zigzag varint.
fn write_long(out: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z >= 0x80 {
        out.push((z as u8 & 0x7f) | 0x80);
        z >>= 7;
    }
    out.push(z as u8);
}

fn sha384(parts: &[&[u8]]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 48];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn deep_hash_blob(data: &[u8]) -> [u8; 48] {
    let tag = sha384(&[b"blob".as_slice(), data.len().to_string().as_bytes()]);
    sha384(&[tag.as_slice(), sha384(&[data]).as_slice()])
}

fn deep_hash_list(chunks: &[&[u8]]) -> [u8; 48] {
    let mut acc = sha384(&[b"list".as_slice(), chunks.len().to_string().as_bytes()]);
    for chunk in chunks {
        acc = sha384(&[acc.as_slice(), deep_hash_blob(chunk).as_slice()]);
    }
    acc
}
