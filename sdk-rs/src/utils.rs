use std::path::Path;

use solana_sdk::{bs58, signature::Keypair};

use crate::types::{SdkError, SdkResult};

fn keypair_from_bytes(bytes: &[u8]) -> SdkResult<Keypair> {
    Keypair::from_bytes(bytes).map_err(|err| SdkError::InvalidKeypair(err.to_string()))
}

/// Decode a keypair from a JSON byte array, a bare comma separated byte list,
/// a base58 string or a base64 string
pub fn read_keypair_str_multi_format(data: &str) -> SdkResult<Keypair> {
    // strip out any white spaces and new line/carriage return characters
    let data = data.replace([' ', '\n', '\r'], "");

    if data.starts_with('[') && data.ends_with(']') {
        let bytes: Vec<u8> = serde_json::from_str(&data)
            .map_err(|err| SdkError::InvalidKeypair(err.to_string()))?;
        return keypair_from_bytes(&bytes);
    }

    if data.contains(',') {
        let bytes: Vec<u8> = serde_json::from_str(&format!("[{data}]"))
            .map_err(|err| SdkError::InvalidKeypair(err.to_string()))?;
        return keypair_from_bytes(&bytes);
    }

    if let Ok(bytes) = bs58::decode(&data).into_vec() {
        return keypair_from_bytes(&bytes);
    }

    if let Ok(bytes) = base64::decode(&data) {
        return keypair_from_bytes(&bytes);
    }

    Err(SdkError::InvalidKeypair("unrecognised encoding".into()))
}

/// Load a keypair from `path_or_key`, either a file holding the key or the key itself
pub fn load_keypair_multi_format(path_or_key: &str) -> SdkResult<Keypair> {
    let path = Path::new(path_or_key);
    if path.is_file() {
        let data = std::fs::read_to_string(path)
            .map_err(|err| SdkError::InvalidKeypair(format!("{path_or_key}: {err}")))?;
        read_keypair_str_multi_format(&data)
    } else {
        read_keypair_str_multi_format(path_or_key)
    }
}

/// Shorten an address for display, e.g. `EPjF..Dt1v`
pub fn abbreviate(address: &str) -> String {
    if address.len() <= 8 {
        return address.to_string();
    }
    format!("{}..{}", &address[..4], &address[address.len() - 4..])
}
