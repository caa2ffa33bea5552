//! Audio payload encoding.
//!
//! Entries carry recorded audio as a self-describing data-URI string
//! (`data:<media type>;base64,<payload>`) so a decoder can recover the
//! original bytes without external metadata.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, thiserror::Error)]
pub enum AudioDataError {
    #[error("audio payload is not a data URI")]
    NotDataUri,

    #[error("audio payload is not base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Encode raw audio bytes as a data-URI string.
pub fn encode_audio_data(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// Decode a data-URI string back to (media type, bytes).
pub fn decode_audio_data(data: &str) -> Result<(String, Vec<u8>), AudioDataError> {
    let rest = data.strip_prefix("data:").ok_or(AudioDataError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(AudioDataError::NotDataUri)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(AudioDataError::NotDataUri)?;
    let bytes = STANDARD.decode(payload)?;
    Ok((media_type.to_string(), bytes))
}
