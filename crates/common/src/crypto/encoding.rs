use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

/// Standard alphabet, emitted without padding, decoded with or without it.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded standard base64
pub fn base64_encode(data: impl AsRef<[u8]>) -> String {
    BASE64.encode(data)
}

/// Decode standard base64, tolerating trailing padding
pub fn base64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(data.trim())
}
