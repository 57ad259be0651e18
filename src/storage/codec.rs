use crate::core::Result;

/// Field-level encoding applied at the record boundary.
///
/// The store encodes every `EncryptedText` field before handing a record to the
/// backend and decodes it on the way back. Implementations must be
/// deterministic in `decode(encode(x)) == x`; the ciphertext itself may vary.
pub trait FieldCodec: Send + Sync {
    fn encode(&self, field: &str, plaintext: &str) -> Result<String>;

    fn decode(&self, field: &str, ciphertext: &str) -> Result<String>;
}

/// Identity codec: stores encrypted fields as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextCodec;

impl FieldCodec for PlainTextCodec {
    fn encode(&self, _field: &str, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decode(&self, _field: &str, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}
