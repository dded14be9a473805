use crate::error::{ProdTotalError, Result};
use encoding_rs::{Encoding, WINDOWS_1252};

/// Billing exports are written in a single-byte Western European code page.
pub const DEFAULT_ENCODING: &str = "windows-1252";

/// Decodes raw report bytes into text.
///
/// Decoding is strict: a byte sequence that is malformed for the configured
/// encoding aborts the analysis instead of being replaced.
#[derive(Debug, Clone, Copy)]
pub struct ReportDecoder {
    encoding: &'static Encoding,
}

impl ReportDecoder {
    pub fn new() -> Self {
        Self {
            encoding: WINDOWS_1252,
        }
    }

    /// Resolve a WHATWG label such as `latin1`, `iso-8859-1` or `cp1252`.
    pub fn for_label(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ProdTotalError::UnknownEncoding {
                label: label.to_string(),
            }
        })?;

        Ok(Self { encoding })
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| ProdTotalError::Decode {
                encoding: self.encoding.name().to_string(),
            })
    }
}

impl Default for ReportDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_latin1_accents() {
        let decoder = ReportDecoder::new();
        // "Convênio" with ê as 0xEA
        let bytes = b"Conv\xeanio;Valor";
        assert_eq!(decoder.decode(bytes).unwrap(), "Convênio;Valor");
    }

    #[test]
    fn test_latin1_label_maps_to_windows_1252() {
        let decoder = ReportDecoder::for_label("latin1").unwrap();
        assert_eq!(decoder.encoding_name(), "windows-1252");
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let result = ReportDecoder::for_label("klingon");
        assert!(matches!(result, Err(ProdTotalError::UnknownEncoding { .. })));
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        let decoder = ReportDecoder::for_label("utf-8").unwrap();
        let result = decoder.decode(b"Nome;Valor\n\xff\xfe;1,00");
        assert!(matches!(result, Err(ProdTotalError::Decode { .. })));
    }
}
