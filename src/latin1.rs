// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ISO-8859-1 helpers for the Kikourou site, which serves and accepts Latin-1.

/// Substituted for characters that have no Latin-1 encoding.
pub const REPLACEMENT: u8 = b'?';

/// Text already encoded as ISO-8859-1 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Latin1Text(Vec<u8>);

impl Latin1Text {
    /// Encode a string, replacing characters above U+00FF with `?`.
    pub fn encode(text: &str) -> Self {
        Self(
            text.chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                .collect(),
        )
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Percent-encode the bytes for a form or query string.
    pub fn url_encoded(&self) -> String {
        urlencoding::encode_binary(&self.0).into_owned()
    }

    /// Decode back to a string (lossless, every byte is a code point).
    pub fn to_string_lossless(&self) -> String {
        decode(&self.0)
    }
}

/// Decode ISO-8859-1 bytes.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accented_french_is_kept() {
        let text = Latin1Text::encode("Sortie à Fontainebleau, côte été");
        assert_eq!(text.to_string_lossless(), "Sortie à Fontainebleau, côte été");
        // 'à' is a single byte in Latin-1
        assert_eq!(text.as_bytes()[7], 0xE0);
    }

    #[test]
    fn test_unencodable_characters_replaced() {
        let text = Latin1Text::encode("Run 🏃 – œuf");
        assert_eq!(text.to_string_lossless(), "Run ? ? ?uf");
    }

    #[test]
    fn test_url_encoding_uses_latin1_bytes() {
        let text = Latin1Text::encode("é t");
        assert_eq!(text.url_encoded(), "%E9%20t");
    }

    #[test]
    fn test_decode_high_bytes() {
        assert_eq!(decode(b"enregistr\xe9"), "enregistré");
    }
}
