//! Per-namespace compression codecs (§4.1).

use std::io::{Read, Write};

use lex_core::{Compression, LexError, LexResult};

pub fn compress(compression: Compression, bytes: &[u8]) -> LexResult<Vec<u8>> {
    match compression {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(bytes)
                .map_err(|e| storage_error("gzip compress", &e))?;
            encoder.finish().map_err(|e| storage_error("gzip finish", &e))
        }
        Compression::Lz4 => {
            let mut encoder = lz4::EncoderBuilder::new()
                .build(Vec::new())
                .map_err(|e| storage_error("lz4 encoder init", &e))?;
            encoder
                .write_all(bytes)
                .map_err(|e| storage_error("lz4 compress", &e))?;
            let (out, result) = encoder.finish();
            result.map_err(|e| storage_error("lz4 finish", &e))?;
            Ok(out)
        }
        Compression::Zstd => {
            zstd::encode_all(bytes, 0).map_err(|e| storage_error("zstd compress", &e))
        }
    }
}

pub fn decompress(compression: Compression, bytes: &[u8]) -> LexResult<Vec<u8>> {
    match compression {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| storage_error("gzip decompress", &e))?;
            Ok(out)
        }
        Compression::Lz4 => {
            let mut decoder = lz4::Decoder::new(bytes).map_err(|e| storage_error("lz4 decoder init", &e))?;
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| storage_error("lz4 decompress", &e))?;
            Ok(out)
        }
        Compression::Zstd => {
            zstd::decode_all(bytes).map_err(|e| storage_error("zstd decompress", &e))
        }
    }
}

fn storage_error(step: &str, err: &dyn std::fmt::Display) -> LexError {
    LexError::Storage {
        reason: format!("{step}: {err}"),
    }
}

/// Disk-tier wire tag for a [`Compression`] variant. Kept local to this
/// crate since `Compression` is defined in `lex-core` and has no reason to
/// know about the disk tier's on-disk layout.
pub(crate) fn compression_tag(compression: Compression) -> u8 {
    match compression {
        Compression::None => 0,
        Compression::Lz4 => 1,
        Compression::Zstd => 2,
        Compression::Gzip => 3,
    }
}

pub(crate) fn compression_from_tag(tag: u8) -> LexResult<Compression> {
    match tag {
        0 => Ok(Compression::None),
        1 => Ok(Compression::Lz4),
        2 => Ok(Compression::Zstd),
        3 => Ok(Compression::Gzip),
        other => Err(LexError::Storage {
            reason: format!("unknown compression tag {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_codec_roundtrips() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(8);
        for codec in [
            Compression::None,
            Compression::Gzip,
            Compression::Lz4,
            Compression::Zstd,
        ] {
            let compressed = compress(codec, &payload).unwrap();
            let restored = decompress(codec, &compressed).unwrap();
            assert_eq!(restored, payload, "roundtrip failed for {codec:?}");
        }
    }
}
