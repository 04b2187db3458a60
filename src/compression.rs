//! Decompression of file contents
//!
//! Files are fetched as whole byte buffers, decompressed here, then handed to
//! the format parsers. The configured `compression` setting either names a
//! codec outright or asks for detection from the file extension.

use crate::config::Compression;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::Read;

/// Codec resolved for a concrete file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    None,
    Zip,
    Bz2,
    Gzip,
    Lzma,
    Xz,
}

/// Resolve the codec for one file from the configured setting.
pub fn resolve(setting: Compression, file_name: &str) -> Codec {
    match setting {
        Compression::None => Codec::None,
        Compression::Zip => Codec::Zip,
        Compression::Bz2 => Codec::Bz2,
        Compression::Gzip => Codec::Gzip,
        Compression::Lzma => Codec::Lzma,
        Compression::Xz => Codec::Xz,
        Compression::Detect => detect(file_name),
    }
}

/// Pick a codec from the file extension; unknown extensions mean no
/// decompression.
fn detect(file_name: &str) -> Codec {
    if file_name.ends_with(".zip") {
        Codec::Zip
    } else if file_name.ends_with(".bz2") {
        Codec::Bz2
    } else if file_name.ends_with(".gz") || file_name.ends_with(".gzip") {
        Codec::Gzip
    } else if file_name.ends_with(".lzma") {
        Codec::Lzma
    } else if file_name.ends_with(".xz") {
        Codec::Xz
    } else {
        Codec::None
    }
}

/// Decompress a whole file buffer with the given codec.
pub fn decompress(codec: Codec, file_name: &str, data: Bytes) -> Result<Bytes> {
    match codec {
        Codec::None => Ok(data),

        Codec::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(data.as_ref());
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            Ok(Bytes::from(out))
        }

        Codec::Bz2 => {
            let mut decoder = bzip2::read::BzDecoder::new(data.as_ref());
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            Ok(Bytes::from(out))
        }

        Codec::Lzma => {
            let mut input = data.as_ref();
            let mut out = Vec::new();
            lzma_rs::lzma_decompress(&mut input, &mut out)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            Ok(Bytes::from(out))
        }

        Codec::Xz => {
            let mut input = data.as_ref();
            let mut out = Vec::new();
            lzma_rs::xz_decompress(&mut input, &mut out)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            Ok(Bytes::from(out))
        }

        Codec::Zip => {
            let cursor = std::io::Cursor::new(data.as_ref());
            let mut archive = zip::ZipArchive::new(cursor)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            if archive.is_empty() {
                return Err(Error::decompression(file_name, "zip archive has no entries"));
            }
            // Archives written by compression tools hold a single member; read
            // the first entry in archive order.
            let mut entry = archive
                .by_index(0)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            let mut out = Vec::new();
            entry
                .read_to_end(&mut out)
                .map_err(|e| Error::decompression(file_name, e.to_string()))?;
            Ok(Bytes::from(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect("data.csv.zip"), Codec::Zip);
        assert_eq!(detect("data.csv.bz2"), Codec::Bz2);
        assert_eq!(detect("data.csv.gz"), Codec::Gzip);
        assert_eq!(detect("data.csv.gzip"), Codec::Gzip);
        assert_eq!(detect("data.csv.lzma"), Codec::Lzma);
        assert_eq!(detect("data.csv.xz"), Codec::Xz);
        assert_eq!(detect("data.csv"), Codec::None);
        assert_eq!(detect("data.gz.csv"), Codec::None);
    }

    #[test]
    fn test_resolve_explicit_setting_wins() {
        assert_eq!(resolve(Compression::Gzip, "data.csv"), Codec::Gzip);
        assert_eq!(resolve(Compression::None, "data.csv.gz"), Codec::None);
        assert_eq!(resolve(Compression::Detect, "data.csv.gz"), Codec::Gzip);
    }

    #[test]
    fn test_gzip_round_trip() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"a,b\n1,2\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress(Codec::Gzip, "data.csv.gz", Bytes::from(compressed)).unwrap();
        assert_eq!(out.as_ref(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_bz2_round_trip() {
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(b"a,b\n1,2\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress(Codec::Bz2, "data.csv.bz2", Bytes::from(compressed)).unwrap();
        assert_eq!(out.as_ref(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_lzma_round_trip() {
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut &b"a,b\n1,2\n"[..], &mut compressed).unwrap();

        let out = decompress(Codec::Lzma, "data.csv.lzma", Bytes::from(compressed)).unwrap();
        assert_eq!(out.as_ref(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_xz_round_trip() {
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut &b"a,b\n1,2\n"[..], &mut compressed).unwrap();

        let out = decompress(Codec::Xz, "data.csv.xz", Bytes::from(compressed)).unwrap();
        assert_eq!(out.as_ref(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_zip_reads_first_entry() {
        let cursor = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(cursor);
        writer
            .start_file("data.csv", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"a,b\n1,2\n").unwrap();
        let cursor = writer.finish().unwrap();

        let out = decompress(Codec::Zip, "data.csv.zip", Bytes::from(cursor.into_inner())).unwrap();
        assert_eq!(out.as_ref(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_corrupt_gzip_errors() {
        let err = decompress(Codec::Gzip, "data.csv.gz", Bytes::from_static(b"not gzip"))
            .unwrap_err();
        assert!(err.to_string().contains("data.csv.gz"));
    }
}
