//! Compression-aware file readers and writers.
//!
//! The extension of a path decides its codec: `.gz` and `.bz2` are
//! decompressed/compressed transparently, `.json` (or any other plain
//! extension named below) passes through. Unknown extensions are rejected
//! rather than guessed.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::UtilsError;

/// Stream codec, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Bzip2,
}

impl Compression {
    /// The codec implied by a path's final extension, if any.
    pub fn from_path(path: &Path) -> Result<Self, UtilsError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Ok(Self::Gzip),
            Some("bz2") => Ok(Self::Bzip2),
            Some("json") | Some("jsonl") => Ok(Self::Plain),
            other => Err(UtilsError::UnsupportedExtension(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// The extension written for this codec.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Plain => "json",
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
        }
    }
}

impl FromStr for Compression {
    type Err = UtilsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gz" | "gzip" => Ok(Self::Gzip),
            "bz2" | "bzip2" => Ok(Self::Bzip2),
            "none" | "json" => Ok(Self::Plain),
            other => Err(UtilsError::UnsupportedCompression(other.to_string())),
        }
    }
}

/// Open `path` for reading, decompressing according to its extension.
pub fn reader(path: &Path) -> Result<Box<dyn BufRead + Send>, UtilsError> {
    if path.is_dir() {
        return Err(UtilsError::NotAFile(path.display().to_string()));
    }
    let compression = Compression::from_path(path)?;
    let file = File::open(path)?;

    Ok(match compression {
        Compression::Plain => Box::new(BufReader::new(file)),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Compression::Bzip2 => Box::new(BufReader::new(MultiBzDecoder::new(file))),
    })
}

/// Create `path` for writing, compressing according to its extension.
pub fn writer(path: &Path) -> Result<Box<dyn Write + Send>, UtilsError> {
    let compression = Compression::from_path(path)?;
    let file = File::create(path)?;

    Ok(match compression {
        Compression::Plain => Box::new(BufWriter::new(file)),
        Compression::Gzip => Box::new(BufWriter::new(GzEncoder::new(
            file,
            flate2::Compression::default(),
        ))),
        Compression::Bzip2 => Box::new(BufWriter::new(BzEncoder::new(
            file,
            bzip2::Compression::best(),
        ))),
    })
}

/// Map an input path into `output_dir`, swapping the codec extension.
///
/// `pages.json.bz2` with gzip compression becomes
/// `<output_dir>/pages.json.gz`.
pub fn output_path(input: &Path, output_dir: &Path, compression: Compression) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output_dir.join(format!("{}.{}", stem, compression.extension()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_compression_from_str() {
        assert_eq!("gz".parse::<Compression>().unwrap(), Compression::Gzip);
        assert_eq!("bz2".parse::<Compression>().unwrap(), Compression::Bzip2);
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::Plain);
        assert!("snappy".parse::<Compression>().is_err());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = Compression::from_path(Path::new("dump.xml")).unwrap_err();
        assert!(matches!(err, UtilsError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_plain_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");

        let mut w = writer(&path).unwrap();
        writeln!(w, "{{\"id\": 1}}").unwrap();
        drop(w);

        let mut content = String::new();
        reader(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "{\"id\": 1}\n");
    }

    #[test]
    fn test_gzip_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.gz");

        let mut w = writer(&path).unwrap();
        writeln!(w, "compressed line").unwrap();
        drop(w);

        let mut content = String::new();
        reader(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "compressed line\n");
    }

    #[test]
    fn test_bzip2_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.bz2");

        let mut w = writer(&path).unwrap();
        writeln!(w, "compressed line").unwrap();
        drop(w);

        let mut content = String::new();
        reader(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "compressed line\n");
    }

    #[test]
    fn test_output_path_swaps_codec() {
        let out = output_path(
            Path::new("dumps/pages.json.bz2"),
            Path::new("out"),
            Compression::Gzip,
        );
        assert_eq!(out, PathBuf::from("out/pages.json.gz"));
    }

    #[test]
    fn test_reader_rejects_directory() {
        let temp = TempDir::new().unwrap();
        match reader(temp.path()) {
            Err(err) => assert!(matches!(err, UtilsError::NotAFile(_))),
            Ok(_) => panic!("expected NotAFile error"),
        }
    }
}
