//! File reader with transparent gzip decompression
//!
//! Feed documents and snapshots may be stored compressed. Paths ending in
//! `.gz` (any case) are decompressed on the fly; `-` reads stdin.
//!
//! ```rust,no_run
//! use cloudiplookup::file_reader;
//! use std::io::Read;
//!
//! let mut text = String::new();
//! file_reader::open("ip-ranges.json.gz")?.read_to_string(&mut text)?;
//! # Ok::<(), std::io::Error>(())
//! ```

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, stdin, BufRead, BufReader, Read};
use std::path::Path;

/// Buffer size for file reading (128KB)
const BUFFER_SIZE: usize = 128 * 1024;

/// True when the path ends in `.gz`, ignoring case
pub fn has_gz_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Open a file, decompressing `.gz` files; `-` means stdin
pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();

    if path.to_str() == Some("-") {
        return Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, stdin())));
    }

    let file = File::open(path)?;
    Ok(from_file(file, has_gz_extension(path)))
}

/// Wrap an already-open file, with an explicit gzip flag
pub fn from_file(file: File, is_gzip: bool) -> Box<dyn BufRead + Send> {
    if is_gzip {
        Box::new(BufReader::with_capacity(BUFFER_SIZE, GzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(BUFFER_SIZE, file))
    }
}

/// Read a whole file as UTF-8 text, decompressing `.gz` files
pub fn read_to_string<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut text = String::new();
    open(path)?.read_to_string(&mut text)?;
    Ok(text)
}
