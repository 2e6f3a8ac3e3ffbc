use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};

/// Bytes inspected per file.
pub const SAMPLE_LEN: usize = 1024;

/// Guesses the text encoding of a log file from its first bytes.
///
/// Compressed files are sampled after decompression. Any failure along the
/// way yields UTF-8; the caller is never blocked by an ambiguous file.
pub fn detect(path: &Path, compressed: bool) -> &'static Encoding {
    match read_sample(path, compressed) {
        Ok(sample) => {
            let encoding = detect_bytes(&sample);
            debug!(action = "detect", component = "encoding", path = ?path, encoding = encoding.name(), sample_len = sample.len(), "Detected encoding");
            encoding
        }
        Err(e) => {
            warn!(action = "detect", component = "encoding", path = ?path, error = %e, "Could not sample file, assuming UTF-8");
            UTF_8
        }
    }
}

/// Runs the detection strategies over an in-memory sample, in order.
pub fn detect_bytes(sample: &[u8]) -> &'static Encoding {
    utf8_strategy(sample)
        .or_else(|| statistical_strategy(sample))
        .unwrap_or(UTF_8)
}

fn utf8_strategy(sample: &[u8]) -> Option<&'static Encoding> {
    match std::str::from_utf8(sample) {
        Ok(_) => Some(UTF_8),
        // A multi-byte sequence cut off by the sample boundary.
        Err(e) if e.error_len().is_none() => Some(UTF_8),
        Err(_) => None,
    }
}

fn statistical_strategy(sample: &[u8]) -> Option<&'static Encoding> {
    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let guess = detector.guess(None, true);
    // Lines are split on b'\n' before decoding, which only holds for
    // ASCII-compatible encodings.
    guess.is_ascii_compatible().then_some(guess)
}

fn read_sample(path: &Path, compressed: bool) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut sample = Vec::with_capacity(SAMPLE_LEN);
    if compressed {
        MultiGzDecoder::new(file)
            .take(SAMPLE_LEN as u64)
            .read_to_end(&mut sample)?;
    } else {
        file.take(SAMPLE_LEN as u64).read_to_end(&mut sample)?;
    }
    Ok(sample)
}
