//! LC-3 object image format.
//!
//! An image is a flat sequence of big-endian 16-bit words:
//! - Word 0 is the origin address
//! - The remaining words are copied to memory starting at the origin

use crate::cpu::memory::MEMORY_SIZE;
use crate::word::Word;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// A loaded program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Address of the first program word.
    pub origin: Word,
    /// The program words.
    pub words: Vec<Word>,
}

impl Image {
    pub fn new(origin: Word, words: Vec<Word>) -> Self {
        Self { origin, words }
    }

    /// Parse an image from raw big-endian bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() < 2 {
            return Err(ImageError::MissingOrigin);
        }
        if bytes.len() % 2 != 0 {
            return Err(ImageError::OddLength(bytes.len()));
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| Word::from_be_bytes([pair[0], pair[1]]));
        let origin = words.next().ok_or(ImageError::MissingOrigin)?;
        let words: Vec<Word> = words.collect();

        let available = MEMORY_SIZE - origin as usize;
        if words.len() > available {
            return Err(ImageError::TooLarge {
                origin,
                size: words.len(),
                available,
            });
        }

        Ok(Self { origin, words })
    }

    /// Serialize back to big-endian bytes, origin first.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(Word::to_be_bytes)
            .collect()
    }

    /// Get the number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address one past the last program word, wrapping.
    pub fn end(&self) -> Word {
        self.origin.wrapping_add(self.words.len() as Word)
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let image = Image::from_bytes(&bytes)?;
    debug!(
        path = %path.display(),
        origin = format_args!("x{:04X}", image.origin),
        words = image.len(),
        "loaded image"
    );
    Ok(image)
}

/// Errors that can occur while reading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image is missing its origin word")]
    MissingOrigin,

    #[error("image has an odd number of bytes ({0})")]
    OddLength(usize),

    #[error("image of {size} words at x{origin:04X} exceeds available space of {available} words")]
    TooLarge {
        origin: Word,
        size: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let image = Image::from_bytes(&[0x30, 0x00, 0xF0, 0x25, 0x12, 0x34]).unwrap();
        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0xF025, 0x1234]);
        assert_eq!(image.end(), 0x3002);
    }

    #[test]
    fn test_origin_only() {
        let image = Image::from_bytes(&[0x30, 0x00]).unwrap();
        assert!(image.is_empty());
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(Image::from_bytes(&[]), Err(ImageError::MissingOrigin)));
        assert!(matches!(Image::from_bytes(&[0x30]), Err(ImageError::MissingOrigin)));
        assert!(matches!(
            Image::from_bytes(&[0x30, 0x00, 0x01]),
            Err(ImageError::OddLength(3))
        ));
    }

    #[test]
    fn test_rejects_overflowing_image() {
        let bytes = [0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02];
        assert!(matches!(
            Image::from_bytes(&bytes),
            Err(ImageError::TooLarge {
                origin: 0xFFFF,
                size: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_to_bytes_matches_file_layout() {
        let image = Image::new(0x3000, vec![0xE002, 0xF022]);
        assert_eq!(image.to_bytes(), vec![0x30, 0x00, 0xE0, 0x02, 0xF0, 0x22]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image("/nonexistent/program.obj").unwrap_err();
        assert!(matches!(err, ImageError::Io(_)));
    }
}
