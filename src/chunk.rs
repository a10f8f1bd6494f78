//! Overlapping fixed-size character windows.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 || overlap >= size {
            return Err(Error::InvalidChunking { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into trimmed windows of at most `size` characters.
    ///
    /// Consecutive windows share `overlap` characters. Windows that are empty
    /// after trimming are dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        // Byte offset of every char boundary, including the end of the string.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut i = 0;
        while i < n {
            let j = (i + self.size).min(n);
            let window = text[bounds[i]..bounds[j]].trim();
            if !window.is_empty() {
                chunks.push(window.to_string());
            }
            if j >= n {
                break;
            }
            i = j.saturating_sub(self.overlap).max(i + 1);
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            Chunker::new(10, 10),
            Err(Error::InvalidChunking { size: 10, overlap: 10 })
        ));
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn keeps_configured_window() {
        let chunker = Chunker::new(1200, 150).unwrap();
        assert_eq!((chunker.size(), chunker.overlap()), (1200, 150));
    }

    #[test]
    fn short_input_yields_single_trimmed_window() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert_eq!(chunker.split("  hello world \n"), vec!["hello world"]);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        let chunker = Chunker::new(8, 2).unwrap();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split(" \n\t  \n        ").is_empty());
    }

    #[test]
    fn windows_overlap_and_respect_size() {
        let chunker = Chunker::new(20, 5).unwrap();
        let text = "Alice lives in Paris. Bob lives in Rome.";
        let chunks = chunker.split(text);

        assert_eq!(
            chunks,
            vec!["Alice lives in Paris", "Paris. Bob lives in", "s in Rome."]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn every_word_survives_chunking() {
        let chunker = Chunker::new(16, 8).unwrap();
        let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
        let chunks = chunker.split(text);
        let joined = chunks.join(" ");
        for word in text.split_whitespace() {
            assert!(joined.contains(word), "missing {word}");
        }
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn blank_windows_are_dropped() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.split("ab      cd");
        assert_eq!(chunks, vec!["ab", "cd"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunker = Chunker::new(3, 1).unwrap();
        let chunks = chunker.split("héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunks.first().map(String::as_str), Some("hél"));
    }

    #[test]
    fn splitting_is_deterministic() {
        let chunker = Chunker::new(7, 3).unwrap();
        let text = "one two three four five six seven eight nine ten";
        assert_eq!(chunker.split(text), chunker.split(text));
    }
}
