use anyhow::Result;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
    pub char_count: usize,
}

pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split text on semantic boundaries (paragraphs, lines, sentences) with overlap.
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Chunking text: {} chars", text.chars().count());

        let splitter = TextSplitter::new(
            ChunkConfig::new(self.chunk_size).with_overlap(self.chunk_overlap)?,
        );

        let chunks: Vec<Chunk> = splitter
            .chunks(text)
            .enumerate()
            .map(|(i, content)| Chunk {
                index: i,
                content: content.to_string(),
                char_count: content.chars().count(),
            })
            .collect();

        debug!("Created {} chunks", chunks.len());

        Ok(chunks)
    }
}
