use std::fmt;
use std::str::FromStr;

use super::types::{Chunker, TextChunk};

/// How the reference corpus is cut into embedded units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkingStrategy {
    /// One unit per non-empty line.
    #[default]
    Line,
    /// One unit per blank-line separated block, split when oversized.
    Paragraph,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Paragraph => "paragraph",
        }
    }

    pub fn chunker(&self) -> Box<dyn Chunker> {
        match self {
            Self::Line => Box::new(LineChunker),
            Self::Paragraph => Box::new(ParagraphChunker::new()),
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(Self::Line),
            "paragraph" => Ok(Self::Paragraph),
            other => Err(format!("unknown chunking strategy: {other}")),
        }
    }
}

/// Each non-empty trimmed line is its own chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineChunker;

impl Chunker for LineChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        text.lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let line = line.trim();
                (!line.is_empty()).then(|| (i + 1, line))
            })
            .enumerate()
            .map(|(chunk_index, (line_number, line))| TextChunk {
                content: line.to_string(),
                chunk_index,
                line_number,
            })
            .collect()
    }
}

/// Groups consecutive non-empty lines into one chunk.
///
/// Multi-line guidance statements stay together. Blocks longer than
/// `max_chunk_chars` are split at sentence boundaries.
pub struct ParagraphChunker {
    max_chunk_chars: usize,
}

impl ParagraphChunker {
    pub fn new() -> Self {
        Self {
            max_chunk_chars: 1000,
        }
    }

    pub fn with_max_chars(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0;

        for block in split_blocks(text) {
            for piece in split_long_block(&block.content, self.max_chunk_chars) {
                chunks.push(TextChunk {
                    content: piece,
                    chunk_index,
                    line_number: block.line_number,
                });
                chunk_index += 1;
            }
        }

        chunks
    }
}

struct Block {
    content: String,
    line_number: usize,
}

fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start_line = 0;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(Block {
                    content: current.join(" "),
                    line_number: start_line,
                });
                current.clear();
            }
            continue;
        }
        if current.is_empty() {
            start_line = i + 1;
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(Block {
            content: current.join(" "),
            line_number: start_line,
        });
    }

    blocks
}

fn split_long_block(block: &str, max_chars: usize) -> Vec<String> {
    if block.len() <= max_chars {
        return vec![block.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0;

    while start < block.len() {
        let mut end = floor_char_boundary(block, (start + max_chars).min(block.len()));
        if end <= start {
            end = ceil_char_boundary(block, start + 1);
        }

        // Prefer a sentence boundary in the last 20% of the window
        let break_at = if end < block.len() {
            let search_start = floor_char_boundary(block, start + (max_chars * 4 / 5)).max(start);
            block[search_start..end]
                .rfind(". ")
                .map(|pos| search_start + pos + 2)
                .unwrap_or(end)
        } else {
            end
        };

        let piece = block[start..break_at].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = break_at;
    }

    pieces
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}
