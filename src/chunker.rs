//! Markdown-aware chunking that preserves heading hierarchy.
//!
//! Mirrors the two-level split used across the corpus: first split on ATX
//! headings, then, for oversize sections, fall back to sentence-based
//! greedy windows with tail overlap.

use std::path::Path;
use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;

use crate::text::{estimate_tokens, split_sentences};
use crate::types::Chunk;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})\s+(.+?)\s*$").unwrap());

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap_tokens: 50,
        }
    }
}

/// Deterministic chunk ID: MD5 of the UTF-8 form `"{file_path}:{chunk_index}"`.
pub fn make_chunk_id(file_path: &Path, chunk_index: usize) -> String {
    let key = format!("{}:{}", file_path.display(), chunk_index);
    let mut hasher = Md5::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct Section {
    level: u8,
    heading: Option<String>,
    body: String,
    char_offset: usize,
}

/// Split `content` into heading-delimited sections. Level 0 is pre-heading text.
fn parse_sections(content: &str) -> Vec<Section> {
    let mut matches: Vec<(usize, usize, u8, String)> = HEADING_RE
        .captures_iter(content)
        .map(|c| {
            let m = c.get(0).unwrap();
            let level = c.get(1).unwrap().as_str().len() as u8;
            let heading = c.get(2).unwrap().as_str().trim().to_string();
            (m.start(), m.end(), level, heading)
        })
        .collect();

    let mut sections = Vec::new();

    let first_heading_start = matches.first().map(|m| m.0).unwrap_or(content.len());
    let preamble = content[..first_heading_start].trim();
    if !preamble.is_empty() {
        sections.push(Section {
            level: 0,
            heading: None,
            body: preamble.to_string(),
            char_offset: 0,
        });
    }

    matches.push((content.len(), content.len(), 0, String::new()));
    for w in matches.windows(2) {
        let (_, body_start, level, heading) = &w[0];
        let (next_start, _, _, _) = &w[1];
        let body = content[*body_start..*next_start].trim().to_string();
        sections.push(Section {
            level: *level,
            heading: Some(heading.clone()),
            body,
            char_offset: *body_start,
        });
    }

    sections
}

/// Split markdown `content` into heading-aware chunks.
pub fn chunk_file(file_path: &Path, content: &str, config: ChunkerConfig) -> Vec<Chunk> {
    let sections = parse_sections(content);
    let mut stack: [Option<String>; 7] = Default::default();
    let mut out = Vec::new();
    let mut chunk_index = 0usize;

    for section in sections {
        if section.body.is_empty() && section.heading.is_none() {
            continue;
        }

        let level = section.level as usize;
        if level > 0 {
            stack[level] = section.heading.clone();
            for slot in stack.iter_mut().skip(level + 1) {
                *slot = None;
            }
        }

        let hierarchy: Vec<String> = if level == 0 {
            Vec::new()
        } else {
            (1..=level).filter_map(|l| stack[l].clone()).collect()
        };

        if section.body.is_empty() && section.heading.is_some() {
            // Heading with an empty body still gets emitted as its own chunk
            // so the heading term is searchable.
            let text = hierarchy.join(" > ");
            let chunk_id = make_chunk_id(file_path, chunk_index);
            out.push(Chunk {
                chunk_id,
                file_path: file_path.to_path_buf(),
                heading_hierarchy: hierarchy,
                level: section.level,
                text,
                chunk_index,
                char_offset: section.char_offset,
            });
            chunk_index += 1;
            continue;
        }

        let prefix = if hierarchy.is_empty() {
            String::new()
        } else {
            format!("{}\n\n", hierarchy.join(" > "))
        };
        let full_text = format!("{prefix}{}", section.body);

        if estimate_tokens(&full_text) <= config.max_tokens {
            let chunk_id = make_chunk_id(file_path, chunk_index);
            out.push(Chunk {
                chunk_id,
                file_path: file_path.to_path_buf(),
                heading_hierarchy: hierarchy,
                level: section.level,
                text: full_text,
                chunk_index,
                char_offset: section.char_offset,
            });
            chunk_index += 1;
            continue;
        }

        for window_text in split_with_overlap(&section.body, config.max_tokens, config.overlap_tokens) {
            let text = if prefix.is_empty() {
                window_text
            } else {
                format!("{prefix}{window_text}")
            };
            let chunk_id = make_chunk_id(file_path, chunk_index);
            out.push(Chunk {
                chunk_id,
                file_path: file_path.to_path_buf(),
                heading_hierarchy: hierarchy.clone(),
                level: section.level,
                text,
                chunk_index,
                char_offset: section.char_offset,
            });
            chunk_index += 1;
        }
    }

    out
}

/// Greedy sentence accumulation with tail-overlap seeding for oversize sections.
fn split_with_overlap(body: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let sentences = split_sentences(body);
    if sentences.is_empty() {
        return vec![body.to_string()];
    }

    let mut windows = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in sentences {
        let sentence_tokens = estimate_tokens(&sentence);

        if sentence_tokens > max_tokens {
            if !current.is_empty() {
                windows.push(current.join(" "));
                current = Vec::new();
                current_tokens = 0;
            }
            windows.push(sentence);
            continue;
        }

        if current_tokens + sentence_tokens > max_tokens && !current.is_empty() {
            windows.push(current.join(" "));

            // Seed the next window with tail sentences covering overlap_tokens.
            let mut tail = Vec::new();
            let mut tail_tokens = 0usize;
            for s in current.iter().rev() {
                if tail_tokens >= overlap_tokens {
                    break;
                }
                tail_tokens += estimate_tokens(s);
                tail.push(s.clone());
            }
            tail.reverse();
            current_tokens = tail.iter().map(|s| estimate_tokens(s)).sum();
            current = tail;
        }

        current.push(sentence);
        current_tokens += sentence_tokens;
    }

    if !current.is_empty() {
        windows.push(current.join(" "));
    }

    windows
}
