// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Splitting text into TTS-sized pieces
//!
//! The translate endpoint rejects long inputs, so text is cut at sentence
//! punctuation first and at whitespace when a sentence is still too long.
//! Lengths are counted in characters.

const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '¿', '¡', '…', '\n'];

/// Split `text` into trimmed, non-empty pieces of at most `max_chars` characters
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();

    for sentence in split_keep_punctuation(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() || is_only_punctuation(sentence) {
            continue;
        }
        if sentence.chars().count() <= max_chars {
            pieces.push(sentence.to_string());
        } else {
            pieces.extend(split_on_whitespace(sentence, max_chars));
        }
    }

    pieces
}

fn split_keep_punctuation(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if PUNCTUATION.contains(&ch) {
            let end = idx + ch.len_utf8();
            parts.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

fn is_only_punctuation(text: &str) -> bool {
    text.chars()
        .all(|c| PUNCTUATION.contains(&c) || c.is_whitespace())
}

fn split_on_whitespace(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
