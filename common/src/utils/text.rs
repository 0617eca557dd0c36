use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Characters per chunk window produced by `chunk_text`.
pub const CHUNK_SIZE: usize = 500;
/// Overlap carried between consecutive windows.
pub const CHUNK_OVERLAP: usize = 50;

/// Removes diacritical marks and lowercases the input. Vietnamese `đ`/`Đ`
/// carry no combining mark under NFD, so they are folded explicitly.
pub fn strip_diacritics(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits text into overlapping character windows for embedding. The last
/// window ends the sequence even when shorter than `CHUNK_SIZE`.
pub fn chunk_text(text: &str) -> Vec<String> {
    chunk_text_with(text, CHUNK_SIZE, CHUNK_OVERLAP)
}

pub fn chunk_text_with(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_vietnamese_diacritics() {
        assert_eq!(strip_diacritics("Hành Động"), "hanh dong");
        assert_eq!(strip_diacritics("Café"), "cafe");
        assert_eq!(strip_diacritics("Señor"), "senor");
        assert_eq!(strip_diacritics("không tìm thấy"), "khong tim thay");
    }

    #[test]
    fn strip_is_identity_for_plain_ascii() {
        assert_eq!(strip_diacritics("plain ascii 123"), "plain ascii 123");
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = chunk_text("a short overview");
        assert_eq!(chunks, vec!["a short overview".to_string()]);
    }

    #[test]
    fn long_text_chunks_overlap() {
        let text: String = ('a'..='z').cycle().take(1200).collect();
        let chunks = chunk_text_with(&text, 500, 50);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 500);
        // Each window starts where the previous one left off, minus overlap.
        let tail_of_first: String = chunks[0].chars().skip(450).collect();
        let head_of_second: String = chunks[1].chars().take(50).collect();
        assert_eq!(tail_of_first, head_of_second);
        // Full text coverage: last chunk ends with the final characters.
        assert!(text.ends_with(chunks.last().map(String::as_str).unwrap_or_default()));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("").is_empty());
    }
}
