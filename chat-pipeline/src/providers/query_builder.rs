use common::utils::text::strip_diacritics;

/// Vietnamese and English genre vocabulary mapped to TMDB genre ids. Both
/// the diacritic and the bare ASCII spelling are listed so either input
/// style matches.
const GENRE_MAP: &[(&str, u32)] = &[
    ("hành động", 28),
    ("hanh dong", 28),
    ("action", 28),
    ("phiêu lưu", 12),
    ("phieu luu", 12),
    ("adventure", 12),
    ("hài", 35),
    ("hai", 35),
    ("comedy", 35),
    ("kinh dị", 27),
    ("kinh di", 27),
    ("horror", 27),
    ("viễn tưởng", 878),
    ("vien tuong", 878),
    ("science fiction", 878),
    ("tình cảm", 10749),
    ("tinh cam", 10749),
    ("romance", 10749),
    ("giật gân", 53),
    ("giat gan", 53),
    ("thriller", 53),
    ("chính kịch", 18),
    ("chinh kich", 18),
    ("drama", 18),
    ("gia đình", 10751),
    ("gia dinh", 10751),
    ("family", 10751),
    ("hoạt hình", 16),
    ("hoat hinh", 16),
    ("animation", 16),
    ("tội phạm", 80),
    ("toi pham", 80),
    ("crime", 80),
    ("tài liệu", 99),
    ("tai lieu", 99),
    ("documentary", 99),
    ("bí ẩn", 9648),
    ("bi an", 9648),
    ("mystery", 9648),
    ("lịch sử", 36),
    ("lich su", 36),
    ("history", 36),
];

/// Tokens that carry no title information once a question is stripped.
const STOPWORDS: &[&str] = &[
    "cac", "các", "nhung", "những", "bo", "bộ", "phim", "hay", "nhat", "nhất", "top", "xem", "ve",
    "về", "thuoc", "thuộc", "the loai", "thể loại", "gi", "gì", "nao", "nào", "kieu", "kiểu",
    "tuong tu", "tương tự", "hot", "moi", "mới", "tot", "tốt", "de cu", "đề cử",
];

pub const DEFAULT_SORT: &str = "vote_average.desc";

/// A concrete TMDB request derived from a free-form Vietnamese question.
/// Genre cues win over title extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmdbQuery {
    Discover {
        genre_id: u32,
        sort_by: &'static str,
        year: Option<u16>,
    },
    SearchTitle {
        query: String,
    },
}

/// Builds a TMDB request from the question, or `None` when neither a genre
/// nor a plausible title can be extracted.
pub fn build_tmdb_query(question: &str) -> Option<TmdbQuery> {
    if let Some(genre_id) = detect_genre_id(question) {
        return Some(TmdbQuery::Discover {
            genre_id,
            sort_by: select_sort(question).unwrap_or(DEFAULT_SORT),
            year: extract_year(question),
        });
    }
    extract_title_query(question).map(|query| TmdbQuery::SearchTitle { query })
}

pub fn detect_genre_id(question: &str) -> Option<u32> {
    let stripped = strip_diacritics(question);
    GENRE_MAP
        .iter()
        .find(|(name, _)| stripped.contains(&strip_diacritics(name)))
        .map(|(_, id)| *id)
}

/// Finds a release year: "năm 2010" (either spelling) takes precedence,
/// otherwise any standalone 19xx/20xx number counts.
pub fn extract_year(question: &str) -> Option<u16> {
    let lowered = question.to_lowercase();
    for marker in ["năm", "nam"] {
        let mut offset = 0;
        while let Some(position) = lowered[offset..].find(marker) {
            let after = lowered[offset + position + marker.len()..].trim_start();
            let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
            if digits.len() == 4 {
                if let Ok(year) = digits.parse() {
                    return Some(year);
                }
            }
            offset += position + marker.len();
        }
    }

    lowered
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 4)
        .filter(|token| token.starts_with("19") || token.starts_with("20"))
        .find_map(|token| token.parse().ok())
}

/// Extracts a title phrase: quoted text wins, otherwise the stripped
/// question minus stopwords. Phrases shorter than two characters are
/// discarded as noise.
pub fn extract_title_query(question: &str) -> Option<String> {
    const QUOTES: &[char] = &['"', '“', '”', '\'', '‘', '’'];
    if let Some(open) = question.find(QUOTES) {
        let rest = &question[open + question[open..].chars().next()?.len_utf8()..];
        if let Some(close) = rest.find(QUOTES) {
            let quoted = rest[..close].trim();
            if !quoted.is_empty() {
                return Some(quoted.to_owned());
            }
        }
    }

    let stripped = strip_diacritics(question);
    let candidate = stripped
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .filter(|token| !STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");
    let candidate = candidate.trim();
    (candidate.len() >= 2).then(|| candidate.to_owned())
}

/// Picks a Discover sort order. Quality cues ("hay nhất", "top") rank by
/// rating, trend cues by popularity; `None` lets the caller apply the
/// default.
pub fn select_sort(question: &str) -> Option<&'static str> {
    let lowered = question.to_lowercase();
    let has_top_token = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == "top");
    if lowered.contains("hay")
        || lowered.contains("nhất")
        || has_top_token
        || lowered.contains("diem cao")
        || lowered.contains("rating cao")
    {
        return Some("vote_average.desc");
    }

    let stripped = strip_diacritics(question);
    if ["pho bien", "thinh hanh", "trending", "moi", "hot"]
        .iter()
        .any(|cue| stripped.contains(cue))
    {
        return Some("popularity.desc");
    }
    None
}
