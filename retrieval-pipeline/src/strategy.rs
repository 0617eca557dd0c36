use common::utils::text::strip_diacritics;

/// How a question should be searched. Factual field lookups favour exact
/// keyword matching, thematic questions favour the vector index, and
/// everything ambiguous runs both arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    Keyword,
    Semantic,
    Hybrid,
}

/// Cues for questions about a concrete data field: budget, revenue,
/// release date, runtime, homepage. Kept in diacritic-stripped form so a
/// single table covers both spellings Vietnamese users type.
const FIELD_TERMS: &[&str] = &[
    "ngan sach",
    "budget",
    "chi phi",
    "tien lam",
    "doanh thu",
    "revenue",
    "kiem duoc",
    "thu ve",
    "phat hanh",
    "ra mat",
    "khoi chieu",
    "thoi luong",
    "runtime",
    "phut",
    "gio",
    "dai",
    "trang web",
    "homepage",
    "website",
];

/// Cues for thematic or plot-level questions.
const SEMANTIC_TERMS: &[&str] = &[
    "ve",
    "noi dung",
    "cot truyen",
    "ke ve",
    "giong nhu",
    "tuong tu",
    "kieu",
    "the loai nao",
    "tam trang",
    "cam xuc",
    "chu de",
    "y nghia",
];

/// Cues for questions about people attached to a movie.
const PERSON_TERMS: &[&str] = &[
    "dien vien",
    "dao dien",
    "vai dien",
    "dong vai",
    "actor",
    "actress",
    "director",
    "cast",
    "crew",
];

/// Picks a search strategy for a question.
///
/// Matching runs over the diacritic-stripped, lowercased question. Multi-word
/// vocabulary terms match as substrings; single-word terms must match a whole
/// token, otherwise short stripped words like "ve" would fire inside
/// unrelated English words. A bare four-digit year counts as a field cue.
pub fn classify(query: &str) -> SearchStrategy {
    let stripped = strip_diacritics(query);
    let tokens: Vec<&str> = stripped
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let field = matches_vocab(&stripped, &tokens, FIELD_TERMS) || tokens.iter().any(|t| is_year(t));
    let semantic = matches_vocab(&stripped, &tokens, SEMANTIC_TERMS);
    let person = matches_vocab(&stripped, &tokens, PERSON_TERMS);

    if field && !semantic {
        SearchStrategy::Keyword
    } else if semantic && !field && !person {
        SearchStrategy::Semantic
    } else {
        SearchStrategy::Hybrid
    }
}

fn matches_vocab(stripped: &str, tokens: &[&str], terms: &[&str]) -> bool {
    terms.iter().any(|term| {
        if term.contains(' ') {
            stripped.contains(term)
        } else {
            tokens.contains(term)
        }
    })
}

fn is_year(token: &str) -> bool {
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && (token.starts_with("19") || token.starts_with("20"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_questions_go_keyword() {
        assert_eq!(classify("Ngân sách phim Avatar là bao nhiêu?"), SearchStrategy::Keyword);
        assert_eq!(classify("Doanh thu của Titanic"), SearchStrategy::Keyword);
        assert_eq!(classify("phim hay năm 1999"), SearchStrategy::Keyword);
    }

    #[test]
    fn thematic_questions_go_semantic() {
        assert_eq!(classify("phim về tình bạn và sự hy sinh"), SearchStrategy::Semantic);
        assert_eq!(classify("nội dung phim Inception"), SearchStrategy::Semantic);
    }

    #[test]
    fn mixed_cues_go_hybrid() {
        // semantic + person
        assert_eq!(classify("đạo diễn phim về chiến tranh"), SearchStrategy::Hybrid);
        // semantic + field
        assert_eq!(classify("nội dung phim năm 1999"), SearchStrategy::Hybrid);
    }

    #[test]
    fn no_cues_default_to_hybrid() {
        assert_eq!(classify("Inception"), SearchStrategy::Hybrid);
        assert_eq!(classify("xin chào"), SearchStrategy::Hybrid);
    }

    #[test]
    fn single_word_terms_do_not_fire_inside_other_words() {
        // "ve" and "gio" are token-level cues and must not match inside
        // longer tokens like "universe" or "giọng" once stripped.
        assert_eq!(classify("phim marvel universe"), SearchStrategy::Hybrid);
        assert_eq!(classify("phim giọng nói hay"), SearchStrategy::Hybrid);
    }
}
