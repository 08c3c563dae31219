//! Verse table and the search behind `GET /search`.
//!
//! The table is a JSON object keyed `<short book><chapter>:<verse>`
//! (`"창1:1"`), kept in file order. A query is tried as a reference first,
//! then as a scoped `book : keyword` search, then as plain full text.

use crate::books::find_book;
use crate::error::{Error, Result};
use crate::matcher::Grammar;
use crate::models::{SearchIcon, SearchItem, SearchMod, SearchMods, SearchResponse};
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum rows for keyword searches.
pub const SEARCH_LIMIT: usize = 50;

const ENTRY_SUBTITLE: &str = "Enter: 전체 | Cmd: 본문만 | Opt: 주소+본문";
const COPY_SUBTITLE: &str = "Enter: 복사";
const ENTRY_ICON: &str = "Images/app.png";
const SEARCH_ICON: &str = "Images/search.png";

// Known book names first (English case-insensitively), then any Korean word
// so unknown abbreviations still reach the table.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?P<book>(?i:{})|[가-힣]+)\s*(?P<chapter>\d+(?:[-~]\d+)?)(?:[:장\s]*(?P<verses>\d+(?:[-~,]\d+)*))?",
        Grammar::standard().book_alternation()
    );
    Regex::new(&pattern).expect("reference query pattern must compile")
});

static SCOPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<book>[가-힣]+|(?:[1-3]\s*)?[A-Za-z]+)\s*:\s*(?P<keyword>.*)$")
        .expect("scoped query pattern must compile")
});

static KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<book>\D+)(?P<chapter>\d+):(?P<verse>\d+)$").expect("key pattern must compile")
});

// ============================================================================
// Verse Table
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BibleIndex {
    verses: IndexMap<String, String>,
}

/// Book as the table and the titles spell it.
struct BookNames<'a> {
    short: &'a str,
    full: &'a str,
}

fn resolve_book(token: &str) -> BookNames<'_> {
    match find_book(token) {
        Some(book) => BookNames {
            short: book.short,
            full: book.name,
        },
        None => BookNames {
            short: token,
            full: token,
        },
    }
}

impl BibleIndex {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| Error::VerseTable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self {
            verses: serde_json::from_str(raw)?,
        })
    }

    pub fn from_verses(verses: IndexMap<String, String>) -> Self {
        Self { verses }
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn verse(&self, short: &str, chapter: u32, verse: u32) -> Option<&str> {
        self.verses
            .get(&format!("{}{}:{}", short, chapter, verse))
            .map(String::as_str)
    }

    pub fn search(&self, query: &str) -> SearchResponse {
        let query = query.trim();

        let items = self.reference_search(&query.replace('절', ""));
        if !items.is_empty() {
            return SearchResponse { items };
        }

        if let Some(caps) = SCOPED.captures(query) {
            return self.scoped_search(&caps["book"], caps["keyword"].trim());
        }

        self.full_text_search(query)
    }

    // ---- reference search ----

    fn reference_search(&self, query: &str) -> Vec<SearchItem> {
        let mut items = Vec::new();

        for caps in REFERENCE.captures_iter(query) {
            let book = resolve_book(&caps["book"]);
            let verses_spec = caps.name("verses").map(|m| m.as_str());

            for chapter in expand_range(&caps["chapter"]) {
                let numbers = match verses_spec {
                    Some(spec) => expand_list(spec),
                    None => self.whole_chapter(book.short, chapter),
                };
                let found: Vec<(u32, &str)> = numbers
                    .into_iter()
                    .filter_map(|v| self.verse(book.short, chapter, v).map(|t| (v, t)))
                    .collect();
                if found.is_empty() {
                    continue;
                }
                push_passage(&mut items, &book, chapter, verses_spec, &found);
            }
        }

        items
    }

    /// Verses 1, 2, ... up to the first gap.
    fn whole_chapter(&self, short: &str, chapter: u32) -> Vec<u32> {
        (1..)
            .take_while(|&v| self.verse(short, chapter, v).is_some())
            .collect()
    }

    // ---- keyword searches ----

    fn scoped_search(&self, book_token: &str, keyword: &str) -> SearchResponse {
        let book = resolve_book(book_token);
        if keyword.is_empty() {
            return SearchResponse {
                items: vec![SearchItem::info(
                    "검색어를 입력하세요",
                    format!("{}에서 검색할 단어 입력", book.full),
                )],
            };
        }

        let items: Vec<SearchItem> = self
            .keyed_verses()
            .filter(|(short, _, _, text)| *short == book.short && text.contains(keyword))
            .take(SEARCH_LIMIT)
            .map(|(_, chapter, verse, text)| {
                copy_item(&format!("{} {}:{}", book.full, chapter, verse), text)
            })
            .collect();

        if items.is_empty() {
            return SearchResponse {
                items: vec![SearchItem::info(
                    "검색 결과 없음",
                    format!("{}에서 '{}'를 찾을 수 없습니다.", book.full, keyword),
                )],
            };
        }
        SearchResponse { items }
    }

    fn full_text_search(&self, query: &str) -> SearchResponse {
        if query.is_empty() {
            return SearchResponse {
                items: vec![SearchItem::info("검색어를 입력하세요", "2글자 이상 입력")],
            };
        }

        let items: Vec<SearchItem> = self
            .keyed_verses()
            .filter(|(_, _, _, text)| text.contains(query))
            .take(SEARCH_LIMIT)
            .map(|(short, chapter, verse, text)| {
                let full = resolve_book(short).full;
                copy_item(&format!("{} {}:{}", full, chapter, verse), text)
            })
            .collect();

        if items.is_empty() {
            return SearchResponse {
                items: vec![SearchItem::info(
                    "검색 결과 없음",
                    format!("'{}'에 대한 결과를 찾을 수 없습니다.", query),
                )],
            };
        }
        SearchResponse { items }
    }

    /// `(short book, chapter, verse, text)` for every well-formed key.
    fn keyed_verses(&self) -> impl Iterator<Item = (&str, &str, &str, &str)> + '_ {
        self.verses.iter().filter_map(|(key, text)| {
            let caps = KEY.captures(key)?;
            Some((
                caps.name("book")?.as_str(),
                caps.name("chapter")?.as_str(),
                caps.name("verse")?.as_str(),
                text.as_str(),
            ))
        })
    }
}

// ============================================================================
// Item Construction
// ============================================================================

fn push_passage(
    items: &mut Vec<SearchItem>,
    book: &BookNames<'_>,
    chapter: u32,
    verses_spec: Option<&str>,
    found: &[(u32, &str)],
) {
    let numbered = join_lines(found.iter().map(|(v, t)| format!("{}. {}", v, t)));
    let plain = join_lines(found.iter().map(|(_, t)| t.to_string()));
    let with_refs = join_lines(
        found
            .iter()
            .map(|(v, t)| format!("{} {}:{} - {}", book.full, chapter, v, t)),
    );

    let first = found[0].0;
    let last = found[found.len() - 1].0;
    let (title, footer, pure_ref) = match verses_spec {
        None => (
            format!("{} {}장 ({}절)", book.full, chapter, found.len()),
            format!("{} {}장 {}-{}절", book.full, chapter, first, last),
            format!("{} {}장", book.full, chapter),
        ),
        Some(spec) => {
            let title = format!("{} {}:{}", book.full, chapter, spec);
            let footer = if found.len() == 1 {
                format!("{} {}장 {}절", book.full, chapter, first)
            } else {
                format!("{} {}장 {}-{}절", book.full, chapter, first, last)
            };
            (title.clone(), footer, title)
        }
    };

    items.push(SearchItem {
        title,
        subtitle: ENTRY_SUBTITLE.to_string(),
        arg: Some(numbered.clone()),
        pure_ref: Some(pure_ref),
        full_body: Some(numbered.clone()),
        footer_text: Some(footer),
        mods: Some(mods(&plain, Some("본문만 복사"), &with_refs, Some("주소와 함께 복사"))),
        icon: Some(SearchIcon {
            path: ENTRY_ICON.to_string(),
        }),
        valid: true,
    });

    for (verse, text) in found {
        items.push(SearchItem {
            title: format!("{}절", verse),
            subtitle: text.to_string(),
            arg: Some(numbered.clone()),
            mods: Some(mods(&plain, None, &with_refs, None)),
            valid: true,
            ..Default::default()
        });
    }
}

fn copy_item(full_ref: &str, text: &str) -> SearchItem {
    SearchItem {
        title: format!("{} : {}", full_ref, text),
        subtitle: COPY_SUBTITLE.to_string(),
        arg: Some(format!("{} - {}", full_ref, text)),
        mods: Some(mods(text, Some("본문만 복사"), full_ref, Some("주소만 복사"))),
        icon: Some(SearchIcon {
            path: SEARCH_ICON.to_string(),
        }),
        valid: true,
        ..Default::default()
    }
}

fn mods(cmd: &str, cmd_subtitle: Option<&str>, alt: &str, alt_subtitle: Option<&str>) -> SearchMods {
    SearchMods {
        cmd: Some(SearchMod {
            valid: true,
            arg: cmd.to_string(),
            subtitle: cmd_subtitle.map(str::to_string),
        }),
        alt: Some(SearchMod {
            valid: true,
            arg: alt.to_string(),
            subtitle: alt_subtitle.map(str::to_string),
        }),
    }
}

fn join_lines(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

// ============================================================================
// Number Ranges
// ============================================================================

/// Highest chapter or verse number in any book (Psalm 119:176). Range ends
/// are clamped to it.
pub const MAX_NUMBER: u32 = 176;

/// `"3"` → `[3]`, `"1-3"` / `"1~3"` → `[1, 2, 3]`. Malformed parts yield
/// nothing.
pub fn expand_range(part: &str) -> Vec<u32> {
    let part = part.trim();
    match part.split_once(['-', '~']) {
        Some((start, end)) => match (start.trim().parse::<u32>(), end.trim().parse::<u32>()) {
            (Ok(start), Ok(end)) => (start..=end.min(MAX_NUMBER)).collect(),
            _ => Vec::new(),
        },
        None => part.parse().map(|n| vec![n]).unwrap_or_default(),
    }
}

/// Comma-separated verse list with ranges, e.g. `"1-3,5"`.
pub fn expand_list(spec: &str) -> Vec<u32> {
    spec.split(',').flat_map(expand_range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> BibleIndex {
        let mut verses = IndexMap::new();
        for (key, text) in [
            ("창1:1", "태초에 하나님이 천지를 창조하시니라"),
            ("창1:2", "땅이 혼돈하고 공허하며"),
            ("창1:3", "하나님이 이르시되 빛이 있으라 하시니 빛이 있었고"),
            ("창2:1", "천지와 만물이 다 이루어지니라"),
            ("요3:16", "하나님이 세상을 이처럼 사랑하사"),
            ("요3:17", "하나님이 그 아들을 세상에 보내신 것은"),
            ("요일4:8", "사랑하지 아니하는 자는 하나님을 알지 못하나니 이는 하나님은 사랑이심이라"),
            ("롬8:28", "우리가 알거니와 하나님을 사랑하는 자"),
        ] {
            verses.insert(key.to_string(), text.to_string());
        }
        BibleIndex::from_verses(verses)
    }

    fn titles(response: &SearchResponse) -> Vec<&str> {
        response.items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_single_verse_reference() {
        let response = index().search("요한복음 3:16");
        assert_eq!(titles(&response), vec!["요한복음 3:16", "16절"]);

        let entry = &response.items[0];
        assert!(entry.is_verse_entry());
        assert_eq!(entry.arg.as_deref(), Some("16. 하나님이 세상을 이처럼 사랑하사"));
        assert_eq!(entry.pure_ref.as_deref(), Some("요한복음 3:16"));
        assert_eq!(entry.footer_text.as_deref(), Some("요한복음 3장 16절"));
        assert!(!response.items[1].is_verse_entry());
    }

    #[test]
    fn test_english_reference_with_range() {
        let response = index().search("John 3:16-17");
        assert_eq!(titles(&response), vec!["요한복음 3:16-17", "16절", "17절"]);
        let entry = &response.items[0];
        assert_eq!(entry.footer_text.as_deref(), Some("요한복음 3장 16-17절"));
        assert_eq!(entry.arg.as_deref().unwrap().lines().count(), 2);
        let alt = entry.mods.as_ref().unwrap().alt.as_ref().unwrap();
        assert!(alt.arg.starts_with("요한복음 3:16 - "));
    }

    #[test]
    fn test_numbered_english_book() {
        let response = index().search("1 John 4:8");
        assert_eq!(response.items[0].title, "요한일서 4:8");
    }

    #[test]
    fn test_korean_units_and_abbreviation() {
        let response = index().search("요 3장 16절");
        assert_eq!(response.items[0].title, "요한복음 3:16");
    }

    #[test]
    fn test_whole_chapter() {
        let response = index().search("창 1");
        let entry = &response.items[0];
        assert_eq!(entry.title, "창세기 1장 (3절)");
        assert_eq!(entry.footer_text.as_deref(), Some("창세기 1장 1-3절"));
        assert_eq!(entry.pure_ref.as_deref(), Some("창세기 1장"));
        assert_eq!(response.items.len(), 4);
    }

    #[test]
    fn test_chapter_range_yields_entry_per_chapter() {
        let response = index().search("창세기 1-2");
        let entries: Vec<&str> = response
            .items
            .iter()
            .filter(|i| i.is_verse_entry())
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(entries, vec!["창세기 1장 (3절)", "창세기 2장 (1절)"]);
    }

    #[test]
    fn test_verse_list_skips_missing() {
        let response = index().search("창 1:1,3,9");
        let entry = &response.items[0];
        assert_eq!(entry.title, "창세기 1:1,3,9");
        assert_eq!(entry.footer_text.as_deref(), Some("창세기 1장 1-3절"));
        assert_eq!(response.items.len(), 3);
    }

    #[test]
    fn test_scoped_search() {
        let response = index().search("창: 빛");
        assert_eq!(response.items.len(), 1);
        assert!(response.items[0].title.starts_with("창세기 1:3 : "));
        assert_eq!(response.items[0].subtitle, COPY_SUBTITLE);
    }

    #[test]
    fn test_scoped_search_matches_book_exactly() {
        // 요일 verses must not leak into a 요 search.
        let response = index().search("요: 사랑");
        assert_eq!(titles(&response).len(), 1);
        assert!(response.items[0].title.starts_with("요한복음 3:16"));
    }

    #[test]
    fn test_scoped_search_prompts_and_reports_empty() {
        let prompt = index().search("창:");
        assert_eq!(prompt.items[0].title, "검색어를 입력하세요");
        assert!(!prompt.items[0].valid);

        let none = index().search("롬: 빛");
        assert_eq!(none.items[0].title, "검색 결과 없음");
        assert!(!none.items[0].valid);
    }

    #[test]
    fn test_full_text_search() {
        let response = index().search("사랑");
        assert_eq!(response.items.len(), 3);
        assert!(response.items[1].title.starts_with("요한일서 4:8 : "));
        assert_eq!(response.items[1].arg.as_deref().map(|a| a.starts_with("요한일서 4:8 - ")), Some(true));
    }

    #[test]
    fn test_full_text_search_is_limited() {
        let mut verses = IndexMap::new();
        for v in 1..=80 {
            verses.insert(format!("시119:{}", v), "주의 말씀".to_string());
        }
        let response = BibleIndex::from_verses(verses).search("말씀");
        assert_eq!(response.items.len(), SEARCH_LIMIT);
        assert!(response.items[0].title.starts_with("시편 119:1 : "));
    }

    #[test]
    fn test_no_result_and_empty_query() {
        let none = index().search("없는말");
        assert_eq!(none.items[0].title, "검색 결과 없음");

        let empty = index().search("   ");
        assert_eq!(empty.items[0].title, "검색어를 입력하세요");
    }

    #[test]
    fn test_unknown_reference_falls_through_to_text() {
        let response = index().search("창 9:9");
        assert_eq!(response.items[0].title, "검색 결과 없음");
    }

    #[test]
    fn test_expand_range() {
        assert_eq!(expand_range("3"), vec![3]);
        assert_eq!(expand_range("1~3"), vec![1, 2, 3]);
        assert_eq!(expand_range("3-1"), Vec::<u32>::new());
        assert_eq!(expand_range("x"), Vec::<u32>::new());
        assert_eq!(expand_list("1-2,5"), vec![1, 2, 5]);
    }

    #[test]
    fn test_huge_ranges_are_clamped() {
        assert_eq!(expand_range("1-4000000000").len(), MAX_NUMBER as usize);
        assert!(expand_range("200-4000000000").is_empty());

        let response = index().search("창 1:1-30000000");
        assert_eq!(response.items[0].footer_text.as_deref(), Some("창세기 1장 1-3절"));
        assert_eq!(response.items.len(), 4);

        let chapters = index().search("창 1-4000000000");
        assert_eq!(chapters.items.iter().filter(|i| i.is_verse_entry()).count(), 2);
    }

    #[test]
    fn test_from_json_keeps_file_order() {
        let index = BibleIndex::from_json(r#"{"창1:2": "b", "창1:1": "a"}"#).unwrap();
        assert_eq!(index.len(), 2);
        let response = index.search("창: a");
        assert_eq!(response.items.len(), 1);
        let all = index.search("창 1:1-2");
        assert_eq!(all.items[0].arg.as_deref(), Some("1. a\n2. b"));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let err = BibleIndex::load("/nonexistent/bible.json").unwrap_err();
        assert!(matches!(err, Error::VerseTable { .. }));
    }
}
