//! Book-name table shared by the reference grammar and the lookup service.
//!
//! Every book has its Korean full name, the Korean abbreviation used as the
//! key prefix in the verse table (`창1:1`), and the English names and
//! abbreviations accepted in references.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    /// Korean full name, e.g. `창세기`.
    pub name: &'static str,
    /// Korean abbreviation, e.g. `창`. Verse-table keys start with this.
    pub short: &'static str,
    /// English names and abbreviations, e.g. `Genesis`, `Gen`.
    pub english: &'static [&'static str],
}

macro_rules! book {
    ($name:literal, $short:literal, [$($en:literal),* $(,)?]) => {
        Book { name: $name, short: $short, english: &[$($en),*] }
    };
}

pub const BOOKS: &[Book] = &[
    // Old Testament
    book!("창세기", "창", ["Genesis", "Gen"]),
    book!("출애굽기", "출", ["Exodus", "Exod", "Ex"]),
    book!("레위기", "레", ["Leviticus", "Lev"]),
    book!("민수기", "민", ["Numbers", "Num"]),
    book!("신명기", "신", ["Deuteronomy", "Deut"]),
    book!("여호수아", "수", ["Joshua", "Josh"]),
    book!("사사기", "삿", ["Judges", "Judg"]),
    book!("룻기", "룻", ["Ruth"]),
    book!("사무엘상", "삼상", ["1 Samuel", "1 Sam"]),
    book!("사무엘하", "삼하", ["2 Samuel", "2 Sam"]),
    book!("열왕기상", "왕상", ["1 Kings", "1 Kgs"]),
    book!("열왕기하", "왕하", ["2 Kings", "2 Kgs"]),
    book!("역대상", "대상", ["1 Chronicles", "1 Chr"]),
    book!("역대하", "대하", ["2 Chronicles", "2 Chr"]),
    book!("에스라", "스", ["Ezra"]),
    book!("느헤미야", "느", ["Nehemiah", "Neh"]),
    book!("에스더", "에", ["Esther", "Esth"]),
    book!("욥기", "욥", ["Job"]),
    book!("시편", "시", ["Psalms", "Psalm", "Ps"]),
    book!("잠언", "잠", ["Proverbs", "Prov"]),
    book!("전도서", "전", ["Ecclesiastes", "Eccl"]),
    book!("아가", "아", ["Song of Songs", "Song of Solomon", "Song"]),
    book!("이사야", "사", ["Isaiah", "Isa"]),
    book!("예레미야", "렘", ["Jeremiah", "Jer"]),
    book!("예레미야애가", "애", ["Lamentations", "Lam"]),
    book!("에스겔", "겔", ["Ezekiel", "Ezek"]),
    book!("다니엘", "단", ["Daniel", "Dan"]),
    book!("호세아", "호", ["Hosea", "Hos"]),
    book!("요엘", "욜", ["Joel"]),
    book!("아모스", "암", ["Amos"]),
    book!("오바댜", "옵", ["Obadiah", "Obad"]),
    book!("요나", "욘", ["Jonah"]),
    book!("미가", "미", ["Micah", "Mic"]),
    book!("나훔", "나", ["Nahum", "Nah"]),
    book!("하박국", "합", ["Habakkuk", "Hab"]),
    book!("스바냐", "습", ["Zephaniah", "Zeph"]),
    book!("학개", "학", ["Haggai", "Hag"]),
    book!("스가랴", "슥", ["Zechariah", "Zech"]),
    book!("말라기", "말", ["Malachi", "Mal"]),
    // New Testament
    book!("마태복음", "마", ["Matthew", "Matt"]),
    book!("마가복음", "막", ["Mark"]),
    book!("누가복음", "누", ["Luke"]),
    book!("요한복음", "요", ["John"]),
    book!("사도행전", "행", ["Acts"]),
    book!("로마서", "롬", ["Romans", "Rom"]),
    book!("고린도전서", "고전", ["1 Corinthians", "1 Cor"]),
    book!("고린도후서", "고후", ["2 Corinthians", "2 Cor"]),
    book!("갈라디아서", "갈", ["Galatians", "Gal"]),
    book!("에베소서", "엡", ["Ephesians", "Eph"]),
    book!("빌립보서", "빌", ["Philippians", "Phil"]),
    book!("골로새서", "골", ["Colossians", "Col"]),
    book!("데살로니가전서", "살전", ["1 Thessalonians", "1 Thess"]),
    book!("데살로니가후서", "살후", ["2 Thessalonians", "2 Thess"]),
    book!("디모데전서", "딤전", ["1 Timothy", "1 Tim"]),
    book!("디모데후서", "딤후", ["2 Timothy", "2 Tim"]),
    book!("디도서", "딛", ["Titus"]),
    book!("빌레몬서", "몬", ["Philemon", "Phlm"]),
    book!("히브리서", "히", ["Hebrews", "Heb"]),
    book!("야고보서", "약", ["James", "Jas"]),
    book!("베드로전서", "벧전", ["1 Peter", "1 Pet"]),
    book!("베드로후서", "벧후", ["2 Peter", "2 Pet"]),
    book!("요한일서", "요일", ["1 John"]),
    book!("요한이서", "요이", ["2 John"]),
    book!("요한삼서", "요삼", ["3 John"]),
    book!("유다서", "유", ["Jude"]),
    book!("요한계시록", "계", ["Revelation", "Rev"]),
];

impl Book {
    /// Korean spellings (full name and abbreviation).
    pub fn korean_names(&self) -> [&'static str; 2] {
        [self.name, self.short]
    }
}

/// Collapse whitespace and drop a trailing abbreviation dot so that
/// `"1  Cor."` and `"1 Cor"` compare equal.
fn normalize_token(token: &str) -> String {
    token
        .trim()
        .trim_end_matches('.')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Look a book up by any of its spellings.
///
/// Korean names must match exactly; English names are compared
/// case-insensitively with whitespace collapsed, so `1cor`, `1 Cor.` and
/// `1 Corinthians` all resolve.
pub fn find_book(token: &str) -> Option<&'static Book> {
    let trimmed = token.trim();
    if let Some(book) = BOOKS
        .iter()
        .find(|b| b.name == trimmed || b.short == trimmed)
    {
        return Some(book);
    }

    let wanted = normalize_token(trimmed);
    let compact = wanted.replace(' ', "");
    BOOKS.iter().find(|b| {
        b.english.iter().any(|en| {
            let candidate = normalize_token(en);
            candidate == wanted || candidate.replace(' ', "") == compact
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_every_book() {
        assert_eq!(BOOKS.len(), 66);
    }

    #[test]
    fn test_korean_abbreviations_are_unique() {
        let mut shorts: Vec<&str> = BOOKS.iter().map(|b| b.short).collect();
        shorts.sort_unstable();
        shorts.dedup();
        assert_eq!(shorts.len(), 66);
    }

    #[test]
    fn test_find_book_korean() {
        assert_eq!(find_book("요한복음").map(|b| b.short), Some("요"));
        assert_eq!(find_book("요").map(|b| b.name), Some("요한복음"));
        assert_eq!(find_book("고전").map(|b| b.name), Some("고린도전서"));
    }

    #[test]
    fn test_find_book_english_variants() {
        assert_eq!(find_book("John").map(|b| b.short), Some("요"));
        assert_eq!(find_book("romans").map(|b| b.short), Some("롬"));
        assert_eq!(find_book("1 Cor.").map(|b| b.short), Some("고전"));
        assert_eq!(find_book("1cor").map(|b| b.short), Some("고전"));
        assert_eq!(find_book("1 John").map(|b| b.short), Some("요일"));
    }

    #[test]
    fn test_find_book_unknown() {
        assert!(find_book("Hezekiah").is_none());
        assert!(find_book("").is_none());
    }
}
