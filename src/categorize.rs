//! Book categorization
//!
//! Every book gets a `(category, subcategory)` pair derived from its author,
//! title, type, code and page count. Rules are evaluated top to bottom and the
//! first match wins. The order reproduces the categorization of existing data;
//! in particular the page-count pamphlet rule only fires after every EGW title
//! rule has been tried.

use serde::{Deserialize, Serialize};

/// The fields categorization looks at
#[derive(Debug, Clone, Copy)]
pub struct BookTraits<'a> {
    pub author: &'a str,
    pub title: &'a str,
    pub book_type: &'a str,
    pub code: &'a str,
    pub npages: Option<i64>,
}

/// Lowercased view used by the predicates
struct Normalized {
    author: String,
    title: String,
    book_type: String,
    code: String,
    npages: Option<i64>,
}

impl Normalized {
    fn new(traits: &BookTraits<'_>) -> Self {
        Self {
            author: traits.author.to_lowercase(),
            title: traits.title.to_lowercase(),
            book_type: traits.book_type.to_lowercase(),
            code: traits.code.trim().to_lowercase(),
            npages: traits.npages,
        }
    }

    fn title_has(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.title.contains(n))
    }

    fn type_has(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.book_type.contains(n))
    }

    fn author_in(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.author.contains(n))
    }
}

/// Resulting classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category: String,
    pub subcategory: String,
}

/// One row of the rule table
pub struct Rule {
    pub name: &'static str,
    matches: fn(&Normalized) -> bool,
    pub category: &'static str,
    pub subcategory: &'static str,
}

const PIONEER_AUTHORS: &[&str] = &[
    "uriah smith",
    "j. n. andrews",
    "john n. andrews",
    "joseph bates",
    "j. n. loughborough",
    "john n. loughborough",
    "a. t. jones",
    "alonzo t. jones",
    "e. j. waggoner",
    "ellet j. waggoner",
    "j. h. waggoner",
    "s. n. haskell",
    "stephen n. haskell",
    "w. w. prescott",
    "hiram edson",
    "j. h. kellogg",
    "g. i. butler",
];

const HISTORIAN_AUTHORS: &[&str] = &[
    "leroy edwin froom",
    "le roy edwin froom",
    "m. ellsworth olsen",
    "c. mervyn maxwell",
    "george r. knight",
    "richard w. schwarz",
    "arthur w. spalding",
    "j. o. corliss",
];

const PERIODICAL_TITLES: &[&str] = &[
    "periodical",
    "review and herald",
    "signs of the times",
    "youth's instructor",
    "bible echo",
    "present truth",
    "magazine",
    "journal",
];

const EGW_MAJOR_TITLES: &[&str] = &[
    "steps to christ",
    "the desire of ages",
    "the great controversy",
    "patriarchs and prophets",
    "prophets and kings",
    "the acts of the apostles",
    "christ's object lessons",
    "the ministry of healing",
    "education",
    "thoughts from the mount of blessing",
    "early writings",
    "counsels for the church",
];

const EGW_MAJOR_CODES: &[&str] = &[
    "sc", "da", "gc", "pp", "pk", "aa", "col", "mh", "ed", "mb", "ew", "cch",
];

fn is_egw(b: &Normalized) -> bool {
    b.author.contains("white") || b.author.contains("elena")
}

fn is_pioneer(b: &Normalized) -> bool {
    b.author_in(PIONEER_AUTHORS)
}

fn is_periodical(b: &Normalized) -> bool {
    b.type_has(&["periodical", "magazine"]) || b.title_has(PERIODICAL_TITLES)
}

fn is_egw_devotional(b: &Normalized) -> bool {
    is_egw(b) && (b.type_has(&["devotional"]) || b.title_has(&["devotional", "morning watch"]))
}

fn is_egw_manuscript(b: &Normalized) -> bool {
    is_egw(b) && (b.title_has(&["manuscript"]) || b.code.starts_with("ms"))
}

fn is_egw_letter(b: &Normalized) -> bool {
    is_egw(b) && (b.title_has(&["letter"]) || b.code.starts_with("lt"))
}

fn is_egw_testimony(b: &Normalized) -> bool {
    is_egw(b) && b.title_has(&["testimon"])
}

fn is_egw_major_book(b: &Normalized) -> bool {
    is_egw(b)
        && (EGW_MAJOR_TITLES.contains(&b.title.trim())
            || EGW_MAJOR_CODES.contains(&b.code.as_str()))
}

fn is_egw_pamphlet(b: &Normalized) -> bool {
    is_egw(b) && matches!(b.npages, Some(n) if n > 0 && n < 100)
}

fn is_pioneer_periodical(b: &Normalized) -> bool {
    is_pioneer(b) && is_periodical(b)
}

fn is_reference(b: &Normalized) -> bool {
    b.type_has(&["bible", "dictionary", "index"]) || b.title_has(&["concordance"])
}

fn is_denominational_history(b: &Normalized) -> bool {
    b.title_has(&["history", "historical", "denomination", "adventist", "advent movement"])
        || b.author_in(HISTORIAN_AUTHORS)
}

fn is_devotional(b: &Normalized) -> bool {
    b.type_has(&["devotional"]) || b.title_has(&["devotional"])
}

fn is_plain_book(b: &Normalized) -> bool {
    b.book_type.trim() == "book"
}

fn always(_: &Normalized) -> bool {
    true
}

/// The ordered rule table
#[rustfmt::skip]
pub const RULES: &[Rule] = &[
    Rule { name: "egw-devotional", matches: is_egw_devotional, category: "egw", subcategory: "devotional" },
    Rule { name: "egw-manuscripts", matches: is_egw_manuscript, category: "egw", subcategory: "manuscripts" },
    Rule { name: "egw-letters", matches: is_egw_letter, category: "egw", subcategory: "letters" },
    Rule { name: "egw-testimonies", matches: is_egw_testimony, category: "egw", subcategory: "testimonies" },
    Rule { name: "egw-books", matches: is_egw_major_book, category: "egw", subcategory: "books" },
    Rule { name: "egw-pamphlets", matches: is_egw_pamphlet, category: "egw", subcategory: "pamphlets" },
    Rule { name: "egw-other", matches: is_egw, category: "egw", subcategory: "books" },
    Rule { name: "pioneer-periodical", matches: is_pioneer_periodical, category: "periodical", subcategory: "pioneer" },
    Rule { name: "pioneer", matches: is_pioneer, category: "pioneer", subcategory: "books" },
    Rule { name: "periodical", matches: is_periodical, category: "periodical", subcategory: "historical" },
    Rule { name: "reference", matches: is_reference, category: "reference", subcategory: "biblical" },
    Rule { name: "denominational", matches: is_denominational_history, category: "historical", subcategory: "denominational" },
    Rule { name: "devotional", matches: is_devotional, category: "devotional", subcategory: "modern" },
    Rule { name: "book", matches: is_plain_book, category: "historical", subcategory: "general" },
    Rule { name: "fallback", matches: always, category: "reference", subcategory: "general" },
];

/// Name of the first rule matching the book
pub fn matching_rule(traits: &BookTraits<'_>) -> &'static Rule {
    let normalized = Normalized::new(traits);
    RULES
        .iter()
        .find(|rule| (rule.matches)(&normalized))
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// Classify a book. Pure and deterministic.
pub fn categorize_book(traits: &BookTraits<'_>) -> Category {
    let rule = matching_rule(traits);
    Category {
        category: rule.category.to_string(),
        subcategory: rule.subcategory.to_string(),
    }
}
