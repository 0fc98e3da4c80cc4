//! Chapter reconstruction from a `puborder`-sorted paragraph stream

use crate::store::Paragraph;
use crate::text::layout_text;

/// A chapter ready for layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 1-based chapter number
    pub number: usize,
    pub title: String,
    /// Plain-text paragraphs, blanks removed
    pub paragraphs: Vec<String>,
}

/// Group paragraphs into maximal runs of equal `chapter_title`.
///
/// The first paragraph always opens chapter 1. Chapters without a usable
/// title are called `"Chapter {n}"`.
pub fn group_chapters(paragraphs: &[Paragraph]) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut running: Option<Option<&str>> = None;

    for paragraph in paragraphs {
        let key = paragraph.chapter_title.as_deref();

        if running != Some(key) {
            let number = chapters.len() + 1;
            let title = match key.map(str::trim) {
                Some(t) if !t.is_empty() => t.to_string(),
                _ => format!("Chapter {}", number),
            };
            chapters.push(Chapter {
                number,
                title,
                paragraphs: Vec::new(),
            });
            running = Some(key);
        }

        if let (Some(chapter), Some(text)) =
            (chapters.last_mut(), layout_text(&paragraph.content))
        {
            chapter.paragraphs.push(text);
        }
    }

    chapters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(puborder: i64, chapter: Option<&str>, content: &str) -> Paragraph {
        Paragraph {
            para_id: format!("1.{}", puborder),
            book_id: 1,
            id_prev: None,
            id_next: None,
            refcode_short: None,
            refcode_long: None,
            element_type: None,
            content: content.to_string(),
            content_plain: content.to_string(),
            puborder,
            chapter_title: chapter.map(str::to_string),
        }
    }

    #[test]
    fn test_intro_intro_ch1_gives_two_chapters() {
        let paragraphs = vec![
            para(1, Some("Intro"), "<p>One</p>"),
            para(2, Some("Intro"), "<p>Two</p>"),
            para(3, Some("Ch1"), "<p>Three</p>"),
        ];

        let chapters = group_chapters(&paragraphs);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Intro");
        assert_eq!(chapters[0].paragraphs, vec!["One", "Two"]);
        assert_eq!(chapters[1].title, "Ch1");
        assert_eq!(chapters[1].paragraphs, vec!["Three"]);
    }

    #[test]
    fn test_missing_titles_are_synthesized() {
        let paragraphs = vec![
            para(1, None, "a"),
            para(2, Some("Named"), "b"),
            para(3, Some("  "), "c"),
        ];

        let titles: Vec<_> = group_chapters(&paragraphs)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Chapter 1", "Named", "Chapter 3"]);
    }

    #[test]
    fn test_runs_are_maximal() {
        // A title that recurs later opens a new chapter
        let titles = ["A", "A", "B", "A", "A", "A", "C"];
        let paragraphs: Vec<_> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| para(i as i64, Some(*t), "text"))
            .collect();

        let chapters = group_chapters(&paragraphs);
        let shape: Vec<_> = chapters
            .iter()
            .map(|c| (c.title.as_str(), c.paragraphs.len()))
            .collect();
        assert_eq!(shape, vec![("A", 2), ("B", 1), ("A", 3), ("C", 1)]);

        let total: usize = chapters.iter().map(|c| c.paragraphs.len()).sum();
        assert_eq!(total, paragraphs.len());
    }

    #[test]
    fn test_blank_paragraphs_dropped() {
        let paragraphs = vec![
            para(1, Some("Intro"), "<br/>"),
            para(2, Some("Intro"), "  <p> Kept  text </p> "),
        ];
        let chapters = group_chapters(&paragraphs);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].paragraphs, vec!["Kept text"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_chapters(&[]).is_empty());
    }
}
