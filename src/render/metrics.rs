//! Standard Type1 font metrics and WinAnsi text encoding

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Serialize};

/// One of the PDF standard fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// PostScript name used in the font dictionary
    pub fn base_font(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::Times => "Times-Roman",
            FontFamily::Courier => "Courier",
        }
    }

    /// Advance width in thousandths of an em
    pub fn char_width(&self, c: char) -> u16 {
        if *self == FontFamily::Courier {
            return 600;
        }

        let (ascii, punct, average) = match self {
            FontFamily::Helvetica => (&HELVETICA_ASCII, &HELVETICA_PUNCT, 556),
            _ => (&TIMES_ASCII, &TIMES_PUNCT, 500),
        };

        if (' '..='~').contains(&c) {
            return ascii[c as usize - 32];
        }
        if let Some((_, w)) = punct.iter().find(|(p, _)| *p == c) {
            return *w;
        }
        if win_ansi_byte(c).is_some() {
            average
        } else {
            // drawn as '?'
            ascii['?' as usize - 32]
        }
    }

    /// Width of `text` in points at `size`
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 * size / 1000.0
    }
}

// AFM advance widths for U+0020..=U+007E
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const TIMES_ASCII: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

const HELVETICA_PUNCT: [(char, u16); 8] = [
    ('\u{2018}', 222),
    ('\u{2019}', 222),
    ('\u{201C}', 333),
    ('\u{201D}', 333),
    ('\u{2013}', 556),
    ('\u{2014}', 1000),
    ('\u{2026}', 1000),
    ('\u{2022}', 350),
];

const TIMES_PUNCT: [(char, u16); 8] = [
    ('\u{2018}', 333),
    ('\u{2019}', 333),
    ('\u{201C}', 444),
    ('\u{201D}', 444),
    ('\u{2013}', 500),
    ('\u{2014}', 1000),
    ('\u{2026}', 1000),
    ('\u{2022}', 350),
];

/// Code point of `c` in WinAnsiEncoding (Windows-1252)
pub fn win_ansi_byte(c: char) -> Option<u8> {
    if c.is_control() {
        return None;
    }
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    match (had_errors, bytes.as_ref()) {
        (false, [byte]) => Some(*byte),
        _ => None,
    }
}

/// Encode text for a WinAnsi font; unsupported characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_widths() {
        assert_eq!(FontFamily::Helvetica.char_width(' '), 278);
        assert_eq!(FontFamily::Helvetica.char_width('W'), 944);
        assert_eq!(FontFamily::Times.char_width('a'), 444);
        assert_eq!(FontFamily::Times.char_width('~'), 541);
        assert_eq!(FontFamily::Courier.char_width('i'), 600);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let w10 = FontFamily::Times.text_width("Grace", 10.0);
        let w20 = FontFamily::Times.text_width("Grace", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        assert_eq!(FontFamily::Courier.text_width("abc", 10.0), 18.0);
    }

    #[test]
    fn test_punctuation_and_fallback() {
        assert_eq!(FontFamily::Times.char_width('\u{2014}'), 1000);
        assert_eq!(FontFamily::Helvetica.char_width('é'), 556);
        // not encodable, measured as '?'
        assert_eq!(FontFamily::Times.char_width('\u{05D0}'), 444);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Abc"), b"Abc".to_vec());
        assert_eq!(encode_win_ansi("\u{201C}é\u{201D}"), vec![0x93, 0xE9, 0x94]);
        assert_eq!(encode_win_ansi("\u{05D0}x"), b"?x".to_vec());
    }

    #[test]
    fn test_win_ansi_upper_half() {
        assert_eq!(win_ansi_byte('\u{20AC}'), Some(0x80));
        assert_eq!(win_ansi_byte('\u{2122}'), Some(0x99));
        assert_eq!(win_ansi_byte('\u{0178}'), Some(0x9F));
        assert_eq!(win_ansi_byte('\u{00FF}'), Some(0xFF));
        assert_eq!(win_ansi_byte('\u{0081}'), None);
        assert_eq!(win_ansi_byte('\n'), None);
        assert_eq!(win_ansi_byte('\u{4E2D}'), None);
    }
}
