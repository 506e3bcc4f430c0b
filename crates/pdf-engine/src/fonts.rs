//! Font resolution for exported text.
//!
//! Text is drawn with the PDF standard Type1 faces, which every viewer ships,
//! so nothing has to be embedded. Requested families are matched against a
//! small alias table; anything unknown falls back to Helvetica.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFont {
    pub const FALLBACK: StandardFont = StandardFont::Helvetica;

    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TimesRoman => "Times-Roman",
            Self::Courier => "Courier",
        }
    }

    /// Resource name used in page `/Font` dictionaries.
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "PgMkHelv",
            Self::TimesRoman => "PgMkTiRo",
            Self::Courier => "PgMkCour",
        }
    }

    /// Resolves a CSS-style family list such as `"Times New Roman", serif`.
    ///
    /// Returns the face and whether the fallback had to be used.
    pub fn resolve(family: &str) -> (StandardFont, bool) {
        family
            .split(',')
            .find_map(Self::match_family)
            .map(|font| (font, false))
            .unwrap_or((Self::FALLBACK, true))
    }

    fn match_family(candidate: &str) -> Option<StandardFont> {
        let normalized =
            candidate.trim().trim_matches(|c: char| c == '"' || c == '\'').to_ascii_lowercase();

        match normalized.as_str() {
            "arial" | "helvetica" | "helvetica neue" | "sans-serif" | "liberation sans" | "arimo" => {
                Some(Self::Helvetica)
            }
            "times" | "times new roman" | "times-roman" | "serif" | "liberation serif" | "tinos" => {
                Some(Self::TimesRoman)
            }
            "courier" | "courier new" | "monospace" | "liberation mono" | "cousine" => {
                Some(Self::Courier)
            }
            _ => None,
        }
    }
}

/// Encodes text for a standard font using WinAnsiEncoding.
///
/// Latin-1 maps directly; the common typographic punctuation in the 0x80-0x9F
/// block is translated; everything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2122}' => 0x99,
            '\t' => b' ',
            c if (' '..='~').contains(&c) => c as u8,
            c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_families_resolve_without_fallback() {
        assert_eq!(StandardFont::resolve("Arial"), (StandardFont::Helvetica, false));
        assert_eq!(StandardFont::resolve("Times New Roman"), (StandardFont::TimesRoman, false));
        assert_eq!(StandardFont::resolve("courier new"), (StandardFont::Courier, false));
    }

    #[test]
    fn family_lists_use_first_known_entry() {
        assert_eq!(
            StandardFont::resolve("\"Fancy Script\", 'Courier New', serif"),
            (StandardFont::Courier, false)
        );
    }

    #[test]
    fn unknown_family_falls_back_to_helvetica() {
        assert_eq!(StandardFont::resolve("Comic Sans MS"), (StandardFont::Helvetica, true));
        assert_eq!(StandardFont::resolve(""), (StandardFont::Helvetica, true));
    }

    #[test]
    fn win_ansi_keeps_latin1_and_replaces_the_rest() {
        assert_eq!(encode_win_ansi("Draft"), b"Draft".to_vec());
        assert_eq!(encode_win_ansi("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{201C}ok\u{201D}"), vec![0x93, b'o', b'k', 0x94]);
        assert_eq!(encode_win_ansi("\u{4e2d}"), b"?".to_vec());
    }
}
