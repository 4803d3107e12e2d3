//! Font metrics for the built-in Helvetica faces.
//!
//! Widths are in 1/1000 of the em square (standard AFM units). Every
//! renderer measures text through these tables, so truncation decisions match
//! what the PDF viewer actually draws.

/// Advance widths for the printable ASCII range `' '..='~'`, Helvetica.
const HELVETICA_ASCII: [u16; 95] = [
    // ' '  !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

/// Advance widths for the printable ASCII range `' '..='~'`, Helvetica-Bold.
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Metrics for one font face.
#[derive(Debug)]
pub struct FontMetrics {
    ascii: &'static [u16; 95],
    /// Width used for characters outside the table
    default_width: u16,
    pub units_per_em: u16,
}

static HELVETICA: FontMetrics = FontMetrics {
    ascii: &HELVETICA_ASCII,
    default_width: 556,
    units_per_em: 1000,
};

static HELVETICA_BOLD: FontMetrics = FontMetrics {
    ascii: &HELVETICA_BOLD_ASCII,
    default_width: 556,
    units_per_em: 1000,
};

impl FontMetrics {
    /// Width of a character in em units.
    pub fn char_width(&self, c: char) -> u16 {
        match c {
            ' '..='~' => self.ascii[c as usize - ' ' as usize],
            '\u{2013}' => 556,                           // en dash
            '\u{2014}' | '\u{2026}' | '\u{2122}' => 1000, // em dash, ellipsis, trademark
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201C}' | '\u{201D}' => 333,
            '\u{00AE}' | '\u{00A9}' => 737,
            '\u{00B0}' => 400,
            '\u{00B5}' => 556, // micro sign, common in strengths
            _ => self.default_width,
        }
    }

    /// Width of a string in points.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 / self.units_per_em as f32 * font_size
    }
}

pub fn helvetica() -> &'static FontMetrics {
    &HELVETICA
}

pub fn helvetica_bold() -> &'static FontMetrics {
    &HELVETICA_BOLD
}

pub fn get_metrics(bold: bool) -> &'static FontMetrics {
    if bold {
        helvetica_bold()
    } else {
        helvetica()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_width() {
        // H=722, e=556, l=222, l=222, o=556 = 2278 units
        let width = helvetica().string_width("Hello", 12.0);
        assert!((width - 27.336).abs() < 0.01);
    }

    #[test]
    fn test_bold_is_wider() {
        let text = "Oxycodone HCl 5mg";
        assert!(helvetica_bold().string_width(text, 9.0) > helvetica().string_width(text, 9.0));
    }

    #[test]
    fn test_digits_are_fixed_width() {
        let m = helvetica();
        assert_eq!(m.string_width("00000", 10.0), m.string_width("98765", 10.0));
    }

    #[test]
    fn test_unknown_char_uses_default() {
        assert_eq!(helvetica().char_width('\u{4E2D}'), 556);
    }
}
