//! Pinyin tone-number rendering
//!
//! Converts numbered pinyin (`ni3 hao3`, `zhong1guo2`) into pinyin with tone
//! diacritics (`nǐ hǎo`, `zhōngguó`). Pure text transform; no dictionary
//! lookups are involved.
//!
//! **Placement rule:** `a`/`e` take the mark when present, `ou` marks the `o`,
//! otherwise the last vowel is marked. Tone 5 (and 0) is neutral and only
//! drops the digit. `v` and `u:` are read as `ü` in toned syllables.

/// Convert tone-numbered pinyin to diacritic pinyin
///
/// Whitespace and any text without a tone digit are preserved as-is.
pub fn numbered_to_marked(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut syllable = String::new();

    for ch in text.chars() {
        match ch {
            '0'..='5' => {
                let tone = ch as u8 - b'0';
                match render_syllable(&syllable, tone) {
                    Some(rendered) => out.push_str(&rendered),
                    None => {
                        out.push_str(&syllable);
                        out.push(ch);
                    }
                }
                syllable.clear();
            }
            c if c.is_whitespace() => {
                out.push_str(&syllable);
                syllable.clear();
                out.push(c);
            }
            c => syllable.push(c),
        }
    }
    out.push_str(&syllable);

    out
}

/// Render one syllable with its tone; `None` when it carries no vowel
fn render_syllable(raw: &str, tone: u8) -> Option<String> {
    let chars: Vec<char> = normalize_umlaut(raw).chars().collect();
    let target = mark_position(&chars)?;

    if !(1..=4).contains(&tone) {
        return Some(chars.into_iter().collect());
    }

    Some(
        chars
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if i == target {
                    marked_vowel(c, tone).unwrap_or(c)
                } else {
                    c
                }
            })
            .collect(),
    )
}

fn normalize_umlaut(raw: &str) -> String {
    raw.replace("u:", "ü")
        .replace("U:", "Ü")
        .replace('v', "ü")
        .replace('V', "Ü")
}

fn is_vowel(c: char) -> bool {
    matches!(
        c.to_ascii_lowercase(),
        'a' | 'e' | 'i' | 'o' | 'u'
    ) || c == 'ü'
        || c == 'Ü'
}

fn mark_position(chars: &[char]) -> Option<usize> {
    let lower: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();

    if let Some(i) = lower.iter().position(|&c| c == 'a' || c == 'e') {
        return Some(i);
    }

    if let Some(i) = lower.windows(2).position(|w| w == ['o', 'u']) {
        return Some(i);
    }

    chars.iter().rposition(|&c| is_vowel(c))
}

fn marked_vowel(c: char, tone: u8) -> Option<char> {
    let row: [char; 4] = match c {
        'a' => ['ā', 'á', 'ǎ', 'à'],
        'e' => ['ē', 'é', 'ě', 'è'],
        'i' => ['ī', 'í', 'ǐ', 'ì'],
        'o' => ['ō', 'ó', 'ǒ', 'ò'],
        'u' => ['ū', 'ú', 'ǔ', 'ù'],
        'ü' => ['ǖ', 'ǘ', 'ǚ', 'ǜ'],
        'A' => ['Ā', 'Á', 'Ǎ', 'À'],
        'E' => ['Ē', 'É', 'Ě', 'È'],
        'I' => ['Ī', 'Í', 'Ǐ', 'Ì'],
        'O' => ['Ō', 'Ó', 'Ǒ', 'Ò'],
        'U' => ['Ū', 'Ú', 'Ǔ', 'Ù'],
        'Ü' => ['Ǖ', 'Ǘ', 'Ǚ', 'Ǜ'],
        _ => return None,
    };
    row.get(usize::from(tone) - 1).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_rendering_table() {
        let cases = [
            ("ni3 hao3", "nǐ hǎo"),
            ("zhong1guo2", "zhōngguó"),
            ("ma5", "ma"),
            ("nv3", "nǚ"),
            ("lü4", "lǜ"),
            ("lu:4", "lǜ"),
            ("shui3", "shuǐ"),
            ("liu2", "liú"),
            ("gou3", "gǒu"),
            ("xiang4", "xiàng"),
            ("er2", "ér"),
            ("qing3 wen4", "qǐng wèn"),
            ("wo3 ai4 ni3", "wǒ ài nǐ"),
            ("Zhong1wen2", "Zhōngwén"),
            ("Ou1zhou1", "Ōuzhōu"),
        ];

        for (input, expected) in cases {
            assert_eq!(numbered_to_marked(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_text_without_tones_is_unchanged() {
        assert_eq!(numbered_to_marked(""), "");
        assert_eq!(numbered_to_marked("nǐ hǎo"), "nǐ hǎo");
        assert_eq!(numbered_to_marked("lv"), "lv");
    }

    #[test]
    fn test_digits_without_vowels_are_kept() {
        assert_eq!(numbered_to_marked("2010"), "2010");
        assert_eq!(numbered_to_marked("r5"), "r5");
    }

    #[test]
    fn test_whitespace_is_preserved() {
        assert_eq!(numbered_to_marked("ni3  hao3\n"), "nǐ  hǎo\n");
    }
}
