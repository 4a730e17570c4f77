//! Reading-time estimation

use super::post::Section;

/// Fixed reading rate
pub const WORDS_PER_MINUTE: usize = 200;

/// Number of whitespace-delimited tokens in `text`
///
/// Punctuation stays attached to its word, so `"end."` is one token.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Total words of all headings and body blocks
pub fn total_words(sections: &[Section]) -> usize {
    sections
        .iter()
        .map(|section| {
            let heading = match section.heading.as_deref() {
                Some(heading) if !heading.is_empty() => count_words(heading),
                _ => 0,
            };
            let body: usize = section.body.iter().map(|block| count_words(&block.text)).sum();
            heading + body
        })
        .sum()
}

/// Minutes needed to read `words`, rounded up
pub fn minutes_for(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Estimated reading time of a post body in whole minutes
pub fn reading_time(sections: &[Section]) -> usize {
    minutes_for(total_words(sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TextBlock;

    fn section(heading: Option<&str>, body: &[&str]) -> Section {
        Section {
            heading: heading.map(str::to_string),
            body: body.iter().map(|t| TextBlock::paragraph(*t)).collect(),
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_heading_and_body_words() {
        let sections = vec![section(Some("A B"), &["C D E"])];
        assert_eq!(total_words(&sections), 5);
        assert_eq!(reading_time(&sections), 1);
    }

    #[test]
    fn test_empty_sections() {
        assert_eq!(total_words(&[]), 0);
        assert_eq!(reading_time(&[]), 0);
    }

    #[test]
    fn test_empty_heading_and_body_contribute_nothing() {
        let sections = vec![section(Some(""), &[]), section(None, &[""])];
        assert_eq!(total_words(&sections), 0);
        assert_eq!(reading_time(&sections), 0);
    }

    #[test]
    fn test_untitled_section_does_not_stop_counting() {
        let sections = vec![
            section(Some("one"), &["two three"]),
            section(None, &["four"]),
            section(Some("five six"), &["seven"]),
        ];
        assert_eq!(total_words(&sections), 7);
    }

    #[test]
    fn test_rounds_up() {
        assert_eq!(minutes_for(0), 0);
        assert_eq!(minutes_for(1), 1);
        assert_eq!(minutes_for(200), 1);
        assert_eq!(minutes_for(201), 2);
        assert_eq!(minutes_for(400), 2);
        assert_eq!(minutes_for(401), 3);

        let sections = vec![section(None, &[words(150).as_str(), words(51).as_str()])];
        assert_eq!(total_words(&sections), 201);
        assert_eq!(reading_time(&sections), 2);
    }

    #[test]
    fn test_punctuation_stays_with_word() {
        assert_eq!(count_words("the end."), 2);
        assert_eq!(count_words("  spaced\tout\nwords  "), 3);
        assert_eq!(count_words(""), 0);
    }
}
