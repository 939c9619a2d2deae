//! Live text metrics.
//!
//! Everything in here is pure and infallible: metrics are derived from the
//! editor's plain text on every keystroke and are never persisted, so there
//! is nothing that can go wrong beyond being handed an empty string.

use derive_more::Display;

/// Assumed reading speed used to estimate [`Metrics::reading_time_minutes`].
pub const WORDS_PER_MINUTE: u64 = 200;

/// Metrics derived from a snapshot of the document's plain text.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
#[display("{word_count} words, {character_count} characters, {reading_time_minutes} min read")]
pub struct Metrics {
    pub word_count: u64,
    /// Characters excluding any whitespace.
    pub character_count: u64,
    pub reading_time_minutes: u64,
}
impl Metrics {
    pub fn compute(text: &str) -> Self {
        let word_count = word_count(text);
        Self {
            word_count,
            character_count: character_count(text),
            reading_time_minutes: reading_time_minutes(word_count),
        }
    }

    /// Lines shown on the metrics dashboard, in display order.
    ///
    /// ```
    /// use scribe_metrics::Metrics;
    ///
    /// let lines = Metrics::compute("hello world").dashboard();
    /// assert_eq!(lines, [
    ///     "Word Count: 2",
    ///     "Character Count: 10",
    ///     "Estimated Reading Time: 1 min",
    /// ]);
    /// ```
    pub fn dashboard(&self) -> [String; 3] {
        [
            format!("Word Count: {}", self.word_count),
            format!("Character Count: {}", self.character_count),
            format!("Estimated Reading Time: {} min", self.reading_time_minutes),
        ]
    }
}
impl From<&str> for Metrics {
    fn from(text: &str) -> Self {
        Self::compute(text)
    }
}

/// Number of maximal whitespace-delimited tokens.
pub fn word_count(text: &str) -> u64 {
    // `split_whitespace` already skips leading/trailing whitespace, so an
    // all-whitespace string yields zero tokens without an explicit trim.
    text.split_whitespace().count() as u64
}

/// Number of characters once every whitespace character has been removed.
///
/// Counted in Unicode scalar values, not bytes.
pub fn character_count(text: &str) -> u64 {
    text.chars().filter(|c| !c.is_whitespace()).count() as u64
}

/// Whole minutes needed to read `word_count` words, rounded up.
pub fn reading_time_minutes(word_count: u64) -> u64 {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(word_count(""), 0);
        assert_eq!(character_count(""), 0);
        assert_eq!(reading_time_minutes(0), 0);
        assert_eq!(Metrics::compute(""), Metrics::default());
    }

    #[test]
    fn test_hello_world() {
        let metrics = Metrics::compute("hello world");
        assert_eq!(
            metrics,
            Metrics {
                word_count: 2,
                character_count: 10,
                reading_time_minutes: 1,
            }
        );
    }

    #[rstest]
    #[case("   ", 0)]
    #[case("\n\t \r\n", 0)]
    #[case("one", 1)]
    #[case("  leading and trailing  ", 3)]
    #[case("tabs\tand\nnewlines\r\nmixed", 4)]
    #[case("multiple     spaces", 2)]
    #[case("non\u{a0}breaking", 2)]
    fn test_word_count(#[case] text: &str, #[case] expected: u64) {
        assert_eq!(word_count(text), expected);
    }

    #[rstest]
    #[case("a b c", 3)]
    #[case(" spaced\tout\n", 9)]
    #[case("ünïcödé", 7)]
    #[case("日本語 テキスト", 7)]
    fn test_character_count(#[case] text: &str, #[case] expected: u64) {
        assert_eq!(character_count(text), expected);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(199, 1)]
    #[case(200, 1)]
    #[case(201, 2)]
    #[case(400, 2)]
    #[case(401, 3)]
    fn test_reading_time_rounds_up(#[case] count: u64, #[case] minutes: u64) {
        assert_eq!(reading_time_minutes(count), minutes);
    }

    #[test]
    fn test_reading_time_boundary_from_text() {
        assert_eq!(Metrics::compute(&words(200)).reading_time_minutes, 1);
        assert_eq!(Metrics::compute(&words(201)).reading_time_minutes, 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Metrics::compute("hello world").to_string(), "2 words, 10 characters, 1 min read");
    }
}
