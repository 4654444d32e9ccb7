use porter_stemmer::stem;
use std::collections::HashSet;
use std::sync::OnceLock;

static STOP_WORDS: OnceLock<HashSet<String>> = OnceLock::new();

fn get_stop_words() -> &'static HashSet<String> {
    STOP_WORDS.get_or_init(|| {
        stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|x| x.to_string())
            .collect()
    })
}

/// A character filter receives the original text and can transform it by adding, removing,
/// or changing characters before tokenization.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Drops whitespace-separated words that are URLs. AI overview snippets sometimes inline the
/// source link, and the link fragments would otherwise dominate the vocabulary.
#[derive(Debug, Default)]
pub struct UrlStripFilter;

impl UrlStripFilter {
    fn is_url(word: &str) -> bool {
        let w = word.trim_start_matches(|c: char| !c.is_alphanumeric());
        w.starts_with("http://") || w.starts_with("https://") || w.starts_with("www.")
    }
}

impl CharacterFilter for UrlStripFilter {
    fn filter(&self, text: String) -> String {
        text.split_whitespace()
            .filter(|w| !Self::is_url(w))
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

/// A tokenizer receives a stream of characters, breaks it up into individual tokens (usually
/// individual words), and outputs a stream of tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<String>>()
    }
}

/// Splits on every non-alphanumeric character, so "real-time" becomes [real, time].
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|w| w.to_string())
            .collect()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut t| {
                t.term = t.term.to_lowercase();
                t
            })
            .collect()
    }
}

pub struct StopWordTokenFilter;

impl TokenFilter for StopWordTokenFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        let stop_words = get_stop_words();
        tokens.retain(|w| !stop_words.contains(&**w));
        tokens
    }
}

pub struct PorterStemmerTokenFilter;

impl TokenFilter for PorterStemmerTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut w| {
                w.term = stem(&w.term);
                w
            })
            .collect::<Vec<TextToken>>()
    }
}

/// Strips punctuation from tokens and filters out tokens that become empty or are too short
pub struct PunctuationStripFilter {
    min_length: usize,
}

impl PunctuationStripFilter {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for PunctuationStripFilter {
    fn default() -> Self {
        Self { min_length: 2 }
    }
}

impl TokenFilter for PunctuationStripFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter_map(|mut token| {
                let trimmed: String = token
                    .term
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string();

                if trimmed.chars().count() >= self.min_length
                    && trimmed.chars().any(|c| c.is_alphanumeric())
                {
                    token.term = trimmed;
                    Some(token)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Filters out tokens that are purely numeric (like "123", "2024", etc.)
pub struct NumericTokenFilter;

impl TokenFilter for NumericTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter(|token| token.term.chars().any(|c| c.is_alphabetic()))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AnalyzerKind {
    /// Lowercased words of two or more characters.
    #[default]
    Plain,
    /// Plain, plus URL stripping, numeric and stop word removal, and Porter stemming.
    English,
}

/// Pure text analysis pipeline: character filters, then a tokenizer, then token filters.
pub struct TextAnalyzer {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextToken {
    pub term: String,
    pub pos: usize,
}

impl std::ops::Deref for TextToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

impl TextAnalyzer {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    pub fn plain() -> Self {
        Self::new(
            vec![],
            Box::new(WordTokenizer),
            vec![
                Box::new(LowerCaseTokenFilter),
                Box::new(PunctuationStripFilter::default()),
            ],
        )
    }

    pub fn english() -> Self {
        Self::new(
            vec![Box::new(UrlStripFilter)],
            Box::new(WordTokenizer),
            vec![
                Box::new(LowerCaseTokenFilter),
                Box::new(PunctuationStripFilter::default()),
                Box::new(NumericTokenFilter),
                Box::new(StopWordTokenFilter),
                Box::new(PorterStemmerTokenFilter),
            ],
        )
    }

    pub fn for_kind(kind: AnalyzerKind) -> Self {
        match kind {
            AnalyzerKind::Plain => Self::plain(),
            AnalyzerKind::English => Self::english(),
        }
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content
    }

    pub fn tokenize(&self, content: String) -> Vec<TextToken> {
        let tokens = self.tokenizer.tokenize(content);
        tokens
            .into_iter()
            .enumerate()
            .map(|(idx, term)| TextToken { term, pos: idx })
            .collect()
    }

    pub fn token_filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Analyzes raw text and returns the surviving tokens in order.
    pub fn analyze(&self, raw_content: &str) -> Vec<TextToken> {
        let content = self.char_filter(raw_content.to_string());
        let tokens = self.tokenize(content);
        self.token_filter(tokens)
    }

    /// Convenience for callers that only need the terms.
    pub fn terms(&self, raw_content: &str) -> Vec<String> {
        self.analyze(raw_content).into_iter().map(|t| t.term).collect()
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::plain()
    }
}
