use anyhow::{Context, Result};
use regex::Regex;

const LABEL_TRAILERS: &[char] = &[',', ';', ':', '*'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineGroup {
    pub label: String,
    pub values: Vec<u64>,
    pub coerced: Vec<String>,
}

enum Token<'a> {
    Word(&'a str),
    Count(u64),
    Coerced(u64),
    Share,
}

pub struct CellParser {
    count: Regex,
    share: Regex,
    loose_number: Regex,
}

impl CellParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            count: Regex::new(r"^(?:\d{1,3}(?:\.\d{3})+|\d+)$")
                .context("failed to compile count regex")?,
            share: Regex::new(r"^\d+(?:[.,]\d+)?%$|^\d+,\d+$")
                .context("failed to compile share regex")?,
            loose_number: Regex::new(r"^\d[\d.,']*\d$")
                .context("failed to compile loose number regex")?,
        })
    }

    fn classify<'a>(&self, word: &'a str) -> Token<'a> {
        if self.count.is_match(word) {
            if let Ok(value) = word.replace('.', "").parse::<u64>() {
                return Token::Count(value);
            }
        }
        if self.share.is_match(word) {
            return Token::Share;
        }
        if self.loose_number.is_match(word) {
            let digits = word
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>();
            if let Ok(value) = digits.parse::<u64>() {
                return Token::Coerced(value);
            }
        }
        if matches!(word, "-" | "–" | "—") {
            return Token::Count(0);
        }
        Token::Word(word)
    }

    pub fn group_line(&self, line: &str) -> Vec<LineGroup> {
        let mut groups: Vec<LineGroup> = Vec::new();
        let mut label_words: Vec<&str> = Vec::new();

        for word in line.split_whitespace() {
            let token = self.classify(word);
            if let Token::Word(word) = token {
                label_words.push(word);
                continue;
            }

            if !label_words.is_empty() {
                groups.push(LineGroup {
                    label: clean_label(&label_words.join(" ")),
                    values: Vec::new(),
                    coerced: Vec::new(),
                });
                label_words.clear();
            }
            let Some(group) = groups.last_mut() else {
                continue;
            };
            match token {
                Token::Count(value) => group.values.push(value),
                Token::Coerced(value) => {
                    group.values.push(value);
                    group.coerced.push(word.to_string());
                }
                Token::Share | Token::Word(_) => {}
            }
        }

        groups.retain(|group| !group.values.is_empty());
        groups
    }
}

pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_label(label: &str) -> String {
    let label = label.rsplit_once(": ").map_or(label, |(_, value)| value);
    let trimmed = label
        .trim_start_matches(|ch: char| ch.is_whitespace() || ch == '*')
        .trim_end_matches(|ch: char| ch.is_whitespace() || LABEL_TRAILERS.contains(&ch));
    normalize_label(trimmed)
}
