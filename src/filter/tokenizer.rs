//! Filter tokenizer.
//!
//! The raw filter is percent-encoded once and only the structural characters
//! are decoded back (parentheses, brackets, quotes, backslash, whitespace).
//! Everything else inside a word stays encoded while scanning, so characters
//! a client smuggles in through an already-encoded filter can never be
//! mistaken for structure. Each emitted word is decoded again on the way out.

use crate::error::FilterError;
use std::fmt;

/// One word of a filter clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Bare(String),
    /// Quoted literal with the quotes stripped and escapes resolved
    Quoted(String),
}

impl Word {
    pub fn as_str(&self) -> &str {
        match self {
            Word::Bare(word) | Word::Quoted(word) => word,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, Word::Quoted(_))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Bare(word) => f.write_str(word),
            Word::Quoted(word) => write_quoted(f, word),
        }
    }
}

/// Write `value` as a double-quoted filter literal.
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

/// A filter token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    OpenParen,
    CloseParen,
    And,
    Or,
    Not,
    /// `attr[` opening a value path filter on `attr`
    ValuePathOpen(String),
    /// `]` closing a value path filter
    ValuePathClose,
    /// Unparsed simple filter clause, e.g. `userName eq "bjensen"`
    Clause(Vec<Word>),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::ValuePathOpen(attribute) => write!(f, "{}[", attribute),
            Token::ValuePathClose => f.write_str("]"),
            Token::Clause(words) => {
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", word)?;
                }
                Ok(())
            }
        }
    }
}

/// Split a filter string into tokens.
///
/// An empty or blank filter yields no tokens.
pub fn tokenize(filter: &str) -> Result<Vec<Token>, FilterError> {
    let encoded = urlencoding::encode(filter);
    let restored = restore_structural(&encoded);

    let mut tokenizer = Tokenizer::default();
    let mut chars = restored.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                tokenizer.end_word()?;
                let mut literal = String::new();
                let mut closed = false;
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => match chars.next() {
                            Some(escaped) => literal.push(escaped),
                            None => break,
                        },
                        quote if quote == c => {
                            closed = true;
                            break;
                        }
                        other => literal.push(other),
                    }
                }
                if !closed {
                    return Err(FilterError::UnterminatedString);
                }
                tokenizer.clause.push(Word::Quoted(decode(&literal)?));
            }
            '(' => {
                tokenizer.flush()?;
                tokenizer.tokens.push(Token::OpenParen);
            }
            ')' => {
                tokenizer.flush()?;
                tokenizer.tokens.push(Token::CloseParen);
            }
            '[' => tokenizer.open_value_path()?,
            ']' => tokenizer.close_value_path()?,
            c if c.is_whitespace() => tokenizer.end_word()?,
            c => tokenizer.word.push(c),
        }
    }

    tokenizer.flush()?;
    if let Some(attribute) = tokenizer.value_path {
        return Err(FilterError::InvalidValuePath {
            details: format!("'{}[' is never closed", attribute),
        });
    }
    Ok(tokenizer.tokens)
}

/// Decode the percent-encoded structural characters back to literals.
fn restore_structural(encoded: &str) -> String {
    let mut restored = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(index) = rest.find('%') {
        restored.push_str(&rest[..index]);
        let escape = rest.get(index..index + 3).unwrap_or(&rest[index..]);
        let literal = match escape {
            "%28" => Some('('),
            "%29" => Some(')'),
            "%5B" => Some('['),
            "%5D" => Some(']'),
            "%22" => Some('"'),
            "%27" => Some('\''),
            "%5C" => Some('\\'),
            "%20" => Some(' '),
            "%09" => Some('\t'),
            "%0A" => Some('\n'),
            "%0D" => Some('\r'),
            _ => None,
        };
        match literal {
            Some(c) => restored.push(c),
            None => restored.push_str(escape),
        }
        rest = &rest[index + escape.len()..];
    }
    restored.push_str(rest);
    restored
}

fn decode(word: &str) -> Result<String, FilterError> {
    urlencoding::decode(word)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| FilterError::InvalidEncoding)
}

#[derive(Default)]
struct Tokenizer {
    tokens: Vec<Token>,
    clause: Vec<Word>,
    word: String,
    /// Attribute of the enclosing `attr[...]` value path
    value_path: Option<String>,
}

impl Tokenizer {
    /// Finish the word being scanned; keywords become tokens of their own.
    fn end_word(&mut self) -> Result<(), FilterError> {
        if self.word.is_empty() {
            return Ok(());
        }
        let word = decode(&std::mem::take(&mut self.word))?;
        let keyword = match word.to_ascii_lowercase().as_str() {
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            _ => None,
        };
        match keyword {
            Some(token) => {
                self.flush_clause();
                self.tokens.push(token);
            }
            None => self.clause.push(Word::Bare(word)),
        }
        Ok(())
    }

    /// Finish the pending word and emit the pending clause, if any.
    fn flush(&mut self) -> Result<(), FilterError> {
        self.end_word()?;
        self.flush_clause();
        Ok(())
    }

    fn flush_clause(&mut self) {
        if self.clause.is_empty() {
            return;
        }
        let words = std::mem::take(&mut self.clause);
        self.tokens.push(Token::Clause(words));
    }

    /// `attr[` opens a value path. Clauses inside name sub-attributes of
    /// `attr` and are resolved against it by the tree builder.
    fn open_value_path(&mut self) -> Result<(), FilterError> {
        if let Some(open) = &self.value_path {
            return Err(FilterError::InvalidValuePath {
                details: format!("nested value path inside '{}['", open),
            });
        }
        let attribute = decode(&std::mem::take(&mut self.word))?;
        if attribute.is_empty() || !self.clause.is_empty() {
            return Err(FilterError::InvalidValuePath {
                details: "'[' must directly follow an attribute name".to_string(),
            });
        }
        self.tokens.push(Token::ValuePathOpen(attribute.clone()));
        self.value_path = Some(attribute);
        Ok(())
    }

    fn close_value_path(&mut self) -> Result<(), FilterError> {
        if self.value_path.is_none() {
            return Err(FilterError::InvalidValuePath {
                details: "']' without matching '['".to_string(),
            });
        }
        self.flush()?;
        self.value_path = None;
        self.tokens.push(Token::ValuePathClose);
        Ok(())
    }
}
