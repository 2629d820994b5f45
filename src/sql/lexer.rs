use crate::config::Limits;
use crate::error::{DbError, DbResult};

/// Stand-in for a space inside a single argument word.
///
/// When a statement arrives as several argument words, spaces inside each
/// word are replaced by this byte before the words are joined, so the
/// tokenizer does not split them. Token text converts it back.
pub const ESCAPED_SPACE: char = '\u{7}';

/// The LIKE operator spelling used inside WHERE clauses
pub const LIKE_OPERATOR: &str = "~";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    From,
    Into,
    Where,
    Order,
    By,
    Values,
    And,
    Asc,
    Desc,
    Top,
    Csv,
}

impl Keyword {
    /// Keywords are exact, case-sensitive matches
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "from" => Some(Keyword::From),
            "into" => Some(Keyword::Into),
            "where" => Some(Keyword::Where),
            "order" => Some(Keyword::Order),
            "by" => Some(Keyword::By),
            "values" => Some(Keyword::Values),
            "and" => Some(Keyword::And),
            "asc" => Some(Keyword::Asc),
            "desc" => Some(Keyword::Desc),
            "top" => Some(Keyword::Top),
            "csv" => Some(Keyword::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::From => "from",
            Keyword::Into => "into",
            Keyword::Where => "where",
            Keyword::Order => "order",
            Keyword::By => "by",
            Keyword::Values => "values",
            Keyword::And => "and",
            Keyword::Asc => "asc",
            Keyword::Desc => "desc",
            Keyword::Top => "top",
            Keyword::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    /// A bare word, possibly holding escaped spaces
    Word(String),
    /// A single- or double-quoted literal, quotes removed
    Quoted(String),
}

impl Token {
    /// Text of the token with escaped spaces restored
    pub fn text(&self) -> String {
        match self {
            Token::Keyword(kw) => kw.as_str().to_string(),
            Token::Word(word) => unescape(word),
            Token::Quoted(literal) => unescape(literal),
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(kw) if *kw == keyword)
    }
}

fn unescape(text: &str) -> String {
    text.replace(ESCAPED_SPACE, " ")
}

/// Rebuild one statement string from its argument words.
///
/// `words` excludes the command keyword. More than one word means the caller
/// passed the statement unquoted, so each word's own spaces are escaped
/// before joining.
pub fn reconstruct(words: &[&str], limits: &Limits) -> DbResult<String> {
    let escape = words.len() > 1;
    let mut statement = String::new();

    for word in words {
        if !statement.is_empty() {
            statement.push(' ');
        }
        if statement.len() + word.len() > limits.statement {
            return Err(DbError::ArgumentTooLong(String::new()));
        }
        if escape {
            statement.extend(word.chars().map(|c| if c == ' ' { ESCAPED_SPACE } else { c }));
        } else {
            statement.push_str(word);
        }
    }

    Ok(statement)
}

/// Splits a reconstructed statement into tokens on single spaces
pub struct Tokenizer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn skip_spaces(&mut self) {
        let rest = &self.input[self.position..];
        self.position += rest.len() - rest.trim_start_matches(' ').len();
    }

    fn read_quoted(&mut self, quote: char) -> DbResult<Token> {
        // Skip opening quote
        let start = self.position + 1;
        match self.input[start..].find(quote) {
            Some(end) => {
                self.position = start + end + 1;
                Ok(Token::Quoted(self.input[start..start + end].to_string()))
            }
            None => Err(DbError::ParseError(format!(
                "unterminated quoted literal: {}",
                unescape(&self.input[self.position..])
            ))),
        }
    }

    fn read_word(&mut self) -> Token {
        let rest = &self.input[self.position..];
        let end = rest.find(' ').unwrap_or(rest.len());
        let word = &rest[..end];
        self.position += end;

        if word == "like" {
            return Token::Word(LIKE_OPERATOR.to_string());
        }
        match Keyword::from_word(word) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Word(word.to_string()),
        }
    }

    pub fn next_token(&mut self) -> DbResult<Option<Token>> {
        self.skip_spaces();
        if self.position >= self.input.len() {
            return Ok(None);
        }

        match self.input[self.position..].chars().next() {
            Some(quote @ ('\'' | '"')) => self.read_quoted(quote).map(Some),
            _ => Ok(Some(self.read_word())),
        }
    }

    pub fn tokenize(&mut self) -> DbResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
