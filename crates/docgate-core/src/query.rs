//! Query model and query-string parsing.
//!
//! A [`Query`] is the structured predicate handed to an index engine. The
//! rest of Docgate treats it as wrap-only: queries are built from terms and
//! combined with [`BooleanQuery`], but never taken apart again.
//!
//! ## Query Syntax
//!
//! - `budget` - Term in the default field
//! - `title:report` - Term in the `title` field
//! - `title:"annual report"` - Phrase in the `title` field
//! - `"annual report"` - Phrase in the default field
//! - `year:[2000 TO 2010]` - Inclusive range (`{..}` for exclusive)
//! - `+term` / `-term` - Required / prohibited clause
//! - `a OR b` - Either clause (clauses are required by default)
//!
//! Text is split on whitespace only and compared case-sensitively.

use crate::error::{DocgateError, Result};

/// How a clause takes part in a boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match
    Must,
    /// The clause may match; at least one must if there is no `Must` clause
    Should,
    /// The clause must not match
    MustNot,
}

/// A structured search predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A single token in a field
    Term { field: String, value: String },

    /// Consecutive tokens in a field
    Phrase { field: String, terms: Vec<String> },

    /// Tokens between two bounds
    Range {
        field: String,
        lower: String,
        upper: String,
        inclusive: bool,
    },

    /// A combination of clauses
    Boolean(BooleanQuery),

    /// Every document
    MatchAll,
}

impl Query {
    /// A term query
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// A phrase query; a single-token phrase is a term query
    pub fn phrase(field: impl Into<String>, mut terms: Vec<String>) -> Self {
        if terms.len() == 1 {
            Query::term(field, terms.remove(0))
        } else {
            Query::Phrase {
                field: field.into(),
                terms,
            }
        }
    }

    /// Whether this is a multi-clause boolean query
    pub fn is_boolean(&self) -> bool {
        matches!(self, Query::Boolean(_))
    }
}

impl From<BooleanQuery> for Query {
    fn from(query: BooleanQuery) -> Self {
        Query::Boolean(query)
    }
}

/// One clause of a boolean query.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanClause {
    pub occur: Occur,
    pub query: Query,
}

/// A conjunction/disjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    /// Create an empty boolean query (matches nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause
    pub fn with_clause(mut self, query: Query, occur: Occur) -> Self {
        self.add(query, occur);
        self
    }

    /// Add a clause in place
    pub fn add(&mut self, query: Query, occur: Occur) {
        self.clauses.push(BooleanClause { occur, query });
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Parse a query string into a [`Query`].
///
/// Clauses that name no field search `default_field`. A query consisting
/// of a single required clause is returned as that clause rather than as a
/// boolean query. An empty query string yields an empty boolean query.
pub fn parse_query(input: &str, default_field: &str) -> Result<Query> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().peekable(),
        default_field,
    };

    let mut clauses: Vec<BooleanClause> = Vec::new();
    let mut pending_or = false;

    while let Some(token) = parser.next_clause()? {
        let (prefix, query) = match token {
            Token::Connective(Connective::And) => continue,
            Token::Connective(Connective::Or) => {
                if clauses.is_empty() {
                    return Err(parser.error("OR without a preceding clause"));
                }
                pending_or = true;
                continue;
            }
            Token::Clause { prefix, query } => (prefix, query),
        };

        let query = match query {
            Some(query) => query,
            None => continue,
        };

        let occur = match prefix {
            Some(occur) => occur,
            None if pending_or => Occur::Should,
            None => Occur::Must,
        };

        if pending_or {
            if let Some(previous) = clauses.last_mut() {
                if previous.occur == Occur::Must {
                    previous.occur = Occur::Should;
                }
            }
            pending_or = false;
        }

        clauses.push(BooleanClause { occur, query });
    }

    if pending_or {
        return Err(parser.error("OR without a following clause"));
    }

    if clauses.len() == 1 && clauses[0].occur == Occur::Must {
        if let Some(clause) = clauses.pop() {
            return Ok(clause.query);
        }
    }

    Ok(Query::Boolean(BooleanQuery { clauses }))
}

enum Connective {
    And,
    Or,
}

enum Token {
    Connective(Connective),
    /// `query` is `None` for clauses without tokens (e.g. `""`)
    Clause {
        prefix: Option<Occur>,
        query: Option<Query>,
    },
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    default_field: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> DocgateError {
        DocgateError::QuerySyntax {
            query: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn next_clause(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let prefix = match self.chars.peek() {
            None => return Ok(None),
            Some((_, '+')) => {
                self.chars.next();
                Some(Occur::Must)
            }
            Some((_, '-')) => {
                self.chars.next();
                Some(Occur::MustNot)
            }
            Some(_) => None,
        };

        if let Some((_, '"')) = self.chars.peek() {
            self.chars.next();
            let terms = self.read_phrase()?;
            return Ok(Some(Token::Clause {
                prefix,
                query: phrase_query(self.default_field, terms),
            }));
        }

        let word = self.read_word();
        if word.is_empty() {
            return Err(self.error("expected a term"));
        }

        if prefix.is_none() {
            match word.as_str() {
                "AND" | "&&" => return Ok(Some(Token::Connective(Connective::And))),
                "OR" | "||" => return Ok(Some(Token::Connective(Connective::Or))),
                _ => {}
            }
        }

        let query = if let Some((_, ':')) = self.chars.peek() {
            self.chars.next();
            Some(self.read_field_value(word)?)
        } else {
            Some(Query::term(self.default_field, word))
        };

        Ok(Some(Token::Clause { prefix, query }))
    }

    /// Read up to whitespace or a field separator
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == ':' {
                break;
            }
            word.push(c);
            self.chars.next();
        }
        word
    }

    fn read_field_value(&mut self, field: String) -> Result<Query> {
        match self.chars.peek() {
            Some((_, '"')) => {
                self.chars.next();
                let terms = self.read_phrase()?;
                Ok(phrase_query(&field, terms).unwrap_or_else(|| Query::Boolean(BooleanQuery::new())))
            }
            Some((_, '[')) | Some((_, '{')) => {
                let inclusive = matches!(self.chars.next(), Some((_, '[')));
                self.read_range(field, inclusive)
            }
            Some((_, c)) if !c.is_whitespace() => {
                let mut value = String::new();
                while let Some(&(_, c)) = self.chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    self.chars.next();
                }
                Ok(Query::term(field, value))
            }
            _ => Err(self.error(format!("missing value for field '{}'", field))),
        }
    }

    /// Read a phrase after its opening quote
    fn read_phrase(&mut self) -> Result<Vec<String>> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => break,
                Some((_, c)) => text.push(c),
                None => return Err(self.error("unterminated phrase")),
            }
        }
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    /// Read a range after its opening bracket
    fn read_range(&mut self, field: String, inclusive: bool) -> Result<Query> {
        let close = if inclusive { ']' } else { '}' };
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == close => break,
                Some((_, c)) => text.push(c),
                None => return Err(self.error("unterminated range")),
            }
        }

        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            [lower, "TO", upper] => Ok(Query::Range {
                field,
                lower: lower.to_string(),
                upper: upper.to_string(),
                inclusive,
            }),
            _ => Err(self.error(format!("malformed range '{}'", text))),
        }
    }
}

fn phrase_query(field: &str, terms: Vec<String>) -> Option<Query> {
    if terms.is_empty() {
        None
    } else {
        Some(Query::phrase(field, terms))
    }
}
