//! Keyword filter expressions
//!
//! Boolean keyword expressions evaluated against paper text
//! (title + abstract). Supports AND / OR / NOT, parentheses, and quoted
//! phrases; matching is case-insensitive substring containment.
//!
//! Examples: `transformer AND attention`, `"graph neural" OR gnn`,
//! `crispr AND NOT (review OR survey)`.

use citewalk_common::errors::{AppError, Result};

/// One parsed keyword filter
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    raw: String,
    expr: Expr,
}

#[derive(Debug, Clone)]
enum Expr {
    Term(String),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Term(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl KeywordFilter {
    /// Parse a filter expression. Bad syntax is a configuration error and
    /// surfaces at job submission, never mid-run.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(AppError::Configuration {
                message: format!("empty keyword expression: {:?}", input),
            });
        }
        let mut parser = Parser {
            tokens,
            position: 0,
            raw: input,
        };
        let expr = parser.parse_or()?;
        if parser.position != parser.tokens.len() {
            return Err(AppError::Configuration {
                message: format!("trailing tokens in keyword expression: {:?}", input),
            });
        }
        Ok(Self {
            raw: input.to_string(),
            expr,
        })
    }

    /// Evaluate the filter against a blob of text
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        eval(&self.expr, &lowered)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn eval(expr: &Expr, lowered_text: &str) -> bool {
    match expr {
        Expr::Term(term) => lowered_text.contains(term.as_str()),
        Expr::Not(inner) => !eval(inner, lowered_text),
        Expr::And(parts) => parts.iter().all(|p| eval(p, lowered_text)),
        Expr::Or(parts) => parts.iter().any(|p| eval(p, lowered_text)),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => phrase.push(ch),
                        None => {
                            return Err(AppError::Configuration {
                                message: format!(
                                    "unterminated quote in keyword expression: {:?}",
                                    input
                                ),
                            })
                        }
                    }
                }
                tokens.push(Token::Term(phrase.to_lowercase()));
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                match word.to_uppercase().as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    _ => tokens.push(Token::Term(word.to_lowercase())),
                }
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    raw: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn error(&self, message: &str) -> AppError {
        AppError::Configuration {
            message: format!("{} in keyword expression: {:?}", message, self.raw),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut parts = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            Expr::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut parts = vec![self.parse_not()?];
        while self.peek() == Some(&Token::And) {
            self.advance();
            parts.push(self.parse_not()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            Expr::And(parts)
        })
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Term(term)) => Ok(Expr::Term(term)),
            Some(Token::Open) => {
                let expr = self.parse_or()?;
                match self.advance() {
                    Some(Token::Close) => Ok(expr),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(other) => Err(self.error(&format!("unexpected token {:?}", other))),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_term() {
        let filter = KeywordFilter::parse("transformer").unwrap();
        assert!(filter.matches("Attention and the Transformer architecture"));
        assert!(!filter.matches("Support vector machines"));
    }

    #[test]
    fn test_and_or() {
        let filter = KeywordFilter::parse("graph AND (neural OR spectral)").unwrap();
        assert!(filter.matches("Graph neural networks"));
        assert!(filter.matches("Spectral graph theory"));
        assert!(!filter.matches("Graph coloring algorithms"));
    }

    #[test]
    fn test_not() {
        let filter = KeywordFilter::parse("crispr AND NOT review").unwrap();
        assert!(filter.matches("CRISPR gene editing in mice"));
        assert!(!filter.matches("CRISPR: a systematic review"));
    }

    #[test]
    fn test_quoted_phrase() {
        let filter = KeywordFilter::parse("\"graph neural\" OR gnn").unwrap();
        assert!(filter.matches("A survey of graph neural networks"));
        assert!(filter.matches("GNN benchmarks"));
        assert!(!filter.matches("neural graph construction"));
    }

    #[test]
    fn test_case_insensitive() {
        let filter = KeywordFilter::parse("TRANSFORMER").unwrap();
        assert!(filter.matches("the transformer model"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(KeywordFilter::parse("").is_err());
        assert!(KeywordFilter::parse("(foo").is_err());
        assert!(KeywordFilter::parse("foo AND").is_err());
        assert!(KeywordFilter::parse("\"unterminated").is_err());
        assert!(KeywordFilter::parse("foo bar )").is_err());
    }

    #[test]
    fn test_adjacent_terms_require_operator() {
        // Two bare terms with no operator leave a trailing token
        assert!(KeywordFilter::parse("foo bar").is_err());
    }
}
