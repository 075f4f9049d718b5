//! Filter expressions for table queries.
//!
//! The language is the subset the deployed clients actually send:
//! conjunctions of equality clauses, e.g.
//!
//! ```text
//! PartitionKey eq 'alice;bob' and isRead eq false
//! ```
//!
//! `PartitionKey` and `RowKey` address the entity's key columns; any other
//! field name addresses the entity's field map. String literals are
//! single-quoted with `''` as an escaped quote. An empty expression matches
//! every entity in the table.

use serde_json::Value;

use crate::StorageError;
use crate::models::Entity;

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Bool(bool),
    Num(f64),
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    field: String,
    value: Literal,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, StorageError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(Self::default());
        }

        let mut clauses = Vec::new();
        let mut it = tokens.into_iter();

        loop {
            let field = match it.next() {
                Some(Token::Word(w)) => w,
                other => return Err(invalid(format!("expected field name, got {other:?}"))),
            };
            match it.next() {
                Some(Token::Word(op)) if op == "eq" => {}
                other => return Err(invalid(format!("expected 'eq', got {other:?}"))),
            }
            let value = match it.next() {
                Some(Token::Str(s)) => Literal::Str(s),
                Some(Token::Word(w)) if w == "true" => Literal::Bool(true),
                Some(Token::Word(w)) if w == "false" => Literal::Bool(false),
                Some(Token::Word(w)) => match w.parse::<f64>() {
                    Ok(n) => Literal::Num(n),
                    Err(_) => return Err(invalid(format!("bad literal '{w}'"))),
                },
                None => return Err(invalid("expected literal, got end of input")),
            };
            clauses.push(Clause { field, value });

            match it.next() {
                None => break,
                Some(Token::Word(w)) if w == "and" => continue,
                other => return Err(invalid(format!("expected 'and', got {other:?}"))),
            }
        }

        Ok(Self { clauses })
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.clauses.iter().all(|c| clause_matches(c, entity))
    }
}

/// Quote a string literal for embedding in a filter expression.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn invalid(msg: impl Into<String>) -> StorageError {
    StorageError::InvalidFilter(msg.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>, StorageError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '\'' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some('\'') => {
                        // '' inside a literal is an escaped quote
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            s.push('\'');
                        } else {
                            break;
                        }
                    }
                    Some(ch) => s.push(ch),
                    None => return Err(invalid("unterminated string literal")),
                }
            }
            tokens.push(Token::Str(s));
        } else {
            let mut w = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '\'' {
                    break;
                }
                w.push(ch);
                chars.next();
            }
            tokens.push(Token::Word(w));
        }
    }

    Ok(tokens)
}

fn clause_matches(clause: &Clause, entity: &Entity) -> bool {
    match clause.field.as_str() {
        "PartitionKey" => match &clause.value {
            Literal::Str(s) => *s == entity.partition_key,
            _ => false,
        },
        "RowKey" => match &clause.value {
            Literal::Str(s) => *s == entity.row_key,
            _ => false,
        },
        field => match (entity.fields.get(field), &clause.value) {
            (Some(Value::String(v)), Literal::Str(s)) => v == s,
            (Some(Value::Bool(v)), Literal::Bool(b)) => v == b,
            (Some(Value::Number(v)), Literal::Num(n)) => v.as_f64() == Some(*n),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Entity {
        Entity::new("alice;bob", "0000001700000000")
            .with_field("Sender", "alice")
            .with_field("isRead", false)
            .with_field("sentAt", 1700000000i64)
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::parse("").unwrap();
        assert!(f.matches(&entity()));
        let f = Filter::parse("   ").unwrap();
        assert!(f.matches(&entity()));
    }

    #[test]
    fn key_and_field_conjunction() {
        let f = Filter::parse("PartitionKey eq 'alice;bob' and isRead eq false").unwrap();
        assert!(f.matches(&entity()));

        let f = Filter::parse("PartitionKey eq 'alice;bob' and isRead eq true").unwrap();
        assert!(!f.matches(&entity()));

        let f = Filter::parse("PartitionKey eq 'alice;carol'").unwrap();
        assert!(!f.matches(&entity()));
    }

    #[test]
    fn string_and_number_literals() {
        let f = Filter::parse("Sender eq 'alice'").unwrap();
        assert!(f.matches(&entity()));

        let f = Filter::parse("sentAt eq 1700000000").unwrap();
        assert!(f.matches(&entity()));

        let f = Filter::parse("sentAt eq 1").unwrap();
        assert!(!f.matches(&entity()));
    }

    #[test]
    fn missing_field_never_matches() {
        let f = Filter::parse("nope eq 'x'").unwrap();
        assert!(!f.matches(&entity()));
    }

    #[test]
    fn escaped_quote_in_literal() {
        let e = Entity::new("p", "r").with_field("name", "o'brien");
        let expr = format!("name eq {}", quote("o'brien"));
        let f = Filter::parse(&expr).unwrap();
        assert!(f.matches(&e));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        assert!(matches!(
            Filter::parse("PartitionKey eq"),
            Err(StorageError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::parse("PartitionKey ne 'x'"),
            Err(StorageError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::parse("Sender eq 'unterminated"),
            Err(StorageError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::parse("Sender eq 'a' or Sender eq 'b'"),
            Err(StorageError::InvalidFilter(_))
        ));
    }
}
