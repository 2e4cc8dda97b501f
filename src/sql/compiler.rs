//! SQL compiler: named templates and condition sets to positional SQL.
//!
//! Both paths are pure and end in [`CompiledSql::new`], which refuses any SQL
//! whose `?` count differs from its parameter count.

use crate::core::value::{NamedParams, Value};
use crate::core::{Result, WeaveError};
use crate::sql::condition::{Comparator, Condition, ConditionSet, Node, Operand};
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::debug;

/// SQL text with `?` placeholders and exactly one bound value per placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    sql: String,
    params: Vec<Value>,
}

impl CompiledSql {
    /// Pairs SQL with its parameters after checking that the counts agree.
    ///
    /// Placeholders inside quoted literals, identifiers and comments are not
    /// counted; see [`count_placeholders`].
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Result<Self> {
        let sql = sql.into();
        let placeholders = count_placeholders(&sql);
        if placeholders != params.len() {
            return Err(WeaveError::ParameterCountMismatch {
                placeholders,
                params: params.len(),
            });
        }
        Ok(CompiledSql { sql, params })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

/// Closing delimiter for a quote-like opening character.
fn closing_quote(open: char) -> Option<char> {
    match open {
        '\'' => Some('\''),
        '"' => Some('"'),
        '`' => Some('`'),
        '[' => Some(']'),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Quoted(char),
    LineComment,
    /// Between the `/` and `*` of a block comment opener.
    BlockCommentStart,
    /// Inside a block comment; `true` when the previous char was `*`.
    BlockComment(bool),
}

/// Walks SQL text char by char, flagging which chars are live code.
///
/// Quoted literals and identifiers, `-- ..` line comments and `/* .. */`
/// block comments are not live, delimiters included. Doubled quotes
/// (`'it''s'`) close and reopen the literal, which keeps the scan in the
/// right state without special casing.
struct SqlScanner<'a> {
    chars: Peekable<CharIndices<'a>>,
    region: Region,
}

impl<'a> SqlScanner<'a> {
    fn new(sql: &'a str) -> Self {
        SqlScanner {
            chars: sql.char_indices().peekable(),
            region: Region::Code,
        }
    }
}

impl Iterator for SqlScanner<'_> {
    /// Byte offset, char, and whether the char is live code.
    type Item = (usize, char, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, ch) = self.chars.next()?;
        let next = self.chars.peek().map(|&(_, c)| c);
        let (region, live) = match self.region {
            Region::Code => match (ch, next) {
                ('-', Some('-')) => (Region::LineComment, false),
                ('/', Some('*')) => (Region::BlockCommentStart, false),
                _ => match closing_quote(ch) {
                    Some(close) => (Region::Quoted(close), false),
                    None => (Region::Code, true),
                },
            },
            Region::Quoted(close) if ch == close => (Region::Code, false),
            Region::Quoted(close) => (Region::Quoted(close), false),
            Region::LineComment if ch == '\n' => (Region::Code, false),
            Region::LineComment => (Region::LineComment, false),
            Region::BlockCommentStart => (Region::BlockComment(false), false),
            Region::BlockComment(true) if ch == '/' => (Region::Code, false),
            Region::BlockComment(_) => (Region::BlockComment(ch == '*'), false),
        };
        self.region = region;
        Some((i, ch, live))
    }
}

/// Number of parameters SQLite expects for `sql`.
///
/// Only `?` and `?NNN` in live code count. A bare `?` takes the index after
/// the largest one seen so far and `?NNN` names its index directly, so the
/// result is the largest index used: `?1 .. ?1` needs one parameter.
pub fn count_placeholders(sql: &str) -> usize {
    let mut largest = 0;
    let mut scanner = SqlScanner::new(sql).peekable();
    while let Some((_, ch, live)) = scanner.next() {
        if !live || ch != '?' {
            continue;
        }
        let mut digits = String::new();
        while let Some(&(_, digit, true)) = scanner.peek() {
            if !digit.is_ascii_digit() {
                break;
            }
            digits.push(digit);
            scanner.next();
        }
        largest = match digits.parse::<usize>() {
            Ok(index) => largest.max(index),
            Err(_) => largest + 1,
        };
    }
    largest
}

/// Returns the identifier of a `{identifier}` placeholder starting right
/// after the opening brace, if `rest` begins with one.
fn placeholder_name(rest: &str) -> Option<&str> {
    let end = rest.find('}')?;
    let name = &rest[..end];
    let mut chars = name.chars();
    let first = chars.next()?;
    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then_some(name)
}

/// Rewrites `{name}` placeholders into positional `?` parameters.
///
/// Each occurrence, in left-to-right order, contributes one parameter, so a
/// name used twice is bound twice. A `{` that does not open a well-formed
/// placeholder, or that sits inside a quoted literal or a comment, is
/// copied as is.
///
/// # Errors
///
/// - `MissingParameter` when a referenced name is absent from `params`
/// - `ParameterCountMismatch` when the template also carries literal `?`s
pub fn compile_template(template: &str, params: &NamedParams) -> Result<CompiledSql> {
    let mut sql = String::with_capacity(template.len());
    let mut values = Vec::new();
    let mut scanner = SqlScanner::new(template);

    while let Some((i, ch, live)) = scanner.next() {
        if live && ch == '{' {
            if let Some(name) = placeholder_name(&template[i + 1..]) {
                let value = params
                    .get(name)
                    .ok_or_else(|| WeaveError::MissingParameter(name.to_string()))?;
                sql.push('?');
                values.push(value.clone());
                // names are ASCII, so byte length equals char count; +1 for '}'
                for _ in 0..=name.len() {
                    scanner.next();
                }
                continue;
            }
        }
        sql.push(ch);
    }

    let compiled = CompiledSql::new(sql, values)?;
    debug!(sql = compiled.sql(), params = compiled.params().len(), "compiled template");
    Ok(compiled)
}

/// Appends ` where <conditions>` to `prefix`.
///
/// An empty set leaves the prefix untouched; refusing it for destructive
/// statements is the caller's decision.
pub fn compile_conditions(prefix: &str, conditions: &ConditionSet) -> Result<CompiledSql> {
    let mut sql = prefix.to_string();
    let mut params = Vec::new();
    append_where(&mut sql, &mut params, conditions)?;
    CompiledSql::new(sql, params)
}

/// Appends the where clause for `conditions` to an SQL buffer and its
/// parameters after any already collected.
pub(crate) fn append_where(sql: &mut String, params: &mut Vec<Value>, conditions: &ConditionSet) -> Result<()> {
    let mut clause = String::new();
    write_set(conditions, &mut clause, params)?;
    if !clause.is_empty() {
        sql.push_str(" where ");
        sql.push_str(&clause);
    }
    Ok(())
}

fn write_set(set: &ConditionSet, out: &mut String, params: &mut Vec<Value>) -> Result<()> {
    let mut first = true;
    for node in set.nodes() {
        if let Node::Group(group) = node {
            if group.is_empty() {
                continue;
            }
        }
        if !first {
            out.push_str(set.connective().separator());
        }
        first = false;
        match node {
            Node::Condition(condition) => write_condition(condition, out, params)?,
            Node::Group(group) => {
                out.push('(');
                write_set(group, out, params)?;
                out.push(')');
            }
        }
    }
    Ok(())
}

fn write_condition(condition: &Condition, out: &mut String, params: &mut Vec<Value>) -> Result<()> {
    let field = condition.field();
    match (condition.comparator(), condition.operand()) {
        (Comparator::IsNull, _) => {
            out.push_str(field);
            out.push_str(" is null");
        }
        (Comparator::IsNotNull, _) => {
            out.push_str(field);
            out.push_str(" is not null");
        }
        (comparator @ (Comparator::In | Comparator::NotIn), Operand::Sequence(values)) => {
            if values.is_empty() {
                return Err(WeaveError::InvalidCondition(format!(
                    "'{}' needs at least one value for in",
                    field
                )));
            }
            out.push_str(field);
            out.push_str(if comparator == Comparator::In { " in (" } else { " not in (" });
            out.push_str(&vec!["?"; values.len()].join(", "));
            out.push(')');
            params.extend(values.iter().cloned());
        }
        (Comparator::In | Comparator::NotIn, _) => {
            return Err(WeaveError::InvalidCondition(format!(
                "'{}' needs a sequence of values for in",
                field
            )));
        }
        (Comparator::Between, Operand::Sequence(values)) if values.len() == 2 => {
            out.push_str(field);
            out.push_str(" between ? and ?");
            params.extend(values.iter().cloned());
        }
        (Comparator::Between, _) => {
            return Err(WeaveError::InvalidCondition(format!(
                "'{}' needs exactly two values for between",
                field
            )));
        }
        (Comparator::Raw, operand) => {
            let values = operand.values();
            let placeholders = count_placeholders(field);
            if placeholders != values.len() {
                return Err(WeaveError::ParameterCountMismatch {
                    placeholders,
                    params: values.len(),
                });
            }
            out.push('(');
            out.push_str(field);
            out.push(')');
            params.extend(values.iter().cloned());
        }
        (comparator, Operand::Single(value)) => {
            // every remaining comparator has operator text
            let operator = comparator.operator().unwrap_or("=");
            out.push_str(field);
            out.push(' ');
            out.push_str(operator);
            out.push_str(" ?");
            params.push(value.clone());
        }
        (_, _) => {
            return Err(WeaveError::InvalidCondition(format!(
                "'{}' needs a single value for {:?}",
                field,
                condition.comparator()
            )));
        }
    }
    Ok(())
}
