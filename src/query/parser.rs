use std::sync::Arc;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, multispace0, multispace1, satisfy};
use nom::combinator::{eof, recognize, value};
use nom::sequence::{delimited, pair, terminated};
use nom::{IResult, Parser};
use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::{BoolQuery, PhraseQuery, PrefixQuery, Query, TermQuery, WildcardQuery};

/// Query parser for Lucene-style query strings.
///
/// Supported syntax:
/// - `rust programming` -> clauses joined by the default operator
/// - `rust AND programming`, `rust OR go`, `NOT java`, `+must -not`
/// - `title:rust`, `title:(rust OR go)` -> field-specific clauses
/// - `"exact phrase"` -> phrase query
/// - `rus*` -> prefix query, `r?st`, `*ust` -> wildcard query
pub struct QueryParser {
    pub default_field: String,
    pub default_operator: BooleanOperator,
    pub allow_leading_wildcard: bool,
    pub analyzer: Arc<Analyzer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occur {
    Must,
    Should,
    MustNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    Required,
    Prohibited,
}

#[derive(Debug)]
enum Node<'a> {
    Term(Option<&'a str>, &'a str),
    Phrase(Option<&'a str>, &'a str),
    Group(Option<&'a str>, Vec<RawClause<'a>>),
}

#[derive(Debug)]
struct RawClause<'a> {
    conjunction: Option<BooleanOperator>,
    modifier: Option<Modifier>,
    node: Node<'a>,
}

type Res<'a, O> = IResult<&'a str, O>;

impl QueryParser {
    pub fn new(default_field: &str, analyzer: Arc<Analyzer>) -> Self {
        QueryParser {
            default_field: default_field.to_string(),
            default_operator: BooleanOperator::Or,
            allow_leading_wildcard: false,
            analyzer,
        }
    }

    pub fn with_leading_wildcard(mut self, allow: bool) -> Self {
        self.allow_leading_wildcard = allow;
        self
    }

    /// Parse a query string into Query AST
    pub fn parse(&self, input: &str) -> Result<Query> {
        let (rest, clauses) = clauses(input)
            .map_err(|e| Error::new(ErrorKind::Parse, format!("invalid query '{}': {}", input, e)))?;
        let (rest, _) = ws(rest).map_err(|_| Error::new(ErrorKind::Parse, "invalid query"))?;
        if !rest.is_empty() {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("unexpected '{}' in query '{}'", rest, input),
            ));
        }
        self.build_clauses(&self.default_field, clauses)
    }

    fn build_clauses(&self, field: &str, raw: Vec<RawClause<'_>>) -> Result<Query> {
        let mut clauses: Vec<(Occur, Query)> = Vec::new();

        for (i, clause) in raw.into_iter().enumerate() {
            if i == 0 && clause.conjunction.is_some() {
                return Err(Error::new(ErrorKind::Parse, "query cannot start with AND/OR"));
            }

            let mut occur = match clause.modifier {
                Some(Modifier::Required) => Occur::Must,
                Some(Modifier::Prohibited) => Occur::MustNot,
                None if self.default_operator == BooleanOperator::And => Occur::Must,
                None => Occur::Should,
            };

            if clause.conjunction == Some(BooleanOperator::And) {
                if let Some(last) = clauses.last_mut() {
                    if last.0 == Occur::Should {
                        last.0 = Occur::Must;
                    }
                }
                if occur == Occur::Should {
                    occur = Occur::Must;
                }
            }

            if let Some(query) = self.build_node(field, clause.node)? {
                clauses.push((occur, query));
            }
        }

        if clauses.len() == 1 && clauses[0].0 != Occur::MustNot {
            if let Some((_, query)) = clauses.pop() {
                return Ok(query);
            }
        }

        let mut bool_query = BoolQuery::new();
        for (occur, query) in clauses {
            match occur {
                Occur::Must => bool_query.must.push(query),
                Occur::Should => bool_query.should.push(query),
                Occur::MustNot => bool_query.must_not.push(query),
            }
        }
        Ok(Query::Bool(bool_query))
    }

    fn build_node(&self, field: &str, node: Node<'_>) -> Result<Option<Query>> {
        match node {
            Node::Group(f, clauses) => self.build_clauses(f.unwrap_or(field), clauses).map(Some),
            Node::Term(f, text) => {
                let field = f.unwrap_or(field);
                if text.contains(['*', '?']) {
                    return self.multi_term(field, text).map(Some);
                }
                let tokens = self.analyzer.analyze(text);
                Ok(match tokens.len() {
                    0 => None,
                    1 => Some(Query::term(field, &tokens[0].text)),
                    _ => Some(Query::Bool(BoolQuery {
                        should: tokens.iter().map(|t| Query::term(field, &t.text)).collect(),
                        ..Default::default()
                    })),
                })
            }
            Node::Phrase(f, text) => {
                let field = f.unwrap_or(field);
                let tokens = self.analyzer.analyze(text);
                Ok(match tokens.len() {
                    0 => None,
                    1 => Some(Query::term(field, &tokens[0].text)),
                    _ => {
                        let base = tokens[0].position;
                        Some(Query::Phrase(PhraseQuery {
                            field: field.to_string(),
                            terms: tokens.into_iter().map(|t| (t.text, t.position - base)).collect(),
                        }))
                    }
                })
            }
        }
    }

    fn multi_term(&self, field: &str, text: &str) -> Result<Query> {
        if !self.allow_leading_wildcard && text.starts_with(['*', '?']) {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("leading wildcard not allowed in '{}'", text),
            ));
        }
        let pattern = self.analyzer.normalize(text);
        if let Some(prefix) = pattern.strip_suffix('*') {
            if !prefix.contains(['*', '?']) {
                return Ok(Query::Prefix(PrefixQuery {
                    field: field.to_string(),
                    prefix: prefix.to_string(),
                }));
            }
        }
        Ok(Query::Wildcard(WildcardQuery {
            field: field.to_string(),
            pattern,
        }))
    }
}

fn ws(i: &str) -> Res<'_, &str> {
    multispace0(i)
}

fn clauses(mut i: &str) -> Res<'_, Vec<RawClause<'_>>> {
    let mut out = Vec::new();
    loop {
        let (rest, _) = ws(i)?;
        if rest.is_empty() || rest.starts_with(')') {
            return Ok((rest, out));
        }
        let (rest, clause) = clause(rest)?;
        out.push(clause);
        i = rest;
    }
}

fn clause(i: &str) -> Res<'_, RawClause<'_>> {
    let (i, conjunction) = match conjunction(i) {
        Ok((rest, op)) => (rest, Some(op)),
        Err(_) => (i, None),
    };
    let (i, modifier) = match modifier(i) {
        Ok((rest, m)) => (rest, Some(m)),
        Err(_) => (i, None),
    };
    let (i, node) = node(i)?;
    Ok((i, RawClause { conjunction, modifier, node }))
}

fn conjunction(i: &str) -> Res<'_, BooleanOperator> {
    alt((
        terminated(value(BooleanOperator::And, alt((tag("AND"), tag("&&")))), alt((multispace1, eof))),
        terminated(value(BooleanOperator::Or, alt((tag("OR"), tag("||")))), alt((multispace1, eof))),
    ))
    .parse(i)
}

fn modifier(i: &str) -> Res<'_, Modifier> {
    alt((
        value(Modifier::Required, char('+')),
        value(Modifier::Prohibited, char('-')),
        value(Modifier::Prohibited, char('!')),
        value(Modifier::Prohibited, terminated(tag("NOT"), alt((multispace1, eof)))),
    ))
    .parse(i)
}

fn node(i: &str) -> Res<'_, Node<'_>> {
    if let Ok((rest, field)) = terminated(field_name, char(':')).parse(i) {
        let (rest, node) = unfielded(rest)?;
        let node = match node {
            Node::Term(_, text) => Node::Term(Some(field), text),
            Node::Phrase(_, text) => Node::Phrase(Some(field), text),
            Node::Group(_, clauses) => Node::Group(Some(field), clauses),
        };
        return Ok((rest, node));
    }
    unfielded(i)
}

fn unfielded(i: &str) -> Res<'_, Node<'_>> {
    alt((group, phrase, bare_term)).parse(i)
}

fn field_name(i: &str) -> Res<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
    ))
    .parse(i)
}

fn group(i: &str) -> Res<'_, Node<'_>> {
    let (i, clauses) = delimited(char('('), clauses, pair(ws, char(')'))).parse(i)?;
    Ok((i, Node::Group(None, clauses)))
}

fn phrase(i: &str) -> Res<'_, Node<'_>> {
    let (i, text) = delimited(char('"'), take_while(|c: char| c != '"'), char('"')).parse(i)?;
    Ok((i, Node::Phrase(None, text)))
}

fn bare_term(i: &str) -> Res<'_, Node<'_>> {
    let (i, text) = take_while1(|c: char| !c.is_whitespace() && !matches!(c, '(' | ')' | '"')).parse(i)?;
    Ok((i, Node::Term(None, text)))
}
