use std::path::PathBuf;

use super::ast::*;
use super::lexer::{Keyword, Token, Tokenizer};
use super::pattern::Pattern;
use super::predicate::Predicate;
use crate::config::Limits;
use crate::error::{DbError, DbResult};

/// Growable text buffer with an enforced maximum length.
///
/// Text is appended in parts; `finish_part` closes the current part so
/// multi-part clauses (WHERE conjunctions) keep their boundaries. The limit
/// covers all parts together.
#[derive(Debug)]
struct ClauseBuffer {
    label: &'static str,
    limit: usize,
    len: usize,
    current: String,
    parts: Vec<String>,
}

impl ClauseBuffer {
    fn new(label: &'static str, limit: usize) -> Self {
        Self {
            label,
            limit,
            len: 0,
            current: String::new(),
            parts: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) -> DbResult<()> {
        if self.len + text.len() > self.limit {
            return Err(DbError::ArgumentTooLong(self.label.to_string()));
        }
        self.len += text.len();
        self.current.push_str(text);
        Ok(())
    }

    /// Append with a single space between this and the previous text
    fn push_spaced(&mut self, text: &str) -> DbResult<()> {
        if !self.current.is_empty() {
            self.push(" ")?;
        }
        self.push(text)
    }

    fn finish_part(&mut self) {
        if !self.current.is_empty() {
            self.parts.push(std::mem::take(&mut self.current));
        }
    }

    fn current(&self) -> &str {
        &self.current
    }

    fn into_parts(mut self) -> Vec<String> {
        self.finish_part();
        self.parts
    }

    fn into_text(self) -> String {
        self.into_parts().concat()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectState {
    Start,
    TopCount,
    Projection,
    Into,
    IntoCsvPath,
    AfterInto,
    FromPattern,
    AfterFrom,
    WhereStart,
    WhereClause,
    WhereAfterAnd,
    OrderKeyword,
    OrderStart,
    OrderField,
}

impl SelectState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            SelectState::AfterFrom | SelectState::WhereClause | SelectState::OrderField
        )
    }

    /// What the statement still needed when input ran out here
    fn expected(&self) -> &'static str {
        match self {
            SelectState::Start | SelectState::Projection => {
                "select list and from statement are expected"
            }
            SelectState::TopCount => "top count is expected",
            SelectState::Into => "into target is expected",
            SelectState::IntoCsvPath => "csv file path is expected",
            SelectState::AfterInto => "from statement is expected",
            SelectState::FromPattern => "from pattern is expected",
            SelectState::WhereStart | SelectState::WhereAfterAnd => "where condition is expected",
            SelectState::OrderKeyword => "missing 'by' after order",
            SelectState::OrderStart => "order field is expected",
            SelectState::AfterFrom | SelectState::WhereClause | SelectState::OrderField => {
                "statement is complete"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertState {
    Start,
    Target,
    AfterTarget,
    Fields,
    AfterFields,
    ValuesStart,
    Values,
    CsvPath,
    Done,
}

impl InsertState {
    fn expected(&self) -> &'static str {
        match self {
            InsertState::Start => "into statement is expected",
            InsertState::Target => "into target is expected",
            InsertState::AfterTarget => "field list, from or csv statement is expected",
            InsertState::Fields => "closing ')' of the field list is expected",
            InsertState::AfterFields => "values, from or csv statement is expected",
            InsertState::ValuesStart => "value list is expected",
            InsertState::Values => "closing ')' of the value list is expected",
            InsertState::CsvPath => "csv file path is expected",
            InsertState::Done => "statement is complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteState {
    Start,
    FromPattern,
    AfterFrom,
    WhereStart,
    WhereClause,
    WhereAfterAnd,
}

impl DeleteState {
    fn is_terminal(&self) -> bool {
        matches!(self, DeleteState::AfterFrom | DeleteState::WhereClause)
    }

    fn expected(&self) -> &'static str {
        match self {
            DeleteState::Start => "from statement is expected",
            DeleteState::FromPattern => "from pattern is expected",
            DeleteState::WhereStart | DeleteState::WhereAfterAnd => "where condition is expected",
            DeleteState::AfterFrom | DeleteState::WhereClause => "statement is complete",
        }
    }
}

/// Accumulates ORDER BY specs from tokens such as `age`, `desc,`, `name`
#[derive(Debug, Default)]
struct OrderBuilder {
    specs: Vec<OrderSpec>,
    pending: Option<OrderSpec>,
}

impl OrderBuilder {
    fn feed(&mut self, text: &str) -> DbResult<()> {
        for (i, segment) in text.split(',').enumerate() {
            if i > 0 {
                self.close();
            }
            match segment {
                "" => {}
                "asc" | "desc" => {
                    let spec = self.pending.as_mut().ok_or_else(|| {
                        DbError::ParseError(format!("'{}' without an order field", segment))
                    })?;
                    spec.direction = if segment == "desc" {
                        Direction::Desc
                    } else {
                        Direction::Asc
                    };
                }
                field => {
                    if let Some(prev) = &self.pending {
                        return Err(DbError::ParseError(format!(
                            "expected ',' between order fields '{}' and '{}'",
                            prev.field, field
                        )));
                    }
                    self.pending = Some(OrderSpec::new(field, Direction::Asc));
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(spec) = self.pending.take() {
            self.specs.push(spec);
        }
    }

    fn finish(mut self) -> Vec<OrderSpec> {
        self.close();
        self.specs
    }
}

fn unexpected(token: &Token, context: &str) -> DbError {
    DbError::ParseError(format!("unexpected '{}' {}", token.text(), context))
}

/// Split a parenthesized list like `(a, 'b c' ,d)` into trimmed items
fn parse_list(text: &str, what: &str) -> DbResult<Vec<String>> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| DbError::ParseError(format!("{} list must be enclosed in parentheses", what)))?;

    if inner.trim().is_empty() {
        return Err(DbError::ParseError(format!("empty {} list", what)));
    }

    Ok(inner.split(',').map(|item| trim_quotes(item.trim()).to_string()).collect())
}

/// Remove one layer of matching single or double quotes
pub(crate) fn trim_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Token-driven statement parser.
///
/// Each statement kind runs its own small state machine over the token
/// stream. Running out of tokens in a non-terminal state is a parse error.
pub struct Parser {
    tokens: Vec<Token>,
    limits: Limits,
}

impl Parser {
    /// Tokenize a reconstructed statement body
    pub fn new(statement: &str, limits: Limits) -> DbResult<Self> {
        let tokens = Tokenizer::new(statement).tokenize()?;
        Ok(Self { tokens, limits })
    }

    pub fn parse(self, kind: StatementKind) -> DbResult<Statement> {
        match kind {
            StatementKind::Select => self.parse_select().map(Statement::Select),
            StatementKind::Insert => self.parse_insert().map(Statement::Insert),
            StatementKind::Delete => self.parse_delete().map(Statement::Delete),
        }
    }

    fn parse_select(self) -> DbResult<SelectStatement> {
        let clause_limit = self.limits.clause;
        let mut state = SelectState::Start;
        let mut limit = None;
        let mut select = ClauseBuffer::new("select", clause_limit);
        let mut sink = SinkTarget::Display;
        let mut source = None;
        let mut where_buf = ClauseBuffer::new("where", clause_limit);
        let mut has_where = false;
        let mut order_buf = ClauseBuffer::new("order", clause_limit);
        let mut order = OrderBuilder::default();

        for token in &self.tokens {
            state = match state {
                SelectState::Start if token.is_keyword(Keyword::Top) => SelectState::TopCount,
                SelectState::Start | SelectState::Projection => match token {
                    Token::Keyword(Keyword::From) if !select.current().is_empty() => {
                        SelectState::FromPattern
                    }
                    Token::Keyword(Keyword::Into) if !select.current().is_empty() => {
                        SelectState::Into
                    }
                    Token::Keyword(_) => return Err(unexpected(token, "in select list")),
                    _ => {
                        select.push(&token.text())?;
                        SelectState::Projection
                    }
                },
                SelectState::TopCount => {
                    let n = token
                        .text()
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| {
                            DbError::ParseError(format!(
                                "top expects a positive integer, got '{}'",
                                token.text()
                            ))
                        })?;
                    limit = Some(n);
                    SelectState::Projection
                }
                SelectState::Into => match token {
                    Token::Keyword(Keyword::Csv) => SelectState::IntoCsvPath,
                    Token::Keyword(_) => return Err(unexpected(token, "after into")),
                    _ => {
                        sink = SinkTarget::MaterializeInto(token.text());
                        SelectState::AfterInto
                    }
                },
                SelectState::IntoCsvPath => {
                    sink = SinkTarget::AppendCsv(PathBuf::from(trim_quotes(&token.text())));
                    SelectState::AfterInto
                }
                SelectState::AfterInto => {
                    if token.is_keyword(Keyword::From) {
                        SelectState::FromPattern
                    } else {
                        return Err(DbError::ParseError("from statement is expected".to_string()));
                    }
                }
                SelectState::FromPattern => {
                    source = Some(token.text());
                    SelectState::AfterFrom
                }
                SelectState::AfterFrom => match token {
                    Token::Keyword(Keyword::Where) => {
                        has_where = true;
                        SelectState::WhereStart
                    }
                    Token::Keyword(Keyword::Order) => SelectState::OrderKeyword,
                    _ => {
                        return Err(DbError::ParseError(
                            "where or order statement is expected".to_string(),
                        ))
                    }
                },
                SelectState::WhereStart | SelectState::WhereAfterAnd => match token {
                    Token::Keyword(Keyword::Order) | Token::Keyword(Keyword::And) => {
                        return Err(unexpected(token, "where a condition is expected"))
                    }
                    _ => {
                        where_buf.push(&token.text())?;
                        SelectState::WhereClause
                    }
                },
                SelectState::WhereClause => match token {
                    Token::Keyword(Keyword::Order) => SelectState::OrderKeyword,
                    Token::Keyword(Keyword::And) => {
                        where_buf.finish_part();
                        SelectState::WhereAfterAnd
                    }
                    _ => {
                        where_buf.push(&token.text())?;
                        SelectState::WhereClause
                    }
                },
                SelectState::OrderKeyword => {
                    if token.is_keyword(Keyword::By) {
                        SelectState::OrderStart
                    } else {
                        return Err(DbError::ParseError("missing 'by' after order".to_string()));
                    }
                }
                SelectState::OrderStart | SelectState::OrderField => match token {
                    Token::Keyword(Keyword::Asc) | Token::Keyword(Keyword::Desc)
                        if state == SelectState::OrderField =>
                    {
                        order_buf.push(&token.text())?;
                        order.feed(&token.text())?;
                        SelectState::OrderField
                    }
                    Token::Keyword(_) => return Err(unexpected(token, "in order by")),
                    _ => {
                        order_buf.push(&token.text())?;
                        order.feed(&token.text())?;
                        SelectState::OrderField
                    }
                },
            };
        }

        if !state.is_terminal() {
            return Err(DbError::ParseError(state.expected().to_string()));
        }

        let projection: Vec<FieldSelector> = select
            .into_text()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(FieldSelector::parse)
            .collect();
        if projection.is_empty() {
            return Err(DbError::ParseError("empty select list".to_string()));
        }

        let order = order.finish();
        if order_buf.current().is_empty() != order.is_empty() {
            return Err(DbError::ParseError("empty order by list".to_string()));
        }

        let source = source.ok_or_else(|| DbError::ParseError("missing from".to_string()))?;
        let predicate = has_where.then(|| Predicate::compile(&where_buf.into_parts()));

        Ok(SelectStatement {
            projection,
            source: Pattern::compile(&source)?,
            predicate,
            order,
            limit,
            sink,
        })
    }

    fn parse_insert(self) -> DbResult<InsertStatement> {
        let clause_limit = self.limits.clause;
        let mut state = InsertState::Start;
        let mut target = String::new();
        let mut fields = ClauseBuffer::new("field", clause_limit);
        let mut values = ClauseBuffer::new("value", clause_limit);
        let mut csv_path = None;

        for token in &self.tokens {
            state = match state {
                InsertState::Start => {
                    if token.is_keyword(Keyword::Into) {
                        InsertState::Target
                    } else {
                        return Err(DbError::ParseError("into statement is expected".to_string()));
                    }
                }
                InsertState::Target => match token {
                    Token::Keyword(_) => return Err(unexpected(token, "after into")),
                    _ => {
                        target = token.text();
                        InsertState::AfterTarget
                    }
                },
                InsertState::AfterTarget => match token {
                    Token::Keyword(Keyword::From) | Token::Keyword(Keyword::Csv) => {
                        InsertState::CsvPath
                    }
                    Token::Word(word) if word.starts_with('(') => {
                        fields.push_spaced(&token.text())?;
                        if fields.current().ends_with(')') {
                            InsertState::AfterFields
                        } else {
                            InsertState::Fields
                        }
                    }
                    _ => {
                        return Err(DbError::ParseError(
                            "field list, from or csv statement is expected".to_string(),
                        ))
                    }
                },
                InsertState::Fields => {
                    fields.push_spaced(&token.text())?;
                    if fields.current().ends_with(')') {
                        InsertState::AfterFields
                    } else {
                        InsertState::Fields
                    }
                }
                InsertState::AfterFields => match token {
                    Token::Keyword(Keyword::Values) => InsertState::ValuesStart,
                    Token::Keyword(Keyword::From) | Token::Keyword(Keyword::Csv) => {
                        InsertState::CsvPath
                    }
                    _ => {
                        return Err(DbError::ParseError(
                            "values, from or csv statement is expected".to_string(),
                        ))
                    }
                },
                InsertState::ValuesStart | InsertState::Values => {
                    let text = token.text();
                    if state == InsertState::ValuesStart && !text.starts_with('(') {
                        return Err(DbError::ParseError(
                            "value list must be enclosed in parentheses".to_string(),
                        ));
                    }
                    values.push_spaced(&text)?;
                    if values.current().ends_with(')') {
                        InsertState::Done
                    } else {
                        InsertState::Values
                    }
                }
                InsertState::CsvPath => {
                    csv_path = Some(PathBuf::from(trim_quotes(&token.text())));
                    InsertState::Done
                }
                InsertState::Done => return Err(unexpected(token, "after end of statement")),
            };
        }

        if state != InsertState::Done {
            return Err(DbError::ParseError(state.expected().to_string()));
        }

        let field_text = fields.into_text();
        let field_list = if field_text.is_empty() {
            Vec::new()
        } else {
            let list = parse_list(&field_text, "field")?;
            if list.iter().any(|f| f.is_empty()) {
                return Err(DbError::ParseError("empty field name".to_string()));
            }
            list
        };

        let source = match csv_path {
            Some(path) => InsertSource::Csv {
                fields: field_list,
                path,
            },
            None => InsertSource::Values {
                fields: field_list,
                values: parse_list(&values.into_text(), "value")?,
            },
        };

        Ok(InsertStatement { target, source })
    }

    fn parse_delete(self) -> DbResult<DeleteStatement> {
        let mut state = DeleteState::Start;
        let mut source = None;
        let mut where_buf = ClauseBuffer::new("where", self.limits.clause);
        let mut has_where = false;

        for token in &self.tokens {
            state = match state {
                DeleteState::Start => {
                    if token.is_keyword(Keyword::From) {
                        DeleteState::FromPattern
                    } else {
                        return Err(DbError::ParseError("from statement is expected".to_string()));
                    }
                }
                DeleteState::FromPattern => {
                    source = Some(token.text());
                    DeleteState::AfterFrom
                }
                DeleteState::AfterFrom => {
                    if token.is_keyword(Keyword::Where) {
                        has_where = true;
                        DeleteState::WhereStart
                    } else {
                        return Err(DbError::ParseError("where statement is expected".to_string()));
                    }
                }
                DeleteState::WhereStart | DeleteState::WhereAfterAnd => match token {
                    Token::Keyword(Keyword::And) | Token::Keyword(Keyword::Order) => {
                        return Err(unexpected(token, "where a condition is expected"))
                    }
                    _ => {
                        where_buf.push(&token.text())?;
                        DeleteState::WhereClause
                    }
                },
                DeleteState::WhereClause => match token {
                    Token::Keyword(Keyword::And) => {
                        where_buf.finish_part();
                        DeleteState::WhereAfterAnd
                    }
                    Token::Keyword(Keyword::Order) => {
                        return Err(unexpected(token, "in delete statement"))
                    }
                    _ => {
                        where_buf.push(&token.text())?;
                        DeleteState::WhereClause
                    }
                },
            };
        }

        if !state.is_terminal() {
            return Err(DbError::ParseError(state.expected().to_string()));
        }

        let source = source.ok_or_else(|| DbError::ParseError("missing from".to_string()))?;
        let predicate = has_where.then(|| Predicate::compile(&where_buf.into_parts()));

        Ok(DeleteStatement {
            source: Pattern::compile(&source)?,
            predicate,
        })
    }
}
