//! Recursive-descent parser for SQLite DDL.

use super::error::ParseError;
use crate::ast::{
    ColumnConstraint, ColumnDef, CreateIndex, CreateTable, CreateTrigger, CreateView, FkAction,
    ForeignKeyClause, IndexedColumn, Name, SortOrder, SqlFragment, Statement, TableConstraint,
    TriggerEvent, TriggerTiming, TypeName,
};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// DDL parser over a statement stream.
///
/// `CREATE TABLE`, `CREATE INDEX`, `CREATE VIEW` and `CREATE TRIGGER` are
/// parsed structurally; every other statement is swallowed into
/// [`Statement::Other`] so that DML mixed into a schema file never fails
/// the stream.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            input,
            lexer,
            current,
        }
    }

    /// Parses the next statement.
    ///
    /// Returns `Ok(None)` at end of input. EOF is not an error; callers
    /// rely on that to drive read-until-exhausted loops.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when a `CREATE` statement is malformed or
    /// the input cannot be tokenized.
    pub fn next_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        while matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance();
        }
        if matches!(self.current.kind, TokenKind::Eof) {
            return Ok(None);
        }
        self.bail_on_error_token()?;

        let statement = if self.check_keyword(Keyword::Create) {
            self.parse_create()?
        } else {
            Statement::Other(self.consume_other(Vec::new())?)
        };

        if statement.is_ddl()
            && !matches!(self.current.kind, TokenKind::Semicolon | TokenKind::Eof)
        {
            return Err(ParseError::unexpected(
                "';' or end of input",
                &self.current.kind,
                self.current.span,
            ));
        }
        Ok(Some(statement))
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn advance(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.current.kind, TokenKind::Keyword(kw) if kw == keyword)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                keyword.as_str(),
                &self.current.kind,
                self.current.span,
            ))
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                &format!("{kind:?}"),
                &self.current.kind,
                self.current.span,
            ))
        }
    }

    /// Accepts a bare identifier, a quoted identifier, or a keyword used
    /// as a name (schemas routinely name columns `key`, `order`, ...).
    fn expect_name(&mut self) -> Result<Name, ParseError> {
        let name = match &self.current.kind {
            TokenKind::Identifier(text) | TokenKind::QuotedIdentifier(text) => {
                Name::new(text.clone())
            }
            TokenKind::Keyword(_) => Name::new(self.token_text()),
            _ => {
                return Err(ParseError::unexpected(
                    "identifier",
                    &self.current.kind,
                    self.current.span,
                ));
            }
        };
        self.advance();
        Ok(name)
    }

    /// The source text of the current token, case preserved.
    fn token_text(&self) -> String {
        self.input[self.current.span.start..self.current.span.end].to_string()
    }

    fn bail_on_error_token(&self) -> Result<(), ParseError> {
        if let TokenKind::Error(message) = &self.current.kind {
            return Err(ParseError::new(message.clone(), self.current.span));
        }
        Ok(())
    }

    fn eof_span(&self) -> Span {
        self.current.span
    }

    // ------------------------------------------------------------------
    // CREATE dispatch
    // ------------------------------------------------------------------

    fn parse_create(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        if self.check_keyword(Keyword::Table) {
            self.advance();
            return Ok(Statement::CreateTable(self.parse_create_table()?));
        }
        if self.check_keyword(Keyword::Unique) {
            self.advance();
            self.expect_keyword(Keyword::Index)?;
            return Ok(Statement::CreateIndex(self.parse_create_index(true)?));
        }
        if self.check_keyword(Keyword::Index) {
            self.advance();
            return Ok(Statement::CreateIndex(self.parse_create_index(false)?));
        }
        if self.check_keyword(Keyword::View) {
            self.advance();
            return Ok(Statement::CreateView(self.parse_create_view()?));
        }
        if self.check_keyword(Keyword::Trigger) {
            self.advance();
            return Ok(Statement::CreateTrigger(self.parse_create_trigger()?));
        }
        // CREATE VIRTUAL TABLE and friends: opaque.
        let prefix = vec![TokenKind::Keyword(Keyword::Create)];
        Ok(Statement::Other(self.consume_other(prefix)?))
    }

    fn parse_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if self.check_keyword(Keyword::If) {
            self.advance();
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ------------------------------------------------------------------
    // CREATE TABLE
    // ------------------------------------------------------------------

    fn parse_create_table(&mut self) -> Result<CreateTable, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.expect_name()?;
        self.expect(&TokenKind::LeftParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if self.at_table_constraint() {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(&TokenKind::RightParen)?;

        let mut without_rowid = false;
        let mut strict = false;
        loop {
            if self.check_keyword(Keyword::Without) {
                self.advance();
                self.expect_keyword(Keyword::Rowid)?;
                without_rowid = true;
            } else if self.check_keyword(Keyword::Strict) {
                self.advance();
                strict = true;
            } else if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(CreateTable {
            name,
            if_not_exists,
            columns,
            constraints,
            without_rowid,
            strict,
        })
    }

    fn at_table_constraint(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Keyword(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Foreign
                    | Keyword::Check
            )
        )
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.expect_name()?;

        // Type: zero or more identifier words plus optional arguments.
        let mut words: Vec<String> = Vec::new();
        while let TokenKind::Identifier(word) = &self.current.kind {
            words.push(word.to_uppercase());
            self.advance();
        }
        let type_name = if words.is_empty() {
            None
        } else {
            let mut args = Vec::new();
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                loop {
                    match &self.current.kind {
                        TokenKind::Number(raw) => {
                            args.push(raw.clone());
                            self.advance();
                        }
                        _ => {
                            return Err(ParseError::unexpected(
                                "type argument",
                                &self.current.kind,
                                self.current.span,
                            ));
                        }
                    }
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                        continue;
                    }
                    break;
                }
                self.expect(&TokenKind::RightParen)?;
            }
            Some(TypeName {
                name: words.join(" "),
                args,
            })
        };

        let mut constraints = Vec::new();
        loop {
            if self.check_keyword(Keyword::Constraint) {
                self.advance();
                let constraint_name = self.expect_name()?;
                let constraint = self.parse_column_constraint()?;
                constraints.push(ColumnConstraint::Named {
                    name: constraint_name,
                    constraint: Box::new(constraint),
                });
            } else if self.at_column_constraint() {
                constraints.push(self.parse_column_constraint()?);
            } else {
                break;
            }
        }

        Ok(ColumnDef {
            name,
            type_name,
            constraints,
        })
    }

    fn at_column_constraint(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Keyword(
                Keyword::Primary
                    | Keyword::Not
                    | Keyword::Null
                    | Keyword::Unique
                    | Keyword::Default
                    | Keyword::Check
                    | Keyword::Collate
                    | Keyword::References
            )
        )
    }

    fn parse_column_constraint(&mut self) -> Result<ColumnConstraint, ParseError> {
        match self.current.kind {
            TokenKind::Keyword(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                // Sort order on a column-level PK is not semantic here.
                if self.check_keyword(Keyword::Asc) || self.check_keyword(Keyword::Desc) {
                    self.advance();
                }
                let autoincrement = if self.check_keyword(Keyword::Autoincrement) {
                    self.advance();
                    true
                } else {
                    false
                };
                Ok(ColumnConstraint::PrimaryKey { autoincrement })
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                self.expect_keyword(Keyword::Null)?;
                Ok(ColumnConstraint::NotNull)
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(ColumnConstraint::Null)
            }
            TokenKind::Keyword(Keyword::Unique) => {
                self.advance();
                Ok(ColumnConstraint::Unique)
            }
            TokenKind::Keyword(Keyword::Default) => {
                self.advance();
                Ok(ColumnConstraint::Default(self.parse_default_value()?))
            }
            TokenKind::Keyword(Keyword::Check) => {
                self.advance();
                Ok(ColumnConstraint::Check(self.parse_parenthesized()?))
            }
            TokenKind::Keyword(Keyword::Collate) => {
                self.advance();
                Ok(ColumnConstraint::Collate(self.expect_name()?))
            }
            TokenKind::Keyword(Keyword::References) => {
                Ok(ColumnConstraint::ForeignKey(self.parse_fk_clause()?))
            }
            _ => Err(ParseError::unexpected(
                "column constraint",
                &self.current.kind,
                self.current.span,
            )),
        }
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint, ParseError> {
        let name = if self.check_keyword(Keyword::Constraint) {
            self.advance();
            Some(self.expect_name()?)
        } else {
            None
        };

        match self.current.kind {
            TokenKind::Keyword(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_name_list()?;
                Ok(TableConstraint::PrimaryKey { name, columns })
            }
            TokenKind::Keyword(Keyword::Unique) => {
                self.advance();
                let columns = self.parse_name_list()?;
                Ok(TableConstraint::Unique { name, columns })
            }
            TokenKind::Keyword(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_name_list()?;
                let clause = self.parse_fk_clause()?;
                Ok(TableConstraint::ForeignKey {
                    name,
                    columns,
                    clause,
                })
            }
            TokenKind::Keyword(Keyword::Check) => {
                self.advance();
                Ok(TableConstraint::Check {
                    name,
                    expr: self.parse_parenthesized()?,
                })
            }
            _ => Err(ParseError::unexpected(
                "table constraint",
                &self.current.kind,
                self.current.span,
            )),
        }
    }

    /// Parses `( name [COLLATE c] [ASC | DESC], ... )`, discarding the
    /// per-column modifiers.
    fn parse_name_list(&mut self) -> Result<Vec<Name>, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut names = Vec::new();
        loop {
            names.push(self.expect_name()?);
            if self.check_keyword(Keyword::Collate) {
                self.advance();
                self.expect_name()?;
            }
            if self.check_keyword(Keyword::Asc) || self.check_keyword(Keyword::Desc) {
                self.advance();
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(names)
    }

    fn parse_fk_clause(&mut self) -> Result<ForeignKeyClause, ParseError> {
        self.expect_keyword(Keyword::References)?;
        let table = self.expect_name()?;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };

        let mut on_update = None;
        let mut on_delete = None;
        while self.check_keyword(Keyword::On) {
            self.advance();
            if self.check_keyword(Keyword::Update) {
                self.advance();
                on_update = Some(self.parse_fk_action()?);
            } else if self.check_keyword(Keyword::Delete) {
                self.advance();
                on_delete = Some(self.parse_fk_action()?);
            } else {
                return Err(ParseError::unexpected(
                    "UPDATE or DELETE",
                    &self.current.kind,
                    self.current.span,
                ));
            }
        }

        Ok(ForeignKeyClause {
            table,
            columns,
            on_update,
            on_delete,
        })
    }

    fn parse_fk_action(&mut self) -> Result<FkAction, ParseError> {
        match self.current.kind {
            TokenKind::Keyword(Keyword::Cascade) => {
                self.advance();
                Ok(FkAction::Cascade)
            }
            TokenKind::Keyword(Keyword::Restrict) => {
                self.advance();
                Ok(FkAction::Restrict)
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                if self.check_keyword(Keyword::Null) {
                    self.advance();
                    Ok(FkAction::SetNull)
                } else {
                    self.expect_keyword(Keyword::Default)?;
                    Ok(FkAction::SetDefault)
                }
            }
            TokenKind::Keyword(Keyword::No) => {
                self.advance();
                self.expect_keyword(Keyword::Action)?;
                Ok(FkAction::NoAction)
            }
            _ => Err(ParseError::unexpected(
                "referential action",
                &self.current.kind,
                self.current.span,
            )),
        }
    }

    /// Parses a DEFAULT value: a parenthesized expression, a literal, or
    /// a bare keyword/identifier such as `CURRENT_TIMESTAMP`. A leading
    /// sign is folded into the number so the canonical form stays a valid
    /// signed-number.
    fn parse_default_value(&mut self) -> Result<SqlFragment, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            return self.parse_parenthesized();
        }

        let mut fragment = SqlFragment::new();
        if let TokenKind::Operator(op @ ("-" | "+")) = self.current.kind {
            self.advance();
            match &self.current.kind {
                TokenKind::Number(raw) => {
                    fragment.push(TokenKind::Number(format!("{op}{raw}")));
                    self.advance();
                    return Ok(fragment);
                }
                _ => {
                    return Err(ParseError::unexpected(
                        "number",
                        &self.current.kind,
                        self.current.span,
                    ));
                }
            }
        }

        match &self.current.kind {
            TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Blob(_)
            | TokenKind::Keyword(Keyword::Null)
            | TokenKind::Identifier(_)
            | TokenKind::QuotedIdentifier(_) => {
                fragment.push(self.current.kind.clone());
                self.advance();
                Ok(fragment)
            }
            _ => Err(ParseError::unexpected(
                "default value",
                &self.current.kind,
                self.current.span,
            )),
        }
    }

    /// Collects a balanced parenthesized token run, outer parens included.
    fn parse_parenthesized(&mut self) -> Result<SqlFragment, ParseError> {
        if !self.check(&TokenKind::LeftParen) {
            return Err(ParseError::unexpected(
                "'('",
                &self.current.kind,
                self.current.span,
            ));
        }
        let mut fragment = SqlFragment::new();
        let mut depth = 0usize;
        loop {
            self.bail_on_error_token()?;
            match &self.current.kind {
                TokenKind::LeftParen => {
                    depth += 1;
                    fragment.push(TokenKind::LeftParen);
                    self.advance();
                }
                TokenKind::RightParen => {
                    depth -= 1;
                    fragment.push(TokenKind::RightParen);
                    self.advance();
                    if depth == 0 {
                        return Ok(fragment);
                    }
                }
                TokenKind::Eof => {
                    return Err(ParseError::unexpected_eof("')'", self.eof_span()));
                }
                kind => {
                    fragment.push(kind.clone());
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // CREATE INDEX / VIEW / TRIGGER
    // ------------------------------------------------------------------

    fn parse_create_index(&mut self, unique: bool) -> Result<CreateIndex, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.expect_name()?;
        self.expect_keyword(Keyword::On)?;
        let table = self.expect_name()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut columns = Vec::new();
        loop {
            let column = self.expect_name()?;
            let collate = if self.check_keyword(Keyword::Collate) {
                self.advance();
                Some(self.expect_name()?)
            } else {
                None
            };
            let order = if self.check_keyword(Keyword::Asc) {
                self.advance();
                Some(SortOrder::Asc)
            } else if self.check_keyword(Keyword::Desc) {
                self.advance();
                Some(SortOrder::Desc)
            } else {
                None
            };
            columns.push(IndexedColumn {
                name: column,
                collate,
                order,
            });
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(&TokenKind::RightParen)?;

        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.fragment_until_end_of_statement()?)
        } else {
            None
        };

        Ok(CreateIndex {
            name,
            unique,
            if_not_exists,
            table,
            columns,
            where_clause,
        })
    }

    fn parse_create_view(&mut self) -> Result<CreateView, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.expect_name()?;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };
        self.expect_keyword(Keyword::As)?;
        let select = self.fragment_until_end_of_statement()?;
        if select.is_empty() {
            return Err(ParseError::unexpected_eof("SELECT body", self.eof_span()));
        }
        Ok(CreateView {
            name,
            if_not_exists,
            columns,
            select,
        })
    }

    fn parse_create_trigger(&mut self) -> Result<CreateTrigger, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.expect_name()?;

        let timing = if self.check_keyword(Keyword::Before) {
            self.advance();
            Some(TriggerTiming::Before)
        } else if self.check_keyword(Keyword::After) {
            self.advance();
            Some(TriggerTiming::After)
        } else if self.check_keyword(Keyword::Instead) {
            self.advance();
            self.expect_keyword(Keyword::Of)?;
            Some(TriggerTiming::InsteadOf)
        } else {
            None
        };

        let event = if self.check_keyword(Keyword::Delete) {
            self.advance();
            TriggerEvent::Delete
        } else if self.check_keyword(Keyword::Insert) {
            self.advance();
            TriggerEvent::Insert
        } else if self.check_keyword(Keyword::Update) {
            self.advance();
            let mut columns = Vec::new();
            if self.check_keyword(Keyword::Of) {
                self.advance();
                loop {
                    columns.push(self.expect_name()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            TriggerEvent::Update(columns)
        } else {
            return Err(ParseError::unexpected(
                "DELETE, INSERT, or UPDATE",
                &self.current.kind,
                self.current.span,
            ));
        };

        self.expect_keyword(Keyword::On)?;
        let table = self.expect_name()?;

        let for_each_row = if self.check_keyword(Keyword::For) {
            self.advance();
            self.expect_keyword(Keyword::Each)?;
            self.expect_keyword(Keyword::Row)?;
            true
        } else {
            false
        };

        let when = if self.check_keyword(Keyword::When) {
            self.advance();
            let mut fragment = SqlFragment::new();
            loop {
                self.bail_on_error_token()?;
                match &self.current.kind {
                    TokenKind::Keyword(Keyword::Begin) => break,
                    TokenKind::Eof => {
                        return Err(ParseError::unexpected_eof("BEGIN", self.eof_span()));
                    }
                    kind => {
                        fragment.push(kind.clone());
                        self.advance();
                    }
                }
            }
            Some(fragment)
        } else {
            None
        };

        self.expect_keyword(Keyword::Begin)?;
        let body = self.parse_trigger_body()?;

        Ok(CreateTrigger {
            name,
            if_not_exists,
            timing,
            event,
            table,
            for_each_row,
            when,
            body,
        })
    }

    /// Collects the trigger body up to the terminating END, tracking
    /// CASE ... END nesting so a CASE expression inside the body cannot
    /// close the trigger early.
    fn parse_trigger_body(&mut self) -> Result<SqlFragment, ParseError> {
        let mut fragment = SqlFragment::new();
        let mut depth = 0usize;
        loop {
            self.bail_on_error_token()?;
            match &self.current.kind {
                TokenKind::Keyword(Keyword::Case) => {
                    depth += 1;
                    fragment.push(TokenKind::Keyword(Keyword::Case));
                    self.advance();
                }
                TokenKind::Keyword(Keyword::End) => {
                    if depth == 0 {
                        self.advance();
                        return Ok(fragment);
                    }
                    depth -= 1;
                    fragment.push(TokenKind::Keyword(Keyword::End));
                    self.advance();
                }
                TokenKind::Eof => {
                    return Err(ParseError::unexpected_eof("END", self.eof_span()));
                }
                kind => {
                    fragment.push(kind.clone());
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Opaque statements
    // ------------------------------------------------------------------

    fn fragment_until_end_of_statement(&mut self) -> Result<SqlFragment, ParseError> {
        let mut fragment = SqlFragment::new();
        loop {
            self.bail_on_error_token()?;
            match &self.current.kind {
                TokenKind::Semicolon | TokenKind::Eof => return Ok(fragment),
                kind => {
                    fragment.push(kind.clone());
                    self.advance();
                }
            }
        }
    }

    fn consume_other(&mut self, prefix: Vec<TokenKind>) -> Result<SqlFragment, ParseError> {
        let mut tokens = prefix;
        loop {
            self.bail_on_error_token()?;
            match &self.current.kind {
                TokenKind::Semicolon | TokenKind::Eof => {
                    return Ok(SqlFragment::from_tokens(tokens));
                }
                kind => {
                    tokens.push(kind.clone());
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(input: &str) -> Statement {
        let mut parser = Parser::new(input);
        parser
            .next_statement()
            .expect("statement should parse")
            .expect("statement expected")
    }

    fn canonical(input: &str) -> String {
        parse_one(input).to_string()
    }

    #[test]
    fn parses_simple_table() {
        let stmt = parse_one("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)");
        let Statement::CreateTable(table) = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(table.name.as_str(), "users");
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name.as_str(), "id");
        assert!(matches!(
            table.columns[0].constraints[0],
            ColumnConstraint::PrimaryKey {
                autoincrement: false
            }
        ));
    }

    #[test]
    fn canonicalizes_identifier_quoting_and_case() {
        assert_eq!(
            canonical("create table Users(Id integer primary key)"),
            "CREATE TABLE \"Users\" (\"Id\" INTEGER PRIMARY KEY)"
        );
    }

    #[test]
    fn round_trip_law() {
        let inputs = [
            "CREATE TABLE t (a INTEGER NOT NULL DEFAULT 0, b TEXT UNIQUE, c REAL DEFAULT -1.5)",
            "CREATE TABLE t (a INTEGER, b TEXT, PRIMARY KEY (a), UNIQUE (b))",
            "CREATE TABLE t (a VARCHAR(255) DEFAULT 'it''s', CHECK (a <> ''))",
            "CREATE TABLE p (id INTEGER PRIMARY KEY AUTOINCREMENT) ",
            "CREATE TABLE c (p INTEGER REFERENCES p (id) ON DELETE CASCADE ON UPDATE SET NULL)",
            "CREATE UNIQUE INDEX idx ON t (a DESC, b)",
            "CREATE INDEX idx2 ON t (a) WHERE a > 0",
            "CREATE VIEW v AS SELECT a, b FROM t WHERE a = 1",
            "CREATE TRIGGER trg AFTER INSERT ON t FOR EACH ROW BEGIN UPDATE t SET b = 'x' WHERE a = NEW.a; END",
            "CREATE TABLE wr (k TEXT PRIMARY KEY, v BLOB) WITHOUT ROWID",
        ];
        for input in inputs {
            let first = canonical(input);
            let second = canonical(&first);
            assert_eq!(first, second, "round-trip failed for: {input}");
        }
    }

    #[test]
    fn eof_is_distinct_from_error() {
        let mut parser = Parser::new("   -- just a comment\n");
        assert_eq!(parser.next_statement().unwrap(), None);

        let mut parser = Parser::new("CREATE TABLE (");
        assert!(parser.next_statement().is_err());
    }

    #[test]
    fn dml_becomes_other() {
        let mut parser = Parser::new("INSERT INTO t VALUES (1); CREATE TABLE t2 (a INTEGER);");
        let first = parser.next_statement().unwrap().unwrap();
        assert!(matches!(first, Statement::Other(_)));
        assert_eq!(first.name(), None);
        let second = parser.next_statement().unwrap().unwrap();
        assert_eq!(second.name(), Some("t2"));
        assert_eq!(parser.next_statement().unwrap(), None);
    }

    #[test]
    fn trigger_body_keeps_inner_semicolons() {
        let stmt = parse_one(
            "CREATE TRIGGER audit AFTER UPDATE OF name ON users BEGIN \
             INSERT INTO log (msg) VALUES ('changed'); \
             UPDATE users SET name = NEW.name WHERE id = NEW.id; END",
        );
        let text = stmt.to_string();
        assert!(text.starts_with("CREATE TRIGGER \"audit\" AFTER UPDATE OF \"name\" ON \"users\" BEGIN"));
        assert!(text.ends_with("END"));
        assert!(text.contains("VALUES ('changed');"));
        assert_eq!(stmt.base_table(), Some("users"));
    }

    #[test]
    fn trigger_body_case_end_nesting() {
        let stmt = parse_one(
            "CREATE TRIGGER trg AFTER INSERT ON t BEGIN \
             UPDATE t SET b = CASE WHEN NEW.a > 0 THEN 'pos' ELSE 'neg' END; END",
        );
        assert!(stmt.to_string().contains("CASE WHEN"));
        assert!(stmt.to_string().trim_end().ends_with("END"));
    }

    #[test]
    fn table_level_constraints() {
        let stmt = parse_one(
            "CREATE TABLE m (a INTEGER, b INTEGER, \
             CONSTRAINT uq_ab UNIQUE (a, b), \
             FOREIGN KEY (a) REFERENCES other (id))",
        );
        let Statement::CreateTable(table) = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(table.constraints.len(), 2);
        assert!(matches!(
            &table.constraints[0],
            TableConstraint::Unique { name: Some(n), .. } if n.as_str() == "uq_ab"
        ));
    }

    #[test]
    fn quoted_names_with_hyphens() {
        let stmt = parse_one(r#"CREATE TABLE "my-table" ("col-1" INTEGER)"#);
        assert_eq!(stmt.name(), Some("my-table"));
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE \"my-table\" (\"col-1\" INTEGER)"
        );
    }

    #[test]
    fn keyword_used_as_column_name() {
        let stmt = parse_one("CREATE TABLE t (key TEXT, \"order\" INTEGER)");
        let Statement::CreateTable(table) = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(table.columns[0].name.as_str(), "key");
        assert_eq!(table.columns[1].name.as_str(), "order");
    }

    #[test]
    fn default_expression_in_parens() {
        assert_eq!(
            canonical("CREATE TABLE t (ts TEXT DEFAULT (datetime('now')))"),
            "CREATE TABLE \"t\" (\"ts\" TEXT DEFAULT (datetime('now')))"
        );
    }
}
