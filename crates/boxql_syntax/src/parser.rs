//! Recursive descent parser for GraphQL documents.
//!
//! One parser handles both executable documents and SDL. Errors are recorded
//! in the returned [`DiagnosticBag`] and parsing continues at the next token,
//! so a single pass reports every syntax problem.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{DirectiveLocation, Token, TokenKind};
use boxql_core::{diagnostics::codes, DiagnosticBag, Interner, Span, Text};

/// Parser for GraphQL.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    prev_end: u32,
    next_selection_set: u32,
    diagnostics: DiagnosticBag,
}

/// Result of parsing.
pub struct ParseResult<'a> {
    pub document: Document<'a>,
    pub diagnostics: DiagnosticBag,
}

impl ParseResult<'_> {
    /// Returns true if parsing reported any error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Parses a source string into a document.
pub fn parse<'a>(source: &'a str, interner: &'a Interner) -> ParseResult<'a> {
    let mut parser = Parser::new(source, interner);
    let document = parser.parse_document();
    ParseResult {
        document,
        diagnostics: parser.diagnostics,
    }
}

impl<'a> Parser<'a> {
    /// Creates a new parser.
    pub fn new(source: &'a str, interner: &'a Interner) -> Self {
        let mut lexer = Lexer::new(source, interner);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            prev_end: 0,
            next_selection_set: 0,
            diagnostics: DiagnosticBag::new(),
        }
    }

    #[inline]
    fn at(&self) -> TokenKind {
        self.current.kind
    }

    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Returns true at `close` or end of input.
    #[inline]
    fn at_end_of(&self, close: TokenKind) -> bool {
        self.at_kind(close) || self.at_kind(TokenKind::Eof)
    }

    fn advance(&mut self) {
        self.prev_end = self.current.span.end;
        self.current = self.lexer.next_token();
    }

    /// Consumes `kind` if it is the current token.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects a specific token kind.
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_expected(kind);
            false
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn current_text(&self) -> &'a str {
        self.lexer.span_text(self.current.span)
    }

    fn intern_current(&self) -> Text {
        self.lexer.intern_span(self.current.span)
    }

    fn error(&mut self, message: &str) {
        let found = self.at();
        self.diagnostics.error(
            codes::INVALID_SYNTAX,
            message,
            self.current.span,
            format!("found {found}"),
        );
    }

    fn error_expected(&mut self, expected: TokenKind) {
        self.diagnostics.error(
            codes::UNEXPECTED_TOKEN,
            format!("Expected {}, found {}", expected, self.at()),
            self.current.span,
            format!("expected {expected}"),
        );
    }

    /// Skips the current token if a list item failed to consume anything.
    fn recover_from(&mut self, start: u32) {
        if self.current.span.start == start && !self.at_kind(TokenKind::Eof) {
            self.advance();
        }
    }

    /// Parses a document.
    pub fn parse_document(&mut self) -> Document<'a> {
        let start = self.current.span.start;
        let mut definitions = Vec::new();

        while !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            if let Some(def) = self.parse_definition() {
                definitions.push(def);
            }
            self.recover_from(before);
        }

        Document {
            definitions,
            span: self.span_from(start),
        }
    }

    fn parse_definition(&mut self) -> Option<Definition<'a>> {
        let description = self.try_parse_description();

        match self.at() {
            TokenKind::Schema => Some(Definition::Schema(self.parse_schema_definition())),
            TokenKind::Type => Some(Definition::Type(TypeDefinition::Object(
                self.parse_object_type(description),
            ))),
            TokenKind::Interface => Some(Definition::Type(TypeDefinition::Interface(
                self.parse_interface_type(description),
            ))),
            TokenKind::Union => Some(Definition::Type(TypeDefinition::Union(
                self.parse_union_type(description),
            ))),
            TokenKind::Enum => Some(Definition::Type(TypeDefinition::Enum(
                self.parse_enum_type(description),
            ))),
            TokenKind::Input => Some(Definition::Type(TypeDefinition::Input(
                self.parse_input_object_type(description),
            ))),
            TokenKind::Scalar => Some(Definition::Type(TypeDefinition::Scalar(
                self.parse_scalar_type(description),
            ))),
            TokenKind::Directive => Some(Definition::Directive(
                self.parse_directive_definition(description),
            )),
            TokenKind::Query | TokenKind::Mutation | TokenKind::Subscription | TokenKind::LBrace => {
                Some(Definition::Operation(self.parse_operation()))
            }
            TokenKind::Fragment => Some(Definition::Fragment(self.parse_fragment_definition())),
            TokenKind::Extend => {
                self.error("type extensions are not supported");
                None
            }
            _ => {
                self.error("Expected a definition");
                None
            }
        }
    }

    fn try_parse_description(&mut self) -> Option<Description<'a>> {
        if matches!(
            self.at(),
            TokenKind::StringLiteral | TokenKind::BlockStringLiteral
        ) {
            let span = self.current.span;
            let text = self.current_text();
            let value = if text.starts_with("\"\"\"") {
                &text[3..text.len() - 3]
            } else {
                &text[1..text.len() - 1]
            };
            self.advance();
            Some(Description::new(value.trim(), span))
        } else {
            None
        }
    }

    /// Parses a name. Keywords are valid names.
    fn parse_name(&mut self) -> Name {
        let span = self.current.span;
        if self.at().is_name() {
            let value = self.intern_current();
            self.advance();
            Name::new(value, span)
        } else {
            self.error("Expected a name");
            Name::new(self.lexer.intern_span(Span::new(span.start, span.start)), span)
        }
    }

    fn parse_schema_definition(&mut self) -> SchemaDefinition {
        let start = self.current.span.start;
        self.advance(); // schema

        let directives = self.parse_directives();
        self.expect(TokenKind::LBrace);

        let mut operations = Vec::new();
        while !self.at_end_of(TokenKind::RBrace) {
            let op_start = self.current.span.start;
            let operation = match self.at() {
                TokenKind::Query => OperationType::Query,
                TokenKind::Mutation => OperationType::Mutation,
                TokenKind::Subscription => OperationType::Subscription,
                _ => {
                    self.error("Expected an operation type");
                    self.advance();
                    continue;
                }
            };
            self.advance();
            self.expect(TokenKind::Colon);
            let type_name = self.parse_name();
            operations.push(OperationTypeDefinition {
                operation,
                type_name,
                span: self.span_from(op_start),
            });
        }
        self.expect(TokenKind::RBrace);

        SchemaDefinition {
            directives,
            operations,
            span: self.span_from(start),
        }
    }

    fn parse_object_type(&mut self, description: Option<Description<'a>>) -> ObjectTypeDefinition<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // type

        let name = self.parse_name();
        let implements = self.parse_implements();
        let directives = self.parse_directives();
        let fields = self.parse_fields_block();

        ObjectTypeDefinition {
            description,
            name,
            implements,
            directives,
            fields,
            span: self.span_from(start),
        }
    }

    fn parse_interface_type(
        &mut self,
        description: Option<Description<'a>>,
    ) -> InterfaceTypeDefinition<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // interface

        let name = self.parse_name();
        let implements = self.parse_implements();
        let directives = self.parse_directives();
        let fields = self.parse_fields_block();

        InterfaceTypeDefinition {
            description,
            name,
            implements,
            directives,
            fields,
            span: self.span_from(start),
        }
    }

    fn parse_union_type(&mut self, description: Option<Description<'a>>) -> UnionTypeDefinition<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // union

        let name = self.parse_name();
        let directives = self.parse_directives();

        let mut members = Vec::new();
        if self.eat(TokenKind::Eq) {
            self.eat(TokenKind::Pipe);
            members.push(self.parse_name());
            while self.eat(TokenKind::Pipe) {
                members.push(self.parse_name());
            }
        }

        UnionTypeDefinition {
            description,
            name,
            directives,
            members,
            span: self.span_from(start),
        }
    }

    fn parse_enum_type(&mut self, description: Option<Description<'a>>) -> EnumTypeDefinition<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // enum

        let name = self.parse_name();
        let directives = self.parse_directives();

        let mut values = Vec::new();
        if self.eat(TokenKind::LBrace) {
            while !self.at_end_of(TokenKind::RBrace) {
                let before = self.current.span.start;
                let description = self.try_parse_description();
                let name = self.parse_name();
                let directives = self.parse_directives();
                values.push(EnumValueDefinition {
                    description,
                    name,
                    directives,
                    span: self.span_from(before),
                });
                self.recover_from(before);
            }
            self.expect(TokenKind::RBrace);
        }

        EnumTypeDefinition {
            description,
            name,
            directives,
            values,
            span: self.span_from(start),
        }
    }

    fn parse_input_object_type(
        &mut self,
        description: Option<Description<'a>>,
    ) -> InputObjectTypeDefinition<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // input

        let name = self.parse_name();
        let directives = self.parse_directives();
        let fields = if self.eat(TokenKind::LBrace) {
            let fields = self.parse_input_value_definitions(TokenKind::RBrace);
            self.expect(TokenKind::RBrace);
            fields
        } else {
            Vec::new()
        };

        InputObjectTypeDefinition {
            description,
            name,
            directives,
            fields,
            span: self.span_from(start),
        }
    }

    fn parse_scalar_type(&mut self, description: Option<Description<'a>>) -> ScalarTypeDefinition<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // scalar

        let name = self.parse_name();
        let directives = self.parse_directives();

        ScalarTypeDefinition {
            description,
            name,
            directives,
            span: self.span_from(start),
        }
    }

    fn parse_directive_definition(
        &mut self,
        description: Option<Description<'a>>,
    ) -> DirectiveDefinitionNode<'a> {
        let start = description.as_ref().map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // directive

        self.expect(TokenKind::At);
        let name = self.parse_name();

        let arguments = if self.eat(TokenKind::LParen) {
            let args = self.parse_input_value_definitions(TokenKind::RParen);
            self.expect(TokenKind::RParen);
            args
        } else {
            Vec::new()
        };

        let repeatable = self.eat(TokenKind::Repeatable);
        self.expect(TokenKind::On);
        self.eat(TokenKind::Pipe);

        let mut locations = Vec::new();
        loop {
            match DirectiveLocation::parse(self.current_text()) {
                Some(location) if self.at().is_name() => {
                    locations.push(location);
                    self.advance();
                }
                _ => {
                    self.error("Expected a directive location");
                    break;
                }
            }
            if !self.eat(TokenKind::Pipe) {
                break;
            }
        }

        DirectiveDefinitionNode {
            description,
            name,
            arguments,
            repeatable,
            locations,
            span: self.span_from(start),
        }
    }

    fn parse_implements(&mut self) -> Vec<Name> {
        let mut interfaces = Vec::new();
        if self.eat(TokenKind::Implements) {
            self.eat(TokenKind::Amp);
            interfaces.push(self.parse_name());
            while self.eat(TokenKind::Amp) {
                interfaces.push(self.parse_name());
            }
        }
        interfaces
    }

    fn parse_fields_block(&mut self) -> Vec<FieldDefinition<'a>> {
        let mut fields = Vec::new();
        if !self.eat(TokenKind::LBrace) {
            return fields;
        }
        while !self.at_end_of(TokenKind::RBrace) {
            let before = self.current.span.start;
            let description = self.try_parse_description();
            fields.push(self.parse_field_definition(description, before));
            self.recover_from(before);
        }
        self.expect(TokenKind::RBrace);
        fields
    }

    fn parse_field_definition(
        &mut self,
        description: Option<Description<'a>>,
        start: u32,
    ) -> FieldDefinition<'a> {
        let name = self.parse_name();

        let arguments = if self.eat(TokenKind::LParen) {
            let args = self.parse_input_value_definitions(TokenKind::RParen);
            self.expect(TokenKind::RParen);
            args
        } else {
            Vec::new()
        };

        self.expect(TokenKind::Colon);
        let ty = self.parse_type();
        let directives = self.parse_directives();

        FieldDefinition {
            description,
            name,
            arguments,
            ty,
            directives,
            span: self.span_from(start),
        }
    }

    fn parse_input_value_definitions(&mut self, close: TokenKind) -> Vec<InputValueDefinition<'a>> {
        let mut values = Vec::new();
        while !self.at_end_of(close) {
            let before = self.current.span.start;
            let description = self.try_parse_description();
            let name = self.parse_name();
            self.expect(TokenKind::Colon);
            let ty = self.parse_type();
            let default_value = if self.eat(TokenKind::Eq) {
                Some(self.parse_value(true))
            } else {
                None
            };
            let directives = self.parse_directives();
            values.push(InputValueDefinition {
                description,
                name,
                ty,
                default_value,
                directives,
                span: self.span_from(before),
            });
            self.recover_from(before);
        }
        values
    }

    /// Parses a type reference: `Name`, `[Type]`, with optional `!`.
    fn parse_type(&mut self) -> Type {
        let start = self.current.span.start;

        let ty = if self.eat(TokenKind::LBracket) {
            let inner = self.parse_type();
            self.expect(TokenKind::RBracket);
            Type::List(Box::new(inner), self.span_from(start))
        } else {
            let name = self.parse_name();
            Type::Named(NamedType {
                name: name.value,
                span: name.span,
            })
        };

        if self.eat(TokenKind::Bang) {
            Type::NonNull(Box::new(ty), self.span_from(start))
        } else {
            ty
        }
    }

    fn parse_directives(&mut self) -> Vec<Directive> {
        let mut directives = Vec::new();
        while self.at_kind(TokenKind::At) {
            directives.push(self.parse_directive());
        }
        directives
    }

    fn parse_directive(&mut self) -> Directive {
        let start = self.current.span.start;
        self.advance(); // @

        let name = self.parse_name();
        let arguments = self.parse_optional_arguments();

        Directive {
            name,
            arguments,
            span: self.span_from(start),
        }
    }

    fn parse_optional_arguments(&mut self) -> Vec<Argument> {
        let mut args = Vec::new();
        if !self.eat(TokenKind::LParen) {
            return args;
        }
        while !self.at_end_of(TokenKind::RParen) {
            let before = self.current.span.start;
            let name = self.parse_name();
            self.expect(TokenKind::Colon);
            let value = self.parse_value(false);
            args.push(Argument {
                name,
                value,
                span: self.span_from(before),
            });
            self.recover_from(before);
        }
        self.expect(TokenKind::RParen);
        args
    }

    /// Parses a value. Variables are rejected in constant positions.
    fn parse_value(&mut self, constant: bool) -> Value {
        let start = self.current.span.start;

        match self.at() {
            TokenKind::Dollar => {
                self.advance();
                let name = self.parse_name();
                if constant {
                    self.diagnostics.error(
                        codes::INVALID_SYNTAX,
                        "Variables are not allowed in constant values",
                        self.span_from(start),
                        "variable used here",
                    );
                }
                Value::Variable(Name::new(name.value, self.span_from(start)))
            }
            TokenKind::IntLiteral => {
                let text = self.current_text();
                let span = self.current.span;
                self.advance();
                match text.parse() {
                    Ok(value) => Value::Int(value, span),
                    Err(_) => {
                        self.diagnostics.error(
                            codes::INVALID_SYNTAX,
                            format!("Integer literal {text} is out of range"),
                            span,
                            "out of range",
                        );
                        Value::Null(span)
                    }
                }
            }
            TokenKind::FloatLiteral => {
                let span = self.current.span;
                let value = self.current_text().parse().unwrap_or(0.0);
                self.advance();
                Value::Float(value, span)
            }
            TokenKind::StringLiteral => {
                let span = self.current.span;
                let text = self.current_text();
                self.advance();
                Value::String(unescape(&text[1..text.len() - 1]), span)
            }
            TokenKind::BlockStringLiteral => {
                let span = self.current.span;
                let text = self.current_text();
                self.advance();
                Value::String(block_string_value(&text[3..text.len() - 3]), span)
            }
            TokenKind::True => {
                self.advance();
                Value::Boolean(true, self.span_from(start))
            }
            TokenKind::False => {
                self.advance();
                Value::Boolean(false, self.span_from(start))
            }
            TokenKind::Null => {
                self.advance();
                Value::Null(self.span_from(start))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut values = Vec::new();
                while !self.at_end_of(TokenKind::RBracket) {
                    let before = self.current.span.start;
                    values.push(self.parse_value(constant));
                    self.recover_from(before);
                }
                self.expect(TokenKind::RBracket);
                Value::List(values, self.span_from(start))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                while !self.at_end_of(TokenKind::RBrace) {
                    let before = self.current.span.start;
                    let name = self.parse_name();
                    self.expect(TokenKind::Colon);
                    let value = self.parse_value(constant);
                    fields.push((name, value));
                    self.recover_from(before);
                }
                self.expect(TokenKind::RBrace);
                Value::Object(fields, self.span_from(start))
            }
            kind if kind.is_name() => Value::Enum(self.parse_name()),
            _ => {
                self.error("Expected a value");
                Value::Null(self.current.span)
            }
        }
    }

    fn parse_operation(&mut self) -> OperationDefinition {
        let start = self.current.span.start;

        let (operation, name) = if self.at_kind(TokenKind::LBrace) {
            (OperationType::Query, None)
        } else {
            let op = match self.at() {
                TokenKind::Mutation => OperationType::Mutation,
                TokenKind::Subscription => OperationType::Subscription,
                _ => OperationType::Query,
            };
            self.advance();

            let name = if self.at().is_name() {
                Some(self.parse_name())
            } else {
                None
            };

            (op, name)
        };

        let variables = if self.eat(TokenKind::LParen) {
            let mut vars = Vec::new();
            while !self.at_end_of(TokenKind::RParen) {
                let before = self.current.span.start;
                vars.push(self.parse_variable_definition());
                self.recover_from(before);
            }
            self.expect(TokenKind::RParen);
            vars
        } else {
            Vec::new()
        };

        let directives = self.parse_directives();
        let selection_set = self.parse_selection_set();

        OperationDefinition {
            operation,
            name,
            variables,
            directives,
            selection_set,
            span: self.span_from(start),
        }
    }

    fn parse_variable_definition(&mut self) -> VariableDefinition {
        let start = self.current.span.start;
        self.expect(TokenKind::Dollar);
        let name = self.parse_name();
        self.expect(TokenKind::Colon);
        let ty = self.parse_type();

        let default_value = if self.eat(TokenKind::Eq) {
            Some(self.parse_value(true))
        } else {
            None
        };

        let directives = self.parse_directives();

        VariableDefinition {
            name,
            ty,
            default_value,
            directives,
            span: self.span_from(start),
        }
    }

    fn parse_fragment_definition(&mut self) -> FragmentDefinition {
        let start = self.current.span.start;
        self.advance(); // fragment

        let name = self.parse_name();
        self.expect(TokenKind::On);
        let type_condition = self.parse_name();
        let directives = self.parse_directives();
        let selection_set = self.parse_selection_set();

        FragmentDefinition {
            name,
            type_condition,
            directives,
            selection_set,
            span: self.span_from(start),
        }
    }

    fn parse_selection_set(&mut self) -> SelectionSet {
        let start = self.current.span.start;
        let id = SelectionSetId(self.next_selection_set);
        self.next_selection_set += 1;

        let mut selections = Vec::new();
        if self.expect(TokenKind::LBrace) {
            while !self.at_end_of(TokenKind::RBrace) {
                let before = self.current.span.start;
                selections.push(self.parse_selection());
                self.recover_from(before);
            }
            self.expect(TokenKind::RBrace);
        }

        SelectionSet {
            id,
            selections,
            span: self.span_from(start),
        }
    }

    fn parse_selection(&mut self) -> Selection {
        let start = self.current.span.start;
        if !self.eat(TokenKind::Spread) {
            return Selection::Field(self.parse_field_selection());
        }

        if self.eat(TokenKind::On) {
            let type_condition = Some(self.parse_name());
            let directives = self.parse_directives();
            let selection_set = self.parse_selection_set();
            Selection::InlineFragment(InlineFragment {
                type_condition,
                directives,
                selection_set,
                span: self.span_from(start),
            })
        } else if self.at_kind(TokenKind::LBrace) || self.at_kind(TokenKind::At) {
            let directives = self.parse_directives();
            let selection_set = self.parse_selection_set();
            Selection::InlineFragment(InlineFragment {
                type_condition: None,
                directives,
                selection_set,
                span: self.span_from(start),
            })
        } else {
            let name = self.parse_name();
            let directives = self.parse_directives();
            Selection::FragmentSpread(FragmentSpread {
                name,
                directives,
                span: self.span_from(start),
            })
        }
    }

    fn parse_field_selection(&mut self) -> FieldSelection {
        let start = self.current.span.start;

        let first_name = self.parse_name();
        let (alias, name) = if self.eat(TokenKind::Colon) {
            (Some(first_name), self.parse_name())
        } else {
            (None, first_name)
        };

        let arguments = self.parse_optional_arguments();
        let directives = self.parse_directives();

        let selection_set = if self.at_kind(TokenKind::LBrace) {
            Some(self.parse_selection_set())
        } else {
            None
        };

        FieldSelection {
            alias,
            name,
            arguments,
            directives,
            selection_set,
            span: self.span_from(start),
        }
    }
}

/// Resolves escape sequences in a quoted string body.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Computes the value of a block string: common indentation and blank
/// leading/trailing lines are removed.
fn block_string_value(raw: &str) -> String {
    let raw = raw.replace("\\\"\"\"", "\"\"\"");
    let lines: Vec<&str> = raw.lines().collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut trimmed: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| match i {
            0 => *line,
            _ if line.len() < common_indent => line.trim_start(),
            _ => &line[common_indent..],
        })
        .collect();

    while trimmed.first().is_some_and(|line| line.trim().is_empty()) {
        trimmed.remove(0);
    }
    while trimmed.last().is_some_and(|line| line.trim().is_empty()) {
        trimmed.pop();
    }

    trimmed.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok<'a>(source: &'a str, interner: &'a Interner) -> Document<'a> {
        let result = parse(source, interner);
        assert!(
            !result.has_errors(),
            "unexpected errors: {:?}",
            result.diagnostics.iter().map(|d| &d.title).collect::<Vec<_>>()
        );
        result.document
    }

    #[test]
    fn test_parse_anonymous_query() {
        let interner = Interner::new();
        let doc = parse_ok("{ a: foo(x: 1) b: foo(x: 1) }", &interner);

        let op = doc.operations().next().unwrap();
        assert_eq!(op.operation, OperationType::Query);
        assert!(op.name.is_none());
        assert_eq!(op.selection_set.selections.len(), 2);

        let Selection::Field(field) = &op.selection_set.selections[0] else {
            panic!("expected field");
        };
        assert_eq!(interner.get(field.response_key()), "a");
        assert_eq!(interner.get(field.name.value), "foo");
        assert_eq!(field.arguments.len(), 1);
    }

    #[test]
    fn test_parse_fragments_and_inline_fragments() {
        let interner = Interner::new();
        let doc = parse_ok(
            r#"
            query Q($id: ID!, $flag: Boolean = true) {
              node(id: $id) {
                ...Named
                ... on Dog @include(if: $flag) { barks }
                ... { id }
              }
            }
            fragment Named on Node { name }
            "#,
            &interner,
        );

        let op = doc.operations().next().unwrap();
        assert_eq!(op.variables.len(), 2);
        assert!(op.variables[1].default_value.is_some());

        let Selection::Field(node) = &op.selection_set.selections[0] else {
            panic!("expected field");
        };
        let inner = &node.selection_set.as_ref().unwrap().selections;
        assert!(matches!(inner[0], Selection::FragmentSpread(_)));
        assert!(matches!(
            &inner[1],
            Selection::InlineFragment(f) if f.type_condition.is_some() && f.directives.len() == 1
        ));
        assert!(matches!(
            &inner[2],
            Selection::InlineFragment(f) if f.type_condition.is_none()
        ));

        assert_eq!(doc.fragments().count(), 1);
    }

    #[test]
    fn test_selection_set_ids_are_unique() {
        let interner = Interner::new();
        let doc = parse_ok("{ a { b { c } } d { e } } fragment F on T { x }", &interner);

        let mut ids = Vec::new();
        fn collect(set: &SelectionSet, ids: &mut Vec<SelectionSetId>) {
            ids.push(set.id);
            for selection in &set.selections {
                if let Selection::Field(FieldSelection {
                    selection_set: Some(sub),
                    ..
                }) = selection
                {
                    collect(sub, ids);
                }
            }
        }
        for op in doc.operations() {
            collect(&op.selection_set, &mut ids);
        }
        for frag in doc.fragments() {
            collect(&frag.selection_set, &mut ids);
        }

        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(count, 5);
    }

    #[test]
    fn test_keywords_are_names() {
        let interner = Interner::new();
        let doc = parse_ok("{ type query: input(on: true) fragment }", &interner);
        let op = doc.operations().next().unwrap();
        assert_eq!(op.selection_set.selections.len(), 3);
    }

    #[test]
    fn test_parse_sdl() {
        let interner = Interner::new();
        let doc = parse_ok(
            r#"
            schema { query: Root mutation: Mut }
            "A node"
            interface Node { id: ID! }
            type User implements Node & Named @key {
              id: ID!
              friends(first: Int = 10, order: Order = ASC): [User!]!
            }
            union SearchResult = | User | Post
            enum Order { ASC DESC }
            input Filter { tags: [String] = ["a"] }
            scalar Date
            directive @key(fields: String) repeatable on OBJECT | INTERFACE
            "#,
            &interner,
        );

        assert_eq!(doc.types().count(), 6);
        assert!(doc.is_type_system_only());

        let user = doc
            .types()
            .find_map(|t| match t {
                TypeDefinition::Object(obj) => Some(obj),
                _ => None,
            })
            .unwrap();
        assert_eq!(user.implements.len(), 2);
        assert!(matches!(user.fields[1].ty, Type::NonNull(_, _)));
        assert_eq!(interner.get(user.fields[1].ty.named().name), "User");
    }

    #[test]
    fn test_errors_recover() {
        let interner = Interner::new();
        let result = parse("{ a(x: ) } query { b }", &interner);
        assert!(result.has_errors());
        assert_eq!(result.document.operations().count(), 2);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(unescape(r#"a\"b\nA"#), "a\"b\nA");
        assert_eq!(
            block_string_value("\n    hello\n      world\n  "),
            "hello\n  world"
        );
    }
}
