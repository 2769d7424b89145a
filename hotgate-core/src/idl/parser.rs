use super::{
    ParseError, Position,
    ast::{BaseType, Document, FieldDef, FunctionDef, Ident, ServiceDef, StructDef, TypeRef},
    lexer::{Token, TokenKind, tokenize},
};

/// Parses an IDL document.
///
/// # Errors
///
/// Returns a [`ParseError`] pointing at the first token that does not fit the grammar.
///
/// # Examples
///
/// ```
/// let doc = hotgate_core::idl::parse(
///     "struct Request { 1: string userId }
///      service ServiceA { void methodA(1: Request req) }",
/// )
/// .unwrap();
///
/// assert_eq!(doc.services[0].name.name, "ServiceA");
/// assert_eq!(doc.structs[0].fields[0].name.name, "userId");
/// ```
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: end_position(source),
    };
    parser.document()
}

fn end_position(source: &str) -> Position {
    let line = source.lines().count().max(1);
    let column = source.lines().last().map_or(0, |l| l.chars().count()) + 1;
    Position { line, column }
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    end: Position,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(token)
    }

    fn position(&self) -> Position {
        self.peek().map_or(self.end, |t| t.position)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::new(
                format!("expected {expected}, found {}", describe(&token.kind)),
                token.position,
            ),
            None => ParseError::new(format!("expected {expected}, found end of input"), self.end),
        }
    }

    fn peek_is_punct(&self, punct: char) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Punct(p), .. }) if *p == punct)
    }

    fn peek_is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Ident(word), .. }) if word == keyword)
    }

    fn eat_punct(&mut self, punct: char) -> bool {
        if self.peek_is_punct(punct) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_is_keyword(keyword) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<(), ParseError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{punct}'")))
        }
    }

    /// Expects a plain name. Dotted names are only valid in namespace headers.
    fn expect_ident(&mut self, what: &str) -> Result<Ident, ParseError> {
        let ident = self.expect_dotted(what)?;
        if ident.name.contains('.') {
            return Err(ParseError::new(
                format!("expected {what}, found dotted name '{}'", ident.name),
                ident.position,
            ));
        }
        Ok(ident)
    }

    fn expect_dotted(&mut self, what: &str) -> Result<Ident, ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                position,
            }) if !is_reserved(name) => {
                let ident = Ident {
                    name: name.clone(),
                    position: *position,
                };
                self.cursor += 1;
                Ok(ident)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Skips an optional list separator after a field or function.
    fn eat_separator(&mut self) {
        let _ = self.eat_punct(',') || self.eat_punct(';');
    }

    fn document(&mut self) -> Result<Document, ParseError> {
        let mut doc = Document::default();

        while let Some(token) = self.peek() {
            let TokenKind::Ident(word) = &token.kind else {
                return Err(self.unexpected("a definition"));
            };
            let (word, position) = (word.clone(), token.position);

            match word.as_str() {
                "namespace" => self.namespace()?,
                "include" | "cpp_include" => {
                    return Err(ParseError::new(
                        "includes are not supported, the document must be self-contained",
                        position,
                    ));
                }
                "struct" => doc.structs.push(self.struct_def()?),
                "service" => doc.services.push(self.service_def()?),
                _ => return Err(self.unexpected("'namespace', 'struct' or 'service'")),
            }
        }

        Ok(doc)
    }

    fn namespace(&mut self) -> Result<(), ParseError> {
        self.next();
        if !self.eat_punct('*') {
            self.expect_ident("a namespace scope")?;
        }
        self.expect_dotted("a namespace name")?;
        Ok(())
    }

    fn struct_def(&mut self) -> Result<StructDef, ParseError> {
        self.next();
        let name = self.expect_ident("a struct name")?;
        self.expect_punct('{')?;
        let fields = self.fields_until('}')?;
        Ok(StructDef { name, fields })
    }

    fn service_def(&mut self) -> Result<ServiceDef, ParseError> {
        self.next();
        let name = self.expect_ident("a service name")?;
        if self.peek_is_keyword("extends") {
            return Err(ParseError::new(
                "service inheritance is not supported",
                self.position(),
            ));
        }
        self.expect_punct('{')?;

        let mut functions = Vec::new();
        while !self.eat_punct('}') {
            if self.peek().is_none() {
                return Err(self.unexpected("'}'"));
            }
            functions.push(self.function_def()?);
        }

        Ok(ServiceDef { name, functions })
    }

    fn function_def(&mut self) -> Result<FunctionDef, ParseError> {
        let oneway = self.eat_keyword("oneway");
        let returns = self.type_ref()?;
        let name = self.expect_ident("a method name")?;
        self.expect_punct('(')?;
        let args = self.fields_until(')')?;

        let throws = if self.eat_keyword("throws") {
            self.expect_punct('(')?;
            self.fields_until(')')?
        } else {
            Vec::new()
        };
        self.eat_separator();

        Ok(FunctionDef {
            name,
            oneway,
            returns,
            args,
            throws,
        })
    }

    /// Reads field declarations up to and including the `close` delimiter.
    fn fields_until(&mut self, close: char) -> Result<Vec<FieldDef>, ParseError> {
        let mut fields = Vec::new();
        while !self.eat_punct(close) {
            fields.push(self.field()?);
        }
        Ok(fields)
    }

    fn field(&mut self) -> Result<FieldDef, ParseError> {
        let tag = match self.peek() {
            Some(Token {
                kind: TokenKind::Int(tag),
                ..
            }) => *tag,
            _ => return Err(self.unexpected("a field tag")),
        };
        self.cursor += 1;
        self.expect_punct(':')?;

        if !self.eat_keyword("required") {
            self.eat_keyword("optional");
        }

        let ty = self.type_ref()?;
        if matches!(ty, TypeRef::Void) {
            return Err(ParseError::new(
                "fields cannot be of type void",
                self.tokens[self.cursor - 1].position,
            ));
        }
        let name = self.expect_ident("a field name")?;

        if self.peek_is_punct('=') {
            return Err(ParseError::new(
                "default values are not supported",
                self.position(),
            ));
        }
        self.eat_separator();

        Ok(FieldDef { tag, ty, name })
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let Some(Token {
            kind: TokenKind::Ident(word),
            position,
        }) = self.peek().cloned()
        else {
            return Err(self.unexpected("a type"));
        };

        if matches!(word.as_str(), "list" | "set" | "map" | "binary") {
            return Err(ParseError::new(
                format!("type '{word}' is not supported"),
                position,
            ));
        }

        self.cursor += 1;
        if word == "void" {
            return Ok(TypeRef::Void);
        }
        if let Some(base) = BaseType::from_keyword(&word) {
            return Ok(TypeRef::Base(base));
        }
        if is_reserved(&word) {
            return Err(ParseError::new(
                format!("expected a type, found keyword '{word}'"),
                position,
            ));
        }
        Ok(TypeRef::Named(Ident {
            name: word,
            position,
        }))
    }
}

fn is_reserved(word: &str) -> bool {
    matches!(
        word,
        "namespace"
            | "include"
            | "cpp_include"
            | "struct"
            | "service"
            | "oneway"
            | "throws"
            | "required"
            | "optional"
            | "extends"
            | "void"
    )
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(word) => format!("'{word}'"),
        TokenKind::Int(value) => format!("'{value}'"),
        TokenKind::Literal(text) => format!("\"{text}\""),
        TokenKind::Punct(p) => format!("'{p}'"),
    }
}
