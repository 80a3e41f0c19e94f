use crate::lexer::{LexError, Lexer, Token};
use crate::model::{
    Attribute, AttributeConstraint, AttributeType, Relationship, RelationshipDestination, Scheme, Table,
    TableDependency,
};

/// Words with a meaning inside the notation. Names spelled like one of these
/// must be written as quoted strings.
pub const KEYWORDS: &[&str] = &["table", "rel", "dep", "pk", "not", "null", "fk"];

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unknown attribute type: {0}")]
    UnknownType(String),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => Ok(s),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "identifier")),
        }
    }

    /// A bare identifier or a quoted string.
    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) | Token::Str(s) => Ok(s),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "name")),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let tok = self.advance().clone();
        if tok == expected {
            Ok(())
        } else if tok == Token::Eof {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::Unexpected(tok, "specific token"))
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == name)
    }

    pub fn parse(&mut self) -> Result<Scheme, ParseError> {
        let mut tables = Vec::new();
        let mut relationships = Vec::new();

        while *self.peek() != Token::Eof {
            if self.check_ident("table") {
                self.advance();
                tables.push(self.parse_table()?);
            } else if self.check_ident("rel") {
                self.advance();
                relationships.extend(self.parse_rel_block()?);
            } else {
                return Err(ParseError::Unexpected(self.peek().clone(), "table or rel"));
            }
        }

        Ok(Scheme { tables, relationships })
    }

    fn parse_table(&mut self) -> Result<Table, ParseError> {
        let name = self.expect_name()?;
        self.expect(Token::LBrace)?;

        let mut attributes = Vec::new();
        let mut dependencies = Vec::new();

        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            if self.check_ident("dep") {
                self.advance();
                dependencies.push(self.parse_dependency()?);
            } else {
                attributes.push(self.parse_attribute()?);
            }
        }

        self.expect(Token::RBrace)?;

        Ok(Table {
            name,
            attributes,
            dependencies,
        })
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.expect_name()?;
        let keyword = self.expect_ident()?;
        let ty = AttributeType::from_str(&keyword).ok_or(ParseError::UnknownType(keyword))?;
        let mut constraints = Vec::new();

        loop {
            if self.check_ident("pk") {
                self.advance();
                constraints.push(AttributeConstraint::PrimaryKey);
            } else if self.check_ident("not") {
                self.advance();
                if !self.check_ident("null") {
                    return Err(ParseError::Unexpected(self.peek().clone(), "null"));
                }
                self.advance();
                constraints.push(AttributeConstraint::NotNullable);
            } else if self.check_ident("fk") {
                self.advance();
                constraints.push(AttributeConstraint::ForeignKey);
            } else {
                break;
            }
        }

        Ok(Attribute::new(name, ty, constraints))
    }

    /// `dep a, b -> c, d`
    fn parse_dependency(&mut self) -> Result<TableDependency, ParseError> {
        let determinants = self.parse_name_list()?;
        self.expect(Token::Arrow)?;
        let dependants = self.parse_name_list()?;
        Ok(TableDependency {
            determinants,
            dependants,
        })
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut list = vec![self.expect_name()?];
        while *self.peek() == Token::Comma {
            self.advance();
            list.push(self.expect_name()?);
        }
        Ok(list)
    }

    fn parse_rel_block(&mut self) -> Result<Vec<Relationship>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut rels = Vec::new();

        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            let from = self.parse_destination()?;
            self.expect(Token::Arrow)?;
            let to = self.parse_destination()?;
            rels.push(Relationship { from, to });
        }

        self.expect(Token::RBrace)?;
        Ok(rels)
    }

    /// `Table(a, b)`
    fn parse_destination(&mut self) -> Result<RelationshipDestination, ParseError> {
        let table_name = self.expect_name()?;
        self.expect(Token::LParen)?;
        let attribute_names = self.parse_name_list()?;
        self.expect(Token::RParen)?;
        Ok(RelationshipDestination {
            table_name,
            attribute_names,
        })
    }
}

/// Parse scheme notation into a [`Scheme`].
pub fn parse_scheme(input: &str) -> Result<Scheme, ParseError> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let input = r#"
            table Orders {
                OrderId int pk not null
                ProductId integer pk
                CustomerName string
                Shipped bool
                dep OrderId -> CustomerName, Shipped
            }
        "#;
        let scheme = parse_scheme(input).unwrap();
        let orders = &scheme.tables[0];

        assert_eq!(orders.name, "Orders");
        assert_eq!(orders.attributes.len(), 4);
        assert_eq!(orders.primary_key(), vec!["OrderId", "ProductId"]);
        assert!(orders.attributes[0].is_not_nullable());
        assert_eq!(orders.attributes[3].ty, AttributeType::Boolean);
        assert_eq!(
            orders.dependencies,
            vec![TableDependency::new(["OrderId"], ["CustomerName", "Shipped"])]
        );
    }

    #[test]
    fn test_parse_relationships() {
        let input = r#"
            rel {
                Orders(CustomerId) -> Customers(Id)
                Lines(OrderId, ProductId) -> "Order Items"(OrderId, ProductId)
            }
        "#;
        let scheme = parse_scheme(input).unwrap();

        assert_eq!(scheme.relationships.len(), 2);
        assert_eq!(scheme.relationships[0].from.table_name, "Orders");
        assert_eq!(scheme.relationships[0].to.attribute_names, vec!["Id"]);
        assert_eq!(scheme.relationships[1].to.table_name, "Order Items");
        assert_eq!(scheme.relationships[1].from.attribute_names.len(), 2);
    }

    #[test]
    fn test_quoted_keyword_names() {
        let input = r#"
            table "table" {
                "dep" int pk
                "not" string fk
            }
        "#;
        let scheme = parse_scheme(input).unwrap();
        let table = &scheme.tables[0];

        assert_eq!(table.name, "table");
        assert_eq!(table.attributes[0].name, "dep");
        assert!(table.attributes[1].is_foreign_key());
        assert!(table.dependencies.is_empty());
    }

    #[test]
    fn test_unknown_type() {
        let err = parse_scheme("table T { id uuid }").unwrap_err();
        assert!(matches!(err, ParseError::UnknownType(t) if t == "uuid"));
    }

    #[test]
    fn test_unexpected_input() {
        assert!(matches!(
            parse_scheme("entity T {}"),
            Err(ParseError::Unexpected(_, _))
        ));
        assert!(matches!(
            parse_scheme("table T { id int"),
            Err(ParseError::UnexpectedEof)
        ));
        assert!(matches!(
            parse_scheme("table T { id int not pk }"),
            Err(ParseError::Unexpected(_, "null"))
        ));
        assert!(matches!(parse_scheme("table T { id int @ }"), Err(ParseError::Lex(_))));
    }
}
