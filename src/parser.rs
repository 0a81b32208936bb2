pub mod ast;

use std::rc::Rc;

use thiserror::Error;

use crate::lexer::stream::TokenStream;
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::Lexer;
use crate::parser::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};

#[derive(Debug, Clone, Error)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

fn binary_operator(kind: &TokenKind) -> Option<(BinaryOp, u8, bool)> {
    // (operator, precedence, right-associative)
    match kind {
        TokenKind::Star => Some((BinaryOp::Mul, 5, false)),
        TokenKind::Slash => Some((BinaryOp::Div, 5, false)),
        TokenKind::Percent => Some((BinaryOp::Mod, 5, false)),
        TokenKind::Plus => Some((BinaryOp::Add, 4, false)),
        TokenKind::Minus => Some((BinaryOp::Sub, 4, false)),
        TokenKind::Less => Some((BinaryOp::Less, 3, false)),
        TokenKind::LessEqual => Some((BinaryOp::LessEqual, 3, false)),
        TokenKind::Greater => Some((BinaryOp::Greater, 3, false)),
        TokenKind::GreaterEqual => Some((BinaryOp::GreaterEqual, 3, false)),
        TokenKind::Equal => Some((BinaryOp::Equal, 2, false)),
        TokenKind::NotEqual => Some((BinaryOp::NotEqual, 2, false)),
        TokenKind::Assign => Some((BinaryOp::Assign, 1, true)),
        _ => None,
    }
}

pub struct Parser {
    stream: TokenStream,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser {
            stream: TokenStream::new(lexer),
        }
    }

    pub fn parse(mut self) -> Result<Program, ParseError> {
        self.parse_program()
    }

    // utility methods
    fn peek_kind(&mut self) -> Result<TokenKind, ParseError> {
        Ok(self.stream.peek(0)?.kind.clone())
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.stream.read()
    }

    fn check(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        Ok(self.stream.peek(0)?.kind == *kind)
    }

    fn consume_if(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.check(kind)? {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind)? {
            self.advance()
        } else {
            Err(self.error_expected(&kind.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if self.check(&TokenKind::Identifier)? {
            Ok(self.advance()?.text)
        } else {
            Err(self.error_expected("identifier"))
        }
    }

    fn error_expected(&mut self, expected: &str) -> ParseError {
        match self.stream.peek(0) {
            Ok(token) => ParseError {
                line: token.line,
                message: format!("unexpected token '{}', expected {}", token.text, expected),
            },
            Err(err) => err,
        }
    }

    // program:
    //     statement (separator statement)*
    // separator:
    //     ';' | end-of-line
    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        if let Some(statement) = self.parse_top_statement()? {
            statements.push(statement);
        }

        while !self.check(&TokenKind::Eof)? {
            self.expect_separator()?;
            if let Some(statement) = self.parse_top_statement()? {
                statements.push(statement);
            }
        }

        Ok(Program { statements })
    }

    fn expect_separator(&mut self) -> Result<(), ParseError> {
        if !self.consume_if(&TokenKind::Eol)? {
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(())
    }

    fn parse_top_statement(&mut self) -> Result<Option<Stmt>, ParseError> {
        if self.check(&TokenKind::Class)? {
            return Ok(Some(self.parse_class_statement()?));
        }
        self.parse_statement()
    }

    // Null statements (at end-of-file, end-of-line, ';' or '}') yield None
    // and are dropped by the program/compound builders.
    fn parse_statement(&mut self) -> Result<Option<Stmt>, ParseError> {
        match self.peek_kind()? {
            TokenKind::Def => Ok(Some(self.parse_procedure()?)),
            TokenKind::If => Ok(Some(self.parse_if()?)),
            TokenKind::While => Ok(Some(self.parse_while()?)),
            TokenKind::LeftBrace => Ok(Some(self.parse_compound()?)),
            TokenKind::Eof | TokenKind::Eol | TokenKind::Semicolon | TokenKind::RightBrace => {
                Ok(None)
            }
            _ => {
                let expr = self.parse_expression()?;
                Ok(Some(Stmt {
                    line: expr.line,
                    kind: StmtKind::Expr(expr),
                }))
            }
        }
    }

    // class-statement:
    //     'class' identifier ('extends' identifier)? compound-statement
    fn parse_class_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = self.expect(TokenKind::Class)?;
        let name = self.expect_identifier()?;
        let superclass = if self.consume_if(&TokenKind::Extends)? {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let body = Rc::new(self.parse_compound()?);

        Ok(Stmt {
            line: token.line,
            kind: StmtKind::Class {
                name,
                superclass,
                body,
            },
        })
    }

    // procedure-statement:
    //     'def' identifier parameter-list compound-statement
    fn parse_procedure(&mut self) -> Result<Stmt, ParseError> {
        let token = self.expect(TokenKind::Def)?;
        let name = self.expect_identifier()?;
        let params = self.parse_parameter_list()?;
        let body = Rc::new(self.parse_compound()?);

        Ok(Stmt {
            line: token.line,
            kind: StmtKind::Procedure { name, params, body },
        })
    }

    // parameter-list:
    //     '(' (identifier (',' identifier)*)? ')'
    fn parse_parameter_list(&mut self) -> Result<Rc<[String]>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen)? {
            params.push(self.expect_identifier()?);
            while self.consume_if(&TokenKind::Comma)? {
                params.push(self.expect_identifier()?);
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(params.into())
    }

    // if-statement:
    //     'if' expression compound-statement ('else' (if-statement | compound-statement))?
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let token = self.expect(TokenKind::If)?;
        let condition = self.parse_expression()?;
        let then_branch = Box::new(self.parse_compound()?);

        let else_branch = if self.consume_if(&TokenKind::Else)? {
            let branch = if self.check(&TokenKind::If)? {
                self.parse_if()?
            } else {
                self.parse_compound()?
            };
            Some(Box::new(branch))
        } else {
            None
        };

        Ok(Stmt {
            line: token.line,
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        })
    }

    // while-statement:
    //     'while' expression compound-statement
    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let token = self.expect(TokenKind::While)?;
        let condition = self.parse_expression()?;
        let body = Box::new(self.parse_compound()?);

        Ok(Stmt {
            line: token.line,
            kind: StmtKind::While { condition, body },
        })
    }

    // compound-statement:
    //     '{' statement (separator statement)* '}'
    fn parse_compound(&mut self) -> Result<Stmt, ParseError> {
        let token = self.expect(TokenKind::LeftBrace)?;
        let mut statements = Vec::new();

        if let Some(statement) = self.parse_statement()? {
            statements.push(statement);
        }

        while !self.consume_if(&TokenKind::RightBrace)? {
            self.expect_separator()?;
            if let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
        }

        Ok(Stmt {
            line: token.line,
            kind: StmtKind::Compound(statements),
        })
    }

    // expression:
    //     binary-expression
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(0)
    }

    // binary-expression:
    //     unary-expression (binary-operator unary-expression)*
    //
    // Precedence climbing: the recursive call uses `prec + 1` for
    // left-associative operators and `prec` for right-associative ones.
    fn parse_binary(&mut self, min_level: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let Some((op, prec, right_assoc)) = binary_operator(&self.peek_kind()?) else {
                return Ok(left);
            };
            if prec < min_level {
                return Ok(left);
            }

            let token = self.advance()?;
            let right = self.parse_binary(prec + if right_assoc { 0 } else { 1 })?;

            left = Expr {
                line: token.line,
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
    }

    // unary-expression:
    //     '-' postfix-expression
    //     postfix-expression
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Minus)? {
            let token = self.advance()?;
            let operand = self.parse_postfix()?;
            return Ok(Expr {
                line: token.line,
                kind: ExprKind::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_postfix()
    }

    // postfix-expression:
    //     primary-expression ('(' arguments? ')' | '.' member-name | '[' expression ']')*
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind()? {
                TokenKind::LeftParen => {
                    let token = self.advance()?;
                    let mut arguments = Vec::new();
                    if !self.check(&TokenKind::RightParen)? {
                        arguments.push(self.parse_expression()?);
                        while self.consume_if(&TokenKind::Comma)? {
                            arguments.push(self.parse_expression()?);
                        }
                    }
                    self.expect(TokenKind::RightParen)?;
                    expr = Expr {
                        line: token.line,
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                    };
                }
                TokenKind::Dot => {
                    let token = self.advance()?;
                    let name = self.expect_member_name()?;
                    expr = Expr {
                        line: token.line,
                        kind: ExprKind::Member {
                            operand: Box::new(expr),
                            name,
                        },
                    };
                }
                TokenKind::LeftBracket => {
                    let token = self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RightBracket)?;
                    expr = Expr {
                        line: token.line,
                        kind: ExprKind::Index {
                            operand: Box::new(expr),
                            index: Box::new(index),
                        },
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    // `new` is reserved but legal after '.', so `Point.new` stays a plain
    // member access.
    fn expect_member_name(&mut self) -> Result<String, ParseError> {
        match self.peek_kind()? {
            TokenKind::Identifier => Ok(self.advance()?.text),
            TokenKind::New => {
                self.advance()?;
                Ok("new".to_string())
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    // primary-expression:
    //     '(' expression ')'
    //     'fun' parameter-list compound-statement
    //     '[' (expression (',' expression)*)? ']'
    //     identifier | integer | string
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind()? {
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Fun => {
                let token = self.advance()?;
                let params = self.parse_parameter_list()?;
                let body = Rc::new(self.parse_compound()?);
                Ok(Expr {
                    line: token.line,
                    kind: ExprKind::Closure { params, body },
                })
            }
            TokenKind::LeftBracket => {
                let token = self.advance()?;
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RightBracket)? {
                    elements.push(self.parse_expression()?);
                    while self.consume_if(&TokenKind::Comma)? {
                        elements.push(self.parse_expression()?);
                    }
                }
                self.expect(TokenKind::RightBracket)?;
                Ok(Expr {
                    line: token.line,
                    kind: ExprKind::Array(elements),
                })
            }
            TokenKind::Identifier => {
                let token = self.advance()?;
                Ok(Expr {
                    line: token.line,
                    kind: ExprKind::Identifier(token.text),
                })
            }
            TokenKind::Int(value) => {
                let token = self.advance()?;
                Ok(Expr {
                    line: token.line,
                    kind: ExprKind::Int(value),
                })
            }
            TokenKind::Str(value) => {
                let token = self.advance()?;
                Ok(Expr {
                    line: token.line,
                    kind: ExprKind::Str(value),
                })
            }
            _ => Err(self.error_expected("expression")),
        }
    }
}
