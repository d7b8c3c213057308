// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive-descent parser for the restricted expression dialect.
//!
//! Grammar (highest to lowest precedence binds tightest):
//! ```text
//! expr       := ternary
//! ternary    := or_expr ( "?" expr ":" expr )?
//! or_expr    := and_expr ( "||" and_expr )*
//! and_expr   := not_expr ( "&&" not_expr )*
//! not_expr   := "!" not_expr | cmp_expr
//! cmp_expr   := add_expr ( cmp_op add_expr )?
//! cmp_op     := "==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not" "in"
//! add_expr   := mul_expr ( ("+" | "-") mul_expr )*
//! mul_expr   := unary ( ("*" | "/" | "%") unary )*
//! unary      := "-" unary | primary
//! primary    := number | string | "true" | "false" | ident_path | call
//!             | list_literal | "(" expr ")"
//! ident_path := ident ("." ident)*
//! call       := ident "(" (expr ("," expr)*)? ")"
//! list_lit   := "[" (expr ("," expr)*)? "]"
//! ```

use crate::ast::{ALLOWED_FUNCTIONS, BinOp, Expr, NAMESPACES};
use crate::lexer::{LexError, Token, lex};
use thiserror::Error;

/// Error produced while parsing an expression.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// Tokenizing failed.
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    /// A token did not match what the grammar expected at this position.
    #[error("unexpected token {found:?}, expected {expected}")]
    Unexpected {
        /// Token actually found.
        found: Token,
        /// Human-readable description of what was expected.
        expected: &'static str,
    },
    /// An identifier path did not begin with a declared namespace.
    #[error("identifier '{0}' does not start with a declared namespace")]
    UnknownNamespace(String),
    /// A call used a function name outside the fixed allowlist.
    #[error("function '{0}' is not in the allowed function list")]
    DisallowedFunction(String),
    /// Trailing tokens remained after a complete expression was parsed.
    #[error("unexpected trailing input after expression")]
    TrailingInput,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse `src` into an [`Expr`] tree. The whole input must be consumed.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let e = p.parse_expr()?;
    if p.peek() != &Token::Eof {
        return Err(ParseError::TrailingInput);
    }
    Ok(e)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, want: &Token, desc: &'static str) -> Result<(), ParseError> {
        if self.peek() == want {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::Unexpected {
                found: self.peek().clone(),
                expected: desc,
            })
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_or()?;
        if self.peek() == &Token::Question {
            self.advance();
            let then_branch = self.parse_expr()?;
            self.expect(&Token::Colon, "':' in ternary expression")?;
            let else_branch = self.parse_expr()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == &Token::OrOr {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::BinOp(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        while self.peek() == &Token::AndAnd {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::BinOp(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == &Token::Bang {
            self.advance();
            let inner = self.parse_not()?;
            Ok(Expr::Not(Box::new(inner)))
        } else {
            self.parse_cmp()
        }
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Token::EqEq => Some(BinOp::Eq),
            Token::NotEq => Some(BinOp::Ne),
            Token::Lt => Some(BinOp::Lt),
            Token::Le => Some(BinOp::Le),
            Token::Gt => Some(BinOp::Gt),
            Token::Ge => Some(BinOp::Ge),
            Token::Ident(id) if id == "in" => Some(BinOp::In),
            Token::Ident(id) if id == "not" => {
                // lookahead for "not in"
                if self.tokens.get(self.pos + 1) == Some(&Token::Ident("in".to_string())) {
                    Some(BinOp::NotIn)
                } else {
                    None
                }
            }
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        match op {
            BinOp::NotIn => {
                self.advance(); // "not"
                self.advance(); // "in"
            }
            _ => {
                self.advance();
            }
        }
        let rhs = self.parse_add()?;
        Ok(Expr::BinOp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == &Token::Minus {
            self.advance();
            let inner = self.parse_unary()?;
            Ok(Expr::Neg(Box::new(inner)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Ident(id) if id == "true" => Ok(Expr::Bool(true)),
            Token::Ident(id) if id == "false" => Ok(Expr::Bool(false)),
            Token::Ident(id) => self.parse_ident_tail(id),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(e)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() != &Token::RBracket {
                    items.push(self.parse_expr()?);
                    while self.peek() == &Token::Comma {
                        self.advance();
                        items.push(self.parse_expr()?);
                    }
                }
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            other => Err(ParseError::Unexpected {
                found: other,
                expected: "number, string, identifier, '(' or '['",
            }),
        }
    }

    fn parse_ident_tail(&mut self, first: String) -> Result<Expr, ParseError> {
        if self.peek() == &Token::LParen {
            if !ALLOWED_FUNCTIONS.contains(&first.as_str()) {
                return Err(ParseError::DisallowedFunction(first));
            }
            self.advance();
            let mut args = Vec::new();
            if self.peek() != &Token::RParen {
                args.push(self.parse_expr()?);
                while self.peek() == &Token::Comma {
                    self.advance();
                    args.push(self.parse_expr()?);
                }
            }
            self.expect(&Token::RParen, "')'")?;
            return Ok(Expr::Call(first, args));
        }

        let mut path = vec![first];
        while self.peek() == &Token::Dot {
            self.advance();
            match self.advance() {
                Token::Ident(seg) => path.push(seg),
                other => {
                    return Err(ParseError::Unexpected {
                        found: other,
                        expected: "identifier after '.'",
                    });
                }
            }
        }
        if !NAMESPACES.contains(&path[0].as_str()) {
            return Err(ParseError::UnknownNamespace(path.join(".")));
        }
        Ok(Expr::Ident(path))
    }
}
