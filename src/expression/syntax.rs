//! Precedence-climbing parser producing a general [`Syntax`] tree.
//!
//! The tree deliberately models constructs the evaluator never runs (calls on arbitrary
//! callees, attribute access, subscripts, `**`, bitwise operators, assignment, dict/set
//! displays). Deciding what is allowed is the job of [`super::validate`], which walks this
//! tree with an allow-list. Reserved words are the one exception: they can never start a valid
//! construct, so they are rejected as soon as they are seen.

use super::ast::LogicalOp;
use super::error::{ExprError, ExprResult};
use super::lexer::{Token, TokenKind};

/// Deepest grammar nesting the parser recurses into (parentheses, brackets, prefix operators).
const MAX_NESTING: usize = 64;

/// Deepest tree handed on to validation, binding and evaluation, which all recurse over it.
/// Left-associative chains (`a + b + c ...`) are parsed iteratively but still deepen the tree.
const MAX_TREE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnarySyntax {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinarySyntax {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareSyntax {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Syntax {
    Name(String),
    QuotedName(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLit,
    Unary {
        op: UnarySyntax,
        operand: Box<Syntax>,
    },
    Binary {
        op: BinarySyntax,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    Compare {
        op: CompareSyntax,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    BoolOp {
        op: LogicalOp,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    Call {
        callee: Box<Syntax>,
        args: Vec<Syntax>,
        keywords: Vec<(String, Syntax)>,
    },
    Attribute {
        value: Box<Syntax>,
        attr: String,
    },
    Subscript {
        value: Box<Syntax>,
        index: Box<Syntax>,
    },
    Slice,
    List(Vec<Syntax>),
    Tuple(Vec<Syntax>),
    /// `{...}` dict or set display.
    Braced(Vec<Syntax>),
    DictEntry {
        key: Box<Syntax>,
        value: Box<Syntax>,
    },
    Assign {
        walrus: bool,
        target: Box<Syntax>,
        value: Box<Syntax>,
    },
}

/// Parse a whole token stream (as produced by [`super::lexer::tokenize`]).
pub(crate) fn parse(tokens: &[Token]) -> ExprResult<Syntax> {
    let mut parser = Parser {
        tokens,
        idx: 0,
        depth: 0,
        height: 0,
    };
    if parser.peek() == &TokenKind::Eof {
        return Err(ExprError::parse("empty expression"));
    }
    let node = parser.parse_assignment()?;
    if parser.peek() != &TokenKind::Eof {
        return Err(parser.unexpected());
    }
    if node.depth() > MAX_TREE_DEPTH {
        return Err(too_deep());
    }
    Ok(node)
}

fn too_deep() -> ExprError {
    ExprError::parse("expression nests too deeply")
}

impl Syntax {
    fn children(&self) -> Vec<&Syntax> {
        match self {
            Syntax::Unary { operand, .. } => vec![&**operand],
            Syntax::Binary { left, right, .. }
            | Syntax::Compare { left, right, .. }
            | Syntax::BoolOp { left, right, .. } => vec![&**left, &**right],
            Syntax::Call {
                callee,
                args,
                keywords,
            } => std::iter::once(&**callee)
                .chain(args)
                .chain(keywords.iter().map(|(_, v)| v))
                .collect(),
            Syntax::Attribute { value, .. } => vec![&**value],
            Syntax::Subscript { value, index } => vec![&**value, &**index],
            Syntax::List(items) | Syntax::Tuple(items) | Syntax::Braced(items) => {
                items.iter().collect()
            }
            Syntax::DictEntry { key, value } => vec![&**key, &**value],
            Syntax::Assign { target, value, .. } => vec![&**target, &**value],
            Syntax::Name(_)
            | Syntax::QuotedName(_)
            | Syntax::Int(_)
            | Syntax::Float(_)
            | Syntax::Str(_)
            | Syntax::Bool(_)
            | Syntax::NoneLit
            | Syntax::Slice => Vec::new(),
        }
    }

    /// Height of the tree, computed without recursion.
    fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children().into_iter().map(|c| (c, depth + 1)));
        }
        deepest
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    /// Current recursion depth.
    depth: usize,
    /// Upper bound on the height of the subtree being built: recursion plus pending
    /// left-associative operators.
    height: usize,
}

impl Parser<'_> {
    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested(&mut self, parse: fn(&mut Self) -> ExprResult<Syntax>) -> ExprResult<Syntax> {
        if self.depth >= MAX_NESTING || self.height >= MAX_TREE_DEPTH {
            return Err(too_deep());
        }
        self.depth += 1;
        self.height += 1;
        let node = parse(self);
        self.depth -= 1;
        self.height -= 1;
        node
    }

    /// Account for one more operator in a left-associative chain.
    fn grow(&mut self) -> ExprResult<()> {
        self.height += 1;
        if self.height > MAX_TREE_DEPTH {
            return Err(too_deep());
        }
        Ok(())
    }

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.idx + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn pos(&self) -> usize {
        self.tokens.get(self.idx).map(|t| t.pos).unwrap_or_default()
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ExprResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Error for the current token; reserved words are reported as disallowed constructs.
    fn unexpected(&self) -> ExprError {
        match self.peek() {
            TokenKind::Reserved(word) => ExprError::disallowed(word.clone()),
            TokenKind::Eof => ExprError::parse("unexpected end of input"),
            other => ExprError::parse(format!("unexpected '{other}' at offset {}", self.pos())),
        }
    }

    fn parse_assignment(&mut self) -> ExprResult<Syntax> {
        let target = self.parse_or()?;
        let walrus = match self.peek() {
            TokenKind::Assign => false,
            TokenKind::Walrus => true,
            _ => return Ok(target),
        };
        self.advance();
        let value = self.nested(Self::parse_assignment)?;
        Ok(Syntax::Assign {
            walrus,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_or(&mut self) -> ExprResult<Syntax> {
        self.nested(Self::parse_or_chain)
    }

    fn parse_or_chain(&mut self) -> ExprResult<Syntax> {
        let base = self.height;
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            self.grow()?;
            let right = self.parse_and()?;
            left = Syntax::BoolOp {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.height = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> ExprResult<Syntax> {
        let base = self.height;
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            self.grow()?;
            let right = self.parse_not()?;
            left = Syntax::BoolOp {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.height = base;
        Ok(left)
    }

    fn parse_not(&mut self) -> ExprResult<Syntax> {
        if self.eat(&TokenKind::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Syntax::Unary {
                op: UnarySyntax::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<(CompareSyntax, usize)> {
        let op = match self.peek() {
            TokenKind::EqEq => CompareSyntax::Eq,
            TokenKind::NotEq => CompareSyntax::NotEq,
            TokenKind::Lt => CompareSyntax::Lt,
            TokenKind::LtEq => CompareSyntax::LtEq,
            TokenKind::Gt => CompareSyntax::Gt,
            TokenKind::GtEq => CompareSyntax::GtEq,
            TokenKind::In => CompareSyntax::In,
            TokenKind::Not if self.peek_at(1) == &TokenKind::In => {
                return Some((CompareSyntax::NotIn, 2));
            }
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_comparison(&mut self) -> ExprResult<Syntax> {
        let left = self.parse_bit_or()?;
        let Some((op, width)) = self.comparison_op() else {
            return Ok(left);
        };
        self.idx += width;
        let right = self.parse_bit_or()?;
        if self.comparison_op().is_some() {
            return Err(ExprError::parse(format!(
                "chained comparisons are not supported (offset {})",
                self.pos()
            )));
        }
        Ok(Syntax::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_binary_level(
        &mut self,
        ops: &[(TokenKind, BinarySyntax)],
        next: fn(&mut Self) -> ExprResult<Syntax>,
    ) -> ExprResult<Syntax> {
        let base = self.height;
        let mut left = next(self)?;
        loop {
            let Some(&(_, op)) = ops.iter().find(|(kind, _)| kind == self.peek()) else {
                self.height = base;
                return Ok(left);
            };
            self.advance();
            self.grow()?;
            let right = next(self)?;
            left = Syntax::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_bit_or(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(&[(TokenKind::Pipe, BinarySyntax::BitOr)], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(&[(TokenKind::Caret, BinarySyntax::BitXor)], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(&[(TokenKind::Amp, BinarySyntax::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(
            &[
                (TokenKind::Shl, BinarySyntax::Shl),
                (TokenKind::Shr, BinarySyntax::Shr),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(
            &[
                (TokenKind::Plus, BinarySyntax::Add),
                (TokenKind::Minus, BinarySyntax::Sub),
            ],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinarySyntax::Mul),
                (TokenKind::Slash, BinarySyntax::Div),
                (TokenKind::DoubleSlash, BinarySyntax::FloorDiv),
                (TokenKind::Percent, BinarySyntax::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> ExprResult<Syntax> {
        let op = match self.peek() {
            TokenKind::Minus => UnarySyntax::Neg,
            TokenKind::Plus => UnarySyntax::Pos,
            TokenKind::Tilde => UnarySyntax::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Syntax::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> ExprResult<Syntax> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        // Right-associative and binds tighter than unary minus on its left only.
        let exponent = self.nested(Self::parse_unary)?;
        Ok(Syntax::Binary {
            op: BinarySyntax::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    fn parse_postfix(&mut self) -> ExprResult<Syntax> {
        let base = self.height;
        let mut node = self.parse_atom()?;
        loop {
            if matches!(self.peek(), TokenKind::LParen | TokenKind::Dot | TokenKind::LBracket) {
                self.grow()?;
            }
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    node = self.parse_call(node)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = match self.advance() {
                        TokenKind::Ident(name) | TokenKind::Reserved(name) => name,
                        other => other.to_string(),
                    };
                    node = Syntax::Attribute {
                        value: Box::new(node),
                        attr,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = if self.peek() == &TokenKind::Colon {
                        Syntax::Slice
                    } else {
                        self.parse_assignment()?
                    };
                    if self.peek() == &TokenKind::Colon {
                        return Err(ExprError::disallowed("[:] slice"));
                    }
                    self.expect(&TokenKind::RBracket)?;
                    node = Syntax::Subscript {
                        value: Box::new(node),
                        index: Box::new(index),
                    };
                }
                _ => {
                    self.height = base;
                    return Ok(node);
                }
            }
        }
    }

    fn parse_call(&mut self, callee: Syntax) -> ExprResult<Syntax> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while self.peek() != &TokenKind::RParen {
            if let (TokenKind::Ident(name), TokenKind::Assign) = (self.peek(), self.peek_at(1)) {
                let name = name.clone();
                self.idx += 2;
                keywords.push((name, self.parse_or()?));
            } else {
                args.push(self.parse_or()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Syntax::Call {
            callee: Box::new(callee),
            args,
            keywords,
        })
    }

    fn parse_sequence(&mut self, close: &TokenKind) -> ExprResult<(Vec<Syntax>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        while self.peek() != close {
            let item = self.parse_assignment()?;
            if self.eat(&TokenKind::Colon) {
                let value = self.parse_or()?;
                items.push(Syntax::DictEntry {
                    key: Box::new(item),
                    value: Box::new(value),
                });
            } else {
                items.push(item);
            }
            trailing_comma = self.eat(&TokenKind::Comma);
            if !trailing_comma {
                break;
            }
        }
        self.expect(close)?;
        Ok((items, trailing_comma))
    }

    fn parse_atom(&mut self) -> ExprResult<Syntax> {
        let node = match self.peek().clone() {
            TokenKind::Ident(name) => Syntax::Name(name),
            TokenKind::QuotedIdent(name) => Syntax::QuotedName(name),
            TokenKind::Int(v) => Syntax::Int(v),
            TokenKind::Float(v) => Syntax::Float(v),
            TokenKind::Str(s) => Syntax::Str(s),
            TokenKind::True => Syntax::Bool(true),
            TokenKind::False => Syntax::Bool(false),
            TokenKind::None => Syntax::NoneLit,
            TokenKind::LParen => {
                self.advance();
                let (mut items, trailing_comma) = self.parse_sequence(&TokenKind::RParen)?;
                return Ok(if items.len() == 1 && !trailing_comma {
                    items.remove(0)
                } else {
                    Syntax::Tuple(items)
                });
            }
            TokenKind::LBracket => {
                self.advance();
                let (items, _) = self.parse_sequence(&TokenKind::RBracket)?;
                return Ok(Syntax::List(items));
            }
            TokenKind::LBrace => {
                self.advance();
                let (items, _) = self.parse_sequence(&TokenKind::RBrace)?;
                return Ok(Syntax::Braced(items));
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(node)
    }
}
