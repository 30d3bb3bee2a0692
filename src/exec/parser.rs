//! Recursive-descent parser for the query language.
//!
//! Precedence, loosest first: `|`, `&`, comparisons, `+ -`, `* /`, unary,
//! postfix (indexing and method calls). Comparisons bind tighter than the
//! mask operators so `table['a'] > 1 & table['b'] < 2` means what it looks
//! like; parenthesised pandas style parses identically.

use super::ast::{BinOp, Expr, Stmt, StmtKind, UnOp};
use super::lexer::{Spanned, Token};
use super::ExecError;

pub fn parse(tokens: &[Spanned]) -> Result<Vec<Stmt>, ExecError> {
    let mut p = Parser { tokens, pos: 0 };
    let mut program = Vec::new();
    loop {
        while p.eat(&Token::Newline) {}
        if p.at_end() {
            break;
        }
        program.push(p.statement()?);
    }
    Ok(program)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let s = self.tokens.get(self.pos);
        if s.is_some() {
            self.pos += 1;
        }
        s
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ExecError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(ExecError::syntax(self.line(), format!("expected {}", what)))
        }
    }

    fn statement(&mut self) -> Result<Stmt, ExecError> {
        let line = self.line();
        // Lookahead for `name = ...`; `==` already lexed as one token so a
        // bare Assign after an identifier is unambiguous.
        let kind = if let (Some(Token::Ident(name)), Some(Token::Assign)) = (
            self.peek().cloned(),
            self.tokens.get(self.pos + 1).map(|s| &s.token).cloned(),
        ) {
            self.pos += 2;
            let expr = self.expression()?;
            StmtKind::Assign { name, expr }
        } else {
            StmtKind::Expr(self.expression()?)
        };
        if !self.at_end() {
            self.expect(&Token::Newline, "end of statement")?;
        }
        Ok(Stmt { line, kind })
    }

    fn expression(&mut self) -> Result<Expr, ExecError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ExecError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary { op: BinOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ExecError> {
        let mut lhs = self.comparison()?;
        while self.eat(&Token::Amp) {
            let rhs = self.comparison()?;
            lhs = Expr::Binary { op: BinOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ExecError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(BinOp::Eq),
            Some(Token::Ne) => Some(BinOp::Ne),
            Some(Token::Lt) => Some(BinOp::Lt),
            Some(Token::Le) => Some(BinOp::Le),
            Some(Token::Gt) => Some(BinOp::Gt),
            Some(Token::Ge) => Some(BinOp::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let rhs = self.additive()?;
                Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
            }
            None => Ok(lhs),
        }
    }

    fn additive(&mut self) -> Result<Expr, ExecError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExecError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExecError> {
        if self.eat(&Token::Minus) {
            let expr = self.unary()?;
            return Ok(Expr::Unary { op: UnOp::Neg, expr: Box::new(expr) });
        }
        if self.eat(&Token::Not) {
            let expr = self.unary()?;
            return Ok(Expr::Unary { op: UnOp::Not, expr: Box::new(expr) });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExecError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index { target: Box::new(expr), index: Box::new(index) };
            } else if self.eat(&Token::Dot) {
                let method = match self.advance() {
                    Some(Spanned { token: Token::Ident(name), .. }) => name.clone(),
                    _ => {
                        return Err(ExecError::syntax(self.line(), "expected method name after '.'"))
                    }
                };
                self.expect(&Token::LParen, "'(' after method name")?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen, "')'")?;
                        break;
                    }
                }
                expr = Expr::Call { target: Box::new(expr), method, args };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ExecError> {
        let line = self.line();
        match self.advance().map(|s| s.token.clone()) {
            Some(Token::Int(v)) => Ok(Expr::Int(v)),
            Some(Token::Float(v)) => Ok(Expr::Float(v)),
            Some(Token::Str(v)) => Ok(Expr::Str(v)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RBracket, "']'")?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            Some(other) => Err(ExecError::syntax(line, format!("unexpected token {:?}", other))),
            None => Err(ExecError::syntax(line, "unexpected end of program")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::lex;
    use super::*;

    fn parse_src(src: &str) -> Vec<Stmt> {
        parse(&lex(src).unwrap()).unwrap()
    }

    #[test]
    fn assignment_with_nested_index() {
        let program = parse_src("ANSWER = table[table['age'] > 30]");
        assert_eq!(program.len(), 1);
        match &program[0].kind {
            StmtKind::Assign { name, expr } => {
                assert_eq!(name, "ANSWER");
                assert!(matches!(expr, Expr::Index { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn method_chain_parses_left_to_right() {
        let program = parse_src("ANSWER = table.sort_values('hp', False).head(3)");
        match &program[0].kind {
            StmtKind::Assign { expr, .. } => match expr {
                Expr::Call { method, target, args } => {
                    assert_eq!(method, "head");
                    assert_eq!(args, &vec![Expr::Int(3)]);
                    assert!(matches!(**target, Expr::Call { .. }));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn comparisons_bind_tighter_than_masks() {
        let program = parse_src("m = a > 1 & b < 2");
        match &program[0].kind {
            StmtKind::Assign { expr, .. } => match expr {
                Expr::Binary { op, .. } => assert_eq!(*op, BinOp::And),
                other => panic!("expected binary, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn several_statements_split_on_newlines() {
        let program = parse_src("adults = table[table['age'] >= 18]\nANSWER = adults.count()");
        assert_eq!(program.len(), 2);
        assert_eq!(program[1].line, 2);
    }

    #[test]
    fn dangling_operator_is_a_syntax_error() {
        let tokens = lex("x = 1 +").unwrap();
        assert!(matches!(parse(&tokens), Err(ExecError::Syntax { line: 1, .. })));
    }
}
