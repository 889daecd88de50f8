//! Recursive-descent parser producing an AST for the restricted build-script
//! language. Denied constructs are rejected here, statically, before a
//! single statement executes (spec §4.3 "statically enforced").

use super::lexer::Token;

#[derive(Debug, Clone)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    None,
    Ident(String),
    List(Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    MethodCall(Box<Expr>, String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign(String, Expr),
    ExprStmt(Expr),
    For { var: String, iter: Expr, body: Vec<Stmt> },
    If { branches: Vec<(Expr, Vec<Stmt>)>, else_body: Option<Vec<Stmt>> },
}

const DENIED_KEYWORDS: &[&str] = &[
    "def", "lambda", "while", "import", "from", "class", "global", "nonlocal", "try", "except",
    "yield", "return", "async", "await", "with", "raise", "del", "assert",
];

pub fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>, String> {
    let mut p = Parser { tokens, pos: 0 };
    let stmts = p.parse_statements(&[Token::Eof])?;
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
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

    fn expect(&mut self, tok: &Token) -> Result<(), String> {
        if self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", tok, self.peek()))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    fn parse_statements(&mut self, terminators: &[Token]) -> Result<Vec<Stmt>, String> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !terminators.contains(self.peek()) {
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, String> {
        self.skip_newlines();
        self.expect(&Token::Indent)?;
        let stmts = self.parse_statements(&[Token::Dedent])?;
        self.expect(&Token::Dedent)?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, String> {
        if let Token::Ident(name) = self.peek().clone() {
            if DENIED_KEYWORDS.contains(&name.as_str()) {
                return Err(format!("'{name}' is not permitted in build scripts"));
            }
            if name == "for" {
                return self.parse_for();
            }
            if name == "if" {
                return self.parse_if();
            }
        }

        let expr = self.parse_expr()?;
        if matches!(self.peek(), Token::Eq) {
            self.advance();
            let name = match expr {
                Expr::Ident(n) => n,
                _ => return Err("assignment target must be a plain name".to_string()),
            };
            let value = self.parse_expr()?;
            Ok(Stmt::Assign(name, value))
        } else {
            Ok(Stmt::ExprStmt(expr))
        }
    }

    fn parse_for(&mut self) -> Result<Stmt, String> {
        self.advance(); // 'for'
        let var = match self.advance() {
            Token::Ident(n) => n,
            other => return Err(format!("expected loop variable, found {:?}", other)),
        };
        match self.advance() {
            Token::Ident(ref kw) if kw == "in" => {}
            other => return Err(format!("expected 'in', found {:?}", other)),
        }
        let iter = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;
        Ok(Stmt::For { var, iter, body })
    }

    fn parse_if(&mut self) -> Result<Stmt, String> {
        self.advance(); // 'if'
        let cond = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;
        let mut branches = vec![(cond, body)];
        let mut else_body = None;

        loop {
            match self.peek().clone() {
                Token::Ident(ref kw) if kw == "elif" => {
                    self.advance();
                    let cond = self.parse_expr()?;
                    self.expect(&Token::Colon)?;
                    let body = self.parse_block()?;
                    branches.push((cond, body));
                }
                Token::Ident(ref kw) if kw == "else" => {
                    self.advance();
                    self.expect(&Token::Colon)?;
                    else_body = Some(self.parse_block()?);
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt::If { branches, else_body })
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Ident(kw) if kw == "or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(Box::new(left), BinOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Token::Ident(kw) if kw == "and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary(Box::new(left), BinOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Token::Ident(kw) if kw == "not") {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_add()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Token::Minus) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnOp::Neg, Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek().clone() {
                Token::Dot => {
                    self.advance();
                    let name = match self.advance() {
                        Token::Ident(n) => n,
                        other => return Err(format!("expected attribute name, found {:?}", other)),
                    };
                    if name.starts_with('_') {
                        return Err(format!("access to '{name}' is not permitted"));
                    }
                    self.expect(&Token::LParen)?;
                    let args = self.parse_args()?;
                    expr = Expr::MethodCall(Box::new(expr), name, args);
                }
                Token::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if matches!(self.peek(), Token::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    break;
                }
                other => return Err(format!("expected ',' or ')', found {:?}", other)),
            }
        }
        Ok(args)
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Num(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if !matches!(self.peek(), Token::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        match self.peek() {
                            Token::Comma => {
                                self.advance();
                            }
                            Token::RBracket => break,
                            other => return Err(format!("expected ',' or ']', found {:?}", other)),
                        }
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(Expr::List(items))
            }
            Token::Ident(name) => {
                if DENIED_KEYWORDS.contains(&name.as_str()) {
                    return Err(format!("'{name}' is not permitted in build scripts"));
                }
                match name.as_str() {
                    "True" => Ok(Expr::Bool(true)),
                    "False" => Ok(Expr::Bool(false)),
                    "None" => Ok(Expr::None),
                    _ => Ok(Expr::Ident(name)),
                }
            }
            other => Err(format!("unexpected token {:?}", other)),
        }
    }
}
