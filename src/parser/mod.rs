use crate::ast::*;
use crate::instruction::{CmpOp, GPRM_COUNT, Reg, SPRM_COUNT};
use crate::lexer::Token;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

/// Intermediate result of the shared expression grammar: arithmetic and
/// boolean operators are parsed by one precedence ladder and checked for
/// kind afterwards.
enum Node {
    Value(Expr),
    Bool(Cond),
}

type Combine = fn(Expr, Expr) -> Expr;

fn add(l: Expr, r: Expr) -> Expr {
    Expr::assoc(AssocOp::Add, l, r)
}

fn mul(l: Expr, r: Expr) -> Expr {
    Expr::assoc(AssocOp::Mul, l, r)
}

fn bit_and(l: Expr, r: Expr) -> Expr {
    Expr::assoc(AssocOp::And, l, r)
}

fn bit_or(l: Expr, r: Expr) -> Expr {
    Expr::assoc(AssocOp::Or, l, r)
}

fn bit_xor(l: Expr, r: Expr) -> Expr {
    Expr::assoc(AssocOp::Xor, l, r)
}

fn sub(l: Expr, r: Expr) -> Expr {
    Expr::binary(BinaryOp::Sub, l, r)
}

fn div(l: Expr, r: Expr) -> Expr {
    Expr::binary(BinaryOp::Div, l, r)
}

fn rem(l: Expr, r: Expr) -> Expr {
    Expr::binary(BinaryOp::Mod, l, r)
}

/// Resolves a register name: `g0`..`g15`, `s0`..`s23`, and the aliases
/// `audio`, `subtitle`, `angle` and `button`.
pub fn register_named(name: &str) -> Option<Reg> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "audio" => return Some(Reg::Sprm(1)),
        "subtitle" | "subpicture" => return Some(Reg::Sprm(2)),
        "angle" => return Some(Reg::Sprm(3)),
        "button" => return Some(Reg::Sprm(8)),
        _ => {}
    }
    let (kind, digits) = lower.split_at(1);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u8 = digits.parse().ok()?;
    match kind {
        "g" if n < GPRM_COUNT => Some(Reg::Gprm(n)),
        "s" if n < SPRM_COUNT => Some(Reg::Sprm(n)),
        _ => None,
    }
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .or_else(|| self.tokens.last().map(|(_, s)| Span { start: s.end, end: s.end }))
            .unwrap_or(Span::UNKNOWN)
    }

    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, s)| *s)
            .unwrap_or(Span::UNKNOWN)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Consumes the next token when it equals `expected`.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span> {
        match self.peek() {
            Some(tok) if tok == expected => {
                let span = self.peek_span();
                self.advance();
                Ok(span)
            }
            Some(tok) => Err(self.error(
                "NAV-P003",
                format!("expected {}, got {}", expected.describe(), tok.describe()),
            )),
            None => Err(self.error("NAV-P002", format!("expected {}, got end of input", expected.describe()))),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(name)
            }
            Some(tok) => Err(self.error("NAV-P004", format!("expected a label name, got {}", tok.describe()))),
            None => Err(self.error("NAV-P002", "expected a label name, got end of input".into())),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<u32> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(n)
            }
            Some(tok) => Err(self.error("NAV-P005", format!("expected {what} number, got {}", tok.describe()))),
            None => Err(self.error("NAV-P002", format!("expected {what} number, got end of input"))),
        }
    }

    /// A number in `min..=max` naming a `what`.
    fn bounded<T: TryFrom<u32>>(&mut self, what: &str, min: u32, max: u32) -> Result<T> {
        let n = self.expect_number(what)?;
        if n < min || n > max {
            return Err(self.error_at(
                "NAV-P006",
                self.prev_span(),
                format!("{what} {n} is out of range, expected {min} to {max}"),
            ));
        }
        T::try_from(n).map_err(|_| self.error_at("NAV-P006", self.prev_span(), format!("{what} {n} is out of range")))
    }

    fn error(&self, code: &'static str, message: String) -> ParseError {
        self.error_at(code, self.peek_span(), message)
    }

    fn error_at(&self, code: &'static str, span: Span, message: String) -> ParseError {
        ParseError { code, position: self.pos, span, message }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn token_at(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx).map(|(t, _)| t)
    }

    // ---- Top-level parsing ----

    pub fn parse_program(&mut self) -> (Program, Vec<ParseError>) {
        let mut statements = Vec::new();
        let mut errors: Vec<ParseError> = Vec::new();
        const MAX_ERRORS: usize = 20;

        if self.tokens.is_empty() {
            statements.push(Spanned::new(Stmt::Nop, Span::UNKNOWN));
        }
        while !self.at_end() {
            if errors.len() >= MAX_ERRORS {
                break;
            }
            if let Err(e) = self.parse_stmt_into(&mut statements) {
                errors.push(e);
                self.sync_to_stmt_boundary();
            }
        }

        (Program { statements }, errors)
    }

    /// Skips past the next `;` or `}` so parsing can resume at a statement.
    fn sync_to_stmt_boundary(&mut self) {
        let start = self.pos;
        while let Some(tok) = self.advance() {
            if matches!(tok, Token::Semi | Token::RBrace) {
                break;
            }
        }
        if self.pos == start {
            self.pos = self.tokens.len();
        }
    }

    /// Parses one statement, flattening `{ ... }` groups into `out`.
    fn parse_stmt_into(&mut self, out: &mut Block) -> Result<()> {
        if !self.eat(&Token::LBrace) {
            out.push(self.parse_stmt()?);
            return Ok(());
        }
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.parse_stmt_into(out)?,
                None => return Err(self.error("NAV-P002", "expected '}', got end of input".into())),
            }
        }
    }

    fn parse_body(&mut self) -> Result<Block> {
        let mut body = Vec::new();
        self.parse_stmt_into(&mut body)?;
        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.peek_span();
        let node = match self.peek().cloned() {
            Some(Token::If) => self.parse_if()?,
            Some(Token::Goto) => {
                self.advance();
                let label = self.expect_ident()?;
                self.expect(&Token::Semi)?;
                Stmt::Goto(label)
            }
            Some(Token::Jump) => {
                self.advance();
                let target = self.parse_jump_target()?;
                self.expect(&Token::Semi)?;
                Stmt::Jump(target)
            }
            Some(Token::Call) => {
                self.advance();
                let target = self.parse_jump_target()?;
                let resume_cell = if self.eat(&Token::Resume) { self.bounded("resume cell", 1, 255)? } else { 0 };
                self.expect(&Token::Semi)?;
                Stmt::Call { target, resume_cell }
            }
            Some(Token::Exit) => self.keyword_stmt(Stmt::Exit)?,
            Some(Token::Resume) => self.keyword_stmt(Stmt::Resume)?,
            Some(Token::Break) => self.keyword_stmt(Stmt::Break)?,
            Some(Token::Semi) => self.keyword_stmt(Stmt::Nop)?,
            Some(Token::Counter) => {
                self.advance();
                let target = match self.parse_register()? {
                    Reg::Gprm(n) => SetTarget::Counter(n),
                    Reg::Sprm(_) => {
                        return Err(self.error_at(
                            "NAV-P012",
                            self.prev_span(),
                            "only general registers g0 to g15 can be counters".into(),
                        ));
                    }
                };
                self.expect(&Token::Assign)?;
                let value = self.parse_value()?;
                self.expect(&Token::Semi)?;
                Stmt::Set { target, value }
            }
            Some(Token::Ident(name)) if self.token_at(self.pos + 1) == Some(&Token::Colon) => {
                self.pos += 2;
                Stmt::Label(name)
            }
            Some(Token::Ident(_)) => self.parse_assignment()?,
            Some(tok) => {
                return Err(self.error("NAV-P001", format!("expected a statement, got {}", tok.describe())));
            }
            None => return Err(self.error("NAV-P002", "expected a statement, got end of input".into())),
        };
        Ok(Spanned::new(node, start.merge(self.prev_span())))
    }

    fn keyword_stmt(&mut self, stmt: Stmt) -> Result<Stmt> {
        if stmt != Stmt::Nop {
            self.advance();
        }
        self.expect(&Token::Semi)?;
        Ok(stmt)
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let cond = self.parse_cond()?;
        self.expect(&Token::RParen)?;
        let then_body = self.parse_body()?;
        let else_body = if self.eat(&Token::Else) { Some(self.parse_body()?) } else { None };
        Ok(Stmt::If { cond, then_body, else_body })
    }

    fn parse_register(&mut self) -> Result<Reg> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => match register_named(&name) {
                Some(reg) => {
                    self.advance();
                    Ok(reg)
                }
                None => Err(self.error("NAV-P007", format!("unknown register '{name}'"))),
            },
            Some(tok) => Err(self.error("NAV-P007", format!("expected a register, got {}", tok.describe()))),
            None => Err(self.error("NAV-P002", "expected a register, got end of input".into())),
        }
    }

    /// `reg = expr;` and the compound forms `reg op= expr;`
    fn parse_assignment(&mut self) -> Result<Stmt> {
        let reg = self.parse_register()?;
        let current = Expr::reg(reg);
        let op = self.advance().cloned();
        let rhs = self.parse_value()?;
        let value = match op {
            Some(Token::Assign) => rhs,
            Some(Token::PlusAssign) => Expr::assoc(AssocOp::Add, current, rhs),
            Some(Token::StarAssign) => Expr::assoc(AssocOp::Mul, current, rhs),
            Some(Token::AmpAssign) => Expr::assoc(AssocOp::And, current, rhs),
            Some(Token::PipeAssign) => Expr::assoc(AssocOp::Or, current, rhs),
            Some(Token::CaretAssign) => Expr::assoc(AssocOp::Xor, current, rhs),
            Some(Token::MinusAssign) => Expr::binary(BinaryOp::Sub, current, rhs),
            Some(Token::SlashAssign) => Expr::binary(BinaryOp::Div, current, rhs),
            Some(Token::PercentAssign) => Expr::binary(BinaryOp::Mod, current, rhs),
            other => {
                let got = other.map_or("end of input".to_string(), |t| t.describe());
                return Err(self.error("NAV-P003", format!("expected an assignment operator, got {got}")));
            }
        };
        self.expect(&Token::Semi)?;
        let target = match reg {
            Reg::Gprm(n) => SetTarget::Gprm(n),
            Reg::Sprm(n) => SetTarget::Sprm(n),
        };
        Ok(Stmt::Set { target, value })
    }

    // ---- Jump targets ----

    fn parse_jump_target(&mut self) -> Result<JumpTarget> {
        let titleset = if self.eat(&Token::Vmgm) {
            TitlesetRef::Vmgm
        } else if self.eat(&Token::Titleset) {
            TitlesetRef::Titleset(self.bounded("titleset", 1, 99)?)
        } else {
            TitlesetRef::Current
        };
        let target = match self.peek() {
            Some(Token::Fpc) => {
                self.advance();
                JumpTarget::FirstPlay { titleset }
            }
            Some(Token::Menu) => {
                self.advance();
                let menu = match self.peek() {
                    Some(Token::Number(_)) => MenuRef::Pgc(self.bounded("menu", 1, 0x7FFF)?),
                    Some(Token::Entry) => {
                        self.advance();
                        MenuRef::Entry(self.parse_entry()?)
                    }
                    _ => MenuRef::Default,
                };
                JumpTarget::Menu { titleset, menu }
            }
            Some(Token::Title) => {
                self.advance();
                let title = self.bounded("title", 1, 99)?;
                let chapter = if self.eat(&Token::Chapter) { Some(self.bounded("chapter", 1, 999)?) } else { None };
                JumpTarget::Title { titleset, title, chapter }
            }
            Some(Token::Chapter | Token::Program | Token::Cell) if titleset != TitlesetRef::Current => {
                return Err(self.error(
                    "NAV-P008",
                    "chapters, programs and cells can only be named in the current title or menu".into(),
                ));
            }
            Some(Token::Chapter) => {
                self.advance();
                JumpTarget::Chapter(self.bounded("chapter", 1, 999)?)
            }
            Some(Token::Program) => {
                self.advance();
                JumpTarget::Program(self.bounded("program", 1, 127)?)
            }
            Some(Token::Cell) => {
                self.advance();
                JumpTarget::Cell(self.bounded("cell", 1, 255)?)
            }
            Some(tok) => {
                return Err(self.error(
                    "NAV-P008",
                    format!("expected a jump target (fpc, menu, title, chapter, program or cell), got {}", tok.describe()),
                ));
            }
            None => return Err(self.error("NAV-P002", "expected a jump target, got end of input".into())),
        };
        Ok(target)
    }

    fn parse_entry(&mut self) -> Result<MenuEntry> {
        let entry = match self.peek() {
            Some(Token::Title) => Some(MenuEntry::Title),
            Some(Token::Chapter) => Some(MenuEntry::Ptt),
            Some(Token::Ident(name)) => MenuEntry::from_name(name),
            _ => None,
        };
        match entry {
            Some(entry) => {
                self.advance();
                Ok(entry)
            }
            None => Err(self.error(
                "NAV-P009",
                "expected a menu entry: title, root, subtitle, audio, angle or ptt".into(),
            )),
        }
    }

    // ---- Expressions ----

    fn parse_value(&mut self) -> Result<Expr> {
        let span = self.peek_span();
        let node = self.parse_or()?;
        self.value(node, span)
    }

    fn parse_cond(&mut self) -> Result<Cond> {
        let span = self.peek_span();
        let node = self.parse_or()?;
        self.cond(node, span)
    }

    fn value(&self, node: Node, span: Span) -> Result<Expr> {
        match node {
            Node::Value(e) => Ok(e),
            Node::Bool(_) => Err(self.error_at("NAV-P010", span.merge(self.prev_span()), "a condition cannot be used as a value".into())),
        }
    }

    fn cond(&self, node: Node, span: Span) -> Result<Cond> {
        match node {
            Node::Bool(c) => Ok(c),
            Node::Value(_) => Err(self.error_at(
                "NAV-P011",
                span.merge(self.prev_span()),
                "expected a comparison such as 'g0 == 1'".into(),
            )),
        }
    }

    fn parse_or(&mut self) -> Result<Node> {
        let span = self.peek_span();
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let rspan = self.peek_span();
            let right = self.parse_and()?;
            let l = self.cond(left, span)?;
            left = Node::Bool(Cond::or(l, self.cond(right, rspan)?));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node> {
        let span = self.peek_span();
        let mut left = self.parse_not()?;
        while self.eat(&Token::AndAnd) {
            let rspan = self.peek_span();
            let right = self.parse_not()?;
            let l = self.cond(left, span)?;
            left = Node::Bool(Cond::and(l, self.cond(right, rspan)?));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node> {
        if self.eat(&Token::Bang) {
            let span = self.peek_span();
            let inner = self.parse_not()?;
            return Ok(Node::Bool(Cond::not(self.cond(inner, span)?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Node> {
        let span = self.peek_span();
        let left = self.parse_bitor()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::GreaterEq) => CmpOp::Ge,
            Some(Token::Greater) => CmpOp::Gt,
            Some(Token::LessEq) => CmpOp::Le,
            Some(Token::Less) => CmpOp::Lt,
            _ => return Ok(left),
        };
        self.advance();
        let left = self.value(left, span)?;
        let rspan = self.peek_span();
        let right = self.parse_bitor()?;
        let right = self.value(right, rspan)?;
        Ok(Node::Bool(Cond::Compare { op, left, right }))
    }

    /// One left-associative level of the arithmetic ladder.
    fn parse_level(
        &mut self,
        next: fn(&mut Self) -> Result<Node>,
        operator: fn(&Token) -> Option<Combine>,
    ) -> Result<Node> {
        let span = self.peek_span();
        let mut left = next(self)?;
        while let Some(combine) = self.peek().and_then(operator) {
            self.advance();
            let rspan = self.peek_span();
            let right = next(self)?;
            let l = self.value(left, span)?;
            left = Node::Value(combine(l, self.value(right, rspan)?));
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> Result<Node> {
        self.parse_level(Self::parse_bitxor, |tok| (*tok == Token::Pipe).then_some(bit_or as Combine))
    }

    fn parse_bitxor(&mut self) -> Result<Node> {
        self.parse_level(Self::parse_bitand, |tok| (*tok == Token::Caret).then_some(bit_xor as Combine))
    }

    fn parse_bitand(&mut self) -> Result<Node> {
        self.parse_level(Self::parse_additive, |tok| (*tok == Token::Amp).then_some(bit_and as Combine))
    }

    fn parse_additive(&mut self) -> Result<Node> {
        self.parse_level(Self::parse_multiplicative, |tok| match tok {
            Token::Plus => Some(add as Combine),
            Token::Minus => Some(sub as Combine),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Node> {
        self.parse_level(Self::parse_primary, |tok| match tok {
            Token::Star => Some(mul as Combine),
            Token::Slash => Some(div as Combine),
            Token::Percent => Some(rem as Combine),
            _ => None,
        })
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                let value = u16::try_from(n).map_err(|_| {
                    self.error("NAV-P006", format!("value {n} does not fit in 16 bits"))
                })?;
                self.advance();
                Ok(Node::Value(Expr::imm(value)))
            }
            Some(Token::Ident(_)) => Ok(Node::Value(Expr::reg(self.parse_register()?))),
            Some(Token::Random) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let inner = self.parse_value()?;
                self.expect(&Token::RParen)?;
                Ok(Node::Value(Expr::Random(Box::new(inner))))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(tok) => Err(self.error("NAV-P003", format!("expected a value, got {}", tok.describe()))),
            None => Err(self.error("NAV-P002", "expected a value, got end of input".into())),
        }
    }
}

/// Parse a token stream into a command block, collecting every error found.
pub fn parse(tokens: Vec<(Token, Span)>) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}
