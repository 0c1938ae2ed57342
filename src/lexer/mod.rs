use logos::Logos;

/// Tokens of the navigation language. Keywords are case-insensitive;
/// register names (`g0`, `s8`, `button`, ...) lex as identifiers and are
/// classified by the parser.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // Statements
    #[token("if", ignore(case))]
    If,
    #[token("else", ignore(case))]
    Else,
    #[token("goto", ignore(case))]
    Goto,
    #[token("jump", ignore(case))]
    Jump,
    #[token("call", ignore(case))]
    Call,
    #[token("resume", ignore(case))]
    Resume,
    #[token("exit", ignore(case))]
    Exit,
    #[token("break", ignore(case))]
    Break,
    #[token("counter", ignore(case))]
    Counter,
    #[token("random", ignore(case))]
    Random,

    // Jump targets
    #[token("vmgm", ignore(case))]
    Vmgm,
    #[token("titleset", ignore(case))]
    Titleset,
    #[token("menu", ignore(case))]
    Menu,
    #[token("entry", ignore(case))]
    Entry,
    #[token("title", ignore(case))]
    Title,
    #[token("chapter", ignore(case))]
    Chapter,
    #[token("program", ignore(case))]
    Program,
    #[token("cell", ignore(case))]
    Cell,
    #[token("fpc", ignore(case))]
    Fpc,

    // Comparison
    #[token("==")]
    #[token("eq", ignore(case))]
    EqEq,
    #[token("!=")]
    #[token("ne", ignore(case))]
    NotEq,
    #[token(">=")]
    #[token("ge", ignore(case))]
    GreaterEq,
    #[token(">")]
    #[token("gt", ignore(case))]
    Greater,
    #[token("<=")]
    #[token("le", ignore(case))]
    LessEq,
    #[token("<")]
    #[token("lt", ignore(case))]
    Less,

    // Boolean
    #[token("&&")]
    #[token("and", ignore(case))]
    AndAnd,
    #[token("||")]
    #[token("or", ignore(case))]
    OrOr,
    #[token("!")]
    #[token("not", ignore(case))]
    Bang,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    #[token("xor", ignore(case))]
    Caret,

    // Assignment
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("^=")]
    CaretAssign,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u32::from_str_radix(&lex.slice()[2..], 16).ok())]
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Number(u32),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// Source-like rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Ident(name) => format!("'{name}'"),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Token::If => "if",
            Token::Else => "else",
            Token::Goto => "goto",
            Token::Jump => "jump",
            Token::Call => "call",
            Token::Resume => "resume",
            Token::Exit => "exit",
            Token::Break => "break",
            Token::Counter => "counter",
            Token::Random => "random",
            Token::Vmgm => "vmgm",
            Token::Titleset => "titleset",
            Token::Menu => "menu",
            Token::Entry => "entry",
            Token::Title => "title",
            Token::Chapter => "chapter",
            Token::Program => "program",
            Token::Cell => "cell",
            Token::Fpc => "fpc",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::GreaterEq => ">=",
            Token::Greater => ">",
            Token::LessEq => "<=",
            Token::Less => "<",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::PercentAssign => "%=",
            Token::AmpAssign => "&=",
            Token::PipeAssign => "|=",
            Token::CaretAssign => "^=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Semi => ";",
            Token::Colon => ":",
            Token::Number(_) | Token::Ident(_) => "",
        }
    }
}

/// Lex source code into a stream of tokens with positions.
pub fn lex(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let snippet = source[span.clone()].to_string();
                return Err(LexError {
                    suggestion: suggest_fix(&snippet),
                    position: span.start,
                    span,
                    snippet,
                });
            }
        }
    }

    Ok(tokens)
}

fn suggest_fix(bad_token: &str) -> String {
    if bad_token.starts_with(|c: char| c.is_ascii_digit()) {
        "Numbers must fit in 16 bits (at most 65535 or 0xffff).".to_string()
    } else if bad_token.starts_with(['"', '\'']) {
        "Strings are not part of the navigation language.".to_string()
    } else if bad_token.starts_with("/*") {
        "Close the comment with '*/'.".to_string()
    } else {
        format!("Unexpected character(s): '{bad_token}'.")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub span: std::ops::Range<usize>,
    pub snippet: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_assignment() {
        assert_eq!(
            kinds("g1 += 0x10;"),
            vec![Token::Ident("g1".into()), Token::PlusAssign, Token::Number(16), Token::Semi]
        );
    }

    #[test]
    fn lex_keywords_any_case() {
        assert_eq!(kinds("IF Jump vmgm MENU"), vec![Token::If, Token::Jump, Token::Vmgm, Token::Menu]);
    }

    #[test]
    fn lex_word_operators() {
        assert_eq!(
            kinds("g0 eq 1 and not g1 lt g2"),
            vec![
                Token::Ident("g0".into()),
                Token::EqEq,
                Token::Number(1),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("g1".into()),
                Token::Less,
                Token::Ident("g2".into()),
            ]
        );
    }

    #[test]
    fn keyword_prefix_stays_identifier() {
        assert_eq!(kinds("menus titles"), vec![Token::Ident("menus".into()), Token::Ident("titles".into())]);
    }

    #[test]
    fn lex_comments_ignored() {
        assert_eq!(kinds("// note\nexit; /* more\n text */ break;"), vec![
            Token::Exit,
            Token::Semi,
            Token::Break,
            Token::Semi,
        ]);
    }

    #[test]
    fn lex_error_reports_position() {
        let err = lex("g0 = 1;\ng1 = $;").unwrap_err();
        assert_eq!(err.position, 13);
        assert_eq!(err.snippet, "$");
    }
}
