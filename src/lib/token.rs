// SPDX-License-Identifier: Apache-2.0

/// Characters allowed inside a WORD besides ASCII alphanumerics.
/// Covers interface names (`vlan.10`, `wg-lan`), IPv4/IPv6 addresses and
/// the unsplit `addr/prefix` form.
const WORD_EXTRA_CHARS: [char; 5] = ['.', ':', '/', '-', '_'];

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
#[repr(usize)]
pub enum TokenKind {
    Show,
    Set,
    Delete,
    Commit,
    Save,
    Discard,
    Interface,
    Route,
    Protocol,
    Static,
    Dynamic,
    Inet,
    Inet6,
    Addr,
    Fib,
    TunnelFib,
    Word,
    Number,
    Slash,
    End,
    Error,
}

impl TokenKind {
    pub(crate) const COUNT: usize = TokenKind::Error as usize + 1;

    pub(crate) const ALL: [TokenKind; TokenKind::COUNT] = [
        TokenKind::Show,
        TokenKind::Set,
        TokenKind::Delete,
        TokenKind::Commit,
        TokenKind::Save,
        TokenKind::Discard,
        TokenKind::Interface,
        TokenKind::Route,
        TokenKind::Protocol,
        TokenKind::Static,
        TokenKind::Dynamic,
        TokenKind::Inet,
        TokenKind::Inet6,
        TokenKind::Addr,
        TokenKind::Fib,
        TokenKind::TunnelFib,
        TokenKind::Word,
        TokenKind::Number,
        TokenKind::Slash,
        TokenKind::End,
        TokenKind::Error,
    ];

    /// Canonical spelling of keyword tokens, `None` for generic tokens.
    pub fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            Self::Show => "show",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Commit => "commit",
            Self::Save => "save",
            Self::Discard => "discard",
            Self::Interface => "interface",
            Self::Route => "route",
            Self::Protocol => "protocol",
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Inet => "inet",
            Self::Inet6 => "inet6",
            Self::Addr => "addr",
            Self::Fib => "fib",
            Self::TunnelFib => "tunnelfib",
            Self::Word
            | Self::Number
            | Self::Slash
            | Self::End
            | Self::Error => return None,
        })
    }

    /// Every spelling the lexer maps to this token.
    pub(crate) fn spellings(&self) -> &'static [&'static str] {
        match self {
            Self::Addr => &["addr", "address"],
            Self::Show => &["show"],
            Self::Set => &["set"],
            Self::Delete => &["delete"],
            Self::Commit => &["commit"],
            Self::Save => &["save"],
            Self::Discard => &["discard"],
            Self::Interface => &["interface"],
            Self::Route => &["route"],
            Self::Protocol => &["protocol"],
            Self::Static => &["static"],
            Self::Dynamic => &["dynamic"],
            Self::Inet => &["inet"],
            Self::Inet6 => &["inet6"],
            Self::Fib => &["fib"],
            Self::TunnelFib => &["tunnelfib"],
            Self::Slash => &["/"],
            Self::Word | Self::Number | Self::End | Self::Error => &[],
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|k| k.spellings().contains(&word) && **k != Self::Slash)
            .copied()
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.keyword() {
            Some(k) => write!(f, "'{k}'"),
            None => write!(
                f,
                "{}",
                match self {
                    Self::Word => "WORD",
                    Self::Number => "NUMBER",
                    Self::Slash => "'/'",
                    Self::End => "end of command",
                    _ => "invalid character",
                }
            ),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub text: String,
    /// Character position of the first character in the input line.
    pub pos: usize,
}

impl Lexeme {
    fn new(kind: TokenKind, text: String, pos: usize) -> Self {
        Self { kind, text, pos }
    }
}

/// Split a command line into lexemes. The returned sequence always ends
/// with a single [TokenKind::End]. The lexer never fails: unrecognized
/// characters produce a [TokenKind::Error] lexeme which the grammar engine
/// reports with its position.
pub fn tokenize(line: &str) -> Vec<Lexeme> {
    let mut ret: Vec<Lexeme> = Vec::new();
    let mut line_iter = line.chars().enumerate().peekable();

    while let Some((pos, c)) = line_iter.next() {
        if c.is_whitespace() {
            continue;
        }
        if !is_word_char(c) {
            ret.push(Lexeme::new(TokenKind::Error, c.to_string(), pos));
            // Resync at next whitespace
            while let Some((_, c)) = line_iter.peek() {
                if c.is_whitespace() {
                    break;
                }
                line_iter.next();
            }
            continue;
        }
        let mut block = vec![c];
        let mut bad_char: Option<(usize, char)> = None;
        while let Some((p, c)) = line_iter.peek() {
            if c.is_whitespace() {
                break;
            }
            if bad_char.is_none() && !is_word_char(*c) {
                bad_char = Some((*p, *c));
            }
            block.push(*c);
            line_iter.next();
        }
        if let Some((bad_pos, bad_c)) = bad_char {
            ret.push(Lexeme::new(TokenKind::Error, bad_c.to_string(), bad_pos));
            continue;
        }
        let block = String::from_iter(block.as_slice());
        log::debug!("Token processing {:?} at {}", block, pos);
        ret.push(Lexeme::new(classify(block.as_str()), block, pos));
    }
    ret.push(Lexeme::new(
        TokenKind::End,
        String::new(),
        line.chars().count(),
    ));
    ret
}

// Keywords are only recognized as a whole whitespace-delimited word, so
// `interfaces` or `fib0` fall through to WORD.
fn classify(word: &str) -> TokenKind {
    if word == "/" {
        TokenKind::Slash
    } else if word.chars().all(|c| c.is_ascii_digit()) {
        TokenKind::Number
    } else if let Some(kind) = TokenKind::from_keyword(word) {
        kind
    } else {
        TokenKind::Word
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || WORD_EXTRA_CHARS.contains(&c)
}
