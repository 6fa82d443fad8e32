// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::{
    ip::parse_addr, token::tokenize, AddressFamily, Command, ConfigEntry,
    ErrorKind, InterfaceConfig, IpPrefix, Lexeme, NetdError, RouteConfig,
    RouteDeletion, RouteFilter, RouteProtocol, ShowTarget, TokenKind,
};

const PLACEHOLDER_END: &str = "<cr>";

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
#[repr(usize)]
pub(crate) enum ParserState {
    Initial,
    Show,
    ShowIface,
    ShowIfaceFilter,
    ShowRoute,
    ShowRouteFib,
    ShowRouteProto,
    Set,
    SetIface,
    SetIfaceName,
    SetIfaceFamily,
    SetIfaceFib,
    SetIfaceTunnelFib,
    SetIfaceAddr,
    SetIfaceCidr,
    SetIfaceTailFib,
    SetIfaceTailTunnelFib,
    SetRoute,
    SetRouteProto,
    SetRouteStatic,
    SetRouteFib,
    SetRouteFamily,
    SetRouteDest,
    SetRouteGw,
    SetRouteTailFib,
    Delete,
    DelRoute,
    DelRouteProto,
    DelRouteStatic,
    DelRouteFib,
    DelRouteFamily,
    DelRouteFamilyFib,
    DelRouteDest,
    DelRouteGw,
    DelRouteTailFib,
    Commit,
    Save,
    Discard,
}

impl ParserState {
    const COUNT: usize = ParserState::Discard as usize + 1;

    fn is_fib_value(&self) -> bool {
        matches!(
            self,
            Self::ShowRouteFib
                | Self::SetIfaceFib
                | Self::SetIfaceTailFib
                | Self::SetRouteFib
                | Self::SetRouteTailFib
                | Self::DelRouteFib
                | Self::DelRouteFamilyFib
                | Self::DelRouteTailFib
        )
    }

    fn is_tunnel_fib_value(&self) -> bool {
        matches!(self, Self::SetIfaceTunnelFib | Self::SetIfaceTailTunnelFib)
    }

    // Placeholder shown by completion where a WORD or NUMBER is expected.
    fn hint(&self) -> &'static str {
        match self {
            Self::ShowIface => "<type|ifname>",
            Self::SetIface => "<ifname>",
            Self::SetIfaceAddr => "<address[/prefix]>",
            Self::SetRouteFamily | Self::DelRouteFamily => {
                "<destination[/prefix]>"
            }
            Self::SetRouteDest | Self::DelRouteDest => "<gateway>",
            s if s.is_fib_value() || s.is_tunnel_fib_value() => "<fib>",
            _ => "<value>",
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) enum Action {
    Shift(ParserState),
    Accept,
    Error,
}

/// Table driven parser of the CLI command language.
///
/// The action table is a pure function of `(state, token)` built once by
/// [Grammar::new] and never mutated afterwards, so one instance can be
/// shared by any number of threads.
#[derive(Debug, Clone)]
pub struct Grammar {
    actions: Vec<[Action; TokenKind::COUNT]>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        use ParserState as S;
        use TokenKind as T;

        let mut g = Self {
            actions: vec![
                [Action::Error; TokenKind::COUNT];
                ParserState::COUNT
            ],
        };

        g.shift(S::Initial, &[T::Show], S::Show);
        g.shift(S::Initial, &[T::Set], S::Set);
        g.shift(S::Initial, &[T::Delete], S::Delete);
        g.shift(S::Initial, &[T::Commit], S::Commit);
        g.shift(S::Initial, &[T::Save], S::Save);
        g.shift(S::Initial, &[T::Discard], S::Discard);
        g.accept(&[S::Commit, S::Save, S::Discard]);

        // show [ interface [WORD] | route route_filters ]
        g.accept(&[S::Show, S::ShowIface, S::ShowIfaceFilter, S::ShowRoute]);
        g.shift(S::Show, &[T::Interface], S::ShowIface);
        g.shift(S::Show, &[T::Route], S::ShowRoute);
        g.shift(S::ShowIface, &[T::Word], S::ShowIfaceFilter);
        g.shift(S::ShowRoute, &[T::Fib], S::ShowRouteFib);
        g.shift(S::ShowRouteFib, &[T::Number], S::ShowRoute);
        g.shift(S::ShowRoute, &[T::Protocol], S::ShowRouteProto);
        g.shift(S::ShowRouteProto, &[T::Static, T::Dynamic], S::ShowRoute);
        g.shift(S::ShowRoute, &[T::Inet, T::Inet6], S::ShowRoute);

        // set interface WORD family [fib_clause]* addr CIDR [fib_clause]*
        g.shift(S::Set, &[T::Interface], S::SetIface);
        g.shift(S::SetIface, &[T::Word], S::SetIfaceName);
        g.shift(S::SetIfaceName, &[T::Inet, T::Inet6], S::SetIfaceFamily);
        g.shift(S::SetIfaceFamily, &[T::Fib], S::SetIfaceFib);
        g.shift(S::SetIfaceFib, &[T::Number], S::SetIfaceFamily);
        g.shift(S::SetIfaceFamily, &[T::TunnelFib], S::SetIfaceTunnelFib);
        g.shift(S::SetIfaceTunnelFib, &[T::Number], S::SetIfaceFamily);
        g.shift(S::SetIfaceFamily, &[T::Addr], S::SetIfaceAddr);
        g.shift(S::SetIfaceAddr, &[T::Word], S::SetIfaceCidr);
        g.accept(&[S::SetIfaceCidr]);
        g.shift(S::SetIfaceCidr, &[T::Fib], S::SetIfaceTailFib);
        g.shift(S::SetIfaceTailFib, &[T::Number], S::SetIfaceCidr);
        g.shift(S::SetIfaceCidr, &[T::TunnelFib], S::SetIfaceTailTunnelFib);
        g.shift(S::SetIfaceTailTunnelFib, &[T::Number], S::SetIfaceCidr);

        // set route protocol static [fib_clause] family DEST GW [fib_clause]
        g.shift(S::Set, &[T::Route], S::SetRoute);
        g.shift(S::SetRoute, &[T::Protocol], S::SetRouteProto);
        g.shift(S::SetRouteProto, &[T::Static], S::SetRouteStatic);
        g.shift(S::SetRouteStatic, &[T::Fib], S::SetRouteFib);
        g.shift(S::SetRouteFib, &[T::Number], S::SetRouteStatic);
        g.shift(S::SetRouteStatic, &[T::Inet, T::Inet6], S::SetRouteFamily);
        g.shift(S::SetRouteFamily, &[T::Word], S::SetRouteDest);
        g.shift(S::SetRouteDest, &[T::Word], S::SetRouteGw);
        g.accept(&[S::SetRouteGw]);
        g.shift(S::SetRouteGw, &[T::Fib], S::SetRouteTailFib);
        g.shift(S::SetRouteTailFib, &[T::Number], S::SetRouteGw);

        // delete route protocol static [fib_clause]
        //     [family [fib_clause] [DEST [GW [fib_clause]]]]
        g.shift(S::Delete, &[T::Route], S::DelRoute);
        g.shift(S::DelRoute, &[T::Protocol], S::DelRouteProto);
        g.shift(S::DelRouteProto, &[T::Static], S::DelRouteStatic);
        g.accept(&[
            S::DelRouteStatic,
            S::DelRouteFamily,
            S::DelRouteDest,
            S::DelRouteGw,
        ]);
        g.shift(S::DelRouteStatic, &[T::Fib], S::DelRouteFib);
        g.shift(S::DelRouteFib, &[T::Number], S::DelRouteStatic);
        g.shift(S::DelRouteStatic, &[T::Inet, T::Inet6], S::DelRouteFamily);
        g.shift(S::DelRouteFamily, &[T::Fib], S::DelRouteFamilyFib);
        g.shift(S::DelRouteFamilyFib, &[T::Number], S::DelRouteFamily);
        g.shift(S::DelRouteFamily, &[T::Word], S::DelRouteDest);
        g.shift(S::DelRouteDest, &[T::Word], S::DelRouteGw);
        g.shift(S::DelRouteGw, &[T::Fib], S::DelRouteTailFib);
        g.shift(S::DelRouteTailFib, &[T::Number], S::DelRouteGw);

        g
    }

    fn shift(
        &mut self,
        from: ParserState,
        kinds: &[TokenKind],
        to: ParserState,
    ) {
        for kind in kinds {
            self.actions[from as usize][*kind as usize] = Action::Shift(to);
        }
    }

    fn accept(&mut self, states: &[ParserState]) {
        for state in states {
            self.actions[*state as usize][TokenKind::End as usize] =
                Action::Accept;
        }
    }

    pub(crate) fn action(&self, state: ParserState, kind: TokenKind) -> Action {
        self.actions[state as usize][kind as usize]
    }

    fn expected(&self, state: ParserState) -> Vec<TokenKind> {
        TokenKind::ALL
            .iter()
            .filter(|k| self.action(state, **k) != Action::Error)
            .copied()
            .collect()
    }

    /// Parse one command line into a fully validated [Command].
    pub fn parse(&self, line: &str) -> Result<Command, NetdError> {
        let tokens = tokenize(line);
        self.parse_tokens(line, &tokens)
    }

    /// Parse lexemes produced by [crate::tokenize] from `line`. The `line`
    /// is only used for error reporting.
    pub fn parse_tokens(
        &self,
        line: &str,
        tokens: &[Lexeme],
    ) -> Result<Command, NetdError> {
        let mut state = ParserState::Initial;
        let mut builder = CommandBuilder::default();

        for lexeme in tokens {
            if lexeme.kind == TokenKind::Error {
                return Err(NetdError::new_input_error(
                    ErrorKind::LexError,
                    format!("Invalid character '{}'", lexeme.text),
                    line,
                    lexeme.pos,
                ));
            }
            match self.action(state, lexeme.kind) {
                Action::Shift(next) => {
                    log::debug!(
                        "Parser {:?} shift {:?} to {:?}",
                        state,
                        lexeme.kind,
                        next
                    );
                    builder.absorb(state, lexeme).map_err(|e| {
                        NetdError::new_input_error(
                            e.kind(),
                            e.msg().to_string(),
                            line,
                            lexeme.pos,
                        )
                    })?;
                    state = next;
                }
                Action::Accept => {
                    log::debug!("Parser {:?} accept", state);
                    return builder.build();
                }
                Action::Error => {
                    let expected = self
                        .expected(state)
                        .iter()
                        .map(|k| k.to_string())
                        .collect::<Vec<String>>()
                        .join(", ");
                    let msg = if state == ParserState::Initial
                        && lexeme.kind == TokenKind::End
                    {
                        format!("Empty command, expecting one of: {expected}")
                    } else if lexeme.kind == TokenKind::End {
                        format!(
                            "Incomplete command, expecting one of: {expected}"
                        )
                    } else {
                        format!(
                            "Unexpected '{}', expecting one of: {expected}",
                            lexeme.text
                        )
                    };
                    return Err(NetdError::new_input_error(
                        ErrorKind::SyntaxError,
                        msg,
                        line,
                        lexeme.pos,
                    ));
                }
            }
        }
        Err(NetdError::new(
            ErrorKind::Bug,
            format!("Token stream of '{line}' does not end with END"),
        ))
    }

    /// Every lexeme which could follow `partial`. When `partial` does not
    /// end with whitespace, its last word is treated as an unfinished token
    /// and only candidates starting with it are returned. Positions
    /// expecting a free form value yield a `<placeholder>` and `<cr>` marks
    /// that the command is complete.
    pub fn complete(&self, partial: &str) -> BTreeSet<String> {
        let mut ret = BTreeSet::new();
        let (head, prefix) = if partial.is_empty()
            || partial.ends_with(char::is_whitespace)
        {
            (partial, "")
        } else {
            match partial.rfind(char::is_whitespace) {
                Some(idx) => partial.split_at(idx + 1),
                None => ("", partial),
            }
        };

        let mut state = ParserState::Initial;
        let mut builder = CommandBuilder::default();
        for lexeme in tokenize(head) {
            if lexeme.kind == TokenKind::End {
                break;
            }
            match self.action(state, lexeme.kind) {
                Action::Shift(next) => {
                    // A head parse would reject cannot be completed
                    if builder.absorb(state, &lexeme).is_err() {
                        return ret;
                    }
                    state = next;
                }
                _ => return ret,
            }
        }

        for kind in TokenKind::ALL {
            if builder.has_clause(kind) {
                continue;
            }
            match self.action(state, kind) {
                Action::Error => (),
                Action::Accept => {
                    if prefix.is_empty() {
                        ret.insert(PLACEHOLDER_END.to_string());
                    }
                }
                Action::Shift(_) => match kind {
                    TokenKind::Word | TokenKind::Number => {
                        if prefix.is_empty() {
                            ret.insert(state.hint().to_string());
                        }
                    }
                    _ => {
                        for spelling in kind.spellings() {
                            if spelling.starts_with(prefix) {
                                ret.insert(spelling.to_string());
                            }
                        }
                    }
                },
            }
        }
        ret
    }
}

// Values collected while shifting, keyed by the state the token was
// consumed in. Turned into a Command only at accept.
#[derive(Debug, Default)]
struct CommandBuilder {
    verb: Option<TokenKind>,
    target: Option<TokenKind>,
    name: Option<String>,
    family: Option<AddressFamily>,
    fib: Option<u32>,
    tunnel_fib: Option<u32>,
    protocol: Option<RouteProtocol>,
    address: Option<IpPrefix>,
    destination: Option<IpPrefix>,
    gateway: Option<IpAddr>,
}

impl CommandBuilder {
    fn absorb(
        &mut self,
        state: ParserState,
        lexeme: &Lexeme,
    ) -> Result<(), NetdError> {
        use ParserState as S;
        use TokenKind as T;

        match (state, lexeme.kind) {
            (S::Initial, kind) => self.verb = Some(kind),
            (S::Show | S::Set | S::Delete, kind) => self.target = Some(kind),
            (S::ShowIface | S::SetIface, T::Word) => {
                self.name = Some(lexeme.text.clone())
            }
            (
                S::ShowRoute
                | S::SetIfaceName
                | S::SetRouteStatic
                | S::DelRouteStatic,
                T::Inet | T::Inet6,
            ) => {
                if self.family.is_some() {
                    return Err(duplicate("address family"));
                }
                self.family = Some(if lexeme.kind == T::Inet {
                    AddressFamily::Inet4
                } else {
                    AddressFamily::Inet6
                });
            }
            (
                S::ShowRouteProto | S::SetRouteProto | S::DelRouteProto,
                T::Static | T::Dynamic,
            ) => {
                if self.protocol.is_some() {
                    return Err(duplicate("protocol"));
                }
                self.protocol = Some(if lexeme.kind == T::Static {
                    RouteProtocol::Static
                } else {
                    RouteProtocol::Dynamic
                });
            }
            (s, T::Number) if s.is_fib_value() => {
                if self.fib.is_some() {
                    return Err(duplicate("fib"));
                }
                self.fib = Some(parse_fib(&lexeme.text)?);
            }
            (s, T::Number) if s.is_tunnel_fib_value() => {
                if self.tunnel_fib.is_some() {
                    return Err(duplicate("tunnelfib"));
                }
                self.tunnel_fib = Some(parse_fib(&lexeme.text)?);
            }
            (S::SetIfaceAddr, T::Word) => {
                self.address =
                    Some(IpPrefix::parse(&lexeme.text, self.family()?)?);
            }
            (S::SetRouteFamily | S::DelRouteFamily, T::Word) => {
                self.destination = Some(IpPrefix::parse_network(
                    &lexeme.text,
                    self.family()?,
                )?);
            }
            (S::SetRouteDest | S::DelRouteDest, T::Word) => {
                self.gateway = Some(parse_addr(&lexeme.text, self.family()?)?);
            }
            _ => (),
        }
        Ok(())
    }

    // Whether the clause introduced by `kind` was already absorbed.
    fn has_clause(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Fib => self.fib.is_some(),
            TokenKind::TunnelFib => self.tunnel_fib.is_some(),
            TokenKind::Protocol => self.protocol.is_some(),
            TokenKind::Inet | TokenKind::Inet6 => self.family.is_some(),
            _ => false,
        }
    }

    fn family(&self) -> Result<AddressFamily, NetdError> {
        self.family.ok_or_else(|| missing("address family"))
    }

    fn build(self) -> Result<Command, NetdError> {
        use TokenKind as T;

        Ok(match (self.verb, self.target) {
            (Some(T::Show), None) => Command::Show(ShowTarget::Help),
            (Some(T::Show), Some(T::Interface)) => {
                Command::Show(ShowTarget::Interface(self.name))
            }
            (Some(T::Show), Some(T::Route)) => {
                Command::Show(ShowTarget::Route(RouteFilter {
                    fib: self.fib,
                    protocol: self.protocol,
                    family: self.family,
                }))
            }
            (Some(T::Set), Some(T::Interface)) => {
                let address = self.address.ok_or_else(|| missing("address"))?;
                Command::Set(ConfigEntry::Interface(InterfaceConfig {
                    name: self.name.ok_or_else(|| missing("interface name"))?,
                    family: self.family.ok_or_else(|| missing("family"))?,
                    address,
                    fib: self.fib.unwrap_or_default(),
                    tunnel_fib: self.tunnel_fib,
                }))
            }
            (Some(T::Set), Some(T::Route)) => {
                Command::Set(ConfigEntry::Route(RouteConfig {
                    family: self.family.ok_or_else(|| missing("family"))?,
                    destination: self
                        .destination
                        .ok_or_else(|| missing("destination"))?,
                    gateway: self.gateway.ok_or_else(|| missing("gateway"))?,
                    fib: self.fib,
                    protocol: self.protocol.unwrap_or(RouteProtocol::Static),
                }))
            }
            (Some(T::Delete), Some(T::Route)) => {
                Command::Delete(RouteDeletion {
                    protocol: self.protocol.unwrap_or(RouteProtocol::Static),
                    fib: self.fib,
                    family: self.family,
                    destination: self.destination,
                    gateway: self.gateway,
                })
            }
            (Some(T::Commit), None) => Command::Commit,
            (Some(T::Save), None) => Command::Save,
            (Some(T::Discard), None) => Command::Discard,
            (verb, target) => {
                return Err(NetdError::new(
                    ErrorKind::UnknownTarget,
                    format!(
                        "No command for verb {verb:?} with target {target:?}"
                    ),
                ))
            }
        })
    }
}

fn parse_fib(text: &str) -> Result<u32, NetdError> {
    text.parse::<u32>().map_err(|e| {
        NetdError::new(
            ErrorKind::SemanticError,
            format!("Invalid FIB number {text}: {e}"),
        )
    })
}

fn duplicate(clause: &str) -> NetdError {
    NetdError::new(
        ErrorKind::SemanticError,
        format!("The {clause} clause is specified more than once"),
    )
}

fn missing(field: &str) -> NetdError {
    NetdError::new(
        ErrorKind::Bug,
        format!("Accepted command has no {field}"),
    )
}
