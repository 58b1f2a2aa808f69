#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the bench REPL.
//!
//! The lexer uses `regal` to produce a bounded token stream, and the parser
//! walks the [`catalog`] grammar tree with `winnow` combinators over those
//! tokens.

use super::catalog::{self, ChoiceBranch, ChoiceTag, CommandTag, IntegerSlot, Node, SlotTag};
use core::fmt;
use core::ops::Range;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
#[allow(deprecated)]
use winnow::error::ErrorKind;
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;

use crate::ranging::ChannelId;

/// Maximum number of tokens produced per REPL line.
pub const MAX_TOKENS: usize = 16;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the bench grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Unsigned integer literal.
    #[regex(r"[0-9]+")]
    Integer,
    /// Command name or keyword (matched case-insensitively later).
    #[regex(r"[A-Za-z][A-Za-z0-9-]*")]
    Ident,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Anything else.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidInteger {
        span: Range<usize>,
    },
    ValueOutOfRange {
        span: Range<usize>,
        max: u16,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::InvalidInteger { span } => {
                write!(f, "invalid integer literal at {span:?}")
            }
            GrammarErrorKind::ValueOutOfRange { span, max } => {
                write!(f, "value at {span:?} exceeds {max}")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        GrammarError {
            kind: match token {
                Some(tok) if tok.kind != TokenKind::Eol => GrammarErrorKind::UnexpectedToken {
                    expected,
                    found: Some(tok.kind),
                    span: tok.span.clone(),
                },
                _ => GrammarErrorKind::UnexpectedEnd { expected },
            },
        }
    }

    fn invalid_integer(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidInteger {
                span: token.span.clone(),
            },
        }
    }

    fn out_of_range(token: &Token<'a>, max: u16) -> Self {
        GrammarError {
            kind: GrammarErrorKind::ValueOutOfRange {
                span: token.span.clone(),
                max,
            },
        }
    }

    fn invalid_token(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidToken {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
        }
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

#[allow(deprecated)]
impl<'src, 'slice> ParserError<Input<'src, 'slice>> for GrammarError<'src>
where
    'src: 'slice,
{
    fn from_error_kind(input: &Input<'src, 'slice>, _kind: ErrorKind) -> Self {
        GrammarError::unexpected("token", input.first())
    }

    fn append(
        self,
        _input: &Input<'src, 'slice>,
        _token_start: &<Input<'src, 'slice> as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }

    fn or(self, other: Self) -> Self {
        other
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Toggle,
    Throttle(u16),
    Range(RangeCommand),
    Step(u16),
    Status,
    Help(HelpCommand<'a>),
}

/// Channels addressed by a `range` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeTarget {
    Channel(ChannelId),
    All,
}

impl RangeTarget {
    /// Returns `true` when `channel` is addressed.
    pub fn includes(self, channel: ChannelId) -> bool {
        match self {
            RangeTarget::Channel(target) => target == channel,
            RangeTarget::All => true,
        }
    }
}

/// Simulated echo placed on a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BenchEcho {
    Centimeters(u16),
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeCommand {
    pub target: RangeTarget,
    pub echo: BenchEcho,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

pub(crate) fn parse_tokens_partial<'src, 'slice>(
    tokens: &'slice [Token<'src>],
) -> Result<(Command<'src>, &'slice [Token<'src>]), GrammarError<'src>>
where
    'src: 'slice,
{
    let mut input = tokens;
    match command().parse_next(&mut input) {
        Ok(cmd) => Ok((cmd, input)),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err),
        Err(ErrMode::Incomplete(_)) => Err(GrammarError::unexpected("token", input.first())),
    }
}

/// Tokenize the provided line.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        push_token(&mut buffer, record.token, lexeme, span)?;
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let span = start..start + partial.fragment.len();
        push_token(&mut buffer, TokenKind::Error, partial.fragment, span)?;
    }

    Ok(buffer)
}

fn push_token<'a>(
    buffer: &mut TokenBuffer<'a>,
    kind: TokenKind,
    lexeme: &'a str,
    span: Range<usize>,
) -> Result<(), LexError> {
    buffer
        .push(Token { kind, lexeme, span })
        .map_err(|_| LexError::TooManyTokens {
            processed: buffer.len() + 1,
        })
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a bench command from the provided line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::invalid_token(token)));
    }

    let (command, mut rest) =
        parse_tokens_partial(tokens.as_slice()).map_err(ParseError::Grammar)?;

    while let Some((token, remaining)) = rest.split_first() {
        if token.kind == TokenKind::Eol {
            rest = remaining;
        } else {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
    }

    Ok(command)
}

fn command<'src, 'slice>() -> impl Parser<Input<'src, 'slice>, Command<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| {
        let snapshot = *input;
        let command_token = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;

        if let Some(spec) = catalog::find(command_token.lexeme) {
            let mut state = CommandState::new(spec.tag);
            parse_node(spec.grammar, input, &mut state)?;
            state.finish()
        } else {
            *input = snapshot;
            Err(ErrMode::Backtrack(GrammarError::unexpected(
                "command keyword",
                Some(&command_token),
            )))
        }
    }
}

fn parse_node<'src, 'slice>(
    node: &'static Node,
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match node {
        Node::End => Ok(()),
        Node::Choice {
            choices,
            integer,
            next,
        } => {
            parse_choice(input, choices, *integer, state)?;
            parse_node(next, input, state)
        }
        Node::Integer {
            slot,
            default,
            next,
        } => {
            parse_integer_slot(input, *slot, *default, state)?;
            parse_node(next, input, state)
        }
        Node::Topic { next } => {
            parse_topic(input, state)?;
            parse_node(next, input, state)
        }
    }
}

fn parse_choice<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    choices: &'static [ChoiceBranch],
    integer: Option<IntegerSlot>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    let label = integer.map_or_else(|| choice_expected_label(choices), |slot| slot.label);
    match (input.split_first(), integer) {
        (Some((token, rest)), _) if token.kind == TokenKind::Ident => {
            let Some(branch) = find_choice(choices, token.lexeme) else {
                return Err(ErrMode::Backtrack(GrammarError::unexpected(
                    choice_expected_label(choices),
                    Some(token),
                )));
            };
            *input = rest;
            state.apply_choice(branch.tag)
        }
        (Some((token, rest)), Some(slot)) if token.kind == TokenKind::Integer => {
            let value = parse_bounded(token, slot.max).map_err(ErrMode::Cut)?;
            *input = rest;
            state.apply_integer(slot.tag, value)
        }
        (token, _) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            token.map(|(token, _)| token),
        ))),
    }
}

fn parse_integer_slot<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    slot: IntegerSlot,
    default: Option<u16>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Integer => {
            let value = parse_bounded(token, slot.max).map_err(ErrMode::Cut)?;
            *input = rest;
            state.apply_integer(slot.tag, value)
        }
        Some((token, _)) if token.kind != TokenKind::Eol => Err(ErrMode::Backtrack(
            GrammarError::unexpected(slot.label, Some(token)),
        )),
        _ => match default {
            Some(value) => state.apply_integer(slot.tag, value),
            None => Err(ErrMode::Backtrack(GrammarError::unexpected(
                slot.label, None,
            ))),
        },
    }
}

fn parse_topic<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            state.set_topic(token.lexeme);
            *input = rest;
            Ok(())
        }
        Some((token, _)) if token.kind != TokenKind::Eol => Err(ErrMode::Backtrack(
            GrammarError::unexpected("command name", Some(token)),
        )),
        _ => Ok(()),
    }
}

fn find_choice(choices: &'static [ChoiceBranch], lexeme: &str) -> Option<&'static ChoiceBranch> {
    choices
        .iter()
        .find(|choice| choice.keyword.eq_ignore_ascii_case(lexeme))
}

fn choice_expected_label(choices: &'static [ChoiceBranch]) -> &'static str {
    choices.first().map_or("keyword", |choice| choice.keyword)
}

enum CommandState<'a> {
    Toggle,
    Throttle {
        raw: Option<u16>,
    },
    Range {
        target: Option<RangeTarget>,
        echo: Option<BenchEcho>,
    },
    Step {
        cycles: Option<u16>,
    },
    Status,
    Help {
        topic: Option<&'a str>,
    },
}

impl<'a> CommandState<'a> {
    fn new(tag: CommandTag) -> Self {
        match tag {
            CommandTag::Toggle => CommandState::Toggle,
            CommandTag::Throttle => CommandState::Throttle { raw: None },
            CommandTag::Range => CommandState::Range {
                target: None,
                echo: None,
            },
            CommandTag::Step => CommandState::Step { cycles: None },
            CommandTag::Status => CommandState::Status,
            CommandTag::Help => CommandState::Help { topic: None },
        }
    }

    fn apply_choice(&mut self, tag: ChoiceTag) -> Result<(), ErrMode<GrammarError<'a>>> {
        match (self, tag) {
            (CommandState::Range { target, .. }, ChoiceTag::Front) => {
                *target = Some(RangeTarget::Channel(ChannelId::Front));
            }
            (CommandState::Range { target, .. }, ChoiceTag::Left) => {
                *target = Some(RangeTarget::Channel(ChannelId::Left));
            }
            (CommandState::Range { target, .. }, ChoiceTag::Right) => {
                *target = Some(RangeTarget::Channel(ChannelId::Right));
            }
            (CommandState::Range { target, .. }, ChoiceTag::All) => {
                *target = Some(RangeTarget::All);
            }
            (CommandState::Range { echo, .. }, ChoiceTag::Timeout) => {
                *echo = Some(BenchEcho::Timeout);
            }
            _ => return Err(ErrMode::Backtrack(GrammarError::unexpected("choice", None))),
        }
        Ok(())
    }

    fn apply_integer(&mut self, tag: SlotTag, value: u16) -> Result<(), ErrMode<GrammarError<'a>>> {
        match (self, tag) {
            (CommandState::Throttle { raw }, SlotTag::ThrottleRaw) => *raw = Some(value),
            (CommandState::Range { echo, .. }, SlotTag::Centimeters) => {
                *echo = Some(BenchEcho::Centimeters(value));
            }
            (CommandState::Step { cycles }, SlotTag::Cycles) => *cycles = Some(value),
            _ => return Err(ErrMode::Backtrack(GrammarError::unexpected("value", None))),
        }
        Ok(())
    }

    fn set_topic(&mut self, topic: &'a str) {
        if let CommandState::Help { topic: slot } = self {
            *slot = Some(topic);
        }
    }

    fn finish(self) -> Result<Command<'a>, ErrMode<GrammarError<'a>>> {
        match self {
            CommandState::Toggle => Ok(Command::Toggle),
            CommandState::Status => Ok(Command::Status),
            CommandState::Throttle { raw: Some(raw) } => Ok(Command::Throttle(raw)),
            CommandState::Range {
                target: Some(target),
                echo: Some(echo),
            } => Ok(Command::Range(RangeCommand { target, echo })),
            CommandState::Step { cycles: Some(cycles) } => Ok(Command::Step(cycles)),
            CommandState::Help { topic } => Ok(Command::Help(HelpCommand { topic })),
            CommandState::Throttle { raw: None } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("throttle sample", None),
            )),
            CommandState::Range { .. } => Err(ErrMode::Backtrack(GrammarError::unexpected(
                "range arguments",
                None,
            ))),
            CommandState::Step { cycles: None } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("cycle count", None),
            )),
        }
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

fn parse_bounded<'a>(token: &Token<'a>, max: u16) -> Result<u16, GrammarError<'a>> {
    let value = token
        .lexeme
        .parse::<u32>()
        .map_err(|_| GrammarError::invalid_integer(token))?;
    u16::try_from(value)
        .ok()
        .filter(|value| *value <= max)
        .ok_or_else(|| GrammarError::out_of_range(token, max))
}
