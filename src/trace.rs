use winnow::ascii::{digit1, hex_digit1, line_ending, multispace0, space0, space1};
use winnow::combinator::{alt, cut_err, dispatch, empty, eof, fail, preceded, repeat, terminated};
use winnow::error::{ContextError, ParseError, StrContext, StrContextValue};
use winnow::token::any;
use winnow::{ModalResult, Parser};

use crate::simulation::{Access, AccessKind, AccessOutcome};

#[derive(Debug)]
pub struct TraceParseError<'a>(ParseError<&'a str, ContextError>);

impl std::fmt::Display for TraceParseError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}", self.0))
    }
}

impl std::error::Error for TraceParseError<'_> {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    InstructionFetch,
    Load,
    Store,
    Modify,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::InstructionFetch => f.write_str("I"),
            Operation::Load => f.write_str("L"),
            Operation::Store => f.write_str("S"),
            Operation::Modify => f.write_str("M"),
        }
    }
}

/// One line of a valgrind memory trace, e.g. ` M 7ff000398,8`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub operation: Operation,
    pub address: u64,
    pub size: u32,
}

impl TraceRecord {
    /// Instruction fetches do not touch the data cache.
    pub fn access(&self) -> Option<Access> {
        let kind = match self.operation {
            Operation::InstructionFetch => return None,
            Operation::Load => AccessKind::Load,
            Operation::Store => AccessKind::Store,
            Operation::Modify => AccessKind::Modify,
        };

        Some(Access {
            kind,
            address: self.address,
        })
    }

    /// `L 10,1 miss eviction`, the record followed by what it did to the cache.
    pub fn format_outcome(&self, outcome: &AccessOutcome) -> String {
        format!("{self} {outcome}")
    }
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} {:x},{}",
            self.operation, self.address, self.size
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    records: Vec<TraceRecord>,
}

impl Trace {
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn accesses(&self) -> impl Iterator<Item = Access> + '_ {
        self.records.iter().filter_map(TraceRecord::access)
    }
}

impl<'a> TryFrom<&'a str> for Trace {
    type Error = TraceParseError<'a>;

    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        trace
            .parse(input)
            .map(|records| Self { records })
            .map_err(TraceParseError)
    }
}

fn trace(input: &mut &str) -> ModalResult<Vec<TraceRecord>> {
    terminated(
        repeat(0.., preceded(multispace0, terminated(record, end))),
        (multispace0, eof).context(StrContext::Label("trace record")),
    )
    .parse_next(input)
}

fn record(input: &mut &str) -> ModalResult<TraceRecord> {
    let operation = operation.parse_next(input)?;

    // the operation decides that this is a record, anything else is malformed
    cut_err((
        preceded(space1, address),
        preceded(',', size),
    ))
    .parse_next(input)
    .map(|(address, size)| TraceRecord {
        operation,
        address,
        size,
    })
}

fn operation(input: &mut &str) -> ModalResult<Operation> {
    dispatch! {any;
        'I' => empty.value(Operation::InstructionFetch),
        'L' => empty.value(Operation::Load),
        'S' => empty.value(Operation::Store),
        'M' => empty.value(Operation::Modify),
        _ => fail::<_, Operation, _>,
    }
    .context(StrContext::Label("operation"))
    .context(StrContext::Expected(StrContextValue::Description(
        "one of I, L, S, M",
    )))
    .parse_next(input)
}

fn address(input: &mut &str) -> ModalResult<u64> {
    hex_digit1
        .try_map(|s| u64::from_str_radix(s, 16))
        .context(StrContext::Label("address"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a hexadecimal address of at most 64 bits",
        )))
        .parse_next(input)
}

fn size(input: &mut &str) -> ModalResult<u32> {
    digit1
        .try_map(str::parse::<u32>)
        .context(StrContext::Label("size"))
        .parse_next(input)
}

fn end<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    (space0, alt((line_ending, eof)))
        .context(StrContext::Label("end of line"))
        .parse_next(input)
}
