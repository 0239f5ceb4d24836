//! Line grammar for probe payloads using nom.
//!
//! ```text
//! line   := name ws+ values
//! values := number (ws* "," ws* number)*
//! ```

use nom::{
    bytes::complete::take_till1,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, rest},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, separated_pair},
    IResult,
};

/// One non-blank payload line
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadLine<'a> {
    /// Metric name
    pub name: &'a str,
    /// One or more finite values
    pub values: Vec<f64>,
}

/// Why a line was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum LineError {
    /// A name with nothing after it
    MissingValue,
    /// The value part is not a list of finite numbers
    InvalidValue(String),
}

impl LineError {
    /// Human-readable reason, used in payload errors
    pub fn reason(&self) -> String {
        match self {
            LineError::MissingValue => "missing value".to_string(),
            LineError::InvalidValue(value) => format!("invalid numeric value '{}'", value),
        }
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<PayloadLine<'_>>, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (name, value) = match record(line) {
        Ok((_, parts)) => parts,
        Err(_) => return Err(LineError::MissingValue),
    };

    let values = match all_consuming(value_list)(value) {
        Ok((_, values)) => values,
        Err(_) => return Err(LineError::InvalidValue(value.to_string())),
    };

    if values.iter().any(|v| !v.is_finite()) {
        return Err(LineError::InvalidValue(value.to_string()));
    }

    Ok(Some(PayloadLine { name, values }))
}

/// Leading name for error reporting, even when the line does not parse
pub fn line_name(line: &str) -> &str {
    metric_name(line.trim()).map(|(_, name)| name).unwrap_or("")
}

fn record(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(metric_name, space1, rest)(input)
}

fn metric_name(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn value_list(input: &str) -> IResult<&str, Vec<f64>> {
    separated_list1(char(','), delimited(space0, double, space0))(input)
}
