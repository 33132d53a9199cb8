// Line parser for the event script

use super::ast::{Event, ScriptLine};
use super::lexer::{integer, string_literal, unsigned, ws};
use anyhow::{bail, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{not_line_ending, space1},
    combinator::{eof, map, map_res, opt},
    sequence::{preceded, terminated},
    IResult,
};

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), space1)
}

fn year(input: &str) -> IResult<&str, i32> {
    map_res(integer, i32::try_from)(input)
}

fn slot(input: &str) -> IResult<&str, usize> {
    map_res(unsigned, usize::try_from)(input)
}

/// Format: count N
fn parse_count(input: &str) -> IResult<&str, Event> {
    map(preceded(keyword("count"), ws(slot)), Event::Count)(input)
}

/// Format: pick SLOT "Country"
fn parse_pick(input: &str) -> IResult<&str, Event> {
    let (input, _) = keyword("pick")(input)?;
    let (input, slot) = ws(slot)(input)?;
    let (input, country) = ws(string_literal)(input)?;
    Ok((input, Event::Pick { slot, country }))
}

/// Format: country "Country"
fn parse_country(input: &str) -> IResult<&str, Event> {
    map(preceded(keyword("country"), ws(string_literal)), Event::Country)(input)
}

/// Format: year Y
fn parse_year(input: &str) -> IResult<&str, Event> {
    map(preceded(keyword("year"), ws(year)), Event::Year)(input)
}

/// Format: slide Y
fn parse_slide(input: &str) -> IResult<&str, Event> {
    map(preceded(keyword("slide"), ws(year)), Event::Slide)(input)
}

/// Format: tick or tick N
fn parse_tick(input: &str) -> IResult<&str, Event> {
    let (input, _) = tag("tick")(input)?;
    let (input, n) = opt(preceded(space1, map_res(unsigned, u32::try_from)))(input)?;
    Ok((input, Event::Tick(n.unwrap_or(1))))
}

/// Format: hover "element-id"
fn parse_hover(input: &str) -> IResult<&str, Event> {
    map(preceded(keyword("hover"), ws(string_literal)), Event::Hover)(input)
}

/// Trailing `# comment` or nothing
fn line_end(input: &str) -> IResult<&str, ()> {
    let (input, _) = ws(opt(preceded(tag("#"), not_line_ending)))(input)?;
    let (input, _) = eof(input)?;
    Ok((input, ()))
}

/// Parse one non-blank line into an event
pub fn parse_event(input: &str) -> IResult<&str, Event> {
    terminated(
        ws(alt((
            parse_count,
            parse_pick,
            parse_country,
            parse_year,
            parse_slide,
            parse_tick,
            parse_hover,
        ))),
        line_end,
    )(input)
}

/// Parse a whole script. Blank lines and comment lines are skipped; the
/// first malformed line aborts with its 1-based line number.
pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>> {
    let mut events = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_event(line) {
            Ok((_, event)) => events.push(ScriptLine {
                line: index + 1,
                event,
            }),
            Err(e) => bail!("line {}: cannot parse '{}': {:?}", index + 1, line, e),
        }
    }
    Ok(events)
}
