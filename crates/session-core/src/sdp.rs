//! SDP transport-setup rewriting
//!
//! The platform offers the subscribing session with an open DTLS role. Before
//! the offer is applied, media sections that carry no direction attribute
//! are marked `a=setup:actpass`; the answer produced locally is then pinned to
//! `a=setup:passive` on every media section before it is applied and sent.
//!
//! Only `a=setup` lines are touched. Everything else, including the line
//! ending style, passes through unchanged.

use crate::errors::{Result, SessionError};
use crate::media::TransceiverDirection;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    combinator::{all_consuming, value},
    sequence::preceded,
};
use std::fmt;

const SETUP_PREFIX: &str = "a=setup:";

/// DTLS setup role (RFC 4145 / RFC 5763)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupRole {
    Active,
    Passive,
    ActPass,
    HoldConn,
}

impl SetupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupRole::Active => "active",
            SetupRole::Passive => "passive",
            SetupRole::ActPass => "actpass",
            SetupRole::HoldConn => "holdconn",
        }
    }
}

impl fmt::Display for SetupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a setup role value
fn setup_role(input: &str) -> IResult<&str, SetupRole> {
    alt((
        value(SetupRole::ActPass, tag_no_case("actpass")),
        value(SetupRole::Active, tag_no_case("active")),
        value(SetupRole::Passive, tag_no_case("passive")),
        value(SetupRole::HoldConn, tag_no_case("holdconn")),
    ))(input)
}

/// Parse a full `a=setup:<role>` line
fn setup_attribute(input: &str) -> IResult<&str, SetupRole> {
    all_consuming(preceded(tag(SETUP_PREFIX), setup_role))(input)
}

/// Parse a direction attribute line such as `a=sendonly`
fn direction_attribute(input: &str) -> IResult<&str, TransceiverDirection> {
    all_consuming(preceded(
        tag("a="),
        alt((
            value(TransceiverDirection::SendRecv, tag("sendrecv")),
            value(TransceiverDirection::SendOnly, tag("sendonly")),
            value(TransceiverDirection::RecvOnly, tag("recvonly")),
            value(TransceiverDirection::Inactive, tag("inactive")),
        )),
    ))(input)
}

/// Direction attribute of a media section, if it declares one
fn section_direction(section: &[&str]) -> Option<TransceiverDirection> {
    section
        .iter()
        .find_map(|line| direction_attribute(line.trim_end()).ok().map(|(_, dir)| dir))
}

/// Pin every media section of an answer to `a=setup:passive`
pub fn force_passive_setup(answer: &str) -> Result<String> {
    rewrite_setup(answer, SetupRole::Passive, |_| true)
}

/// Mark media sections without a direction attribute as `a=setup:actpass`
///
/// A description without media sections is an error rather than passed
/// through unchanged.
pub fn offer_actpass_setup(offer: &str) -> Result<String> {
    rewrite_setup(offer, SetupRole::ActPass, |section| {
        section_direction(section).is_none()
    })
}

/// Setup role declared by each media section, in order
pub fn media_setup_roles(sdp: &str) -> Result<Vec<Option<SetupRole>>> {
    let lines: Vec<&str> = sdp.lines().collect();
    let sections = media_sections(&lines)?;
    Ok(sections
        .into_iter()
        .map(|(start, end)| {
            lines[start..end]
                .iter()
                .find_map(|line| setup_attribute(line.trim_end()).ok().map(|(_, role)| role))
        })
        .collect())
}

/// Half-open line ranges of each media section
fn media_sections(lines: &[&str]) -> Result<Vec<(usize, usize)>> {
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("m="))
        .map(|(idx, _)| idx)
        .collect();

    if starts.is_empty() {
        return Err(SessionError::invalid_sdp("description has no media sections"));
    }

    Ok(starts
        .iter()
        .enumerate()
        .map(|(n, &start)| (start, starts.get(n + 1).copied().unwrap_or(lines.len())))
        .collect())
}

fn rewrite_setup<F>(sdp: &str, role: SetupRole, should_rewrite: F) -> Result<String>
where
    F: Fn(&[&str]) -> bool,
{
    let eol = if sdp.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = sdp.lines().collect();
    let sections = media_sections(&lines)?;

    let mut out: Vec<String> = lines[..sections[0].0]
        .iter()
        .map(|line| line.to_string())
        .collect();

    for (start, end) in sections {
        let section = &lines[start..end];
        if should_rewrite(section) {
            out.extend(with_setup_role(section, role));
        } else {
            out.extend(section.iter().map(|line| line.to_string()));
        }
    }

    let mut rewritten = out.join(eol);
    if sdp.ends_with('\n') {
        rewritten.push_str(eol);
    }
    Ok(rewritten)
}

fn with_setup_role(section: &[&str], role: SetupRole) -> Vec<String> {
    let setup_line = format!("{}{}", SETUP_PREFIX, role);
    let mut replaced = false;
    let mut out = Vec::with_capacity(section.len() + 1);

    for line in section {
        if line.starts_with(SETUP_PREFIX) {
            // collapse duplicates into one line
            if !replaced {
                out.push(setup_line.clone());
                replaced = true;
            }
        } else {
            out.push(line.to_string());
        }
    }

    if !replaced {
        let at = out
            .iter()
            .position(|line| line.starts_with("a="))
            .unwrap_or(out.len());
        out.insert(at, setup_line);
    }
    out
}
