//! Recursive descent parser for Mermaid sequence diagram syntax.
//!
//! Strict where the Mermaid parser is strict: the header is required,
//! unknown statements are errors, blocks must be closed, and a participant
//! cannot be deactivated more often than it was activated. Activation
//! shorthand on messages (`A->>+B`, `B-->>-A`) is desugared into explicit
//! `Activate`/`Deactivate` events.

use std::collections::HashMap;

use super::ast::{
    ArrowStyle, Block, BlockKind, BlockSection, Event, Message, Note, NotePosition, Participant, ParticipantKind,
    SequenceDiagram,
};
use crate::render::RenderError;

const HEADER: &str = "sequenceDiagram";

/// First keywords of Mermaid diagram types this parser does not handle.
const OTHER_DIAGRAM_KEYWORDS: &[&str] = &[
    "graph",
    "flowchart",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "journey",
    "gitGraph",
    "mindmap",
    "timeline",
    "quadrantChart",
    "requirementDiagram",
    "C4Context",
    "sankey-beta",
    "xychart-beta",
    "block-beta",
    "architecture-beta",
    "kanban",
];

// Ordered so the longest pattern wins at a given position.
const ARROWS: &[(&str, ArrowStyle)] = &[
    ("-->>", ArrowStyle::DottedArrow),
    ("--x", ArrowStyle::DottedCross),
    ("--)", ArrowStyle::DottedAsync),
    ("-->", ArrowStyle::Dotted),
    ("->>", ArrowStyle::SolidArrow),
    ("-x", ArrowStyle::SolidCross),
    ("-)", ArrowStyle::SolidAsync),
    ("->", ArrowStyle::Solid),
];

/// Parse Mermaid sequence diagram text into an AST.
///
/// # Errors
///
/// - [`RenderError::Empty`] for blank or comment-only input.
/// - [`RenderError::UnsupportedDiagram`] when the header names another Mermaid diagram type.
/// - [`RenderError::Parse`] with a 1-based line number for anything else malformed.
pub fn parse(input: &str) -> Result<SequenceDiagram, RenderError> {
    let lines: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with("%%"))
        .collect();

    let Some(&(header_line, header)) = lines.first() else {
        return Err(RenderError::Empty);
    };
    let keyword = header.split_whitespace().next().unwrap_or_default();
    if keyword != HEADER {
        if OTHER_DIAGRAM_KEYWORDS.contains(&keyword) {
            return Err(RenderError::UnsupportedDiagram(keyword.to_owned()));
        }
        return Err(parse_error(header_line, format!("no diagram type detected in '{header}'")));
    }

    let mut parser = Parser {
        lines: &lines[1..],
        pos: 0,
        participants: Vec::new(),
        active: HashMap::new(),
        title: None,
        autonumber: false,
    };
    let events = parser.parse_events(None)?;

    Ok(SequenceDiagram {
        title: parser.title,
        autonumber: parser.autonumber,
        participants: parser.participants,
        events,
    })
}

fn parse_error(line: usize, message: impl Into<String>) -> RenderError {
    RenderError::Parse { line, message: message.into() }
}

struct Parser<'a> {
    lines: &'a [(usize, &'a str)],
    pos: usize,
    participants: Vec<Participant>,
    /// Open activation count per participant id.
    active: HashMap<String, usize>,
    title: Option<String>,
    autonumber: bool,
}

impl Parser<'_> {
    /// Parse statements until EOF, `end`, or a section keyword of the enclosing block.
    ///
    /// `open` is the enclosing block kind and the line it was opened on. The
    /// terminating keyword is left unconsumed for [`Parser::parse_block`].
    fn parse_events(&mut self, open: Option<(BlockKind, usize)>) -> Result<Vec<Event>, RenderError> {
        let mut events = Vec::new();

        while self.pos < self.lines.len() {
            let (line_no, line) = self.lines[self.pos];
            let lower = line.to_ascii_lowercase();
            let first = lower.split_whitespace().next().unwrap_or_default();

            match first {
                "end" => {
                    if open.is_some() {
                        return Ok(events);
                    }
                    return Err(parse_error(line_no, "'end' without an open block"));
                }
                "else" | "and" | "option" => {
                    let section = open.and_then(|(kind, _)| kind.section_keyword());
                    if section == Some(first) {
                        return Ok(events);
                    }
                    return Err(parse_error(line_no, format!("'{first}' outside of a matching block")));
                }
                _ => {}
            }

            self.pos += 1;

            if let Some(rest) = strip_keyword(line, "participant") {
                self.declare(rest, ParticipantKind::Participant, line_no)?;
            } else if let Some(rest) = strip_keyword(line, "actor") {
                self.declare(rest, ParticipantKind::Actor, line_no)?;
            } else if let Some(rest) = strip_keyword(line, "activate") {
                let id = self.require_id(rest, line_no)?;
                events.push(self.activate(id));
            } else if let Some(rest) = strip_keyword(line, "deactivate") {
                let id = self.require_id(rest, line_no)?;
                events.push(self.deactivate(id, line_no)?);
            } else if strip_keyword(line, "autonumber").is_some() {
                self.autonumber = true;
            } else if let Some(rest) = strip_keyword(line, "title") {
                let title = rest.trim_start_matches(':').trim();
                self.title = (!title.is_empty()).then(|| title.to_owned());
            } else if first == "note" {
                events.push(Event::Note(self.parse_note(line, line_no)?));
            } else if let Some(kind) = block_keyword(first) {
                let label = line
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, rest)| rest)
                    .trim();
                events.push(Event::Block(self.parse_block(kind, label, line_no)?));
            } else {
                self.parse_message(line, line_no, &mut events)?;
            }
        }

        match open {
            Some((kind, opened_on)) => Err(parse_error(opened_on, format!("unterminated '{}' block", kind.keyword()))),
            None => Ok(events),
        }
    }

    /// Parse the sections of a block whose header line was just consumed.
    fn parse_block(&mut self, kind: BlockKind, label: &str, opened_on: usize) -> Result<Block, RenderError> {
        let mut sections = Vec::new();
        let mut section_label = None;

        loop {
            let events = self.parse_events(Some((kind, opened_on)))?;
            sections.push(BlockSection { label: section_label.take(), events });

            // parse_events only returns Ok inside a block on `end` or a section keyword.
            let (_, line) = self.lines[self.pos];
            self.pos += 1;
            let mut parts = line.splitn(2, char::is_whitespace);
            let keyword = parts.next().unwrap_or_default();
            if keyword.eq_ignore_ascii_case("end") {
                break;
            }
            section_label = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned);
        }

        Ok(Block { kind, label: label.to_owned(), sections })
    }

    fn parse_message(&mut self, line: &str, line_no: usize, events: &mut Vec<Event>) -> Result<(), RenderError> {
        let (head, text) = match line.split_once(':') {
            Some((head, text)) => (head, Some(text.trim())),
            None => (line, None),
        };
        let Some((from, arrow, to)) = split_arrow(head) else {
            return Err(parse_error(line_no, format!("unexpected statement '{line}'")));
        };
        let Some(text) = text else {
            return Err(parse_error(line_no, format!("message is missing ':' in '{line}'")));
        };

        let from = from.trim();
        let to = to.trim();
        let (to, activate_target) = match to.strip_prefix('+') {
            Some(rest) => (rest.trim(), true),
            None => (to, false),
        };
        let (to, deactivate_source) = match to.strip_prefix('-') {
            Some(rest) => (rest.trim(), true),
            None => (to, false),
        };
        if from.is_empty() || to.is_empty() {
            return Err(parse_error(line_no, format!("message needs a sender and a receiver in '{line}'")));
        }

        self.ensure(from);
        self.ensure(to);
        events.push(Event::Message(Message { from: from.to_owned(), to: to.to_owned(), text: text.to_owned(), arrow }));

        if activate_target {
            events.push(self.activate(to.to_owned()));
        }
        if deactivate_source {
            events.push(self.deactivate(from.to_owned(), line_no)?);
        }
        Ok(())
    }

    /// Parse `Note over A,B: text`, `Note left of A: text`, or `Note right of A: text`.
    fn parse_note(&mut self, line: &str, line_no: usize) -> Result<Note, RenderError> {
        // The caller matched a leading ASCII "note", so byte offsets match
        // between `line` and its lowercase form.
        let rest = line[4..].trim_start();
        let lower = rest.to_ascii_lowercase();

        let (position, after) = if lower.starts_with("left of ") {
            (NotePosition::LeftOf, &rest[8..])
        } else if lower.starts_with("right of ") {
            (NotePosition::RightOf, &rest[9..])
        } else if lower.starts_with("over ") {
            (NotePosition::Over, &rest[5..])
        } else {
            return Err(parse_error(line_no, format!("invalid note placement in '{line}'")));
        };

        let (targets, text) = after
            .split_once(':')
            .ok_or_else(|| parse_error(line_no, format!("note is missing ':' in '{line}'")))?;

        let over: Vec<String> = targets
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if over.is_empty() || (position != NotePosition::Over && over.len() > 1) {
            return Err(parse_error(line_no, format!("invalid note target in '{line}'")));
        }
        for id in &over {
            self.ensure(id);
        }

        Ok(Note { over, text: text.trim().to_owned(), position })
    }

    /// Register a declaration like `Alice` or `A as Alice`.
    fn declare(&mut self, rest: &str, kind: ParticipantKind, line_no: usize) -> Result<(), RenderError> {
        let (id, label) = match rest.split_once(" as ") {
            Some((id, alias)) => (id.trim(), alias.trim()),
            None => (rest.trim(), rest.trim()),
        };
        if id.is_empty() {
            return Err(parse_error(line_no, "participant declaration is missing a name"));
        }

        if let Some(existing) = self.participants.iter_mut().find(|p| p.id == id) {
            label.clone_into(&mut existing.label);
            existing.kind = kind;
        } else {
            self.participants
                .push(Participant { id: id.to_owned(), label: label.to_owned(), kind });
        }
        Ok(())
    }

    fn ensure(&mut self, id: &str) {
        if !self.participants.iter().any(|p| p.id == id) {
            self.participants.push(Participant {
                id: id.to_owned(),
                label: id.to_owned(),
                kind: ParticipantKind::Participant,
            });
        }
    }

    fn require_id(&mut self, rest: &str, line_no: usize) -> Result<String, RenderError> {
        let id = rest.trim();
        if id.is_empty() {
            return Err(parse_error(line_no, "activation is missing a participant"));
        }
        self.ensure(id);
        Ok(id.to_owned())
    }

    fn activate(&mut self, id: String) -> Event {
        *self.active.entry(id.clone()).or_default() += 1;
        Event::Activate(id)
    }

    fn deactivate(&mut self, id: String, line_no: usize) -> Result<Event, RenderError> {
        match self.active.get_mut(&id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(Event::Deactivate(id))
            }
            _ => Err(parse_error(line_no, format!("trying to deactivate inactive participant '{id}'"))),
        }
    }
}

/// Split a message head at its arrow: `(sender, style, receiver)`.
fn split_arrow(head: &str) -> Option<(&str, ArrowStyle, &str)> {
    for (idx, _) in head.match_indices('-') {
        let rest = &head[idx..];
        if let Some(&(pattern, style)) = ARROWS.iter().find(|(p, _)| rest.starts_with(p)) {
            return Some((&head[..idx], style, &head[idx + pattern.len()..]));
        }
    }
    None
}

/// Strip a keyword prefix (case-insensitive) and return the rest.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let prefix = line.get(..keyword.len())?;
    if !prefix.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &line[keyword.len()..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) || (keyword == "title" && rest.starts_with(':')) {
        return Some(rest.trim());
    }
    None
}

fn block_keyword(word: &str) -> Option<BlockKind> {
    match word {
        "loop" => Some(BlockKind::Loop),
        "alt" => Some(BlockKind::Alt),
        "opt" => Some(BlockKind::Opt),
        "par" => Some(BlockKind::Par),
        "critical" => Some(BlockKind::Critical),
        "break" => Some(BlockKind::Break),
        _ => None,
    }
}
