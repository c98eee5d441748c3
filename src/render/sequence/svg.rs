//! Layout + SVG emission for a parsed sequence diagram.
//!
//! Rows are fixed height; every message or note takes one row and every
//! block section takes at least one. Background shapes (frames, activation
//! bars) go into a separate buffer so they paint under arrows and labels.

use std::collections::HashMap;
use std::fmt::Write;

use super::ast::{ArrowStyle, Block, Event, Message, Note, NotePosition, Participant, ParticipantKind, SequenceDiagram};

// Layout constants, in SVG user units.
const MARGIN: f64 = 20.0;
const PARTICIPANT_BOX_W: f64 = 120.0;
const PARTICIPANT_BOX_H: f64 = 40.0;
const PARTICIPANT_SPACING: f64 = 200.0;
const MESSAGE_ROW_HEIGHT: f64 = 50.0;
const ACTIVATION_BAR_W: f64 = 12.0;
const NOTE_W: f64 = 140.0;
const NOTE_H: f64 = 36.0;
const BLOCK_PADDING: f64 = 20.0;
const TITLE_H: f64 = 30.0;
const SELF_LOOP_W: f64 = 40.0;
/// Horizontal room reserved on each side for `left of`/`right of` notes.
const GUTTER: f64 = NOTE_W + BLOCK_PADDING;
const LIFELINE_DASH_PATTERN: &str = "8,4";

/// Render `diagram` as a standalone SVG document whose root id is `target_id`.
#[must_use]
pub fn render_svg(diagram: &SequenceDiagram, target_id: &str) -> String {
    let count = diagram.participants.len();
    let title_h = if diagram.title.is_some() { TITLE_H } else { 0.0 };

    #[allow(clippy::cast_precision_loss)]
    let centers: Vec<f64> = (0..count)
        .map(|i| MARGIN + GUTTER + PARTICIPANT_BOX_W / 2.0 + i as f64 * PARTICIPANT_SPACING)
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let span = count.saturating_sub(1) as f64 * PARTICIPANT_SPACING + PARTICIPANT_BOX_W;
    let width = 2.0 * (MARGIN + GUTTER) + span;

    let rows = count_event_rows(&diagram.events);
    let lifeline_top = MARGIN + title_h + PARTICIPANT_BOX_H;
    #[allow(clippy::cast_precision_loss)]
    let lifeline_bottom = lifeline_top + (rows as f64 + 1.0) * MESSAGE_ROW_HEIGHT;
    let height = lifeline_bottom + PARTICIPANT_BOX_H + MARGIN;

    let id = escape(target_id);
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" role="graphics-document document" aria-roledescription="sequence">"#
    );
    write_style(&mut out, &id);
    write_defs(&mut out, &id);

    if let Some(title) = &diagram.title {
        let _ = write!(
            out,
            r#"<text class="title" x="{x}" y="{y}" text-anchor="middle">{text}</text>"#,
            x = width / 2.0,
            y = MARGIN + TITLE_H / 2.0,
            text = escape(title)
        );
    }

    for (p, &cx) in diagram.participants.iter().zip(&centers) {
        write_participant(&mut out, p, cx, MARGIN + title_h);
        let _ = write!(
            out,
            r#"<line class="lifeline" x1="{cx}" y1="{lifeline_top}" x2="{cx}" y2="{lifeline_bottom}" stroke-dasharray="{LIFELINE_DASH_PATTERN}"/>"#
        );
        write_participant(&mut out, p, cx, lifeline_bottom);
    }

    let mut layout = Layout {
        id: &id,
        centers: &centers,
        index: diagram
            .participants
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.as_str(), i))
            .collect(),
        lifeline_top,
        frame_left: MARGIN + GUTTER / 2.0,
        frame_right: width - MARGIN - GUTTER / 2.0,
        row: 0,
        last_message_y: None,
        open_bars: HashMap::new(),
        autonumber: diagram.autonumber.then_some(0),
        back: String::new(),
        front: String::new(),
    };
    layout.events(&diagram.events);
    layout.close_all_bars(lifeline_bottom);

    out.push_str(&layout.back);
    out.push_str(&layout.front);
    out.push_str("</svg>");
    out
}

struct Layout<'a> {
    id: &'a str,
    centers: &'a [f64],
    index: HashMap<&'a str, usize>,
    lifeline_top: f64,
    frame_left: f64,
    frame_right: f64,
    row: usize,
    /// Arrow y of the most recent message; activations anchor to it.
    last_message_y: Option<f64>,
    /// Stack of bar start y per participant index.
    open_bars: HashMap<usize, Vec<f64>>,
    autonumber: Option<usize>,
    back: String,
    front: String,
}

impl Layout<'_> {
    fn row_top(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let row = self.row as f64;
        self.lifeline_top + row * MESSAGE_ROW_HEIGHT
    }

    fn anchor_y(&self) -> f64 {
        self.last_message_y.unwrap_or_else(|| self.row_top())
    }

    fn center(&self, id: &str) -> Option<(usize, f64)> {
        self.index.get(id).map(|&i| (i, self.centers[i]))
    }

    fn events(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::Message(msg) => {
                    self.message(msg);
                    self.row += 1;
                }
                Event::Note(note) => {
                    self.note(note);
                    self.row += 1;
                }
                Event::Block(block) => self.block(block),
                Event::Activate(id) => {
                    if let Some((idx, _)) = self.center(id) {
                        let y = self.anchor_y();
                        self.open_bars.entry(idx).or_default().push(y);
                    }
                }
                Event::Deactivate(id) => {
                    if let Some((idx, _)) = self.center(id) {
                        let end = self.anchor_y();
                        self.close_bar(idx, end);
                    }
                }
            }
        }
    }

    fn message(&mut self, msg: &Message) {
        let (Some((from_idx, from_x)), Some((to_idx, to_x))) = (self.center(&msg.from), self.center(&msg.to)) else {
            return;
        };
        let y = self.row_top() + MESSAGE_ROW_HEIGHT / 2.0;
        self.last_message_y = Some(y);

        let class = if msg.arrow.is_dotted() { "message dotted" } else { "message" };
        let marker = match msg.arrow {
            ArrowStyle::SolidArrow | ArrowStyle::DottedArrow => Some("arrowhead"),
            ArrowStyle::SolidCross | ArrowStyle::DottedCross => Some("crosshead"),
            ArrowStyle::SolidAsync | ArrowStyle::DottedAsync => Some("openhead"),
            ArrowStyle::Solid | ArrowStyle::Dotted => None,
        };
        let marker_attr = marker.map_or(String::new(), |m| format!(r#" marker-end="url(#{}-{m})""#, self.id));

        if from_idx == to_idx {
            // Self message: a small loop to the right of the lifeline.
            let top = y - MESSAGE_ROW_HEIGHT / 4.0;
            let bottom = y + MESSAGE_ROW_HEIGHT / 4.0;
            let _ = write!(
                self.front,
                r#"<path class="{class}" d="M{from_x},{top} H{right} V{bottom} H{from_x}" fill="none"{marker_attr}/>"#,
                right = from_x + SELF_LOOP_W
            );
        } else {
            let _ = write!(
                self.front,
                r#"<line class="{class}" x1="{from_x}" y1="{y}" x2="{to_x}" y2="{y}"{marker_attr}/>"#
            );
        }

        let label = match self.autonumber.as_mut() {
            Some(n) => {
                *n += 1;
                format!("{n}. {}", msg.text)
            }
            None => msg.text.clone(),
        };
        if !label.is_empty() {
            let mid_x = if from_idx == to_idx { from_x + SELF_LOOP_W } else { f64::midpoint(from_x, to_x) };
            let _ = write!(
                self.front,
                r#"<text class="message-text" x="{mid_x}" y="{ty}" text-anchor="middle">{text}</text>"#,
                ty = y - 8.0,
                text = escape(&label)
            );
        }
    }

    fn note(&mut self, note: &Note) {
        let Some((_, cx)) = note.over.first().and_then(|id| self.center(id)) else {
            return;
        };
        let y = self.row_top() + (MESSAGE_ROW_HEIGHT - NOTE_H) / 2.0;
        let (x, w) = match note.position {
            NotePosition::LeftOf => (cx - PARTICIPANT_BOX_W / 2.0 - NOTE_W - 10.0, NOTE_W),
            NotePosition::RightOf => (cx + PARTICIPANT_BOX_W / 2.0 + 10.0, NOTE_W),
            NotePosition::Over => {
                let last_x = note
                    .over
                    .last()
                    .and_then(|id| self.center(id))
                    .map_or(cx, |(_, x)| x);
                if note.over.len() > 1 && (last_x - cx).abs() > f64::EPSILON {
                    let left = cx.min(last_x) - PARTICIPANT_BOX_W / 2.0;
                    (left, (last_x - cx).abs() + PARTICIPANT_BOX_W)
                } else {
                    (cx - NOTE_W / 2.0, NOTE_W)
                }
            }
        };
        let _ = write!(
            self.front,
            r#"<g class="note"><rect x="{x}" y="{y}" width="{w}" height="{NOTE_H}"/><text x="{tx}" y="{ty}" text-anchor="middle" dominant-baseline="middle">{text}</text></g>"#,
            tx = x + w / 2.0,
            ty = y + NOTE_H / 2.0,
            text = escape(&note.text)
        );
    }

    fn block(&mut self, block: &Block) {
        let start = self.row_top() - 5.0;
        let width = self.frame_right - self.frame_left;

        for (i, section) in block.sections.iter().enumerate() {
            if i > 0 {
                let sep_y = self.row_top();
                let _ = write!(
                    self.back,
                    r#"<line class="block-separator" x1="{x1}" y1="{sep_y}" x2="{x2}" y2="{sep_y}" stroke-dasharray="{LIFELINE_DASH_PATTERN}"/>"#,
                    x1 = self.frame_left,
                    x2 = self.frame_right
                );
                if let Some(label) = &section.label {
                    let _ = write!(
                        self.back,
                        r#"<text class="block-label" x="{x}" y="{y}" text-anchor="middle">[{text}]</text>"#,
                        x = f64::midpoint(self.frame_left, self.frame_right),
                        y = sep_y + 14.0,
                        text = escape(label)
                    );
                }
            }
            self.events(&section.events);
            if section.events.iter().all(|e| matches!(e, Event::Activate(_) | Event::Deactivate(_))) {
                self.row += 1;
            }
        }

        let height = self.row_top() + 5.0 - start;
        let title = if block.label.is_empty() {
            block.kind.keyword().to_owned()
        } else {
            format!("{} [{}]", block.kind.keyword(), block.label)
        };
        let _ = write!(
            self.back,
            r#"<g class="block"><rect x="{x}" y="{start}" width="{width}" height="{height}"/><text class="block-title" x="{tx}" y="{ty}">{text}</text></g>"#,
            x = self.frame_left,
            tx = self.frame_left + 6.0,
            ty = start + 14.0,
            text = escape(&title)
        );
    }

    fn close_bar(&mut self, idx: usize, end: f64) {
        let Some(start) = self.open_bars.get_mut(&idx).and_then(Vec::pop) else {
            return;
        };
        let cx = self.centers[idx];
        let depth = self.open_bars.get(&idx).map_or(0, Vec::len);
        #[allow(clippy::cast_precision_loss)]
        let offset = depth as f64 * (ACTIVATION_BAR_W / 2.0);
        let height = (end - start).max(MESSAGE_ROW_HEIGHT / 4.0);
        let _ = write!(
            self.back,
            r#"<rect class="activation" x="{x}" y="{start}" width="{ACTIVATION_BAR_W}" height="{height}"/>"#,
            x = cx - ACTIVATION_BAR_W / 2.0 + offset
        );
    }

    fn close_all_bars(&mut self, end: f64) {
        let mut open: Vec<usize> = self.open_bars.keys().copied().collect();
        open.sort_unstable();
        for idx in open {
            while self.open_bars.get(&idx).is_some_and(|bars| !bars.is_empty()) {
                self.close_bar(idx, end);
            }
        }
    }
}

fn write_participant(out: &mut String, p: &Participant, cx: f64, top: f64) {
    let label = escape(&p.label);
    match p.kind {
        ParticipantKind::Participant => {
            let _ = write!(
                out,
                r#"<g class="participant"><rect x="{x}" y="{top}" width="{PARTICIPANT_BOX_W}" height="{PARTICIPANT_BOX_H}" rx="3"/><text x="{cx}" y="{ty}" text-anchor="middle" dominant-baseline="middle">{label}</text></g>"#,
                x = cx - PARTICIPANT_BOX_W / 2.0,
                ty = top + PARTICIPANT_BOX_H / 2.0
            );
        }
        ParticipantKind::Actor => {
            let head_y = top + 6.0;
            let body_top = top + 12.0;
            let body_bottom = top + 22.0;
            let _ = write!(
                out,
                r#"<g class="actor"><circle cx="{cx}" cy="{head_y}" r="6"/><line x1="{cx}" y1="{body_top}" x2="{cx}" y2="{body_bottom}"/><line x1="{l}" y1="{arms}" x2="{r}" y2="{arms}"/><line x1="{cx}" y1="{body_bottom}" x2="{l}" y2="{feet}"/><line x1="{cx}" y1="{body_bottom}" x2="{r}" y2="{feet}"/><text x="{cx}" y="{ty}" text-anchor="middle">{label}</text></g>"#,
                l = cx - 8.0,
                r = cx + 8.0,
                arms = top + 15.0,
                feet = top + 30.0,
                ty = top + PARTICIPANT_BOX_H - 2.0
            );
        }
    }
}

fn write_style(out: &mut String, id: &str) {
    let _ = write!(
        out,
        "<style>#{id}{{font-family:\"trebuchet ms\",verdana,arial,sans-serif;font-size:14px;fill:#333}}\
#{id} .participant rect{{fill:#ECECFF;stroke:#9370DB}}\
#{id} .actor circle,#{id} .actor line{{fill:none;stroke:#333}}\
#{id} .lifeline{{stroke:#999;stroke-width:0.5}}\
#{id} .message{{stroke:#333;stroke-width:1.5}}\
#{id} .message.dotted{{stroke-dasharray:3,3}}\
#{id} .note rect{{fill:#FFF5AD;stroke:#AAAA33}}\
#{id} .block rect{{fill:none;stroke:#666}}\
#{id} .block-separator{{stroke:#666}}\
#{id} .activation{{fill:#F4F4F4;stroke:#666}}\
#{id} .title{{font-size:18px}}</style>"
    );
}

fn write_defs(out: &mut String, id: &str) {
    let _ = write!(
        out,
        r##"<defs><marker id="{id}-arrowhead" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="8" markerHeight="8" orient="auto"><path d="M0,0 L10,5 L0,10 z" fill="#333"/></marker><marker id="{id}-crosshead" viewBox="0 0 10 10" refX="5" refY="5" markerWidth="10" markerHeight="10" orient="auto"><path d="M1,1 L9,9 M9,1 L1,9" stroke="#333" stroke-width="1.5"/></marker><marker id="{id}-openhead" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="8" markerHeight="8" orient="auto"><path d="M0,0 L10,5 L0,10" fill="none" stroke="#333"/></marker></defs>"##
    );
}

/// Count the rows consumed by a list of events (for lifeline sizing).
fn count_event_rows(events: &[Event]) -> usize {
    let mut rows = 0;
    for event in events {
        match event {
            Event::Message(_) | Event::Note(_) => rows += 1,
            Event::Block(block) => {
                for section in &block.sections {
                    rows += count_event_rows(&section.events).max(1);
                }
            }
            Event::Activate(_) | Event::Deactivate(_) => {}
        }
    }
    rows
}

/// Escape text for use in SVG content and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
