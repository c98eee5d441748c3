//! AST types for Mermaid sequence diagrams.

/// A parsed Mermaid sequence diagram.
#[derive(Debug, Clone)]
pub struct SequenceDiagram {
    pub title: Option<String>,
    pub autonumber: bool,
    pub participants: Vec<Participant>,
    pub events: Vec<Event>,
}

/// A lifeline owner, declared explicitly or created by first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub label: String,
    pub kind: ParticipantKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    /// Drawn as a box.
    Participant,
    /// Drawn as a stick figure.
    Actor,
}

/// A statement that consumes vertical space or changes activation state.
#[derive(Debug, Clone)]
pub enum Event {
    Message(Message),
    Note(Note),
    Block(Block),
    Activate(String),
    Deactivate(String),
}

/// An arrow between two participants.
#[derive(Debug, Clone)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    pub arrow: ArrowStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowStyle {
    /// `->` solid line, no head
    Solid,
    /// `-->` dotted line, no head
    Dotted,
    /// `->>` solid line, filled head
    SolidArrow,
    /// `-->>` dotted line, filled head
    DottedArrow,
    /// `-x` solid line, cross
    SolidCross,
    /// `--x` dotted line, cross
    DottedCross,
    /// `-)` solid line, open async head
    SolidAsync,
    /// `--)` dotted line, open async head
    DottedAsync,
}

impl ArrowStyle {
    #[must_use]
    pub fn is_dotted(self) -> bool {
        matches!(self, Self::Dotted | Self::DottedArrow | Self::DottedCross | Self::DottedAsync)
    }
}

#[derive(Debug, Clone)]
pub struct Note {
    pub over: Vec<String>,
    pub text: String,
    pub position: NotePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePosition {
    Over,
    LeftOf,
    RightOf,
}

/// A control flow frame (loop, alt, opt, par, critical, break).
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub label: String,
    pub sections: Vec<BlockSection>,
}

/// One arm of a block; arms after the first come from `else`, `and`, or `option`.
#[derive(Debug, Clone)]
pub struct BlockSection {
    pub label: Option<String>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Loop,
    Alt,
    Opt,
    Par,
    Critical,
    Break,
}

impl BlockKind {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::Alt => "alt",
            Self::Opt => "opt",
            Self::Par => "par",
            Self::Critical => "critical",
            Self::Break => "break",
        }
    }

    /// Keyword that opens a further section, if this block kind has sections.
    #[must_use]
    pub fn section_keyword(self) -> Option<&'static str> {
        match self {
            Self::Alt => Some("else"),
            Self::Par => Some("and"),
            Self::Critical => Some("option"),
            Self::Loop | Self::Opt | Self::Break => None,
        }
    }
}
