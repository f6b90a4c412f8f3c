use crate::tools::ToolId;

/// Relevance cues for one tool.
///
/// Phrases raise confidence in proportion to their word count, negatives
/// lower it, and a booster adds a fixed amount when any of its trigger words
/// appear. All cues are normalized with the same tokenizer as the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorProfile {
    pub tool: ToolId,
    pub phrases: Vec<Vec<String>>,
    pub negatives: Vec<Vec<String>>,
    pub boosters: Vec<Vec<String>>,
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize(cues: &[&str]) -> Vec<Vec<String>> {
    cues.iter()
        .map(|cue| tokenize(cue))
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

impl SelectorProfile {
    pub fn new(tool: ToolId) -> Self {
        Self {
            tool,
            phrases: Vec::new(),
            negatives: Vec::new(),
            boosters: Vec::new(),
        }
    }

    pub fn phrases(mut self, cues: &[&str]) -> Self {
        self.phrases.extend(normalize(cues));
        self
    }

    pub fn negatives(mut self, cues: &[&str]) -> Self {
        self.negatives.extend(normalize(cues));
        self
    }

    pub fn boosted_by(mut self, cues: &[&str]) -> Self {
        self.boosters.extend(normalize(cues));
        self
    }

    /// Built-in cues for a tool.
    pub fn default_for(tool: ToolId) -> Self {
        let profile = Self::new(tool);
        match tool {
            ToolId::GetPhoneNumber => profile
                .phrases(&["phone", "phone number", "number", "call", "text", "sms", "contact"])
                .negatives(&["email address"]),
            ToolId::GetEmailAddress => profile
                .phrases(&["email", "emails", "e-mail", "email address", "send an email"])
                .negatives(&["text message", "sms"]),
            ToolId::CreateCalendarEvent => profile
                .phrases(&[
                    "calendar",
                    "event",
                    "schedule",
                    "meeting",
                    "appointment",
                    "invite",
                    "calendar event",
                    "set up a meeting",
                ])
                .boosted_by(&[
                    "tomorrow",
                    "today",
                    "tonight",
                    "next week",
                    "monday",
                    "tuesday",
                    "wednesday",
                    "thursday",
                    "friday",
                    "saturday",
                    "sunday",
                    "am",
                    "pm",
                ]),
            ToolId::OpenAndGetFilePath => profile
                .phrases(&["file", "files", "document", "attachment", "attach", "folder", "open file"])
                .boosted_by(&["pdf", "report", "slides"]),
            ToolId::SummarizePdf => profile
                .phrases(&["summarize", "summarise", "summary", "pdf", "tldr", "summarize the pdf"])
                .boosted_by(&["document", "report", "paper"]),
            ToolId::ComposeNewEmail => profile
                .phrases(&[
                    "email",
                    "mail",
                    "e-mail",
                    "compose",
                    "draft",
                    "send an email",
                    "write an email",
                ])
                .negatives(&["text message", "sms", "reply", "forward"]),
            ToolId::ReplyToEmail => profile
                .phrases(&["reply", "respond", "reply to", "write back"])
                .negatives(&["sms", "text message"])
                .boosted_by(&["email", "mail", "thread"]),
            ToolId::ForwardEmail => profile
                .phrases(&["forward", "fwd", "forward email", "pass along"])
                .negatives(&["sms", "text message"])
                .boosted_by(&["email", "mail"]),
            ToolId::MapsOpenLocation => profile
                .phrases(&["map", "maps", "location", "where is", "show me", "place", "address"])
                .negatives(&["email address", "directions"]),
            ToolId::MapsShowDirections => profile
                .phrases(&[
                    "directions",
                    "route",
                    "navigate",
                    "drive",
                    "walk",
                    "how do i get",
                    "get to",
                ])
                .boosted_by(&["map", "maps", "location", "address"]),
            ToolId::CreateNote => profile
                .phrases(&["note", "write down", "jot", "memo", "take a note", "create a note"])
                .negatives(&["open note", "append"]),
            ToolId::OpenNote => profile
                .phrases(&["notes", "open note", "open the note", "show note", "view note", "read note"]),
            ToolId::AppendNoteContent => profile
                .phrases(&["append", "add to", "add to note", "update note", "add it to"])
                .boosted_by(&["note", "notes"]),
            ToolId::CreateReminder => profile
                .phrases(&["remind", "reminder", "reminders", "remind me", "todo", "to-do"])
                .boosted_by(&["tomorrow", "today", "tonight", "later", "deadline"]),
            ToolId::SendSms => profile
                .phrases(&["text", "sms", "message", "text message", "send a text", "imessage"])
                .negatives(&["email", "mail"]),
            ToolId::GetZoomMeetingLink => profile
                .phrases(&["zoom", "zoom link", "meeting link", "video call", "zoom meeting"])
                .boosted_by(&["meeting", "call", "invite"]),
        }
    }

    pub fn defaults() -> Vec<Self> {
        ToolId::ALL.into_iter().map(Self::default_for).collect()
    }
}
