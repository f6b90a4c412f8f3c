use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reserved name of the terminal synchronization step. Never a catalog tool.
pub const JOIN_TOOL_NAME: &str = "join";

/// Closed set of tools the planner may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    GetPhoneNumber,
    GetEmailAddress,
    CreateCalendarEvent,
    OpenAndGetFilePath,
    SummarizePdf,
    ComposeNewEmail,
    ReplyToEmail,
    ForwardEmail,
    MapsOpenLocation,
    MapsShowDirections,
    CreateNote,
    OpenNote,
    AppendNoteContent,
    CreateReminder,
    SendSms,
    GetZoomMeetingLink,
}

impl ToolId {
    pub const ALL: [ToolId; 16] = [
        ToolId::GetPhoneNumber,
        ToolId::GetEmailAddress,
        ToolId::CreateCalendarEvent,
        ToolId::OpenAndGetFilePath,
        ToolId::SummarizePdf,
        ToolId::ComposeNewEmail,
        ToolId::ReplyToEmail,
        ToolId::ForwardEmail,
        ToolId::MapsOpenLocation,
        ToolId::MapsShowDirections,
        ToolId::CreateNote,
        ToolId::OpenNote,
        ToolId::AppendNoteContent,
        ToolId::CreateReminder,
        ToolId::SendSms,
        ToolId::GetZoomMeetingLink,
    ];

    /// Stable name used in plans and prompts.
    pub fn name(self) -> &'static str {
        match self {
            ToolId::GetPhoneNumber => "get_phone_number",
            ToolId::GetEmailAddress => "get_email_address",
            ToolId::CreateCalendarEvent => "create_calendar_event",
            ToolId::OpenAndGetFilePath => "open_and_get_file_path",
            ToolId::SummarizePdf => "summarize_pdf",
            ToolId::ComposeNewEmail => "compose_new_email",
            ToolId::ReplyToEmail => "reply_to_email",
            ToolId::ForwardEmail => "forward_email",
            ToolId::MapsOpenLocation => "maps_open_location",
            ToolId::MapsShowDirections => "maps_show_directions",
            ToolId::CreateNote => "create_note",
            ToolId::OpenNote => "open_note",
            ToolId::AppendNoteContent => "append_note_content",
            ToolId::CreateReminder => "create_reminder",
            ToolId::SendSms => "send_sms",
            ToolId::GetZoomMeetingLink => "get_zoom_meeting_link",
        }
    }

    /// Call signature and usage guidance injected into the planner prompt.
    pub fn signature(self) -> &'static str {
        match self {
            ToolId::GetPhoneNumber => {
                "get_phone_number(name: str) -> str\n - Search for a contact by name.\n - Returns the phone number of the contact."
            }
            ToolId::GetEmailAddress => {
                "get_email_address(name: str) -> str\n - Search for a contact by name.\n - Returns the email address of the contact."
            }
            ToolId::CreateCalendarEvent => {
                "create_calendar_event(title: str, start_date: str, end_date: str, location: str, invitees: list[str], notes: str, calendar: str) -> str\n - Create a calendar event.\n - Dates use the 'YYYY-MM-DD HH:MM:SS' format.\n - invitees must be a list of email addresses; use get_email_address first when only names are known.\n - Returns a confirmation message."
            }
            ToolId::OpenAndGetFilePath => {
                "open_and_get_file_path(file_name: str) -> str\n - Opens the file that best matches the given name.\n - Returns the absolute path of the opened file."
            }
            ToolId::SummarizePdf => {
                "summarize_pdf(pdf_path: str) -> str\n - Summarizes the PDF at the given path.\n - Returns the summary text."
            }
            ToolId::ComposeNewEmail => {
                "compose_new_email(recipients: list[str], cc: list[str], subject: str, context: str, attachments: list[str]) -> str\n - Composes a new email.\n - recipients and cc must be lists of email addresses.\n - attachments is a list of file paths, or an empty list.\n - Returns a confirmation message."
            }
            ToolId::ReplyToEmail => {
                "reply_to_email(cc: list[str], context: str, attachments: list[str]) -> str\n - Replies to the currently selected email.\n - Returns a confirmation message."
            }
            ToolId::ForwardEmail => {
                "forward_email(recipients: list[str], cc: list[str], context: str, attachments: list[str]) -> str\n - Forwards the currently selected email.\n - Returns a confirmation message."
            }
            ToolId::MapsOpenLocation => {
                "maps_open_location(location: str) -> str\n - Opens the given location in Maps.\n - Returns the opened URL."
            }
            ToolId::MapsShowDirections => {
                "maps_show_directions(start_location: str, end_location: str, transport: str) -> str\n - Shows directions between two locations.\n - transport is one of 'd' (driving), 'w' (walking) or 'r' (public transit).\n - Returns the opened URL."
            }
            ToolId::CreateNote => {
                "create_note(name: str, content: str, folder: str) -> str\n - Creates a new note in the given folder.\n - Returns a confirmation message."
            }
            ToolId::OpenNote => {
                "open_note(name: str, folder: str) -> str\n - Opens an existing note.\n - Returns the note content."
            }
            ToolId::AppendNoteContent => {
                "append_note_content(name: str, content: str, folder: str) -> str\n - Appends content to an existing note.\n - Returns a confirmation message."
            }
            ToolId::CreateReminder => {
                "create_reminder(name: str, due_date: str, notes: str, list_name: str, priority: int, all_day: bool) -> str\n - Creates a reminder.\n - due_date uses the 'YYYY-MM-DD HH:MM:SS' format.\n - Returns a confirmation message."
            }
            ToolId::SendSms => {
                "send_sms(recipients: list[str], message: str) -> str\n - Sends a text message.\n - recipients must be a list of phone numbers; use get_phone_number first when only names are known.\n - Returns a confirmation message."
            }
            ToolId::GetZoomMeetingLink => {
                "get_zoom_meeting_link(topic: str, start_time: str, duration: int, meeting_invitees: list[str]) -> str\n - Creates a Zoom meeting.\n - start_time uses the 'YYYY-MM-DD HH:MM:SS' format and duration is in minutes.\n - Returns the meeting link."
            }
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownToolName(pub String);

impl FromStr for ToolId {
    type Err = UnknownToolName;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ToolId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == name)
            .ok_or_else(|| UnknownToolName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for id in ToolId::ALL {
            assert_eq!(id.name().parse::<ToolId>(), Ok(id));
        }
    }

    #[test]
    fn join_is_not_a_tool() {
        assert_eq!(
            JOIN_TOOL_NAME.parse::<ToolId>(),
            Err(UnknownToolName("join".to_string()))
        );
    }

    #[test]
    fn every_signature_starts_with_its_name() {
        for id in ToolId::ALL {
            assert!(id.signature().starts_with(&format!("{}(", id.name())));
        }
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&ToolId::SendSms).unwrap();
        assert_eq!(json, "\"send_sms\"");
    }
}
