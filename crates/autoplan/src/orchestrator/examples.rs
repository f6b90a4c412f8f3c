use std::collections::BTreeSet;

use crate::tools::ToolId;

/// A query paired with a reference plan, shown to the planner as guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkedExample {
    pub query: &'static str,
    pub plan: &'static str,
    pub tools: &'static [ToolId],
}

pub const WORKED_EXAMPLES: &[WorkedExample] = &[
    WorkedExample {
        query: "Text John that the meeting is at 3pm",
        plan: "1. get_phone_number(\"John\")\n2. send_sms([$1], \"The meeting is at 3pm\")\nThought: I have sent the message.\n3. join()<END_OF_PLAN>",
        tools: &[ToolId::GetPhoneNumber, ToolId::SendSms],
    },
    WorkedExample {
        query: "Set up a meeting with Jane and Sam tomorrow at 10am about the budget",
        plan: "1. get_email_address(\"Jane\")\n2. get_email_address(\"Sam\")\n3. create_calendar_event(\"Budget\", \"2024-03-12 10:00:00\", \"2024-03-12 11:00:00\", \"\", [$1, $2], \"\", None)\nThought: The event is created with both invitees.\n4. join()<END_OF_PLAN>",
        tools: &[ToolId::GetEmailAddress, ToolId::CreateCalendarEvent],
    },
    WorkedExample {
        query: "Send the quarterly report to Lee and summarize it for me",
        plan: "1. open_and_get_file_path(\"quarterly report\")\n2. get_email_address(\"Lee\")\n3. compose_new_email([$2], [], \"Quarterly report\", \"Attached is the quarterly report.\", [$1])\n4. summarize_pdf($1)\nThought: The email is drafted and the summary is ready.\n5. join()<END_OF_PLAN>",
        tools: &[
            ToolId::OpenAndGetFilePath,
            ToolId::GetEmailAddress,
            ToolId::ComposeNewEmail,
            ToolId::SummarizePdf,
        ],
    },
    WorkedExample {
        query: "Create a zoom meeting with Ana for Friday at 2pm and text her the link",
        plan: "1. get_email_address(\"Ana\")\n2. get_zoom_meeting_link(\"Sync with Ana\", \"2024-03-15 14:00:00\", 30, [$1])\n3. get_phone_number(\"Ana\")\n4. send_sms([$3], $2)\nThought: The link is shared.\n5. join()<END_OF_PLAN>",
        tools: &[
            ToolId::GetEmailAddress,
            ToolId::GetZoomMeetingLink,
            ToolId::GetPhoneNumber,
            ToolId::SendSms,
        ],
    },
    WorkedExample {
        query: "How do I get to the airport from the office by train?",
        plan: "1. maps_show_directions(\"office\", \"airport\", \"r\")\n2. join()<END_OF_PLAN>",
        tools: &[ToolId::MapsShowDirections],
    },
    WorkedExample {
        query: "Add milk to my groceries note and remind me to shop tonight at 6pm",
        plan: "1. append_note_content(\"groceries\", \"milk\", \"Notes\")\n2. create_reminder(\"Go shopping\", \"2024-03-11 18:00:00\", \"\", \"Reminders\", 0, False)\n3. join()<END_OF_PLAN>",
        tools: &[ToolId::AppendNoteContent, ToolId::CreateReminder],
    },
    WorkedExample {
        query: "Reply to this email saying I'll review it and forward it to Priya",
        plan: "1. reply_to_email([], \"Thanks, I'll review it.\", [])\n2. get_email_address(\"Priya\")\n3. forward_email([$2], [], \"FYI\", [])\n4. join()<END_OF_PLAN>",
        tools: &[ToolId::ReplyToEmail, ToolId::GetEmailAddress, ToolId::ForwardEmail],
    },
];

/// Examples whose tools are all in `selected`, those covering more of the
/// selection first, capped at `limit`.
pub fn matching_examples(
    selected: &BTreeSet<ToolId>,
    limit: usize,
) -> Vec<&'static WorkedExample> {
    let mut matched: Vec<&'static WorkedExample> = WORKED_EXAMPLES
        .iter()
        .filter(|example| example.tools.iter().all(|tool| selected.contains(tool)))
        .collect();
    // Stable sort keeps declaration order among equals.
    matched.sort_by(|a, b| b.tools.len().cmp(&a.tools.len()));
    matched.truncate(limit);
    matched
}
