//! Small helpers shared by the workflow steps.

use chrono::{Local, NaiveDate};
use llm::{Message, MessageRole};

/// Render the conversation as the research topic.
///
/// A single message is used verbatim; longer histories are flattened into
/// `User:`/`Assistant:` lines. System messages are not part of the topic.
pub fn research_topic(messages: &[Message]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }

    let mut topic = String::new();
    for message in messages {
        match message.role {
            MessageRole::Human => {
                topic.push_str("User: ");
                topic.push_str(&message.content);
                topic.push('\n');
            }
            MessageRole::Assistant => {
                topic.push_str("Assistant: ");
                topic.push_str(&message.content);
                topic.push('\n');
            }
            MessageRole::System => {}
        }
    }
    topic
}

/// Date as written in prompts, e.g. `June 14, 2024`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Today's date in the local timezone, formatted for prompts.
pub fn current_date() -> String {
    format_date(Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message_topic() {
        assert_eq!(research_topic(&[Message::human("Who won Euro 2024?")]), "Who won Euro 2024?");
    }

    #[test]
    fn test_conversation_topic() {
        let messages = vec![
            Message::human("Who won Euro 2024?"),
            Message::assistant("Spain."),
            Message::human("Top scorer?"),
        ];
        assert_eq!(
            research_topic(&messages),
            "User: Who won Euro 2024?\nAssistant: Spain.\nUser: Top scorer?\n"
        );
    }

    #[test]
    fn test_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(format_date(date), "July 04, 2024");
    }
}
