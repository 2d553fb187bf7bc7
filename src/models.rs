use serde::{Deserialize, Serialize};

/// One fetched email, reduced to the fields the digest cares about.
///
/// Every field is independently optional: a header-sparse or otherwise odd
/// message yields `None` fields, never an error. Records live in memory for
/// the duration of one run and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub date: Option<String>,
    pub snippet: Option<String>,
}

impl EmailRecord {
    /// Build a record from a full Gmail API message.
    ///
    /// Header lookup is first-match by name; a missing header leaves the
    /// field absent.
    pub fn from_message(message: &Message) -> Self {
        let headers = message
            .payload
            .as_ref()
            .and_then(|p| p.headers.as_deref())
            .unwrap_or(&[]);

        Self {
            sender: header_value(headers, "From"),
            subject: header_value(headers, "Subject"),
            date: header_value(headers, "Date"),
            snippet: message.snippet.clone(),
        }
    }
}

/// First header value matching `name`, by case-insensitive name comparison.
fn header_value(headers: &[MessageHeader], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

/// Wire structures for the Gmail REST API (documented message shapes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub snippet: Option<String>,
    pub payload: Option<MessagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub headers: Option<Vec<MessageHeader>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

/// Body for `users/me/messages/send`: a base64url-encoded RFC 2822 message
#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_headers(headers: Vec<(&str, &str)>, snippet: Option<&str>) -> Message {
        Message {
            id: "m1".to_string(),
            snippet: snippet.map(|s| s.to_string()),
            payload: Some(MessagePayload {
                headers: Some(
                    headers
                        .into_iter()
                        .map(|(name, value)| MessageHeader {
                            name: name.to_string(),
                            value: value.to_string(),
                        })
                        .collect(),
                ),
            }),
        }
    }

    #[test]
    fn test_record_from_full_message() {
        let message = message_with_headers(
            vec![
                ("From", "Alice <alice@example.com>"),
                ("Subject", "Quarterly numbers"),
                ("Date", "Tue, 1 Jul 2025 09:00:00 +0000"),
            ],
            Some("The numbers are in..."),
        );

        let record = EmailRecord::from_message(&message);
        assert_eq!(record.sender.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(record.subject.as_deref(), Some("Quarterly numbers"));
        assert_eq!(
            record.date.as_deref(),
            Some("Tue, 1 Jul 2025 09:00:00 +0000")
        );
        assert_eq!(record.snippet.as_deref(), Some("The numbers are in..."));
    }

    #[test]
    fn test_record_fields_independently_absent() {
        // Subject present, everything else missing
        let message = message_with_headers(vec![("Subject", "Only a subject")], None);
        let record = EmailRecord::from_message(&message);
        assert!(record.sender.is_none());
        assert_eq!(record.subject.as_deref(), Some("Only a subject"));
        assert!(record.date.is_none());
        assert!(record.snippet.is_none());
    }

    #[test]
    fn test_record_from_headerless_message() {
        let message = Message {
            id: "m2".to_string(),
            snippet: Some("snippet only".to_string()),
            payload: None,
        };
        let record = EmailRecord::from_message(&message);
        assert!(record.sender.is_none());
        assert!(record.subject.is_none());
        assert!(record.date.is_none());
        assert_eq!(record.snippet.as_deref(), Some("snippet only"));
    }

    #[test]
    fn test_header_value_first_match_wins() {
        let headers = vec![
            MessageHeader {
                name: "Received".to_string(),
                value: "relay-a".to_string(),
            },
            MessageHeader {
                name: "Received".to_string(),
                value: "relay-b".to_string(),
            },
        ];
        assert_eq!(header_value(&headers, "Received").as_deref(), Some("relay-a"));
        assert_eq!(header_value(&headers, "received").as_deref(), Some("relay-a"));
        assert!(header_value(&headers, "From").is_none());
    }

    #[test]
    fn test_list_response_without_messages_field() {
        let parsed: ListMessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.messages.is_none());
        assert!(parsed.next_page_token.is_none());
    }

    #[test]
    fn test_message_deserializes_from_api_shape() {
        let json = r#"{
            "id": "18c2a9",
            "threadId": "18c2a9",
            "snippet": "Hi there",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "bob@example.org"}
                ]
            }
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, "18c2a9");
        let record = EmailRecord::from_message(&message);
        assert_eq!(record.sender.as_deref(), Some("bob@example.org"));
    }
}
