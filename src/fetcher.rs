//! Sequential retrieval of recent messages into uniform records

use tracing::{debug, info};

use crate::client::MailClient;
use crate::error::Result;
use crate::models::EmailRecord;

/// Fetch up to `max_results` recent messages, newest first as the provider
/// lists them, and reduce each to an [`EmailRecord`].
///
/// Zero messages is an empty result, not an error. A single failed
/// per-message fetch fails the whole batch: no partial results, no retry.
pub async fn fetch_recent(client: &dyn MailClient, max_results: u32) -> Result<Vec<EmailRecord>> {
    info!("Listing up to {} recent messages", max_results);
    let ids = client.list_message_ids(max_results).await?;
    if ids.is_empty() {
        info!("Mailbox returned no messages");
        return Ok(Vec::new());
    }

    let mut records = Vec::with_capacity(ids.len());
    for id in &ids {
        debug!("Fetching message {}", id);
        let message = client.get_message(id).await?;
        records.push(EmailRecord::from_message(&message));
    }

    info!("Fetched {} messages", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMailClient;
    use crate::error::DigestError;
    use crate::models::{Message, MessageHeader, MessagePayload};

    fn message(id: &str, from: Option<&str>, subject: Option<&str>, snippet: Option<&str>) -> Message {
        let mut headers = Vec::new();
        if let Some(from) = from {
            headers.push(MessageHeader {
                name: "From".to_string(),
                value: from.to_string(),
            });
        }
        if let Some(subject) = subject {
            headers.push(MessageHeader {
                name: "Subject".to_string(),
                value: subject.to_string(),
            });
        }
        Message {
            id: id.to_string(),
            snippet: snippet.map(|s| s.to_string()),
            payload: Some(MessagePayload {
                headers: Some(headers),
            }),
        }
    }

    #[tokio::test]
    async fn test_fetch_recent_preserves_provider_order() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .withf(|max| *max == 3)
            .times(1)
            .returning(|_| Ok(vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]));
        client.expect_get_message().times(3).returning(|id| {
            Ok(message(
                id,
                Some(&format!("sender-{}@example.com", id)),
                Some(&format!("subject {}", id)),
                Some(&format!("snippet {}", id)),
            ))
        });

        let records = fetch_recent(&client, 3).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].sender.as_deref(),
            Some("sender-m1@example.com")
        );
        assert_eq!(records[1].subject.as_deref(), Some("subject m2"));
        assert_eq!(records[2].snippet.as_deref(), Some("snippet m3"));
    }

    #[tokio::test]
    async fn test_fetch_recent_empty_mailbox_is_ok() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        // get_message has no expectation: calling it would panic the test

        let records = fetch_recent(&client, 20).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recent_fields_follow_header_presence() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Ok(vec!["sparse".to_string()]));
        client
            .expect_get_message()
            .returning(|id| Ok(message(id, None, Some("only subject"), None)));

        let records = fetch_recent(&client, 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].sender.is_none());
        assert_eq!(records[0].subject.as_deref(), Some("only subject"));
        assert!(records[0].date.is_none());
        assert!(records[0].snippet.is_none());
    }

    #[tokio::test]
    async fn test_fetch_recent_aborts_batch_on_single_failure() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Ok(vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]));
        client.expect_get_message().returning(|id| {
            if id == "m2" {
                Err(DigestError::ProviderStatus {
                    status: 500,
                    message: "backend blew up".to_string(),
                })
            } else {
                Ok(message(id, None, None, None))
            }
        });

        let result = fetch_recent(&client, 3).await;
        assert!(matches!(
            result,
            Err(DigestError::ProviderStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_recent_propagates_list_failure() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Err(DigestError::Provider("connection reset".to_string())));

        let result = fetch_recent(&client, 20).await;
        assert!(matches!(result, Err(DigestError::Provider(_))));
    }
}
