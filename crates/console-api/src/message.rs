//! Broadcast messages sent to one or more groups.

use crate::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// One item of a broadcast. Images carry a data URL or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { content: String },
    Image { content: String },
}

impl MessageContent {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn image(content: impl Into<String>) -> Self {
        Self::Image {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Text { content } | Self::Image { content } => content,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }

    fn is_blank(&self) -> bool {
        self.content().trim().is_empty()
    }
}

/// Body of `POST /message/send`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub group_ids: Vec<u64>,
    pub message_content: Vec<MessageContent>,
    pub at_all: bool,
    pub set_essence: bool,
    pub set_announcement: bool,
}

impl SendMessageRequest {
    pub fn new(group_ids: Vec<u64>) -> Self {
        Self {
            group_ids,
            ..Default::default()
        }
    }

    pub fn push(mut self, item: MessageContent) -> Self {
        self.message_content.push(item);
        self
    }

    pub fn at_all(mut self, enabled: bool) -> Self {
        self.at_all = enabled;
        self
    }

    pub fn set_essence(mut self, enabled: bool) -> Self {
        self.set_essence = enabled;
        self
    }

    pub fn set_announcement(mut self, enabled: bool) -> Self {
        self.set_announcement = enabled;
        self
    }

    /// Check the request and drop blank items.
    ///
    /// Requires at least one group and at least one non-blank item. A group
    /// announcement may carry one image at most.
    pub fn prepare(mut self) -> ApiResult<Self> {
        if self.group_ids.is_empty() {
            return Err(ApiError::Validation(
                "select at least one group".to_string(),
            ));
        }

        self.message_content.retain(|item| !item.is_blank());
        if self.message_content.is_empty() {
            return Err(ApiError::Validation(
                "message content cannot be empty".to_string(),
            ));
        }

        let images = self
            .message_content
            .iter()
            .filter(|item| item.is_image())
            .count();
        if self.set_announcement && images > 1 {
            return Err(ApiError::Validation(
                "a group announcement can contain only one image".to_string(),
            ));
        }

        Ok(self)
    }
}

/// Response of `POST /message/send`. `code == 0` means every group got it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_groups: Vec<serde_json::Value>,
}

impl SendResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub(crate) fn into_result(self) -> ApiResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let message = match (&self.message, self.failed_groups.len()) {
            (Some(message), _) => message.clone(),
            (None, 0) => "send failed".to_string(),
            (None, failed) => format!("{} group(s) failed", failed),
        };
        Err(ApiError::Rejected {
            code: self.code,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let request = SendMessageRequest::new(vec![123456789])
            .push(MessageContent::text("hello"))
            .push(MessageContent::image("data:image/png;base64,AAAA"))
            .at_all(true);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "group_ids": [123456789],
                "message_content": [
                    {"type": "text", "content": "hello"},
                    {"type": "image", "content": "data:image/png;base64,AAAA"}
                ],
                "at_all": true,
                "set_essence": false,
                "set_announcement": false
            })
        );
    }

    #[test]
    fn test_prepare_requires_group() {
        let err = SendMessageRequest::new(vec![])
            .push(MessageContent::text("hi"))
            .prepare()
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_prepare_requires_content() {
        let err = SendMessageRequest::new(vec![1])
            .push(MessageContent::text("   "))
            .push(MessageContent::text(""))
            .prepare()
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_prepare_drops_blank_items() {
        let request = SendMessageRequest::new(vec![1])
            .push(MessageContent::text(" "))
            .push(MessageContent::text("kept"))
            .push(MessageContent::text("\n"))
            .prepare()
            .unwrap();
        assert_eq!(request.message_content, vec![MessageContent::text("kept")]);
    }

    #[test]
    fn test_image_alone_is_enough() {
        let request = SendMessageRequest::new(vec![1])
            .push(MessageContent::text(""))
            .push(MessageContent::image("https://img.example/x.png"))
            .prepare()
            .unwrap();
        assert_eq!(request.message_content.len(), 1);
        assert!(request.message_content[0].is_image());
    }

    #[test]
    fn test_announcement_single_image() {
        let request = SendMessageRequest::new(vec![1])
            .push(MessageContent::image("a"))
            .push(MessageContent::image("b"))
            .set_announcement(true);
        assert!(request.clone().set_announcement(false).prepare().is_ok());
        assert!(matches!(
            request.prepare(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_send_result_codes() {
        let ok: SendResult = serde_json::from_str(r#"{"code":0}"#).unwrap();
        assert!(ok.into_result().is_ok());

        let partial: SendResult =
            serde_json::from_str(r#"{"code":1,"failed_groups":[1,2]}"#).unwrap();
        match partial.into_result() {
            Err(ApiError::Rejected { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message, "2 group(s) failed");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
