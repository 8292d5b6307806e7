//! Bot API payload types. Only the fields the dispatcher reads are mapped;
//! everything else is ignored on deserialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub document: Option<Document>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// The name to store and show: the full name when set, otherwise
    /// `@username`, otherwise the numeric id.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        if let Some(username) = &self.username {
            return format!("@{username}");
        }
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// Persistent reply keyboard shown under the input field.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    #[must_use]
    pub fn from_labels<S: AsRef<str>>(rows: &[&[S]]) -> Self {
        Self {
            keyboard: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|label| KeyboardButton { text: label.as_ref().to_string() })
                        .collect()
                })
                .collect(),
            resize_keyboard: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    #[must_use]
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: callback_data.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Reply(ReplyKeyboardMarkup),
    Inline(InlineKeyboardMarkup),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        let user = User {
            id: 7,
            username: Some("inspector".to_string()),
            first_name: Some("Иван".to_string()),
            last_name: Some("Петров".to_string()),
        };
        assert_eq!(user.display_name(), "Иван Петров");
    }

    #[test]
    fn display_name_falls_back_to_username_then_id() {
        let nameless = User {
            id: 7,
            username: Some("inspector".to_string()),
            first_name: None,
            last_name: None,
        };
        assert_eq!(nameless.display_name(), "@inspector");

        let bare = User { id: 42, username: None, first_name: None, last_name: None };
        assert_eq!(bare.display_name(), "42");
    }

    #[test]
    fn updates_parse_with_unknown_fields_present() {
        let body = r#"{
            "update_id": 10,
            "message": {
                "message_id": 1,
                "date": 1700000000,
                "chat": {"id": 55, "type": "private"},
                "from": {"id": 7, "is_bot": false, "first_name": "Иван"},
                "text": "/start"
            }
        }"#;
        let update: Update = match serde_json::from_str(body) {
            Ok(update) => update,
            Err(err) => panic!("update should parse: {err}"),
        };
        let message = match update.message {
            Some(message) => message,
            None => panic!("message should be present"),
        };
        assert_eq!(message.chat.id, 55);
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert!(message.photo.is_empty());
    }

    #[test]
    fn reply_keyboard_serializes_as_button_grid() {
        let markup = ReplyKeyboardMarkup::from_labels(&[&["А", "Б"], &["В"]]);
        let value = match serde_json::to_value(&markup) {
            Ok(value) => value,
            Err(err) => panic!("markup should serialize: {err}"),
        };
        assert_eq!(value["keyboard"][0][1]["text"], "Б");
        assert_eq!(value["resize_keyboard"], true);
    }
}
