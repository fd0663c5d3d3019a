use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub avatar: String,
    pub posts: Vec<String>,
    pub liked_posts: Vec<String>,
    pub notifications: Vec<String>,
}

impl User {
    pub fn new(name: impl Into<String>, password: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            password: password.into(),
            avatar: avatar.into(),
            posts: Vec::new(),
            liked_posts: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn has_liked(&self, post_id: &str) -> bool {
        self.liked_posts.iter().any(|p| p == post_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: String,
    pub likes_count: i64,
}

impl Post {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content: content.into(),
            author: author.into(),
            likes_count: 0,
        }
    }
}

/// Tag carried by every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(NotificationKind::Like),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: String,
    pub liked_by: String,
}

impl Notification {
    pub fn like(post_id: impl Into<String>, liked_by: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            kind: NotificationKind::Like,
            post_id: post_id.into(),
            liked_by: liked_by.into(),
        }
    }
}
