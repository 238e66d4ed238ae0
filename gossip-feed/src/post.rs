//! Feed items and the reaction vocabulary, plus normalization from the server's wire shape.

use serde::Deserialize;

/// Reactions as the app names them.
#[derive(
    Copy,
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Hash,
    parse_display::Display,
    parse_display::FromStr,
)]
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum ReactionKind {
    Like,
    Dislike,
    Support,
}

/// Reactions as the server names them.
#[derive(
    Copy,
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Hash,
    parse_display::Display,
    parse_display::FromStr,
)]
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum ServerReaction {
    ThumbsUp,
    ThumbsDown,
    Heart,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 3] = [
        ReactionKind::Like,
        ReactionKind::Dislike,
        ReactionKind::Support,
    ];

    pub fn to_server(self) -> ServerReaction {
        match self {
            ReactionKind::Like => ServerReaction::ThumbsUp,
            ReactionKind::Dislike => ServerReaction::ThumbsDown,
            ReactionKind::Support => ServerReaction::Heart,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ReactionKind::Like => "👍",
            ReactionKind::Dislike => "👎",
            ReactionKind::Support => "💜",
        }
    }
}

impl From<ServerReaction> for ReactionKind {
    fn from(reaction: ServerReaction) -> Self {
        match reaction {
            ServerReaction::ThumbsUp => ReactionKind::Like,
            ServerReaction::ThumbsDown => ReactionKind::Dislike,
            ServerReaction::Heart => ReactionKind::Support,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReactionCounts {
    pub like: u64,
    pub dislike: u64,
    pub support: u64,
}

impl ReactionCounts {
    pub fn new(like: u64, dislike: u64, support: u64) -> Self {
        Self {
            like,
            dislike,
            support,
        }
    }

    pub fn get(&self, kind: ReactionKind) -> u64 {
        match kind {
            ReactionKind::Like => self.like,
            ReactionKind::Dislike => self.dislike,
            ReactionKind::Support => self.support,
        }
    }

    pub fn get_mut(&mut self, kind: ReactionKind) -> &mut u64 {
        match kind {
            ReactionKind::Like => &mut self.like,
            ReactionKind::Dislike => &mut self.dislike,
            ReactionKind::Support => &mut self.support,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub date: String,
    pub image_uri: Option<String>,
    pub video_uri: Option<String>,
    pub media_type: Option<String>,
    pub counts: ReactionCounts,
}

/// Servers have sent both `"id": 7` and `"id": "7"`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl std::fmt::Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireId::Text(text) => f.write_str(text),
            WireId::Number(number) => write!(f, "{number}"),
        }
    }
}

/// A post as the server sends it. Everything but the id is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ApiPost {
    pub id: WireId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "imageUri")]
    pub image_uri: Option<String>,
    #[serde(default, rename = "videoUri")]
    pub video_uri: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub thumbs_up_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub thumbs_down_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub heart_count: u64,
}

/// Counters arrive as numbers, as numeric strings (`COUNT(*)` from some databases), or as
/// junk. Junk reads as 0 so one bad counter doesn't cost the whole post.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

fn count_from_value(value: &serde_json::Value) -> u64 {
    use serde_json::Value;

    let count = match value {
        Value::Null => return 0,
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    count.unwrap_or_else(|| {
        log::warn!("Treating malformed reaction counter {value} as 0");
        0
    })
}

pub fn normalize(post: ApiPost) -> Post {
    Post {
        id: post.id.to_string(),
        title: post.title.unwrap_or_default(),
        body: post.body.unwrap_or_default(),
        date: post.date.unwrap_or_default(),
        image_uri: post.image_uri.or(post.media_url),
        video_uri: post.video_uri,
        media_type: post.media_type,
        counts: ReactionCounts {
            like: post.thumbs_up_count,
            dislike: post.thumbs_down_count,
            support: post.heart_count,
        },
    }
}

/// Decodes and normalizes a single post, or `None` if `value` isn't shaped like one.
pub fn normalize_value(value: serde_json::Value) -> Option<Post> {
    match serde_json::from_value::<ApiPost>(value) {
        Ok(post) => Some(normalize(post)),
        Err(e) => {
            log::warn!("Skipping malformed post: {e}");
            None
        }
    }
}

const CARD_WORD_LIMIT: usize = 60;

/// Trims text to the first sixty words for a card, marking the cut with an ellipsis.
pub fn to_sixty_words(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= CARD_WORD_LIMIT {
        return text.trim().to_string();
    }
    let mut trimmed = words[..CARD_WORD_LIMIT].join(" ");
    trimmed.push('…');
    trimmed
}
