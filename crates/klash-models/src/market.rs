use serde::{Deserialize, Deserializer, Serialize};

/// A market resolution request as it arrives from the caller.
///
/// Every field is optional at this layer so that a request with missing or
/// empty fields still deserializes and can be answered with an error record
/// that carries whatever identifiers were present. Validation happens in the
/// engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketRequest {
    #[serde(default)]
    pub market_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub outcomes: Option<Vec<String>>,
    #[serde(default)]
    pub resolution_method: Option<String>,
    #[serde(default)]
    pub reply_tweets: Vec<ReplyEntry>,
    /// Tweet the market was created from. Carried through, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_tweet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_time: Option<String>,
}

/// One entry of `reply_tweets`. Anything that is not an item object is kept
/// as `Malformed` so the rest of the batch can still be processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReplyEntry {
    Item(ReplyItem),
    Malformed(serde_json::Value),
}

impl From<ReplyItem> for ReplyEntry {
    fn from(item: ReplyItem) -> Self {
        ReplyEntry::Item(item)
    }
}

/// A single piece of text evidence, e.g. a reply to the market's tweet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyItem {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl ReplyItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: Some(text.into()),
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// The item's text if it carries anything other than whitespace.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "item id must be a string or number, got {other}"
        ))),
    }
}

/// How a market is resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Resolved from classified reply sentiment.
    Sentiment,
    /// Awaits an external oracle signal.
    Oracle,
    /// Awaits a human decision.
    Manual,
}

impl ResolutionMethod {
    /// Case-insensitive parse. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sentiment" => Some(Self::Sentiment),
            "oracle" => Some(Self::Oracle),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Oracle => "oracle",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
