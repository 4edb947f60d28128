use serde::Deserialize;

/// A chapter id as clients send it: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChapterIdValue {
    Number(i64),
    Text(String),
}

impl ChapterIdValue {
    pub fn parse(&self) -> Option<i64> {
        match self {
            ChapterIdValue::Number(n) => Some(*n),
            ChapterIdValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteChapterRequest {
    #[serde(default)]
    pub chap_id: Option<ChapterIdValue>,
}
