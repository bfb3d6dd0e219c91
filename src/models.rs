use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

// Inbound proxy instruction: where to send, and what
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub target_url: Option<String>,
    // never interpreted, re-sent byte for byte; None only when the key is absent
    #[serde(default, deserialize_with = "present")]
    pub body: Option<Box<RawValue>>,
}

// Keeps an explicit `null` as the raw text "null" instead of collapsing it to None
fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

impl ProxyRequest {
    /// Parse an inbound body. Anything that is not a JSON object with a
    /// string `targetUrl` yields a request without a target.
    pub fn parse(raw: &[u8]) -> Self {
        serde_json::from_slice(raw).unwrap_or_default()
    }

    /// The target URL, if present and non-empty.
    pub fn target(&self) -> Option<&str> {
        self.target_url.as_deref().filter(|url| !url.is_empty())
    }
}
