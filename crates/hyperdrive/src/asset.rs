use serde::Serialize;

use crate::media;

/// One servable image in a refresh response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Cache-relative URL, e.g. `images/a.png`.
    pub path: String,
    /// Caption, present only when captions are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Asset {
    /// Build the asset for cache file `file`, served under `prefix`.
    pub fn new(prefix: &str, file: &str, captions: bool) -> Self {
        let prefix = prefix.trim_matches('/');
        let path = if prefix.is_empty() {
            file.to_owned()
        } else {
            format!("{prefix}/{file}")
        };

        Self {
            path,
            name: captions.then(|| media::stem(file).to_owned()),
        }
    }
}
