use serde::Deserialize;

/// One page of `GET /drive/v3/files`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    pub next_page_token: Option<String>,
}

/// The `files(id, name)` projection of a Drive file resource.
#[derive(Debug, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_has_no_token() {
        let page: FileList =
            serde_json::from_str(r#"{"files":[{"id":"1","name":"a.png"}]}"#).unwrap();

        assert_eq!(page.files.len(), 1);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn empty_folder_may_omit_files() {
        let page: FileList = serde_json::from_str(r#"{"kind":"drive#fileList"}"#).unwrap();

        assert!(page.files.is_empty());
    }
}
