use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{
    ConvertError, Drive, DriveError, FolderId, HeicConverter, MovConverter, RemoteId, RemoteItem,
};

enum Payload {
    Bytes(Vec<u8>),
    Failing,
}

struct Entry {
    item: RemoteItem,
    payload: Payload,
    empty_remaining: u32,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    fetches: HashMap<RemoteId, u32>,
    list_error: Option<String>,
}

/// In-memory drive for testing. Lists its entries in insertion order for any
/// folder and counts every fetch.
pub struct InMemoryDrive {
    label: String,
    state: Mutex<State>,
}

impl InMemoryDrive {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, item: RemoteItem, payload: Payload) -> RemoteItem {
        self.state().entries.push(Entry {
            item: item.clone(),
            payload,
            empty_remaining: 0,
        });
        item
    }

    /// Add a file whose fetch writes `bytes`.
    pub fn add(&self, id: &str, name: &str, bytes: &[u8]) -> RemoteItem {
        self.push(RemoteItem::new(id, name), Payload::Bytes(bytes.to_vec()))
    }

    /// Add a file whose every fetch fails with a network error.
    pub fn add_failing(&self, id: &str, name: &str) -> RemoteItem {
        self.push(RemoteItem::new(id, name), Payload::Failing)
    }

    /// Make the first `count` fetches of `id` write an empty file.
    pub fn empty_for_first(&self, id: &RemoteId, count: u32) {
        if let Some(entry) = self.state().entries.iter_mut().find(|e| &e.item.id == id) {
            entry.empty_remaining = count;
        }
    }

    /// Drop a file from the listing.
    pub fn remove(&self, id: &RemoteId) {
        self.state().entries.retain(|e| &e.item.id != id);
    }

    /// Make every subsequent `list` call fail.
    pub fn fail_listing(&self, message: impl Into<String>) {
        self.state().list_error = Some(message.into());
    }

    pub fn fetch_count(&self, id: &RemoteId) -> u32 {
        self.state().fetches.get(id).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> u32 {
        self.state().fetches.values().sum()
    }
}

#[async_trait::async_trait]
impl Drive for InMemoryDrive {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list(&self, _folder: &FolderId) -> Result<Vec<RemoteItem>, DriveError> {
        let state = self.state();
        if let Some(message) = &state.list_error {
            return Err(DriveError::Network(message.clone()));
        }
        Ok(state.entries.iter().map(|e| e.item.clone()).collect())
    }

    async fn fetch(&self, item: &RemoteItem, dest: &Path) -> Result<u64, DriveError> {
        let bytes = {
            let mut state = self.state();
            *state.fetches.entry(item.id.clone()).or_insert(0) += 1;

            let entry = state
                .entries
                .iter_mut()
                .find(|e| e.item.id == item.id)
                .ok_or_else(|| DriveError::NotFound(item.id.clone()))?;

            match &entry.payload {
                Payload::Failing => {
                    return Err(DriveError::Network(format!("connection reset: {item}")));
                }
                Payload::Bytes(_) if entry.empty_remaining > 0 => {
                    entry.empty_remaining -= 1;
                    Vec::new()
                }
                Payload::Bytes(bytes) => bytes.clone(),
            }
        };

        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

/// HEIC converter that prefixes the input with `jpeg:`.
#[derive(Default)]
pub struct FakeHeicConverter {
    calls: AtomicUsize,
}

impl FakeHeicConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HeicConverter for FakeHeicConverter {
    async fn to_jpeg(&self, heic: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = b"jpeg:".to_vec();
        out.extend(heic);
        Ok(out)
    }
}

/// MOV converter that writes `gif:` followed by the input's bytes.
#[derive(Default)]
pub struct FakeMovConverter {
    calls: AtomicUsize,
}

impl FakeMovConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MovConverter for FakeMovConverter {
    async fn to_gif(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = b"gif:".to_vec();
        out.extend(tokio::fs::read(input).await?);
        tokio::fs::write(output, out).await?;
        Ok(())
    }
}

/// Converter whose every call fails as if the tool exited non-zero.
#[derive(Default)]
pub struct FailingConverter;

fn tool_failure() -> ConvertError {
    ConvertError::Failed {
        program: "fake".into(),
        status: "exit status: 1".into(),
        stderr: "unsupported input".into(),
    }
}

#[async_trait::async_trait]
impl HeicConverter for FailingConverter {
    async fn to_jpeg(&self, _heic: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        Err(tool_failure())
    }
}

#[async_trait::async_trait]
impl MovConverter for FailingConverter {
    async fn to_gif(&self, _input: &Path, _output: &Path) -> Result<(), ConvertError> {
        Err(tool_failure())
    }
}
