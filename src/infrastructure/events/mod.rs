//! Event bus for decoupled communication
//!
//! Subscribers (the UI shell, the CLI progress display) learn about job
//! progress and finished derivatives without polling the catalog.

use crate::domain::import::ImportState;
use crate::domain::media::MediaKind;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Event {
    /// Archive handle finished initializing
    ArchiveStarted,

    /// Archive handle is shutting down
    ArchiveShutdown,

    /// Background job reported progress
    JobProgress {
        queue: String,
        job_id: Uuid,
        percent: f32,
        message: Option<String>,
    },

    /// A derivative (thumbnail, preview, poster, proxy) became available
    AssetReady {
        kind: MediaKind,
        sha: String,
        asset: AssetKind,
    },

    /// Import session progress, by bytes for smooth progress on large files
    ImportProgress {
        import_id: Uuid,
        state: ImportState,
        files_done: usize,
        files_total: usize,
        bytes_done: u64,
        bytes_total: u64,
    },

    /// Import session reached a terminal state
    ImportCompleted {
        import_id: Uuid,
        state: ImportState,
    },

    /// A fixity run finished
    FixityCompleted {
        checked: usize,
        corrupted: usize,
        missing: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    ThumbSmall,
    ThumbLarge,
    Preview,
    Poster,
    Proxy,
    Metadata,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event. Send errors (no receivers) are ignored.
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
