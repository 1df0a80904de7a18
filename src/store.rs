use std::{collections::BTreeMap, fs, io, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

/// One chat line. Never mutated after it's appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub username: String,
    pub msg: String,
}

impl Message {
    pub fn new(username: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            msg: msg.into(),
        }
    }
}

// older snapshots stored bare strings, those get read as anonymous messages
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Full(Message),
    Legacy(String),
}

impl From<StoredRecord> for Message {
    fn from(record: StoredRecord) -> Self {
        match record {
            StoredRecord::Full(message) => message,
            StoredRecord::Legacy(msg) => Message::new("", msg),
        }
    }
}

pub type Rooms = BTreeMap<String, Vec<Message>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("couldn't access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot isn't a room -> messages object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Room history mirrored to a single JSON snapshot file.
///
/// The whole file is rewritten after every append, so writes cost
/// O(total history). Fine for small deployments, nothing more.
#[derive(Debug)]
pub struct MessageStore {
    path: PathBuf,
    rooms: Rooms,
}

impl MessageStore {
    /// Reads the snapshot at `path`.
    ///
    /// A missing file is created as `{}`. A malformed one is logged and
    /// replaced by an empty store; the next append overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let rooms = match read_snapshot(&path) {
            Ok(Some(rooms)) => {
                tracing::info!(
                    path = %path.display(),
                    rooms = rooms.len(),
                    "loaded message history"
                );
                rooms
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "no message file found, creating a new one");
                let rooms = Rooms::new();
                if let Err(err) = write_snapshot(&path, &rooms) {
                    tracing::warn!(error = %err, "couldn't create message file");
                }
                rooms
            }
            Err(err) => {
                tracing::error!(
                    path = %path.display(),
                    error = %err,
                    "couldn't load message history, starting empty"
                );
                Rooms::new()
            }
        };

        Self { path, rooms }
    }

    /// Appends to `room` and rewrites the snapshot.
    ///
    /// The message is kept in memory even when the write fails.
    pub fn append(&mut self, room: &str, message: Message) -> Result<(), StoreError> {
        self.rooms
            .entry(room.to_owned())
            .or_default()
            .push(message);

        write_snapshot(&self.path, &self.rooms)
    }

    pub fn history(&self, room: &str) -> &[Message] {
        self.rooms
            .get(room)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_snapshot(path: &Path) -> Result<Option<Rooms>, StoreError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StoreError::Io { path: path.to_owned(), source }),
    };

    let records: BTreeMap<String, Vec<StoredRecord>> = serde_json::from_str(&data)?;
    Ok(Some(
        records
            .into_iter()
            .map(|(room, records)| (room, records.into_iter().map(Message::from).collect()))
            .collect()
    ))
}

fn write_snapshot(path: &Path, rooms: &Rooms) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: path.to_owned(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(rooms)?;

    // rename over the old snapshot so a crash never leaves half a file
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_err(source)
    })
}
