use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{IncentiveError, store_error},
    record::EnrichedRecord,
    store::{
        memory::{ActivityPartition, MemoryAggregateStore},
        ports::AggregateStore,
        types::AgentAggregate,
    },
    types::{ActivityCode, Cents},
};

const PERSISTENCE_VERSION: u64 = 1;
const JOURNAL_EXTENSION: &str = "journal";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedIncentiveState {
    version: u64,
    activities: BTreeMap<ActivityCode, ActivityPartition>,
}

#[derive(Serialize)]
struct PersistedIncentiveStateRef<'a> {
    version: u64,
    activities: &'a BTreeMap<ActivityCode, ActivityPartition>,
}

/// Store backed by a JSON snapshot plus an append-only NDJSON journal next to it.
/// Each `save` appends one fsynced journal line; `open` replays the journal on top of the
/// snapshot and `flush` folds it into a new snapshot. A failed `save` leaves both the
/// journal and the in-memory view at their previous state.
#[derive(Debug)]
pub struct JsonFileAggregateStore {
    path: PathBuf,
    journal_path: PathBuf,
    memory: MemoryAggregateStore,
}

impl JsonFileAggregateStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IncentiveError> {
        let path = path.into();
        let journal_path = path.with_extension(JOURNAL_EXTENSION);
        let mut memory = match load(&path)? {
            Some(activities) => MemoryAggregateStore::from_partitions(activities),
            None => MemoryAggregateStore::new(),
        };
        let replayed = replay_journal(&journal_path, &mut memory)?;
        tracing::debug!(
            target: "store",
            path = %path.display(),
            activities = memory.partitions().len(),
            replayed = replayed,
            "store_opened"
        );
        Ok(Self {
            path,
            journal_path,
            memory,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Writes a fresh snapshot and empties the journal.
    pub fn flush(&self) -> Result<(), IncentiveError> {
        write_atomically(&self.path, self.memory.partitions())?;
        let journal = fs::File::create(&self.journal_path).map_err(|err| {
            store_error(format!(
                "failed to truncate incentive journal '{}': {err}",
                self.journal_path.display()
            ))
        })?;
        journal.sync_all().map_err(|err| {
            store_error(format!(
                "failed to sync incentive journal '{}': {err}",
                self.journal_path.display()
            ))
        })
    }
}

impl AggregateStore for JsonFileAggregateStore {
    fn exists(&self, activity: &str, contract_id: &str) -> Result<bool, IncentiveError> {
        self.memory.exists(activity, contract_id)
    }

    fn aggregate(&self, activity: &str, agent_key: &str) -> Result<AgentAggregate, IncentiveError> {
        self.memory.aggregate(activity, agent_key)
    }

    fn project_consumption(
        &self,
        activity: &str,
        project_id: &str,
    ) -> Result<Cents, IncentiveError> {
        self.memory.project_consumption(activity, project_id)
    }

    fn contract_sequence(&self, activity: &str) -> Result<u64, IncentiveError> {
        self.memory.contract_sequence(activity)
    }

    fn save(&mut self, record: &EnrichedRecord) -> Result<(), IncentiveError> {
        let mut line = serde_json::to_vec(record).map_err(|err| {
            store_error(format!(
                "failed to encode record '{}': {err}",
                record.record_id
            ))
        })?;
        line.push(b'\n');

        let mut journal = open_journal(&self.journal_path)?;
        let committed_len = journal
            .metadata()
            .map_err(|err| journal_error(&self.journal_path, "stat", err))?
            .len();

        let appended = journal
            .write_all(&line)
            .and_then(|()| journal.sync_data())
            .map_err(|err| journal_error(&self.journal_path, "append to", err));
        let applied = appended.and_then(|()| self.memory.save(record));
        if let Err(err) = applied {
            if let Err(truncate_err) = journal
                .set_len(committed_len)
                .and_then(|()| journal.sync_data())
            {
                tracing::warn!(
                    target: "store",
                    journal = %self.journal_path.display(),
                    error = %truncate_err,
                    "journal_rollback_failed"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn records(&self, activity: &str) -> Result<Vec<EnrichedRecord>, IncentiveError> {
        self.memory.records(activity)
    }
}

fn journal_error(path: &Path, action: &str, err: std::io::Error) -> IncentiveError {
    store_error(format!(
        "failed to {action} incentive journal '{}': {err}",
        path.display()
    ))
}

fn open_journal(path: &Path) -> Result<fs::File, IncentiveError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| {
            store_error(format!(
                "failed to create incentive state directory '{}': {err}",
                parent.display()
            ))
        })?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| journal_error(path, "open", err))
}

/// Applies journaled records the snapshot does not know yet. A trailing line without a
/// newline is a torn append and is dropped.
fn replay_journal(path: &Path, memory: &mut MemoryAggregateStore) -> Result<usize, IncentiveError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(journal_error(path, "read", err)),
    };

    let (complete, torn_tail) = match content.rfind('\n') {
        Some(last_newline) => content.split_at(last_newline + 1),
        None => ("", content.as_str()),
    };
    if !torn_tail.trim().is_empty() {
        tracing::warn!(
            target: "store",
            journal = %path.display(),
            dropped_bytes = torn_tail.len(),
            "journal_torn_tail_dropped"
        );
    }

    let mut replayed = 0;
    for (index, line) in complete.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: EnrichedRecord = serde_json::from_str(line).map_err(|err| {
            store_error(format!(
                "failed to parse incentive journal '{}' line {}: {err}",
                path.display(),
                index + 1
            ))
        })?;
        if memory.exists(&record.activity_code, &record.contract.contract_id)? {
            continue;
        }
        memory.save(&record)?;
        replayed += 1;
    }
    Ok(replayed)
}

fn load(path: &Path) -> Result<Option<BTreeMap<ActivityCode, ActivityPartition>>, IncentiveError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(store_error(format!(
                "failed to read incentive state '{}': {err}",
                path.display()
            )));
        }
    };

    let parsed: PersistedIncentiveState = serde_json::from_str(&content).map_err(|err| {
        store_error(format!(
            "failed to parse incentive state '{}': {err}",
            path.display()
        ))
    })?;
    if parsed.version != PERSISTENCE_VERSION {
        return Err(store_error(format!(
            "unsupported incentive state version {} at '{}'",
            parsed.version,
            path.display()
        )));
    }

    Ok(Some(parsed.activities))
}

fn write_atomically(
    path: &Path,
    activities: &BTreeMap<ActivityCode, ActivityPartition>,
) -> Result<(), IncentiveError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| {
        store_error(format!(
            "failed to create incentive state directory '{}': {err}",
            parent.display()
        ))
    })?;

    let persisted = PersistedIncentiveStateRef {
        version: PERSISTENCE_VERSION,
        activities,
    };

    let tmp_path = path.with_extension("tmp");
    let file = fs::File::create(&tmp_path).map_err(|err| {
        store_error(format!(
            "failed to create incentive temp file '{}': {err}",
            tmp_path.display()
        ))
    })?;
    {
        let mut writer = BufWriter::new(&file);
        serde_json::to_writer_pretty(&mut writer, &persisted).map_err(|err| {
            store_error(format!(
                "failed to serialize incentive state '{}': {err}",
                tmp_path.display()
            ))
        })?;
        writer.write_all(b"\n").map_err(|err| {
            store_error(format!(
                "failed to finalize incentive state '{}': {err}",
                tmp_path.display()
            ))
        })?;
        writer.flush().map_err(|err| {
            store_error(format!(
                "failed to flush incentive state '{}': {err}",
                tmp_path.display()
            ))
        })?;
    }
    file.sync_all().map_err(|err| {
        store_error(format!(
            "failed to sync incentive temp file '{}': {err}",
            tmp_path.display()
        ))
    })?;

    fs::rename(&tmp_path, path).map_err(|err| {
        store_error(format!(
            "failed to replace incentive state '{}' from '{}': {err}",
            path.display(),
            tmp_path.display()
        ))
    })?;

    if let Ok(parent_file) = fs::File::open(parent) {
        let _ = parent_file.sync_all();
    }

    Ok(())
}
