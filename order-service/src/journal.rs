//! Durable order storage: an append-only command journal plus periodic snapshots.
//!
//! Every committed insert is one JSON line in `orders.journal`. Once `snapshot_every` commands
//! have been committed the full order table is written to `orders.snapshot` and the journal is
//! truncated. On open the snapshot is loaded first and the journal replayed on top of it.
use crate::store::{Order, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const JOURNAL_FILE: &str = "orders.journal";
pub const SNAPSHOT_FILE: &str = "orders.snapshot";

const BUF_WRITER_CAPACITY: usize = 32 * 1024;

/// A journal entry. Inserts are upserts, so replaying an entry twice is harmless.
#[derive(Debug, Serialize, Deserialize)]
enum Command {
    InsertOrder(Order),
}

impl Command {
    fn apply(self, orders: &mut HashMap<u64, Order>) {
        match self {
            Command::InsertOrder(order) => {
                orders.insert(order.order_id, order);
            }
        }
    }
}

pub struct Journal {
    writer: BufWriter<File>,
    snapshot_path: PathBuf,
    commits: u64,
    snapshot_every: u64,
}

impl Journal {
    /// Open (or create) the journal in `dir` and restore the orders it holds.
    pub fn open(
        dir: impl AsRef<Path>,
        snapshot_every: u64,
    ) -> Result<(Self, HashMap<u64, Order>), StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let mut orders = read_snapshot(&snapshot_path)?;

        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(JOURNAL_FILE))?;
        let (commits, valid_len) = replay(&file, &mut orders)?;

        // A trailing entry without its newline was never committed.
        if file.metadata()?.len() > valid_len {
            warn!("Removing uncommitted journal entry");
            file.set_len(valid_len)?;
        }
        file.seek(SeekFrom::End(0))?;

        debug!("Restored {} orders, {commits} journal entries", orders.len());

        let journal = Self {
            writer: BufWriter::with_capacity(BUF_WRITER_CAPACITY, file),
            snapshot_path,
            commits,
            snapshot_every,
        };
        Ok((journal, orders))
    }

    /// Durably record an insert. The caller applies it to the in-memory table afterwards.
    pub fn append(&mut self, order: &Order) -> Result<(), StoreError> {
        serde_json::to_writer(&mut self.writer, &Command::InsertOrder(order.clone()))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.commits += 1;
        Ok(())
    }

    pub fn needs_snapshot(&self) -> bool {
        self.commits >= self.snapshot_every
    }

    /// Write the whole table to the snapshot file and empty the journal.
    pub fn snapshot(&mut self, orders: &HashMap<u64, Order>) -> Result<(), StoreError> {
        let instant = Instant::now();

        let mut sorted: Vec<&Order> = orders.values().collect();
        sorted.sort_by_key(|order| order.order_id);

        let tmp_path = self.snapshot_path.with_extension("tmp");
        let mut writer = BufWriter::with_capacity(BUF_WRITER_CAPACITY, File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, &sorted)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        std::fs::rename(&tmp_path, &self.snapshot_path)?;

        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        self.commits = 0;

        debug!(
            "Snapshot of {} orders created in {}ms",
            sorted.len(),
            instant.elapsed().as_millis()
        );
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<HashMap<u64, Order>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let orders: Vec<Order> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(orders
        .into_iter()
        .map(|order| (order.order_id, order))
        .collect())
}

/// Apply every committed entry. Returns the entry count and the byte length they span.
fn replay(file: &File, orders: &mut HashMap<u64, Order>) -> Result<(u64, u64), StoreError> {
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut commits = 0;
    let mut valid_len = 0;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 || line.last() != Some(&b'\n') {
            break;
        }

        let command: Command = serde_json::from_slice(&line)
            .map_err(|_| StoreError::CorruptJournal(commits + 1))?;
        command.apply(orders);

        commits += 1;
        valid_len += read as u64;
    }

    Ok((commits, valid_len))
}
