use async_trait::async_trait;
use http::StatusCode;
use serde_derive::Serialize;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;

use super::frontier::Task;
use crate::Error;

/// Status text used when there is no HTTP status to report: fetch failures
/// and statuses outside the registered set.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// The per-fetch outcome streamed to sinks, exactly one per dequeued task.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub url: Url,
    pub depth: u16,
    pub status_code: u16,
    pub status: String,
    pub num_links: usize,
    pub parent: Option<Url>,
}

impl Record {
    /// A record for a fetch that produced an HTTP response, whatever the
    /// status was.
    pub fn response(task: &Task, status_code: StatusCode, num_links: usize) -> Record {
        Record {
            url: task.url.clone(),
            depth: task.depth,
            status_code: status_code.as_u16(),
            status: status_code
                .canonical_reason()
                .unwrap_or(UNKNOWN_STATUS)
                .to_owned(),
            num_links,
            parent: task.parent.clone(),
        }
    }

    /// A record for a fetch that never produced a response (DNS, dial, TLS,
    /// timeout). Status code 0 is the documented sentinel.
    pub fn fetch_failure(task: &Task) -> Record {
        Record {
            url: task.url.clone(),
            depth: task.depth,
            status_code: 0,
            status: UNKNOWN_STATUS.to_owned(),
            num_links: 0,
            parent: task.parent.clone(),
        }
    }
}

/// A consumer of per-fetch outcomes. Implementations are called from every
/// worker at once and must synchronize internally.
#[async_trait]
pub trait Sink: 'static + Send + Sync {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error>;
}

/// List mode for logs: one info line per record.
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error> {
        log::info!(
            "depth={} url={} status={} links={}",
            record.depth,
            record.url,
            record.status_code,
            record.num_links,
        );
        Ok(())
    }
}

/// Spreadsheet download: one Link/Status row per record.
pub struct CsvSink {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<CsvSink, Error> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer
            .write_record(["Link", "Status"])
            .map_err(|err| Error::Custom(format!("spreadsheet header: {err}")))?;

        Ok(CsvSink {
            writer: Mutex::new(writer),
        })
    }

    /// The conventional output name, `{host}_depth_{depth}.csv`.
    pub fn file_name(seed: &Url, depth: u16) -> String {
        format!("{}_depth_{}.csv", seed.host_str().unwrap_or("crawl"), depth)
    }

    pub fn finish(&self) -> Result<(), Error> {
        self.writer
            .lock()
            .expect("csv writer poisoned")
            .flush()
            .map_err(Error::Io)
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error> {
        let status = format!("{} {}", record.status_code, record.status);
        let mut writer = self.writer.lock().expect("csv writer poisoned");
        writer.write_record([record.url.as_str(), status.as_str()])?;
        Ok(())
    }
}

/// Publishes every record to several sinks in turn.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> FanoutSink {
        FanoutSink { sinks }
    }
}

#[async_trait]
impl Sink for FanoutSink {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error> {
        for sink in &self.sinks {
            sink.publish(record.clone()).await?;
        }
        Ok(())
    }
}

/// Collects records in memory; handy for tests and for one-shot extractors.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().expect("record buffer poisoned").clone()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error> {
        self.records
            .lock()
            .expect("record buffer poisoned")
            .push(record);
        Ok(())
    }
}
