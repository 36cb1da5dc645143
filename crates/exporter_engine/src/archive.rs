//! Streaming ZIP writer.
//!
//! Entries are written in order as local header + payload, followed by the
//! central directory and the end-of-central-directory record. The byte cursor
//! comes from the sink wrapper itself, so the offsets stored in the central
//! directory always match where each local header really starts.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use exporter_logging::{export_debug, export_warn};
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::checksum::checksum;

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
const VERSION: u16 = 20;
const FLAG_UTF8_NAME: u16 = 1 << 11;

pub const LOCAL_HEADER_LEN: usize = 30;
pub const CENTRAL_HEADER_LEN: usize = 46;
pub const END_RECORD_LEN: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflated,
}

impl CompressionMethod {
    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflated => 8,
        }
    }
}

/// Raw-deflate strategy used for entries that ask for compression.
pub trait Compressor: Send + Sync {
    /// Returns the raw deflate stream for `data`, or `None` when this strategy
    /// cannot compress. `None` makes the entry fall back to being stored.
    fn deflate_raw(&self, data: &[u8]) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone, Copy)]
pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    /// `level` ranges from 0 (no compression) to 9 (best).
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for DeflateCompressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Compressor for DeflateCompressor {
    fn deflate_raw(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        match encoder.write_all(data).and_then(|()| encoder.finish()) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                export_warn!("deflate failed, storing entry instead: {}", err);
                None
            }
        }
    }
}

/// Strategy that never compresses; every entry is stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreCompressor;

impl Compressor for StoreCompressor {
    fn deflate_raw(&self, _data: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

impl<C: Compressor + ?Sized> Compressor for Arc<C> {
    fn deflate_raw(&self, data: &[u8]) -> Option<Vec<u8>> {
        (**self).deflate_raw(data)
    }
}

/// Legacy MS-DOS packed timestamp used by ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// Packs `at`; instants outside 1980..=2107 clamp to the nearest
    /// representable value.
    pub fn from_naive(at: &NaiveDateTime) -> Self {
        let year = at.year();
        if year < 1980 {
            return Self {
                time: 0,
                date: (1 << 5) | 1,
            };
        }
        if year > 2107 {
            return Self {
                time: (23 << 11) | (59 << 5) | 29,
                date: (127 << 9) | (12 << 5) | 31,
            };
        }
        let time = (at.hour() << 11) | (at.minute() << 5) | (at.second().min(59) / 2);
        let date = (((year - 1980) as u32) << 9) | (at.month() << 5) | at.day();
        Self {
            time: time as u16,
            date: date as u16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    payload: Vec<u8>,
    modified_at: NaiveDateTime,
    compressed: bool,
}

impl ArchiveEntry {
    /// New compressed entry stamped with the current local time.
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            modified_at: Local::now().naive_local(),
            compressed: true,
        }
    }

    pub fn with_modified_at(mut self, modified_at: NaiveDateTime) -> Self {
        self.modified_at = modified_at;
        self
    }

    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn modified_at(&self) -> NaiveDateTime {
        self.modified_at
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Stored,
    Deflated,
}

/// Reported once per entry after its header and payload reached the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryProgress {
    pub entry_index: usize,
    pub name: String,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entry_count: usize,
    pub central_directory_offset: u32,
    pub central_directory_size: u32,
    pub total_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{what} exceeds the zip limit of {limit}")]
    LimitExceeded { what: &'static str, limit: u64 },
}

/// Ordered set of pending entries plus the compression policy applied to them.
pub struct ArchiveBuilder {
    entries: Vec<ArchiveEntry>,
    compress: bool,
    compressor: Box<dyn Compressor>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::with_compressor(DeflateCompressor::default())
    }

    pub fn with_compressor(compressor: impl Compressor + 'static) -> Self {
        Self {
            entries: Vec::new(),
            compress: true,
            compressor: Box::new(compressor),
        }
    }

    /// Compression default for entries added later through [`Self::add`].
    pub fn set_compression(&mut self, enabled: bool) -> &mut Self {
        self.compress = enabled;
        self
    }

    /// Overrides the compression flag of every entry already added.
    pub fn compress_all(&mut self, enabled: bool) -> &mut Self {
        for entry in &mut self.entries {
            entry.compressed = enabled;
        }
        self
    }

    pub fn add(&mut self, name: impl Into<String>, payload: impl Into<Vec<u8>>) -> &mut Self {
        let entry = ArchiveEntry::new(name, payload).with_compression(self.compress);
        self.entries.push(entry);
        self
    }

    /// Appends an entry as-is, keeping its own compression flag.
    pub fn add_entry(&mut self, entry: ArchiveEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn add_all(&mut self, entries: impl IntoIterator<Item = ArchiveEntry>) -> &mut Self {
        self.entries.extend(entries);
        self
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the complete archive to `sink`.
    ///
    /// `on_progress` receives the rounded completion percentage and the
    /// entry that was just written. A failing sink aborts the whole pass.
    pub fn write_to<W, F>(
        &self,
        sink: W,
        mut on_progress: F,
    ) -> Result<ArchiveSummary, ArchiveError>
    where
        W: Write,
        F: FnMut(u8, &EntryProgress),
    {
        let total = self.entries.len();
        if total > usize::from(u16::MAX) {
            return Err(ArchiveError::LimitExceeded {
                what: "entry count",
                limit: u64::from(u16::MAX),
            });
        }

        let mut sink = CountingWriter::new(sink);
        let mut records = Vec::with_capacity(total);

        for (index, entry) in self.entries.iter().enumerate() {
            let offset = fit_u32(sink.written(), "local header offset")?;
            let name = entry.name.as_bytes();
            let name_len = u16::try_from(name.len()).map_err(|_| ArchiveError::LimitExceeded {
                what: "entry name length",
                limit: u64::from(u16::MAX),
            })?;
            let uncompressed_size = fit_u32(entry.payload.len() as u64, "entry size")?;
            let crc = checksum(&entry.payload);

            let deflated = if entry.compressed {
                let deflated = self.compressor.deflate_raw(&entry.payload);
                if deflated.is_none() {
                    export_debug!("no compressor available, storing {}", entry.name);
                }
                deflated
            } else {
                None
            };
            let (method, data) = match deflated.as_deref() {
                Some(bytes) => (CompressionMethod::Deflated, bytes),
                None => (CompressionMethod::Stored, entry.payload.as_slice()),
            };

            let record = CentralRecord {
                name,
                name_len,
                flags: if entry.name.is_ascii() { 0 } else { FLAG_UTF8_NAME },
                method,
                stamp: DosDateTime::from_naive(&entry.modified_at),
                crc,
                compressed_size: fit_u32(data.len() as u64, "compressed entry size")?,
                uncompressed_size,
                offset,
            };
            sink.write_all(&record.local_header())?;
            sink.write_all(data)?;
            records.push(record);

            let progress = EntryProgress {
                entry_index: index,
                name: entry.name.clone(),
                status: match method {
                    CompressionMethod::Stored => EntryStatus::Stored,
                    CompressionMethod::Deflated => EntryStatus::Deflated,
                },
            };
            on_progress(percent_complete(index + 1, total), &progress);
        }

        let central_directory_offset = fit_u32(sink.written(), "central directory offset")?;
        for record in &records {
            sink.write_all(&record.central_header())?;
        }
        let central_directory_size = fit_u32(
            sink.written() - u64::from(central_directory_offset),
            "central directory size",
        )?;

        let count = total as u16;
        let mut end = Vec::with_capacity(END_RECORD_LEN);
        put_u32(&mut end, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        put_u16(&mut end, 0);
        put_u16(&mut end, 0);
        put_u16(&mut end, count);
        put_u16(&mut end, count);
        put_u32(&mut end, central_directory_size);
        put_u32(&mut end, central_directory_offset);
        put_u16(&mut end, 0);
        sink.write_all(&end)?;
        sink.flush()?;

        Ok(ArchiveSummary {
            entry_count: total,
            central_directory_offset,
            central_directory_size,
            total_bytes: sink.written(),
        })
    }

    /// Convenience wrapper collecting the archive in memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes, |_, _| {})?;
        Ok(bytes)
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct CentralRecord<'a> {
    name: &'a [u8],
    name_len: u16,
    flags: u16,
    method: CompressionMethod,
    stamp: DosDateTime,
    crc: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    offset: u32,
}

impl CentralRecord<'_> {
    fn local_header(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LOCAL_HEADER_LEN + self.name.len());
        put_u32(&mut buf, LOCAL_HEADER_SIGNATURE);
        put_u16(&mut buf, VERSION);
        put_u16(&mut buf, self.flags);
        put_u16(&mut buf, self.method.code());
        put_u16(&mut buf, self.stamp.time);
        put_u16(&mut buf, self.stamp.date);
        put_u32(&mut buf, self.crc);
        put_u32(&mut buf, self.compressed_size);
        put_u32(&mut buf, self.uncompressed_size);
        put_u16(&mut buf, self.name_len);
        put_u16(&mut buf, 0);
        buf.extend_from_slice(self.name);
        buf
    }

    fn central_header(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CENTRAL_HEADER_LEN + self.name.len());
        put_u32(&mut buf, CENTRAL_HEADER_SIGNATURE);
        put_u16(&mut buf, VERSION);
        put_u16(&mut buf, VERSION);
        put_u16(&mut buf, self.flags);
        put_u16(&mut buf, self.method.code());
        put_u16(&mut buf, self.stamp.time);
        put_u16(&mut buf, self.stamp.date);
        put_u32(&mut buf, self.crc);
        put_u32(&mut buf, self.compressed_size);
        put_u32(&mut buf, self.uncompressed_size);
        put_u16(&mut buf, self.name_len);
        // extra length, comment length, disk number start, internal attributes
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        put_u32(&mut buf, 0);
        put_u32(&mut buf, self.offset);
        buf.extend_from_slice(self.name);
        buf
    }
}

/// Write adapter that tracks how many bytes reached the inner sink.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn fit_u32(value: u64, what: &'static str) -> Result<u32, ArchiveError> {
    u32::try_from(value).map_err(|_| ArchiveError::LimitExceeded {
        what,
        limit: u64::from(u32::MAX),
    })
}

/// `round(done / total * 100)` with halves rounded up.
fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = (done as u64 * 200 + total as u64) / (2 * total as u64);
    scaled.min(100) as u8
}
