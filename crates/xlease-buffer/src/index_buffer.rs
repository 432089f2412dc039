//! In-memory mirror of the index region.

use tracing::{debug, warn};
use xlease_common::record::RECORD_SEP;
use xlease_common::{Geometry, Record, RecordNumber, Result, MAX_RECORDS, RECORD_SIZE};
use xlease_storage::{AlignedBuf, DirectFile};

/// Owned copy of the index region, read once from storage.
///
/// Changes are made in memory with [`write_record`](Self::write_record) and
/// reach storage only through [`flush_record`](Self::flush_record) or
/// [`flush_all`](Self::flush_all).
pub struct IndexBuffer {
    /// Block-aligned index bytes, `geometry.buffer_size()` long.
    data: AlignedBuf,
    /// Layout of the volume.
    geometry: Geometry,
}

impl IndexBuffer {
    /// Reads the whole index region from the start of `file`.
    pub fn load(file: &mut DirectFile, geometry: Geometry) -> Result<Self> {
        assert_eq!(file.block_size(), geometry.block_size());

        let mut data = AlignedBuf::new_zeroed(geometry.buffer_size(), geometry.block_size());
        file.seek(0)?;
        file.read_into(data.as_mut_slice())?;

        Ok(Self { data, geometry })
    }

    /// Returns the volume geometry.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Returns the record table bytes.
    fn records(&self) -> &[u8] {
        &self.data.as_slice()[self.geometry.record_base()..self.geometry.index_size()]
    }

    /// Searches for the first record whose lease id is `lease_id`.
    ///
    /// Records are scanned in ascending record number, so looking up the
    /// blank id yields the lowest free slot.
    pub fn find_record(&self, lease_id: &str) -> Option<RecordNumber> {
        let prefix = lease_id.as_bytes();
        self.records()
            .chunks_exact(RECORD_SIZE)
            .position(|record| {
                record.starts_with(prefix) && record.get(prefix.len()) == Some(&RECORD_SEP)
            })
            .map(|n| RecordNumber(n as u32))
    }

    /// Decodes record `recnum`.
    pub fn read_record(&self, recnum: RecordNumber) -> Result<Record> {
        let offset = self.geometry.record_offset(recnum);
        Record::from_bytes(&self.data.as_slice()[offset..offset + RECORD_SIZE])
    }

    /// Iterates over every record in ascending record number.
    pub fn read_records(&self) -> impl Iterator<Item = (RecordNumber, Result<Record>)> + '_ {
        (0..MAX_RECORDS as u32).map(move |n| {
            let recnum = RecordNumber(n);
            (recnum, self.read_record(recnum))
        })
    }

    /// Overwrites record `recnum` in memory. The change is not durable
    /// until [`flush_record`](Self::flush_record) returns.
    pub fn write_record(&mut self, recnum: RecordNumber, record: &Record) {
        assert!(recnum.index() < MAX_RECORDS, "{} out of range", recnum);
        let offset = self.geometry.record_offset(recnum);
        self.data.as_mut_slice()[offset..offset + RECORD_SIZE].copy_from_slice(&record.to_bytes());
    }

    /// Writes the block containing record `recnum` and waits until it
    /// reaches storage.
    pub fn flush_record(&self, recnum: RecordNumber, file: &mut DirectFile) -> Result<()> {
        let block_size = self.geometry.block_size();
        let block_start = self.geometry.block_start(self.geometry.record_offset(recnum));

        debug!("flushing {} block at offset {}", recnum, block_start);
        file.seek(block_start as u64)?;
        file.write(&self.data.as_slice()[block_start..block_start + block_size])?;
        file.sync()
    }

    /// Writes the entire buffer and waits until it reaches storage.
    ///
    /// Not atomic: if this fails, some blocks may not have been written.
    pub fn flush_all(&self, file: &mut DirectFile) -> Result<()> {
        debug!("flushing {} bytes of index", self.geometry.buffer_size());
        file.seek(0)?;
        file.write(self.data.as_slice())?;
        file.sync()
    }

    /// Replaces record `recnum` and flushes its block.
    ///
    /// If the flush fails the previous record is put back, so the buffer
    /// never shows a change that may not have reached storage.
    pub fn commit_record(
        &mut self,
        recnum: RecordNumber,
        record: &Record,
        file: &mut DirectFile,
    ) -> Result<()> {
        let offset = self.geometry.record_offset(recnum);
        let mut previous = [0u8; RECORD_SIZE];
        previous.copy_from_slice(&self.data.as_slice()[offset..offset + RECORD_SIZE]);

        self.write_record(recnum, record);
        if let Err(e) = self.flush_record(recnum, file) {
            warn!("flushing {} failed, restoring previous record: {}", recnum, e);
            self.data.as_mut_slice()[offset..offset + RECORD_SIZE].copy_from_slice(&previous);
            return Err(e);
        }
        Ok(())
    }

    /// Replaces every record with `record` and flushes the whole buffer.
    ///
    /// If the flush fails the previous contents are put back. Storage may
    /// still hold a mix of old and new blocks.
    pub fn commit_all(&mut self, record: &Record, file: &mut DirectFile) -> Result<()> {
        let previous = self.data.as_slice().to_vec();

        for n in 0..MAX_RECORDS as u32 {
            self.write_record(RecordNumber(n), record);
        }
        if let Err(e) = self.flush_all(file) {
            warn!("flushing index failed, restoring previous records: {}", e);
            self.data.as_mut_slice().copy_from_slice(&previous);
            return Err(e);
        }
        Ok(())
    }
}
