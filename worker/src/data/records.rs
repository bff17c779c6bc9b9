use std::{
    io::{Read, Seek, SeekFrom},
    ops::Range,
};

use log::{debug, warn};

use super::{DataErr, Result, shard::shard_range};

const VALUE_SIZE: usize = size_of::<f32>();

/// Reads batches of fixed-width records from a stream.
///
/// A record is `sample_size` little endian floats. The records of the stream are split in
/// contiguous ranges among the workers and each reader only goes through the one of its rank.
pub struct DataReader<'a, S: Read + Seek + ?Sized> {
    stream: &'a mut S,
    sample_size: usize,
    batch_size: usize,
    records: Range<usize>,
    smallest_shard: usize,
    cursor: usize,
    buf: Vec<u8>,
}

impl<'a, S: Read + Seek + ?Sized> DataReader<'a, S> {
    /// Creates a new `DataReader` positioned at the first record of the shard of `rank`.
    ///
    /// # Arguments
    /// * `stream` - The stream holding the records.
    /// * `stream_size` - The size of the stream in bytes, a trailing partial record is ignored.
    /// * `sample_size` - The amount of floats per record.
    /// * `rank` - The rank of this worker.
    /// * `num_workers` - The amount of workers sharing the stream.
    /// * `batch_size` - The maximum amount of records per batch.
    ///
    /// # Returns
    /// An error if some argument is out of range or the stream can't be positioned.
    pub fn new(
        stream: &'a mut S,
        stream_size: u64,
        sample_size: usize,
        rank: usize,
        num_workers: usize,
        batch_size: usize,
    ) -> Result<Self> {
        if sample_size == 0 || batch_size == 0 {
            return Err(DataErr::InvalidArgument(
                "sample and batch sizes must be positive",
            ));
        }

        if rank >= num_workers {
            return Err(DataErr::InvalidArgument("rank must be less than num_workers"));
        }

        let record_bytes = (sample_size * VALUE_SIZE) as u64;
        let total = (stream_size / record_bytes) as usize;

        let trailing = stream_size % record_bytes;
        if trailing != 0 {
            warn!("ignoring {trailing} trailing bytes that don't make a whole record");
        }

        let records = shard_range(total, rank, num_workers);
        debug!(rank = rank; "reading records {records:?} of {total}");

        stream.seek(SeekFrom::Start(records.start as u64 * record_bytes))?;

        Ok(Self {
            stream,
            sample_size,
            batch_size,
            cursor: records.start,
            records,
            smallest_shard: total / num_workers,
            buf: Vec::new(),
        })
    }

    /// Shortens the shard to the length of the smallest one, so that every rank goes through the
    /// same amount of batches. Up to one record per shard is left unread.
    pub fn even_shards(mut self) -> Self {
        self.records.end = self.records.start + self.smallest_shard;
        self
    }

    /// Reads the next batch of at most `batch_size` records.
    ///
    /// # Returns
    /// The records one after the other, empty once the shard is exhausted.
    pub fn read_batch(&mut self) -> Result<Vec<f32>> {
        let n = self.batch_size.min(self.records.end.saturating_sub(self.cursor));
        if n == 0 {
            return Ok(Vec::new());
        }

        self.buf.resize(n * self.sample_size * VALUE_SIZE, 0);
        self.stream.read_exact(&mut self.buf)?;
        self.cursor += n;

        let values = self
            .buf
            .chunks_exact(VALUE_SIZE)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(values)
    }

    /// Whether every record of the shard was read.
    pub fn eof(&self) -> bool {
        self.cursor >= self.records.end
    }

    /// The amount of records in the shard of this reader.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Splits raw records into their features and labels, the label being the first value.
///
/// # Returns
/// The features, `sample_size - 1` per record, and one label per record.
pub fn split_records(raw: &[f32], sample_size: usize) -> Result<(Vec<f32>, Vec<f32>)> {
    if sample_size == 0 || raw.len() % sample_size != 0 {
        return Err(DataErr::PartialRecord {
            len: raw.len(),
            sample_size,
        });
    }

    let n = raw.len() / sample_size;
    let mut features = Vec::with_capacity(n * (sample_size - 1));
    let mut labels = Vec::with_capacity(n);

    for record in raw.chunks_exact(sample_size) {
        labels.push(record[0]);
        features.extend_from_slice(&record[1..]);
    }

    Ok((features, labels))
}
