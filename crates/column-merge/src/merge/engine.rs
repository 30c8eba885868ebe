use super::{
    config::MergeConfig,
    realign::align_record,
    record::{sort_by_key_prefix, RawRecord, Record},
    schema::{SchemaPlan, SourceDescriptor},
    LOG_PREFIX,
};
use crate::{MergeError, Result};

/// Lazy, finite, non-restartable sequence of raw records from one source.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<RawRecord>> + 'a>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineState {
    Collecting,
    FlushPartial,
    FlushFinal,
    Done,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MergeStats {
    pub rounds: u64,
    pub records: u64,
    pub records_per_source: Vec<u64>,
    pub partial_flushes: u64,
    pub partial_records: u64,
}

#[derive(Debug)]
pub struct MergeOutcome {
    /// At least one batch went to the partial-flush callback.
    pub partial_write: bool,
    /// Remaining records sorted by the final key; written by the caller.
    pub final_batch: Vec<Record>,
    pub stats: MergeStats,
}

/// Drives one stream per source in lock-step rounds, aligning every record to
/// the unified schema and spilling sorted batches once the buffer outgrows the
/// configured threshold.
#[derive(Debug)]
pub struct MergeEngine {
    plan: SchemaPlan,
    config: MergeConfig,
    buffer: Vec<Record>,
    state: EngineState,
    started: bool,
    partial_write: bool,
    stats: MergeStats,
}

impl MergeEngine {
    pub fn new(plan: SchemaPlan, config: MergeConfig) -> Self {
        let stats = MergeStats {
            records_per_source: vec![0; plan.descriptors.len()],
            ..MergeStats::default()
        };
        Self {
            plan,
            config,
            buffer: Vec::new(),
            state: EngineState::Collecting,
            started: false,
            partial_write: false,
            stats,
        }
    }

    pub fn schema(&self) -> &[String] {
        &self.plan.schema
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.plan.descriptors
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Consumes `streams` (one per descriptor, same order) to exhaustion.
    ///
    /// Partial batches are sorted by the partial key and handed to
    /// `flush_partial`; the buffer left at the end is sorted by the final key
    /// and returned. A read error or a record-shape violation stops the run.
    pub fn run<'a, F, E>(
        &mut self,
        streams: Vec<RecordStream<'a>>,
        mut flush_partial: F,
    ) -> std::result::Result<MergeOutcome, E>
    where
        F: FnMut(&[Record]) -> std::result::Result<(), E>,
        E: From<MergeError>,
    {
        if self.started {
            return Err(MergeError::message("merge engine has already run").into());
        }
        if streams.len() != self.plan.descriptors.len() {
            return Err(MergeError::SourceCountMismatch {
                expected: self.plan.descriptors.len(),
                found: streams.len(),
            }
            .into());
        }

        self.started = true;
        merge_debug!(
            "{LOG_PREFIX}: merging {} sources into {} columns (flush_threshold={} partial_key={} final_key={})",
            streams.len(),
            self.plan.schema.len(),
            self.config.flush_threshold,
            self.config.partial_key_columns,
            self.config.final_key_columns
        );

        let mut active: Vec<Option<RecordStream<'a>>> = streams.into_iter().map(Some).collect();
        let mut round: Vec<(usize, RawRecord)> = Vec::with_capacity(active.len());

        loop {
            round.clear();
            for (index, slot) in active.iter_mut().enumerate() {
                let Some(stream) = slot else {
                    continue;
                };
                match stream.next() {
                    Some(Ok(record)) => round.push((index, record)),
                    Some(Err(error)) => {
                        merge_debug!(
                            "{LOG_PREFIX}: source {} failed after {} records",
                            self.plan.descriptors[index].source_id,
                            self.stats.records_per_source[index]
                        );
                        return Err(error.into());
                    }
                    None => {
                        merge_debug!(
                            "{LOG_PREFIX}: source {} exhausted after {} records",
                            self.plan.descriptors[index].source_id,
                            self.stats.records_per_source[index]
                        );
                        *slot = None;
                    }
                }
            }
            if round.is_empty() {
                break;
            }

            // Checked between rounds only, so a round never straddles two batches.
            if self.buffer.len() > self.config.flush_threshold {
                self.flush_partial(&mut flush_partial)?;
            }

            self.stats.rounds += 1;
            for (index, record) in round.drain(..) {
                let aligned = align_record(&self.plan.descriptors[index], record)?;
                self.buffer.push(aligned);
                self.stats.records_per_source[index] += 1;
                self.stats.records += 1;
            }
        }

        self.finish()
    }

    fn flush_partial<F, E>(&mut self, flush: &mut F) -> std::result::Result<(), E>
    where
        F: FnMut(&[Record]) -> std::result::Result<(), E>,
    {
        self.state = EngineState::FlushPartial;
        let mut batch = std::mem::take(&mut self.buffer);
        sort_by_key_prefix(&mut batch, self.config.partial_key_columns);
        merge_debug!(
            "{LOG_PREFIX}: {} records buffered after {} rounds, writing partial batch {}",
            batch.len(),
            self.stats.rounds,
            self.stats.partial_flushes + 1
        );

        flush(&batch)?;

        self.partial_write = true;
        self.stats.partial_flushes += 1;
        self.stats.partial_records += batch.len() as u64;
        batch.clear();
        self.buffer = batch;
        self.state = EngineState::Collecting;
        Ok(())
    }

    fn finish<E>(&mut self) -> std::result::Result<MergeOutcome, E> {
        self.state = EngineState::FlushFinal;
        let mut final_batch = std::mem::take(&mut self.buffer);
        sort_by_key_prefix(&mut final_batch, self.config.final_key_columns);
        self.state = EngineState::Done;

        merge_info!(
            "{LOG_PREFIX}: done after {} rounds, {} records ({} in {} partial batches, {} in final batch)",
            self.stats.rounds,
            self.stats.records,
            self.stats.partial_records,
            self.stats.partial_flushes,
            final_batch.len()
        );
        Ok(MergeOutcome {
            partial_write: self.partial_write,
            final_batch,
            stats: self.stats.clone(),
        })
    }
}
