use crate::{
    cli::MergeArgs,
    constants::RESULT_DIR_NAME,
    error::TabmergeError,
    io::{
        discovery::find_source_files,
        readers::{ReaderRegistry, RecordStream, SourceReader},
        tsv_writer::{OutputSink, WriterRegistry},
    },
    utils::util::{format_number_with_commas, Result},
};
use column_merge::{MergeConfig, MergeEngine, MergeStats, SchemaReconciler};
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    pub output_name: String,
    pub output_extension: String,
    pub config: MergeConfig,
}

#[derive(Debug)]
pub struct MergeSummary {
    pub output: PathBuf,
    /// Merged sources, in schema order.
    pub sources: Vec<String>,
    /// Files left out because they could not be opened or their header was unusable.
    pub skipped: Vec<PathBuf>,
    pub columns: Vec<String>,
    pub stats: MergeStats,
}

pub fn merge(args: MergeArgs) -> Result<()> {
    let options = args.output.merge_options()?;
    let summary = run_merge(
        &args.dir,
        &options,
        &ReaderRegistry::default(),
        &WriterRegistry::default(),
    )?;
    log::info!(
        "Merged {} records from {} sources into {}",
        format_number_with_commas(summary.stats.records),
        summary.sources.len(),
        summary.output.display()
    );
    if !summary.skipped.is_empty() {
        log::warn!("Skipped {} source files", summary.skipped.len());
    }
    Ok(())
}

/// Merges every source file directly inside `dir` into `<dir>/result/`.
pub fn run_merge(
    dir: &Path,
    options: &MergeOptions,
    readers: &ReaderRegistry,
    writers: &WriterRegistry,
) -> Result<MergeSummary> {
    let files = find_source_files(dir)?;
    if files.is_empty() {
        return Err(TabmergeError::NoSourceFiles {
            dir: dir.to_path_buf(),
        });
    }
    merge_files(dir, &files, options, readers, writers)
}

/// Merges `files` into `<dir>/result/<name>.<ext>`.
///
/// Files that cannot be opened or whose header is unusable are logged and
/// skipped. Anything that goes wrong after the header is written ends the run.
pub fn merge_files(
    dir: &Path,
    files: &[PathBuf],
    options: &MergeOptions,
    readers: &ReaderRegistry,
    writers: &WriterRegistry,
) -> Result<MergeSummary> {
    let mut sink = writers.open(
        &dir.join(RESULT_DIR_NAME),
        &options.output_name,
        &options.output_extension,
    )?;

    let mut reconciler = SchemaReconciler::new();
    let mut sources: Vec<Box<dyn SourceReader>> = Vec::new();
    let mut skipped = Vec::new();
    for path in files {
        match open_source(path, readers, &mut reconciler) {
            Ok(source) => sources.push(source),
            Err(error) => {
                log::warn!("Skipping {}: {error}", path.display());
                skipped.push(path.clone());
            }
        }
    }

    let plan = reconciler.finish()?;
    log::info!(
        "Unified schema of {} columns from {} sources",
        plan.schema.len(),
        sources.len()
    );
    log::debug!("Schema: {}", plan.schema.join(", "));
    for descriptor in plan.descriptors.iter().filter(|d| d.needs_realignment) {
        log::debug!("{} columns will be realigned", descriptor.source_id);
    }

    sink.write_header(&plan.schema)?;

    let streams = sources
        .iter()
        .zip(plan.descriptors.iter())
        .map(|(source, descriptor)| source.stream_records(descriptor.raw_columns.len()))
        .collect::<Result<Vec<RecordStream>>>()?;

    let columns = plan.schema.clone();
    let source_ids: Vec<String> = plan.source_ids().map(str::to_string).collect();
    let output = sink.path().to_path_buf();
    let mut engine = MergeEngine::new(plan, options.config.clone());
    let outcome = engine.run(streams, |batch| -> Result<()> {
        log::info!(
            "Writing a partial batch of {} records to {}",
            format_number_with_commas(batch.len()),
            output.display()
        );
        sink.append_batch(batch)
    })?;

    log::debug!(
        "Writing the final batch of {} records",
        format_number_with_commas(outcome.final_batch.len())
    );
    sink.append_batch(&outcome.final_batch)?;

    Ok(MergeSummary {
        output,
        sources: source_ids,
        skipped,
        columns,
        stats: outcome.stats,
    })
}

fn open_source(
    path: &Path,
    readers: &ReaderRegistry,
    reconciler: &mut SchemaReconciler,
) -> Result<Box<dyn SourceReader>> {
    let mut source = readers.open(path)?;
    let columns = source.discover_columns()?;
    log::debug!(
        "{}: {} columns ({})",
        source.source_id(),
        columns.len(),
        columns.join(", ")
    );
    reconciler.add_source(source.source_id(), columns)?;
    Ok(source)
}
