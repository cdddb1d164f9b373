// Parallel parse orchestration.
//
// One grammar invocation per non-empty planned range, fanned out on rayon.
// Workers share only the read-only buffer; results come back tagged with
// their chunk id. rayon's collect preserves input order, so the merge is a
// single sequential pass that separates successes from failures. Failures
// never short-circuit siblings: every chunk runs to completion and every
// error is reported.

use log::debug;
use rayon::prelude::*;

use crate::error::{ChunkError, ParseErrors};
use crate::grammar::{parse_range, GrammarConfig, Record};
use crate::plan::ChunkPlan;

/// Records parsed from one chunk, tagged with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecords {
    pub chunk: usize,
    pub records: Vec<Record>,
}

/// Parse every non-empty range of `plan` concurrently.
///
/// Returns record sets ordered by chunk id, which restores the exact order
/// a sequential parse of the whole buffer would produce. If any chunk
/// fails, the error lists every failed chunk.
pub fn parse_chunks(
    data: &[u8],
    plan: &ChunkPlan,
    config: &GrammarConfig,
) -> Result<Vec<ChunkRecords>, ParseErrors> {
    let jobs: Vec<(usize, std::ops::Range<usize>)> = plan.ranges().collect();
    debug!("parsing {} non-empty chunk(s)", jobs.len());

    let outcomes: Vec<(usize, Result<Vec<Record>, _>)> = jobs
        .into_par_iter()
        .map(|(chunk, range)| (chunk, parse_range(&data[range], config)))
        .collect();

    let mut sets = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (chunk, outcome) in outcomes {
        match outcome {
            Ok(records) => sets.push(ChunkRecords { chunk, records }),
            Err(source) => errors.push(ChunkError { chunk, source }),
        }
    }
    if !errors.is_empty() {
        return Err(ParseErrors { errors });
    }

    // Collect already yields chunk order; keep the guarantee explicit.
    sets.sort_by_key(|s| s.chunk);
    Ok(sets)
}

/// Flattened variant: one record sequence in original buffer order.
pub fn parse_records(
    data: &[u8],
    plan: &ChunkPlan,
    config: &GrammarConfig,
) -> Result<Vec<Record>, ParseErrors> {
    let sets = parse_chunks(data, plan, config)?;
    let total = sets.iter().map(|s| s.records.len()).sum();
    let mut records = Vec::with_capacity(total);
    for set in sets {
        records.extend(set.records);
    }
    Ok(records)
}
