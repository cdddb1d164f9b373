// Chunk boundary planning.
//
// Divides the buffer into near-equal coarse ranges, then refines them so
// every non-empty range starts and ends on a true record boundary. With
// quoting disabled that is a forward newline search; with quoting enabled it
// is a parallel prescan followed by a sequential stitch, since a naive byte
// split can land inside a quoted field that contains literal newlines.

pub mod prescan;
pub mod stitch;

use log::debug;
use rayon::prelude::*;

use crate::error::PlanError;
use prescan::{prescan_range, Prescan};

/// Record-aligned byte ranges over one buffer, indexed by chunk id.
///
/// Ranges are half-open `[start, end)`, non-overlapping, and in buffer
/// order. Both boundary arrays are allocated once at the chunk count and
/// stay in lockstep. A range with `start == end` is suppressed: its bytes
/// were absorbed by an earlier chunk and it must never reach the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    starts: Vec<usize>,
    ends: Vec<usize>,
}

impl ChunkPlan {
    /// Number of chunk slots, including suppressed ones.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Boundaries of one chunk as `(start, end)`, half-open.
    pub fn get(&self, chunk: usize) -> Option<(usize, usize)> {
        Some((*self.starts.get(chunk)?, *self.ends.get(chunk)?))
    }

    /// Non-empty ranges with their chunk ids, in buffer order.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, std::ops::Range<usize>)> + '_ {
        self.starts
            .iter()
            .zip(self.ends.iter())
            .enumerate()
            .filter(|(_, (s, e))| s != e)
            .map(|(i, (&s, &e))| (i, s..e))
    }
}

/// Compute record-aligned ranges for `data[starting_offset..]`.
///
/// `chunks` is the target partition count; the result has exactly that many
/// slots (at least one), some possibly suppressed. With `quoted_newlines`
/// set, newlines inside quoted fields never become boundaries, and a buffer
/// whose total quote count is odd fails with
/// [`PlanError::UnterminatedQuote`].
pub fn plan(
    data: &[u8],
    starting_offset: usize,
    chunks: usize,
    quoted_newlines: bool,
) -> Result<ChunkPlan, PlanError> {
    let len = data.len();
    let offset = starting_offset.min(len);
    let k = chunks.max(1);
    debug!(
        "planning {} chunk(s) over {} byte(s) (quoted_newlines={})",
        k,
        len - offset,
        quoted_newlines
    );

    let (mut starts, mut ends) = coarse_partition(len, offset, k);

    if quoted_newlines {
        refine_quoted(data, &mut starts, &mut ends)?;
    } else {
        refine_unquoted(data, &mut starts, &mut ends);
    }

    Ok(ChunkPlan { starts, ends })
}

/// Near-equal contiguous split of `[offset, len)` into `k` slots. The last
/// slot absorbs the integer-division remainder.
fn coarse_partition(len: usize, offset: usize, k: usize) -> (Vec<usize>, Vec<usize>) {
    let chunk_size = (len - offset) / k;
    let mut starts = Vec::with_capacity(k);
    let mut ends = Vec::with_capacity(k);

    let mut start = offset;
    for i in 0..k {
        let end = if i == k - 1 {
            len
        } else {
            len.min(start + chunk_size)
        };
        starts.push(start);
        ends.push(end);
        start = end;
    }
    (starts, ends)
}

/// Quoting disabled: every newline is a record boundary, so each chunk just
/// extends to the nearest one at or past its last coarse byte.
fn refine_unquoted(data: &[u8], starts: &mut [usize], ends: &mut [usize]) {
    let len = data.len();
    let k = starts.len();

    for i in 0..k {
        if starts[i] == ends[i] {
            continue;
        }

        // The chunk's last byte may already be a newline; start the search
        // there so an aligned coarse boundary is kept as-is.
        let mut p = ends[i] - 1;
        while p < len && data[p] != b'\n' {
            p += 1;
        }
        let new_end = if p < len { p + 1 } else { len };
        ends[i] = new_end;

        for j in i + 1..k {
            if ends[j] <= new_end {
                // Fully absorbed by the extension.
                starts[j] = 0;
                ends[j] = 0;
            } else if starts[j] < new_end {
                starts[j] = new_end;
            }
        }
    }
}

/// Quoting enabled: prescan all coarse chunks in parallel, then stitch the
/// summaries sequentially. The prescans touch disjoint memory and join
/// before any boundary moves.
fn refine_quoted(
    data: &[u8],
    starts: &mut [usize],
    ends: &mut [usize],
) -> Result<(), PlanError> {
    let prescans: Vec<Prescan> = starts
        .par_iter()
        .zip(ends.par_iter())
        .map(|(&s, &e)| prescan_range(data, s, e))
        .collect();

    stitch::stitch(starts, ends, &prescans, data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Union of non-empty ranges must be [offset, len) with no gaps or
    /// overlaps.
    fn assert_coverage(plan: &ChunkPlan, offset: usize, len: usize) {
        let mut pos = offset;
        for (i, r) in plan.ranges() {
            assert_eq!(r.start, pos, "gap or overlap before chunk {i}");
            assert!(r.start < r.end);
            pos = r.end;
        }
        assert_eq!(pos, len, "ranges do not reach the end of the buffer");
    }

    #[test]
    fn test_plan_unquoted_splits_at_newline() {
        // Scenario A
        let data = b"a,b\nc,d\n";
        let plan = plan(data, 0, 2, false).unwrap();
        assert_eq!(plan.get(0), Some((0, 4)));
        assert_eq!(plan.get(1), Some((4, 8)));
        assert_coverage(&plan, 0, data.len());
    }

    #[test]
    fn test_plan_quoted_newline_not_a_boundary() {
        // Scenario B
        let data = b"a,\"b\nc\",d\n";
        let p = plan(data, 0, 2, true).unwrap();
        let ranges: Vec<_> = p.ranges().collect();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].1, 0..10);
    }

    #[test]
    fn test_plan_unterminated_quote() {
        // Scenario C, across several chunk counts
        let data = b"a,\"unterminated\n";
        for k in [1, 2, 3, 8, 64] {
            let err = plan(data, 0, k, true).unwrap_err();
            assert!(matches!(err, PlanError::UnterminatedQuote { .. }), "k={k}");
        }
    }

    #[test]
    fn test_plan_empty_buffer() {
        // Scenario D
        for k in [1, 2, 7] {
            let p = plan(b"", 0, k, true).unwrap();
            assert_eq!(p.len(), k);
            assert_eq!(p.ranges().count(), 0);
        }
    }

    #[test]
    fn test_plan_zero_chunks_treated_as_one() {
        let data = b"a,b\n";
        let p = plan(data, 0, 0, true).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p.get(0), Some((0, 4)));
    }

    #[test]
    fn test_plan_unquoted_no_trailing_newline() {
        let data = b"a,b\nc,d";
        let p = plan(data, 0, 2, false).unwrap();
        assert_coverage(&p, 0, data.len());
    }

    #[test]
    fn test_plan_unquoted_chunk_absorbs_followers() {
        // One long line: chunk 0 swallows everything.
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaa\n";
        let p = plan(data, 0, 4, false).unwrap();
        assert_eq!(p.get(0), Some((0, data.len())));
        assert_eq!(p.ranges().count(), 1);
        assert_coverage(&p, 0, data.len());
    }

    #[test]
    fn test_plan_starting_offset() {
        let data = b"skipme\na,b\nc,d\n";
        let p = plan(data, 7, 2, true).unwrap();
        assert_coverage(&p, 7, data.len());
        let first = p.ranges().next().unwrap();
        assert_eq!(first.1.start, 7);
    }

    #[test]
    fn test_plan_offset_past_end_is_clamped() {
        let p = plan(b"abc", 10, 2, false).unwrap();
        assert_eq!(p.ranges().count(), 0);
    }

    #[test]
    fn test_plan_coverage_many_k() {
        let mut data = Vec::new();
        for i in 0..50 {
            data.extend_from_slice(format!("row{i},\"multi\nline {i}\",tail\n").as_bytes());
        }
        for k in 1..=17 {
            let p = plan(&data, 0, k, true).unwrap();
            assert_coverage(&p, 0, data.len());
        }
    }

    #[test]
    fn test_plan_boundaries_have_even_quote_parity() {
        // Parity invariant: a sequential scan up to any range start must
        // leave the scanner outside a quoted field.
        let data = b"a,\"x\ny\",b\n\"p\",q\nr,\"s\"\"t\"\nu,v\n";
        for k in 1..=10 {
            let p = plan(data, 0, k, true).unwrap();
            for (_, r) in p.ranges() {
                let quotes = data[..r.start].iter().filter(|&&b| b == b'"').count();
                assert_eq!(quotes % 2, 0, "k={k} boundary {} inside quotes", r.start);
            }
        }
    }

    #[test]
    fn test_plan_quote_safety_embedded_newline() {
        // No boundary may fall strictly inside the quoted field, whatever K.
        let data = b"head,1\na,\"long\nquoted\nfield\",z\ntail,2\n";
        let field_start = 9; // opening quote of the multi-line field
        let field_end = 28; // closing quote
        for k in 1..=12 {
            let p = plan(data, 0, k, true).unwrap();
            for (_, r) in p.ranges() {
                assert!(
                    r.start <= field_start || r.start > field_end,
                    "k={k}: boundary {} inside quoted field",
                    r.start
                );
            }
            assert_coverage(&p, 0, data.len());
        }
    }
}
