// Boundary stitching: the sequential half of quoted-newline planning.
//
// Walks the coarse chunks left to right, carrying cumulative quote parity,
// and picks the authoritative newline candidate for each boundary. O(K) on
// top of the parallel prescans.

use crate::error::PlanError;
use crate::plan::prescan::Prescan;

/// Resolve coarse chunk boundaries into record-aligned ones, in place.
///
/// `starts`/`ends` hold the half-open coarse ranges; `prescans` their scan
/// summaries, both indexed by chunk id. On success every non-empty range
/// ends one past an unquoted newline (or at `len`). Chunks absorbed into a
/// predecessor are collapsed to `(0, 0)`.
///
/// Parity is tested before a chunk's own quotes are folded in: even parity
/// at a chunk's start means its begins-outside newline candidate is the
/// true one, odd parity selects the begins-inside candidate.
pub fn stitch(
    starts: &mut [usize],
    ends: &mut [usize],
    prescans: &[Prescan],
    len: usize,
) -> Result<(), PlanError> {
    debug_assert_eq!(starts.len(), ends.len());
    debug_assert_eq!(starts.len(), prescans.len());
    let k = starts.len();

    // Cumulative quote count through the coarse end of chunk `counted - 1`.
    // The watermark guarantees each chunk is folded in exactly once, even
    // when the cursor jumps over empty chunks.
    let mut quotes_so_far: u64 = 0;
    let mut counted = 0usize;
    let count_through = |watermark: &mut usize, total: &mut u64, chunk: usize| {
        while *watermark <= chunk {
            *total += prescans[*watermark].quotes;
            *watermark += 1;
        }
    };

    let mut cur = 0usize;
    let mut next = 1usize;
    while cur < k {
        if starts[cur] == ends[cur] {
            // Empty chunk: zero bytes, zero quotes. Normalize and move on.
            starts[cur] = 0;
            ends[cur] = 0;
            count_through(&mut counted, &mut quotes_so_far, cur);
            cur += 1;
            next = cur + 1;
            continue;
        }

        count_through(&mut counted, &mut quotes_so_far, cur);
        let outside = quotes_so_far % 2 == 0;

        if next >= k {
            if outside {
                // Final record runs to the end of the buffer.
                ends[cur] = len;
                return Ok(());
            }
            return Err(PlanError::UnterminatedQuote {
                quotes: quotes_so_far,
            });
        }

        let candidate = if outside {
            prescans[next].first_unquoted_newline
        } else {
            prescans[next].first_quoted_newline
        };
        count_through(&mut counted, &mut quotes_so_far, next);

        match candidate {
            Some(p) => {
                // Boundary lands just past the newline; the next chunk picks
                // up at the same offset so no byte is dropped or repeated.
                ends[cur] = p + 1;
                starts[next] = ends[next].min(p + 1);
                cur = next;
                next += 1;
            }
            None => {
                // No usable newline anywhere in `next`: absorb it whole and
                // keep looking one chunk further.
                ends[cur] = ends[next];
                starts[next] = 0;
                ends[next] = 0;
                next += 1;
            }
        }
    }

    Ok(())
}
