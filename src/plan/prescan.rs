// Quote prescan: the fully parallel half of boundary planning.
//
// Each worker scans one coarse range and reports a small fixed-size summary.
// The true quote state at the range's start is unknown until the stitching
// pass accumulates parity from every preceding range, so both newline
// candidates are recorded in the same linear scan.

use crate::QUOTE;

/// What one coarse range looks like to the stitcher.
///
/// `first_unquoted_newline` is the first newline reached assuming the range
/// begins outside a quoted field (even local quote parity);
/// `first_quoted_newline` assumes it begins inside one (odd local parity).
/// Offsets are absolute positions into the shared buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prescan {
    pub quotes: u64,
    pub first_unquoted_newline: Option<usize>,
    pub first_quoted_newline: Option<usize>,
}

/// Scan `data[start..end)` once, tracking both starting-state assumptions.
///
/// A quote toggles the local state; a newline is recorded for whichever
/// assumption currently puts the scanner outside a quoted field, the first
/// time that happens. After both candidates are found the remainder of the
/// range only needs its quotes counted for parity propagation.
pub fn prescan_range(data: &[u8], start: usize, end: usize) -> Prescan {
    let mut quotes: u64 = 0;
    let mut first_unquoted_newline = None;
    let mut first_quoted_newline = None;

    // Local state relative to the start of the range. Even parity here means
    // "outside" under the begins-outside assumption and "inside" under the
    // begins-inside assumption, so one state variable serves both tracks.
    let mut in_quote = false;

    let mut pos = start;
    while pos < end {
        match data[pos] {
            QUOTE => {
                quotes += 1;
                in_quote = !in_quote;
            }
            b'\n' => {
                if !in_quote {
                    if first_unquoted_newline.is_none() {
                        first_unquoted_newline = Some(pos);
                    }
                } else if first_quoted_newline.is_none() {
                    first_quoted_newline = Some(pos);
                }
            }
            _ => {}
        }
        pos += 1;

        if first_unquoted_newline.is_some() && first_quoted_newline.is_some() {
            break;
        }
    }

    // Count-only tail: newline candidates are settled, parity still matters.
    quotes += data[pos..end].iter().filter(|&&b| b == QUOTE).count() as u64;

    Prescan {
        quotes,
        first_unquoted_newline,
        first_quoted_newline,
    }
}
