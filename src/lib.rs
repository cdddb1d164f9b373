// stitchcsv - parallel CSV parsing with record-aligned chunk planning
//
// Pipeline:
// 1. Plan: split the buffer into K near-equal coarse ranges, then move each
//    boundary to a true record boundary. With quoted newlines enabled this
//    takes a parallel quote prescan plus a sequential stitch; otherwise a
//    forward newline search suffices.
// 2. Parse: run the sequential record grammar over each finalized range on
//    rayon workers, then merge results back into buffer order by chunk id.
//
// The input buffer is immutable and shared by all workers; output order is
// always identical to a single-threaded parse of the whole buffer.

pub mod error;
pub mod grammar;
pub mod parallel;
pub mod plan;

pub use error::{ChunkError, Error, ParseErrors, PlanError, RecordError};
pub use grammar::{parse_range, FieldCount, GrammarConfig, Record};
pub use parallel::{parse_chunks, parse_records, ChunkRecords};
pub use plan::{plan, ChunkPlan};

/// The quote character. Single-character RFC-style quoting only; `""`
/// inside a quoted field is a literal quote.
pub(crate) const QUOTE: u8 = b'"';

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// High-level reader: plans boundaries and parses chunks in one call.
///
/// ```
/// use stitchcsv::ConcurrentReader;
///
/// let data = b"a,\"b\nc\",d\nx,y,z\n";
/// let records = ConcurrentReader::new().read_records(data).unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0][1], b"b\nc".to_vec());
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrentReader {
    grammar: GrammarConfig,
    chunks: Option<usize>,
    quoted_newlines: bool,
}

impl ConcurrentReader {
    pub fn new() -> Self {
        ConcurrentReader {
            grammar: GrammarConfig::default(),
            chunks: None,
            quoted_newlines: true,
        }
    }

    /// Target chunk count. Defaults to the available core count, resolved
    /// when a read call runs.
    pub fn chunks(mut self, chunks: usize) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Disable quoted-newline handling. Planning degrades to a plain
    /// newline search, which is faster but corrupts records if any quoted
    /// field contains a literal newline.
    pub fn quoted_newlines(mut self, enabled: bool) -> Self {
        self.quoted_newlines = enabled;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.grammar.delimiter = delimiter;
        self
    }

    pub fn comment(mut self, comment: u8) -> Self {
        self.grammar.comment = Some(comment);
        self
    }

    pub fn field_count(mut self, field_count: FieldCount) -> Self {
        self.grammar.field_count = field_count;
        self
    }

    pub fn lazy_quotes(mut self, lazy: bool) -> Self {
        self.grammar.lazy_quotes = lazy;
        self
    }

    pub fn trim_leading_space(mut self, trim: bool) -> Self {
        self.grammar.trim_leading_space = trim;
        self
    }

    fn chunk_count(&self) -> usize {
        self.chunks.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        })
    }

    /// Parse `data`, returning one record set per non-empty chunk, ordered
    /// by chunk id. Grouping avoids one large reallocation when the caller
    /// consumes chunks independently.
    pub fn read_all(&self, data: &[u8]) -> Result<Vec<ChunkRecords>, Error> {
        let plan = plan::plan(data, 0, self.chunk_count(), self.quoted_newlines)?;
        Ok(parallel::parse_chunks(data, &plan, &self.grammar)?)
    }

    /// Parse `data` into one flattened record sequence in buffer order.
    pub fn read_records(&self, data: &[u8]) -> Result<Vec<Record>, Error> {
        let plan = plan::plan(data, 0, self.chunk_count(), self.quoted_newlines)?;
        Ok(parallel::parse_records(data, &plan, &self.grammar)?)
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_quoted_newline() {
        // Scenario B end to end.
        let records = ConcurrentReader::new()
            .chunks(2)
            .read_records(b"a,\"b\nc\",d\n")
            .unwrap();
        assert_eq!(
            records,
            vec![vec![b"a".to_vec(), b"b\nc".to_vec(), b"d".to_vec()]]
        );
    }

    #[test]
    fn test_reader_unquoted_split() {
        // Scenario A end to end.
        let sets = ConcurrentReader::new()
            .chunks(2)
            .quoted_newlines(false)
            .read_all(b"a,b\nc,d\n")
            .unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].records, vec![vec![b"a".to_vec(), b"b".to_vec()]]);
        assert_eq!(sets[1].records, vec![vec![b"c".to_vec(), b"d".to_vec()]]);
    }

    #[test]
    fn test_reader_unterminated_quote() {
        let err = ConcurrentReader::new()
            .chunks(3)
            .read_records(b"a,\"unterminated\n")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Plan(PlanError::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn test_reader_empty_input() {
        let records = ConcurrentReader::new().read_records(b"").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_reader_semicolon_delimiter() {
        let records = ConcurrentReader::new()
            .chunks(2)
            .delimiter(b';')
            .read_records(b"a;b\nc;d\n")
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_reader_default_chunks_uses_cores() {
        // Just exercises the default path; the count itself is host-defined.
        let records = ConcurrentReader::new().read_records(b"a,b\n").unwrap();
        assert_eq!(records.len(), 1);
    }
}
