// Sequential record grammar.
//
// Turns one record-aligned byte range into records of owned fields. Quote
// handling follows RFC 4180: a field starting with `"` runs until the
// closing quote, `""` unescapes to `"`, and newlines inside quotes are
// data. The range itself is produced by the planner, so it always starts on
// a record boundary; the grammar is still usable standalone on a whole
// buffer.

use crate::error::RecordError;
use crate::QUOTE;

/// One parsed record: fields in order, owned bytes.
pub type Record = Vec<Vec<u8>>;

/// Expected number of fields per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldCount {
    /// Every record must have exactly this many fields.
    Exactly(usize),
    /// Inferred from the first record parsed, then enforced. Each parse
    /// worker infers from the first record of its own range.
    #[default]
    FromFirstRecord,
    /// No check; records may be ragged.
    Variable,
}

/// Pass-through configuration for the record grammar.
#[derive(Debug, Clone)]
pub struct GrammarConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Lines whose first byte (no preceding whitespace) is this character
    /// are skipped entirely.
    pub comment: Option<u8>,
    pub field_count: FieldCount,
    /// Tolerate bare quotes in fields and a missing closing quote at the
    /// end of input.
    pub lazy_quotes: bool,
    /// Strip ASCII space and tab at the start of each field. Never strips
    /// the delimiter byte itself.
    pub trim_leading_space: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            delimiter: b',',
            comment: None,
            field_count: FieldCount::default(),
            lazy_quotes: false,
            trim_leading_space: false,
        }
    }
}

/// How the field that just ended was terminated.
enum Terminator {
    Delimiter,
    Newline,
    Eof,
}

/// Parse every record in `data`.
///
/// Records end at `\n` (a `\r` immediately before it is stripped outside
/// quotes); empty lines and comment lines produce no record. Returns the
/// first malformed record as an error.
pub fn parse_range(data: &[u8], config: &GrammarConfig) -> Result<Vec<Record>, RecordError> {
    let len = data.len();
    let mut records = Vec::new();
    let mut expected = match config.field_count {
        FieldCount::Exactly(n) => Some(n),
        _ => None,
    };

    let mut pos = 0;
    let mut line = 1usize;

    while pos < len {
        // Blank lines carry no record.
        if data[pos] == b'\n' {
            pos += 1;
            line += 1;
            continue;
        }
        if data[pos] == b'\r' && pos + 1 < len && data[pos + 1] == b'\n' {
            pos += 2;
            line += 1;
            continue;
        }
        if let Some(c) = config.comment {
            if data[pos] == c {
                while pos < len && data[pos] != b'\n' {
                    pos += 1;
                }
                if pos < len {
                    pos += 1;
                    line += 1;
                }
                continue;
            }
        }

        let record_line = line;
        let mut fields: Record = Vec::with_capacity(8);

        loop {
            if config.trim_leading_space {
                while pos < len
                    && (data[pos] == b' ' || data[pos] == b'\t')
                    && data[pos] != config.delimiter
                {
                    pos += 1;
                }
            }

            let term = if pos < len && data[pos] == QUOTE {
                pos += 1;
                let (field, term) = read_quoted_field(data, &mut pos, &mut line, config)?;
                fields.push(field);
                term
            } else {
                let (field, term) = read_unquoted_field(data, &mut pos, &mut line, config)?;
                fields.push(field);
                term
            };

            match term {
                Terminator::Delimiter => continue,
                Terminator::Newline | Terminator::Eof => break,
            }
        }

        match config.field_count {
            FieldCount::Exactly(_) | FieldCount::FromFirstRecord => match expected {
                Some(n) if fields.len() != n => {
                    return Err(RecordError::FieldCount {
                        line: record_line,
                        expected: n,
                        got: fields.len(),
                    });
                }
                Some(_) => {}
                None => expected = Some(fields.len()),
            },
            FieldCount::Variable => {}
        }
        records.push(fields);
    }

    Ok(records)
}

/// Field body after an opening quote. Leaves `pos` past the terminator.
fn read_quoted_field(
    data: &[u8],
    pos: &mut usize,
    line: &mut usize,
    config: &GrammarConfig,
) -> Result<(Vec<u8>, Terminator), RecordError> {
    let len = data.len();
    let mut buf = Vec::new();

    loop {
        if *pos >= len {
            // Input stops inside the quotes. The planner rejects such
            // buffers before parsing, but standalone callers can hit it.
            if config.lazy_quotes {
                return Ok((buf, Terminator::Eof));
            }
            return Err(RecordError::UnterminatedField { line: *line });
        }
        let b = data[*pos];
        if b != QUOTE {
            if b == b'\n' {
                *line += 1;
            }
            buf.push(b);
            *pos += 1;
            continue;
        }

        // Doubled quote is a literal quote.
        if *pos + 1 < len && data[*pos + 1] == QUOTE {
            buf.push(QUOTE);
            *pos += 2;
            continue;
        }

        // Closing quote: only delimiter, end of line, or end of input may
        // follow.
        *pos += 1;
        if *pos >= len {
            return Ok((buf, Terminator::Eof));
        }
        let after = data[*pos];
        if after == config.delimiter {
            *pos += 1;
            return Ok((buf, Terminator::Delimiter));
        }
        if after == b'\n' {
            *pos += 1;
            *line += 1;
            return Ok((buf, Terminator::Newline));
        }
        if after == b'\r' && *pos + 1 < len && data[*pos + 1] == b'\n' {
            *pos += 2;
            *line += 1;
            return Ok((buf, Terminator::Newline));
        }
        if config.lazy_quotes {
            // The quote was literal data; stay inside the field.
            buf.push(QUOTE);
            continue;
        }
        return Err(RecordError::Quote { line: *line });
    }
}

/// Field body with no opening quote. Leaves `pos` past the terminator.
fn read_unquoted_field(
    data: &[u8],
    pos: &mut usize,
    line: &mut usize,
    config: &GrammarConfig,
) -> Result<(Vec<u8>, Terminator), RecordError> {
    let len = data.len();
    let start = *pos;
    let mut saw_quote = false;

    while *pos < len {
        let b = data[*pos];
        if b == config.delimiter || b == b'\n' {
            break;
        }
        if b == QUOTE {
            saw_quote = true;
        }
        *pos += 1;
    }
    if saw_quote && !config.lazy_quotes {
        return Err(RecordError::BareQuote { line: *line });
    }

    let mut end = *pos;
    let term = if *pos >= len {
        Terminator::Eof
    } else if data[*pos] == config.delimiter {
        *pos += 1;
        Terminator::Delimiter
    } else {
        // Record terminator; drop a CR that belongs to a CRLF pair.
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }
        *pos += 1;
        *line += 1;
        Terminator::Newline
    };

    Ok((data[start..end].to_vec(), term))
}
