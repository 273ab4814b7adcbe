use std::io::BufRead;
use std::path::Path;

use tracing::{debug, info};

use crate::input::gz::open_maybe_gz;
use crate::regulon::{Confidence, InteractionRecord, RegulonError};

#[derive(Debug, Clone, Copy)]
struct Columns {
    tf: usize,
    target: usize,
    mor: usize,
    likelihood: usize,
    confidence: Option<usize>,
}

/// Reads a delimited interaction table (tab or comma separated, optionally
/// gzipped) with a header naming `tf`, `target`, `mor`, `likelihood` and,
/// optionally, `confidence`.
pub fn read_interactions(path: &Path) -> Result<Vec<InteractionRecord>, RegulonError> {
    let reader = open_maybe_gz(path)?;
    let records = parse_interactions(reader)?;
    info!(
        path = %path.display(),
        n_interactions = records.len(),
        "interaction table loaded"
    );
    Ok(records)
}

pub fn parse_interactions<R: BufRead>(reader: R) -> Result<Vec<InteractionRecord>, RegulonError> {
    let mut lines = reader.lines();

    let header = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => {
                return Err(RegulonError::Parse {
                    line: 1,
                    msg: "interaction table is empty".to_string(),
                });
            }
        }
    };
    let delim = if header.contains('\t') { '\t' } else { ',' };
    let header_fields = split_fields(&header, delim);
    let columns = resolve_columns(&header_fields)?;
    debug!(?delim, ?columns, "interaction table header resolved");

    let mut records = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line_no = idx + 2;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(&line, delim);
        records.push(parse_record(&fields, columns, line_no)?);
    }
    Ok(records)
}

fn resolve_columns(header: &[String]) -> Result<Columns, RegulonError> {
    let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
    Ok(Columns {
        tf: find("tf").ok_or(RegulonError::MissingColumn("tf"))?,
        target: find("target").ok_or(RegulonError::MissingColumn("target"))?,
        mor: find("mor").ok_or(RegulonError::MissingColumn("mor"))?,
        likelihood: find("likelihood").ok_or(RegulonError::MissingColumn("likelihood"))?,
        confidence: find("confidence"),
    })
}

fn parse_record(
    fields: &[String],
    columns: Columns,
    line: usize,
) -> Result<InteractionRecord, RegulonError> {
    let tf = field(fields, columns.tf, "tf", line)?;
    let target = field(fields, columns.target, "target", line)?;
    if tf.is_empty() || target.is_empty() {
        return Err(RegulonError::Parse {
            line,
            msg: "empty tf or target".to_string(),
        });
    }
    let mor = parse_number(field(fields, columns.mor, "mor", line)?, "mor", line)?;
    let likelihood = parse_number(
        field(fields, columns.likelihood, "likelihood", line)?,
        "likelihood",
        line,
    )?;
    let confidence = match columns.confidence {
        Some(idx) => {
            let raw = field(fields, idx, "confidence", line)?;
            Some(
                raw.parse::<Confidence>()
                    .map_err(|msg| RegulonError::Parse { line, msg })?,
            )
        }
        None => None,
    };

    Ok(InteractionRecord {
        tf: tf.to_string(),
        target: target.to_string(),
        mor,
        confidence,
        likelihood,
    })
}

fn field<'a>(
    fields: &'a [String],
    idx: usize,
    name: &str,
    line: usize,
) -> Result<&'a str, RegulonError> {
    fields
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| RegulonError::Parse {
            line,
            msg: format!("missing '{name}' field"),
        })
}

fn parse_number(raw: &str, name: &str, line: usize) -> Result<f32, RegulonError> {
    raw.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RegulonError::Parse {
            line,
            msg: format!("'{name}' is not a finite number: '{raw}'"),
        })
}

/// Splits a line and strips surrounding quotes, as written by R's `write.csv`.
fn split_fields(line: &str, delim: char) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split(delim)
        .map(|f| f.trim().trim_matches('"').trim().to_string())
        .collect()
}
