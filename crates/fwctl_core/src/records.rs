//! Parsing of the device's `Key: value` plain-text responses.
//!
//! Nothing outside this module and the typed constructors built on it should
//! look at raw response text.

use std::collections::BTreeMap;

use fwctl_logging::{fwctl_debug, fwctl_trace};

/// Literal the device answers with when its package store is empty.
pub const NO_PACKAGES_SENTINEL: &str = "No firmware packages found";
/// Separator between records in multi-record responses.
pub const RECORD_DELIMITER: &str = "---";
/// Placeholder for fields the device did not report.
pub const UNKNOWN: &str = "Unknown";

/// One parsed record, keyed by field name (the prefix without its colon).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Value of `field`, or `"Unknown"` when the line was absent.
    pub fn get_or_unknown(&self, field: &str) -> String {
        match self.get(field) {
            Some(value) => value.to_string(),
            None => {
                fwctl_debug!("record has no {:?} line, using {}", field, UNKNOWN);
                UNKNOWN.to_string()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRecords {
    /// The body carried the empty-store sentinel.
    Empty,
    Records(Vec<Record>),
}

impl ParsedRecords {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            ParsedRecords::Empty => Vec::new(),
            ParsedRecords::Records(records) => records,
        }
    }
}

/// Splits responses into records and picks out recognised `Prefix:` lines.
///
/// Prefixes are tried in the order given; the first that matches a line wins.
#[derive(Debug, Clone, Copy)]
pub struct RecordParser<'a> {
    prefixes: &'a [&'a str],
}

impl<'a> RecordParser<'a> {
    pub fn new(prefixes: &'a [&'a str]) -> Self {
        Self { prefixes }
    }

    pub fn parse(&self, raw: &str) -> ParsedRecords {
        if raw.contains(NO_PACKAGES_SENTINEL) {
            return ParsedRecords::Empty;
        }

        let blocks: Vec<&str> = if raw.contains(RECORD_DELIMITER) {
            raw.split(RECORD_DELIMITER).collect()
        } else {
            vec![raw]
        };

        let records = blocks
            .into_iter()
            .filter(|block| !block.trim().is_empty())
            .map(|block| self.parse_record(block))
            .collect();
        ParsedRecords::Records(records)
    }

    /// Parses `raw` as a single record, ignoring delimiters and sentinels.
    pub fn parse_record(&self, raw: &str) -> Record {
        let mut record = Record::default();
        for line in raw.lines().map(str::trim) {
            let matched = self
                .prefixes
                .iter()
                .find_map(|prefix| line.strip_prefix(prefix).map(|rest| (*prefix, rest)));
            match matched {
                Some((prefix, rest)) => {
                    let key = prefix.trim_end_matches(':').trim();
                    record
                        .fields
                        .insert(key.to_string(), rest.trim().to_string());
                }
                None if !line.is_empty() => {
                    fwctl_trace!("ignoring unrecognised line {:?}", line);
                }
                None => {}
            }
        }
        record
    }
}

/// Best-effort byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeField {
    Bytes(u64),
    Unknown,
}

impl SizeField {
    /// Accepts `"2048"` as well as the device's `"2048 bytes"` form.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let number = raw
            .strip_suffix("bytes")
            .or_else(|| raw.strip_suffix('B'))
            .unwrap_or(raw)
            .trim();
        match number.parse::<u64>() {
            Ok(value) => SizeField::Bytes(value),
            Err(_) => {
                fwctl_debug!("size {:?} is not numeric", raw);
                SizeField::Unknown
            }
        }
    }

    pub fn bytes(self) -> Option<u64> {
        match self {
            SizeField::Bytes(value) => Some(value),
            SizeField::Unknown => None,
        }
    }
}

/// Renders a size the way the firmware table shows it.
pub fn format_size(size: SizeField) -> String {
    match size {
        SizeField::Bytes(value) if value > 1024 => format!("{:.1} KB", value as f64 / 1024.0),
        SizeField::Bytes(value) => format!("{value} B"),
        SizeField::Unknown => UNKNOWN.to_string(),
    }
}
