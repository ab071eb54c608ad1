use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::records::{format_size, ParsedRecords, Record, RecordParser, SizeField, UNKNOWN};

/// Field prefixes of a `/firmware/all` record, in match priority order.
pub const PACKAGE_FIELDS: &[&str] = &[
    "Filename:",
    "Size:",
    "Version:",
    "Board:",
    "Build Date:",
    "Description:",
    "Modified:",
];

/// Field prefixes of a `/firmware/package/info` response.
pub const PACKAGE_INFO_FIELDS: &[&str] = &[
    "Package:",
    "Size:",
    "Modified:",
    "Type:",
    "Version:",
    "Description:",
    "Build Date:",
    "Board:",
    "Features:",
];

/// Body prefix the device uses when an info request names a missing package.
pub const PACKAGE_NOT_FOUND_MARKER: &str = "Firmware package not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwarePackageRecord {
    pub filename: String,
    pub size: SizeField,
    pub version: String,
    pub board: String,
    pub build_date: String,
    pub description: String,
    pub modified: String,
}

impl FirmwarePackageRecord {
    pub fn from_record(record: &Record) -> Self {
        Self {
            filename: record.get_or_unknown("Filename"),
            size: record
                .get("Size")
                .map(SizeField::parse)
                .unwrap_or(SizeField::Unknown),
            version: record.get_or_unknown("Version"),
            board: record.get_or_unknown("Board"),
            build_date: record.get_or_unknown("Build Date"),
            description: record.get_or_unknown("Description"),
            modified: record.get_or_unknown("Modified"),
        }
    }

    pub fn display_size(&self) -> String {
        format_size(self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    /// The device reported that it stores no packages.
    Empty,
    Populated,
}

/// Point-in-time view of the packages stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub packages: Vec<FirmwarePackageRecord>,
    pub fetched_at: DateTime<Utc>,
    pub state: CatalogState,
}

impl CatalogSnapshot {
    /// Builds a snapshot from a `/firmware/all` body.
    pub fn parse(body: &str, fetched_at: DateTime<Utc>) -> Self {
        match RecordParser::new(PACKAGE_FIELDS).parse(body) {
            ParsedRecords::Empty => Self {
                packages: Vec::new(),
                fetched_at,
                state: CatalogState::Empty,
            },
            ParsedRecords::Records(records) => Self {
                packages: records
                    .iter()
                    .map(FirmwarePackageRecord::from_record)
                    .collect(),
                fetched_at,
                state: CatalogState::Populated,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.packages.iter().any(|p| p.filename == filename)
    }

    /// Packages in table order: board ascending, newest version first within a board.
    pub fn sorted_for_display(&self) -> Vec<&FirmwarePackageRecord> {
        let mut rows: Vec<_> = self.packages.iter().collect();
        rows.sort_by(|a, b| {
            a.board
                .cmp(&b.board)
                .then_with(|| compare_versions(&b.version, &a.version))
        });
        rows
    }
}

/// Compares dotted versions part by part.
///
/// Each part ranks by its leading number, then a bare number above one with a
/// suffix (`1.1` > `1.1rc1`), then the suffix text. Parts without any leading
/// digits rank below numeric ones, so `Unknown` sorts under every release.
/// The result is a total order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    version_key(a).cmp(&version_key(b))
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct VersionPart<'a> {
    numeric: bool,
    number: u64,
    release: bool,
    suffix: &'a str,
}

fn version_key(version: &str) -> Vec<VersionPart<'_>> {
    let trimmed = version.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('.').map(version_part).collect()
}

fn version_part(part: &str) -> VersionPart<'_> {
    let digits = part.len() - part.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let (number, suffix) = part.split_at(digits);
    VersionPart {
        numeric: digits > 0,
        number: number.parse().unwrap_or(if digits > 0 { u64::MAX } else { 0 }),
        release: suffix.is_empty(),
        suffix,
    }
}

/// Detail view of a single stored package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub filename: String,
    pub size: SizeField,
    pub modified: String,
    pub kind: String,
    pub version: String,
    pub description: String,
    pub build_date: String,
    pub board: String,
    pub features: Vec<String>,
}

impl PackageInfo {
    /// Parses an info body; `None` when the device says the package does not exist.
    pub fn parse(filename: &str, body: &str) -> Option<Self> {
        if body.trim_start().starts_with(PACKAGE_NOT_FOUND_MARKER) {
            return None;
        }
        let record = RecordParser::new(PACKAGE_INFO_FIELDS).parse_record(body);
        let features = record
            .get("Features")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            filename: record
                .get("Package")
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| filename.to_string()),
            size: record
                .get("Size")
                .map(SizeField::parse)
                .unwrap_or(SizeField::Unknown),
            modified: record.get_or_unknown("Modified"),
            kind: record.get_or_unknown("Type"),
            version: record.get_or_unknown("Version"),
            description: record.get_or_unknown("Description"),
            build_date: record.get_or_unknown("Build Date"),
            board: record.get_or_unknown("Board"),
            features,
        })
    }

    pub fn has_metadata(&self) -> bool {
        self.version != UNKNOWN || self.description != UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn device_listing_becomes_typed_records() {
        let body = "Filename: firmware-v1.0.1.bin\nSize: 30720 bytes\nModified: 1700000000\n\
                    Version: 1.0.1\nDescription: LED driver\nBuild Date: 2024-05-01\nBoard: ATtiny1616\n\
                    \n---\n\
                    Filename: firmware.bin\nSize: 512 bytes\nModified: 1700000001\n";
        let snapshot = CatalogSnapshot::parse(body, at());

        assert_eq!(snapshot.state, CatalogState::Populated);
        assert_eq!(snapshot.len(), 2);
        let first = &snapshot.packages[0];
        assert_eq!(first.filename, "firmware-v1.0.1.bin");
        assert_eq!(first.display_size(), "30.0 KB");
        assert_eq!(first.board, "ATtiny1616");
        assert_eq!(first.build_date, "2024-05-01");
        let second = &snapshot.packages[1];
        assert_eq!(second.display_size(), "512 B");
        assert_eq!(second.version, "Unknown");
        assert_eq!(second.board, "Unknown");
    }

    #[test]
    fn sentinel_maps_to_explicit_empty_state() {
        let snapshot = CatalogSnapshot::parse("No firmware packages found", at());
        assert_eq!(snapshot.state, CatalogState::Empty);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn versions_compare_numerically() {
        assert_eq!(compare_versions("1.10.0", "1.9.3"), Ordering::Greater);
        assert_eq!(compare_versions("v2.0", "2.0"), Ordering::Equal);
        assert_eq!(compare_versions("Unknown", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.1", "1.1rc1"), Ordering::Greater);
        assert_eq!(compare_versions("1.1x", "1.10"), Ordering::Less);
    }

    #[test]
    fn mixed_versions_form_a_total_order() {
        let versions = [
            "1.2", "1.1rc1", "1.10", "1.1-beta", "Unknown", "1.1x", "2.0", "v1.9", "", "1.1",
        ];
        for a in versions {
            assert_eq!(compare_versions(a, a), Ordering::Equal, "{a}");
            for b in versions {
                assert_eq!(
                    compare_versions(a, b),
                    compare_versions(b, a).reverse(),
                    "{a} vs {b}"
                );
                for c in versions {
                    if compare_versions(a, b) != Ordering::Greater
                        && compare_versions(b, c) != Ordering::Greater
                    {
                        assert_ne!(compare_versions(a, c), Ordering::Greater, "{a} {b} {c}");
                    }
                }
            }
        }

        let mut sorted = versions.to_vec();
        sorted.sort_by(|a, b| compare_versions(b, a));
        assert_eq!(
            sorted,
            vec!["2.0", "1.10", "v1.9", "1.2", "1.1", "1.1x", "1.1rc1", "1.1-beta", "Unknown", ""]
        );
    }

    #[test]
    fn info_parses_feature_list() {
        let body = "Package: fw.bin\nSize: 2048 bytes\nType: Firmware Package (.bin)\n\
                    Version: 1.2.0\nFeatures: LED control, I2C slave ,\n";
        let info = PackageInfo::parse("fw.bin", body).unwrap();
        assert_eq!(info.features, vec!["LED control", "I2C slave"]);
        assert_eq!(info.size, SizeField::Bytes(2048));
        assert!(info.has_metadata());
    }

    #[test]
    fn info_not_found_marker_yields_none() {
        assert_eq!(
            PackageInfo::parse("gone.bin", "Firmware package not found: gone.bin"),
            None
        );
    }
}
