//! File-name → identity.
//!
//! UKCP18 global files are named
//! `{variable}_{scenario}_land-gcm_global_60km_{member}_{resolution}_{start}-{end}.nc`,
//! e.g. `tasmax_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::ParseError, VARIABLES};

static FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<variable>[^_]+)_(?P<scenario>[^_]+)_land-gcm_global_60km_(?P<member>\d+)_(?P<resolution>[^_]+)_(?P<start>\d{8})-(?P<end>\d{8})\.nc$",
    )
    .expect("filename grammar is a valid regex")
});

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemporalResolution {
    Day,
    Mon,
}

impl TemporalResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Mon => "mon",
        }
    }
}

impl fmt::Display for TemporalResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemporalResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "mon" => Ok(Self::Mon),
            other => Err(other.to_string()),
        }
    }
}

/// Identity of one UKCP18 file, recovered from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub variable: String,
    pub scenario: String,
    pub member_id: u32,
    pub temporal_resolution: TemporalResolution,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Basename the identity was parsed from.
    pub filename: String,
}

impl FileIdentity {
    /// Parse a filename, a filesystem path, or a URL. Only the last path
    /// component is matched against the grammar.
    pub fn parse(path: &str) -> Result<Self, ParseError> {
        let filename = basename(path);
        let caps = FILENAME
            .captures(filename)
            .ok_or_else(|| ParseError::Grammar(filename.to_string()))?;

        let variable = &caps["variable"];
        if !VARIABLES.contains(&variable) {
            return Err(ParseError::UnknownVariable {
                variable: variable.to_string(),
                filename: filename.to_string(),
            });
        }

        let temporal_resolution = caps["resolution"].parse::<TemporalResolution>().map_err(
            |resolution| ParseError::UnknownResolution {
                resolution,
                filename: filename.to_string(),
            },
        )?;

        let member = &caps["member"];
        let member_id = member
            .parse::<u32>()
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| ParseError::Member {
                member: member.to_string(),
                filename: filename.to_string(),
            })?;

        let start = parse_date(&caps["start"], filename)?;
        let end = parse_date(&caps["end"], filename)?;
        if start > end {
            return Err(ParseError::Range {
                start: caps["start"].to_string(),
                end: caps["end"].to_string(),
                filename: filename.to_string(),
            });
        }

        Ok(Self {
            variable: variable.to_string(),
            scenario: caps["scenario"].to_string(),
            member_id,
            temporal_resolution,
            start,
            end,
            filename: filename.to_string(),
        })
    }

    pub fn start_datetime(&self) -> String {
        iso_timestamp(self.start)
    }

    pub fn end_datetime(&self) -> String {
        iso_timestamp(self.end)
    }

    /// Canonical Item id, e.g. `ukcp18-day-rcp26-1-1899-12-01T00:00:00Z-1909-11-30T00:00:00Z`.
    ///
    /// The scenario may itself contain `-`. The resolution comes from a fixed
    /// vocabulary, the member is all digits and both timestamps have a fixed
    /// width, so the id still splits unambiguously from either end and distinct
    /// (resolution, scenario, member, start, end) tuples never collide.
    pub fn item_id(&self) -> String {
        [
            "ukcp18".to_string(),
            self.temporal_resolution.to_string(),
            self.scenario.clone(),
            self.member_id.to_string(),
            self.start_datetime(),
            self.end_datetime(),
        ]
        .join("-")
    }
}

impl FromStr for FileIdentity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Paths bucketed by the Item they belong to.
#[derive(Debug, Default)]
pub struct Grouping {
    pub groups: BTreeMap<String, Vec<String>>,
    pub rejected: Vec<(String, ParseError)>,
}

/// Bucket paths by canonical Item id, keeping the input order inside each
/// group. Paths that do not parse are collected in `rejected`.
pub fn group_by_item<I, S>(paths: I) -> Grouping
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Grouping::default();
    for path in paths {
        let path = path.as_ref();
        match FileIdentity::parse(path) {
            Ok(id) => out.groups.entry(id.item_id()).or_default().push(path.to_string()),
            Err(e) => out.rejected.push((path.to_string(), e)),
        }
    }
    out
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn parse_date(token: &str, filename: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(token, DATE_FORMAT).map_err(|e| ParseError::Date {
        token: token.to_string(),
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

fn iso_timestamp(date: NaiveDate) -> String {
    NaiveDateTime::new(date, NaiveTime::MIN)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "tasmax_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc";

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_bare_filename() {
        let id = FileIdentity::parse(NAME).unwrap();
        assert_eq!(id.variable, "tasmax");
        assert_eq!(id.scenario, "rcp26");
        assert_eq!(id.member_id, 1);
        assert_eq!(id.temporal_resolution, TemporalResolution::Day);
        assert_eq!(id.start, ymd(1899, 12, 1));
        assert_eq!(id.end, ymd(1909, 11, 30));
        assert_eq!(id.filename, NAME);
    }

    #[test]
    fn directory_prefix_is_ignored() {
        let bare = FileIdentity::parse(NAME).unwrap();
        for prefix in ["directory/", "/data/ukcp18/rcp26/01/tasmax/day/", "file:///tmp/"] {
            let with_dir = FileIdentity::parse(&format!("{prefix}{NAME}")).unwrap();
            assert_eq!(with_dir, bare);
        }
    }

    #[test]
    fn monthly_files_parse() {
        let id: FileIdentity = "pr_rcp85_land-gcm_global_60km_15_mon_19001201-20991130.nc"
            .parse()
            .unwrap();
        assert_eq!(id.variable, "pr");
        assert_eq!(id.member_id, 15);
        assert_eq!(id.temporal_resolution, TemporalResolution::Mon);
    }

    #[test]
    fn grammar_violations_are_rejected() {
        for bad in [
            "tasmax_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc4",
            "tasmax_rcp26_land-rcm_uk_12km_01_day_18991201-19091130.nc",
            "tasmax_rcp26_land-gcm_global_60km_01_day_1899120-19091130.nc",
            "tasmax_rcp26_land-gcm_global_60km_xx_day_18991201-19091130.nc",
            "tasmax_land-gcm_global_60km_01_day_18991201-19091130.nc",
            "",
        ] {
            assert!(
                matches!(FileIdentity::parse(bad), Err(ParseError::Grammar(_))),
                "{bad} should not match"
            );
        }
    }

    #[test]
    fn vocabulary_is_enforced() {
        let err = FileIdentity::parse("snow_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownVariable { .. }));

        let err = FileIdentity::parse("tas_rcp26_land-gcm_global_60km_01_1hr_18991201-19091130.nc")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownResolution { .. }));
    }

    #[test]
    fn member_zero_is_rejected() {
        let err = FileIdentity::parse("tas_rcp26_land-gcm_global_60km_00_day_18991201-19091130.nc")
            .unwrap_err();
        assert!(matches!(err, ParseError::Member { .. }));
    }

    #[test]
    fn malformed_dates_are_parse_errors() {
        let err = FileIdentity::parse("tas_rcp26_land-gcm_global_60km_01_day_18991301-19091130.nc")
            .unwrap_err();
        assert!(matches!(err, ParseError::Date { ref token, .. } if token == "18991301"));

        let err = FileIdentity::parse("tas_rcp26_land-gcm_global_60km_01_day_19091130-18991201.nc")
            .unwrap_err();
        assert!(matches!(err, ParseError::Range { .. }));
    }

    #[test]
    fn item_id_is_canonical() {
        let id = FileIdentity::parse(NAME).unwrap();
        assert_eq!(
            id.item_id(),
            "ukcp18-day-rcp26-1-1899-12-01T00:00:00Z-1909-11-30T00:00:00Z"
        );
        assert_eq!(id.item_id(), FileIdentity::parse(NAME).unwrap().item_id());
    }

    #[test]
    fn item_id_ignores_variable_only() {
        let tasmax = FileIdentity::parse(NAME).unwrap();
        let pr = FileIdentity::parse("pr_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc")
            .unwrap();
        assert_eq!(tasmax.item_id(), pr.item_id());

        let variants = [
            "tasmax_rcp26_land-gcm_global_60km_01_mon_18991201-19091130.nc",
            "tasmax_rcp85_land-gcm_global_60km_01_day_18991201-19091130.nc",
            "tasmax_rcp26_land-gcm_global_60km_11_day_18991201-19091130.nc",
            "tasmax_rcp26_land-gcm_global_60km_01_day_19091201-19191130.nc",
            "tasmax_rcp26_land-gcm_global_60km_01_day_18991201-19191130.nc",
            "tasmax_rcp26-1_land-gcm_global_60km_01_day_18991201-19091130.nc",
            "tasmax_rcp26_land-gcm_global_60km_11_mon_18991201-19091130.nc",
        ];
        let mut ids: Vec<String> = variants
            .iter()
            .map(|v| FileIdentity::parse(v).unwrap().item_id())
            .collect();
        ids.push(tasmax.item_id());
        let unique: std::collections::BTreeSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn grouping_buckets_by_item() {
        let grouping = group_by_item([
            "a/tas_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc",
            "a/pr_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc",
            "a/pr_rcp26_land-gcm_global_60km_01_day_19091201-19191130.nc",
            "a/readme.txt",
        ]);
        assert_eq!(grouping.groups.len(), 2);
        let first = &grouping.groups["ukcp18-day-rcp26-1-1899-12-01T00:00:00Z-1909-11-30T00:00:00Z"];
        assert_eq!(first.len(), 2);
        assert!(first[0].contains("/tas_"));
        assert_eq!(grouping.rejected.len(), 1);
        assert_eq!(grouping.rejected[0].0, "a/readme.txt");
    }
}
