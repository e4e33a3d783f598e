///! Validated two-line element set
use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

pub const TLE_LINE_LENGTH: usize = 69;
pub const MAX_NAME_LENGTH: usize = 24;
const MIN_NAME_LENGTH: usize = 3;

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

static LINE1_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^1 [ 0-9A-HJ-NP-Z][ 0-9]{4}[A-Z] [ 0-9]{5}[ A-Z]{3} [ 0-9]{5}[.][ 0-9]{8} ",
        r"(?:(?:[ 0+-][.][ 0-9]{8})|(?: [ +-][.][ 0-9]{7})) ",
        r"[ +-][ 0-9]{5}[+-][ 0-9] [ +-][ 0-9]{5}[+-][ 0-9] [ 0-9] [ 0-9]{4}[ 0-9]$"
    ))
    .unwrap()
});

static LINE2_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^2 [ 0-9A-HJ-NP-Z][ 0-9]{4} [ 0-9]{3}[.][ 0-9]{4} [ 0-9]{3}[.][ 0-9]{4} ",
        r"[ 0-9]{7} [ 0-9]{3}[.][ 0-9]{4} [ 0-9]{3}[.][ 0-9]{4} [ 0-9]{2}[.][ 0-9]{13}[ 0-9]$"
    ))
    .unwrap()
});

/// Which of the two element lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TleLine {
    One,
    Two,
}

impl TleLine {
    fn leading(self) -> char {
        match self {
            TleLine::One => '1',
            TleLine::Two => '2',
        }
    }

    fn format(self) -> &'static Regex {
        match self {
            TleLine::One => &LINE1_FORMAT,
            TleLine::Two => &LINE2_FORMAT,
        }
    }
}

impl fmt::Display for TleLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.leading())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TleError {
    #[error("line {line} has {length} characters, expected {}", TLE_LINE_LENGTH)]
    WrongLength { line: TleLine, length: usize },

    #[error("line {line} must start with '{line}'")]
    WrongLeadingCharacter { line: TleLine },

    #[error("line {line} does not match the element set format")]
    Format { line: TleLine },

    #[error("line {line} checksum mismatch: expected {expected}, found {actual}")]
    Checksum { line: TleLine, expected: u32, actual: u32 },

    #[error("catalog numbers differ between lines ({line1} vs {line2})")]
    CatalogNumberMismatch { line1: u32, line2: u32 },

    #[error("cannot decode epoch field '{0}'")]
    Epoch(String),

    #[error("international designator is blank")]
    BlankDesignator,
}

/// Immutable element set with its derived identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct TleRecord {
    name: Option<String>,
    line1: String,
    line2: String,
    catalog_number: u32,
    international_designator: String,
    epoch: DateTime<Utc>,
}

impl TleRecord {
    /// Validate both lines and derive catalog number, designator and epoch.
    ///
    /// A name that is too short or looks like an element line is dropped and
    /// the record is anonymous; longer names are cut to 24 characters.
    pub fn new(name: Option<&str>, line1: &str, line2: &str) -> Result<Self, TleError> {
        validate_line(line1, TleLine::One)?;
        validate_line(line2, TleLine::Two)?;

        let catalog_number = parse_catalog_number(line1, TleLine::One)?;
        let line2_number = parse_catalog_number(line2, TleLine::Two)?;
        if catalog_number != line2_number {
            return Err(TleError::CatalogNumberMismatch {
                line1: catalog_number,
                line2: line2_number,
            });
        }

        let international_designator = parse_designator(line1)?;
        let epoch = parse_epoch(&line1[18..32])?;

        let name = name
            .map(str::trim)
            .filter(|n| is_valid_satellite_name(n))
            .map(|n| n.chars().take(MAX_NAME_LENGTH).collect::<String>())
            .map(|n| n.trim_end().to_string());

        Ok(Self {
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            catalog_number,
            international_designator,
            epoch,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// NORAD catalog number (Alpha-5 numbers are decoded)
    pub fn catalog_number(&self) -> u32 {
        self.catalog_number
    }

    /// Short form designator, e.g. `98067A`
    pub fn international_designator(&self) -> &str {
        &self.international_designator
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Render as text: the name padded to 24 characters (if any), then both lines
    pub fn render(&self) -> String {
        match &self.name {
            Some(name) => format!(
                "{:<width$}{LINE_ENDING}{}{LINE_ENDING}{}",
                name,
                self.line1,
                self.line2,
                width = MAX_NAME_LENGTH
            ),
            None => format!("{}{LINE_ENDING}{}", self.line1, self.line2),
        }
    }
}

impl fmt::Display for TleRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Cheap shape test: 69 characters starting with the line number
pub fn looks_like_tle_line(line: &str, which: TleLine) -> bool {
    line.chars().count() == TLE_LINE_LENGTH && line.starts_with(which.leading())
}

/// A usable name has at least 3 characters and is not an element line
pub fn is_valid_satellite_name(name: &str) -> bool {
    name.chars().count() >= MIN_NAME_LENGTH
        && !looks_like_tle_line(name, TleLine::One)
        && !looks_like_tle_line(name, TleLine::Two)
}

/// Modulo-10 checksum over the first 68 characters; '-' counts as 1
pub fn checksum(line: &str) -> u32 {
    line.chars()
        .take(TLE_LINE_LENGTH - 1)
        .map(|c| match c {
            '-' => 1,
            c => c.to_digit(10).unwrap_or(0),
        })
        .sum::<u32>()
        % 10
}

fn validate_line(line: &str, which: TleLine) -> Result<(), TleError> {
    let length = line.chars().count();
    if length != TLE_LINE_LENGTH {
        return Err(TleError::WrongLength { line: which, length });
    }
    if !line.starts_with(which.leading()) {
        return Err(TleError::WrongLeadingCharacter { line: which });
    }
    if !which.format().is_match(line) {
        return Err(TleError::Format { line: which });
    }

    // The format check guarantees ASCII, so byte indexing is safe from here on
    let actual = (line.as_bytes()[TLE_LINE_LENGTH - 1] as char)
        .to_digit(10)
        .ok_or(TleError::Format { line: which })?;
    let expected = checksum(line);
    if expected != actual {
        return Err(TleError::Checksum {
            line: which,
            expected,
            actual,
        });
    }
    Ok(())
}

fn parse_catalog_number(line: &str, which: TleLine) -> Result<u32, TleError> {
    let field = line[2..7].trim();
    let mut chars = field.chars();
    let first = chars.next().ok_or(TleError::Format { line: which })?;

    let (high, rest) = match first {
        'A'..='H' => (first as u32 - 'A' as u32 + 10, chars.as_str()),
        'J'..='N' => (first as u32 - 'J' as u32 + 18, chars.as_str()),
        'P'..='Z' => (first as u32 - 'P' as u32 + 23, chars.as_str()),
        _ => (0, field),
    };

    let low: u32 = rest.parse().map_err(|_| TleError::Format { line: which })?;
    if high > 0 {
        if rest.len() != 4 {
            return Err(TleError::Format { line: which });
        }
        Ok(high * 10_000 + low)
    } else {
        Ok(low)
    }
}

fn parse_designator(line1: &str) -> Result<String, TleError> {
    if line1[9..17].trim().is_empty() {
        return Err(TleError::BlankDesignator);
    }

    let format_error = || TleError::Format { line: TleLine::One };
    let year: u32 = line1[9..11].trim().parse().map_err(|_| format_error())?;
    let number: u32 = line1[11..14].trim().parse().map_err(|_| format_error())?;
    let piece = line1[14..17].trim();

    Ok(format!("{:02}{:03}{}", year, number, piece))
}

/// Decode `YYDDD.DDDDDDDD`: two-digit years below 57 are in the 2000s
fn parse_epoch(field: &str) -> Result<DateTime<Utc>, TleError> {
    let epoch_error = || TleError::Epoch(field.to_string());

    let two_digit: i32 = field[..2].trim().parse().map_err(|_| epoch_error())?;
    let day: f64 = field[2..].trim().parse().map_err(|_| epoch_error())?;
    if !(0.0..367.0).contains(&day) {
        return Err(epoch_error());
    }

    let year = if two_digit < 57 {
        2000 + two_digit
    } else {
        1900 + two_digit
    };

    let start_of_year = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(epoch_error)?
        .and_utc();

    let offset = Duration::nanoseconds(((day - 1.0) * 86_400e9).round() as i64);
    Ok(start_of_year + offset)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    pub(crate) const ISS_NAME: &str = "ISS (ZARYA)";
    pub(crate) const ISS_LINE1: &str =
        "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    pub(crate) const ISS_LINE2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    pub(crate) const VANGUARD_LINE1: &str =
        "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    pub(crate) const VANGUARD_LINE2: &str =
        "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

    /// Replace the last character with a freshly computed checksum
    pub(crate) fn with_checksum(line: &str) -> String {
        let body: String = line.chars().take(TLE_LINE_LENGTH - 1).collect();
        format!("{}{}", body, checksum(&body))
    }

    fn replace_at(line: &str, index: usize, c: char) -> String {
        line.chars()
            .enumerate()
            .map(|(i, old)| if i == index { c } else { old })
            .collect()
    }

    #[test]
    fn test_valid_record() {
        let record = TleRecord::new(Some(ISS_NAME), ISS_LINE1, ISS_LINE2).unwrap();

        assert_eq!(record.name(), Some(ISS_NAME));
        assert_eq!(record.catalog_number(), 25544);
        assert_eq!(record.international_designator(), "98067A");
        assert_eq!(record.line1(), ISS_LINE1);
        assert_eq!(record.line2(), ISS_LINE2);
    }

    #[test]
    fn test_epoch_decoding() {
        let record = TleRecord::new(None, ISS_LINE1, ISS_LINE2).unwrap();
        let epoch = record.epoch();

        assert_eq!((epoch.year(), epoch.month(), epoch.day()), (2008, 9, 20));
        assert_eq!((epoch.hour(), epoch.minute(), epoch.second()), (12, 25, 40));

        // 58 is in the previous century, 00 in this one
        let vanguard = TleRecord::new(None, VANGUARD_LINE1, VANGUARD_LINE2).unwrap();
        assert_eq!(vanguard.epoch().year(), 2000);
        assert_eq!(vanguard.international_designator(), "58002B");
        assert_eq!(vanguard.catalog_number(), 5);
    }

    #[test]
    fn test_wrong_length() {
        let short = &ISS_LINE1[..68];
        assert!(matches!(
            TleRecord::new(None, short, ISS_LINE2),
            Err(TleError::WrongLength { line: TleLine::One, length: 68 })
        ));

        let long = format!("{} ", ISS_LINE2);
        assert!(matches!(
            TleRecord::new(None, ISS_LINE1, &long),
            Err(TleError::WrongLength { line: TleLine::Two, length: 70 })
        ));
    }

    #[test]
    fn test_wrong_leading_character() {
        let bad = replace_at(ISS_LINE1, 0, '3');
        assert_eq!(
            TleRecord::new(None, &bad, ISS_LINE2),
            Err(TleError::WrongLeadingCharacter { line: TleLine::One })
        );

        // Swapped lines
        assert_eq!(
            TleRecord::new(None, ISS_LINE2, ISS_LINE1),
            Err(TleError::WrongLeadingCharacter { line: TleLine::One })
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let bad = replace_at(ISS_LINE1, 68, '8');
        assert_eq!(
            TleRecord::new(None, &bad, ISS_LINE2),
            Err(TleError::Checksum {
                line: TleLine::One,
                expected: 7,
                actual: 8
            })
        );

        // A changed digit in the body breaks the checksum too
        let bad = replace_at(ISS_LINE2, 10, '2');
        assert!(matches!(
            TleRecord::new(None, ISS_LINE1, &bad),
            Err(TleError::Checksum { line: TleLine::Two, .. })
        ));
    }

    #[test]
    fn test_format_mismatch() {
        let bad = with_checksum(&replace_at(ISS_LINE2, 11, 'x'));
        assert_eq!(
            TleRecord::new(None, ISS_LINE1, &bad),
            Err(TleError::Format { line: TleLine::Two })
        );
    }

    #[test]
    fn test_catalog_number_mismatch() {
        let other = with_checksum(&replace_at(ISS_LINE2, 6, '5'));
        assert_eq!(
            TleRecord::new(None, ISS_LINE1, &other),
            Err(TleError::CatalogNumberMismatch {
                line1: 25544,
                line2: 25545
            })
        );
    }

    #[test]
    fn test_blank_designator() {
        let blank: String = ISS_LINE1
            .chars()
            .enumerate()
            .map(|(i, c)| if (9..17).contains(&i) { ' ' } else { c })
            .collect();
        let blank = with_checksum(&blank);
        assert_eq!(
            TleRecord::new(None, &blank, ISS_LINE2),
            Err(TleError::BlankDesignator)
        );
    }

    #[test]
    fn test_alpha5_catalog_number() {
        let line1 = with_checksum(&ISS_LINE1.replacen("25544", "A0001", 1));
        let line2 = with_checksum(&ISS_LINE2.replacen("25544", "A0001", 1));
        let record = TleRecord::new(None, &line1, &line2).unwrap();
        assert_eq!(record.catalog_number(), 100_001);

        let line1 = with_checksum(&ISS_LINE1.replacen("25544", "Z9999", 1));
        let line2 = with_checksum(&ISS_LINE2.replacen("25544", "Z9999", 1));
        let record = TleRecord::new(None, &line1, &line2).unwrap();
        assert_eq!(record.catalog_number(), 339_999);
    }

    #[test]
    fn test_name_rules() {
        let record = TleRecord::new(Some("  AO-91  "), ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(record.name(), Some("AO-91"));

        let record = TleRecord::new(Some("AO"), ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(record.name(), None);

        // A preceding element line is not a name
        let record = TleRecord::new(Some(ISS_LINE2), ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(record.name(), None);

        let long = "A VERY LONG SATELLITE NAME THAT KEEPS GOING";
        let record = TleRecord::new(Some(long), ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(record.name(), Some("A VERY LONG SATELLITE NA"));
    }

    #[test]
    fn test_render() {
        let record = TleRecord::new(Some("ISS"), ISS_LINE1, ISS_LINE2).unwrap();
        let rendered = record.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("{:<24}", "ISS"));
        assert_eq!(lines[1], ISS_LINE1);
        assert_eq!(lines[2], ISS_LINE2);

        let anonymous = TleRecord::new(None, ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(anonymous.render().lines().count(), 2);
        assert_eq!(anonymous.to_string(), anonymous.render());
    }

    #[test]
    fn test_checksum_counts_minus_signs() {
        assert_eq!(checksum(ISS_LINE1), 7);
        assert_eq!(checksum(ISS_LINE2), 7);
        assert_eq!(checksum(VANGUARD_LINE1), 3);
    }
}
