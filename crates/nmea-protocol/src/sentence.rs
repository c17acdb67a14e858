//! NMEA 0183 Sentence Decoding
//!
//! Defines the supported sentence variants and their field-extraction rules.
//! A [`DecodedSentence`] is only ever constructed from a line whose checksum
//! matched; everything else fails with [`ParseError`].

use crate::error::ParseError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// XOR checksum over the span between the leading delimiter and the `*`
/// marker, as transmitted in the two-hex-digit trailer.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, byte| acc ^ byte)
}

/// One validated, decoded sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSentence {
    /// Two-letter talker code ("GP", "SD", "WI", ...)
    pub talker: String,
    /// Three-letter sentence type ("GLL", "DPT", ...)
    pub sentence_type: String,
    /// Typed fields of the sentence
    pub body: SentenceBody,
}

impl DecodedSentence {
    /// Full talker+type address, e.g. "GPGLL"
    pub fn source(&self) -> String {
        format!("{}{}", self.talker, self.sentence_type)
    }
}

/// Typed fields per supported sentence type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SentenceBody {
    /// Geographic position, latitude/longitude
    Gll(GllFields),
    /// GPS fix data
    Gga(GgaFields),
    /// Recommended minimum position/velocity
    Rmc(RmcFields),
    /// Depth of water below the transducer
    Dpt(DptFields),
    /// Cumulative distance through water
    Vlw(VlwFields),
    /// Wind speed and angle
    Mwv(MwvFields),
    /// Meteorological composite
    Mda(MdaFields),
    /// UTC date and time
    Zda(ZdaFields),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GllFields {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_time: Option<NaiveTime>,
    /// Status flag: `A` = data valid, `V` = void
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GgaFields {
    pub fix_time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// 0 = no fix
    pub fix_quality: Option<u8>,
    pub satellites: Option<u8>,
    pub altitude_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmcFields {
    pub fix_time: Option<NaiveTime>,
    pub valid: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_over_ground_kn: Option<f64>,
    pub course_over_ground_deg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DptFields {
    /// Depth below the transducer, meters
    pub depth_m: Option<f64>,
    /// Transducer offset, meters; positive means distance to the waterline
    pub offset_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlwFields {
    /// Total cumulative distance, nautical miles
    pub total_nm: Option<f64>,
    /// Distance since reset, nautical miles
    pub trip_nm: Option<f64>,
}

/// Wind reference frame for MWV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindReference {
    /// Theoretical wind relative to true north
    True,
    /// Apparent wind relative to the vessel bow
    Relative,
}

/// Speed unit code carried in MWV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    Knots,
    MetersPerSecond,
    KilometersPerHour,
}

impl SpeedUnit {
    /// Convert a value in this unit to knots
    pub fn to_knots(self, value: f64) -> f64 {
        match self {
            SpeedUnit::Knots => value,
            SpeedUnit::MetersPerSecond => value * 3600.0 / 1852.0,
            SpeedUnit::KilometersPerHour => value / 1.852,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MwvFields {
    pub angle_deg: Option<f64>,
    pub reference: WindReference,
    pub speed: Option<f64>,
    pub speed_unit: SpeedUnit,
    /// Status flag: `A` = data valid
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdaFields {
    pub pressure_bar: Option<f64>,
    pub air_temp_c: Option<f64>,
    pub water_temp_c: Option<f64>,
    pub wind_dir_true_deg: Option<f64>,
    pub wind_speed_kn: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZdaFields {
    pub fix_time: Option<NaiveTime>,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// Decode one line of NMEA 0183 text.
///
/// Pure function: the same line always yields the same result, so it is safe
/// to call from any number of tasks. The trailing CR/LF may be present or
/// already stripped.
pub fn decode(line: &str) -> Result<DecodedSentence, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line
        .strip_prefix('$')
        .or_else(|| line.strip_prefix('!'))
        .ok_or(ParseError::MissingDelimiter)?;

    let (payload, trailer) = rest.split_once('*').ok_or(ParseError::MissingChecksum)?;
    if trailer.len() != 2 || !trailer.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::MalformedChecksum(trailer.to_string()));
    }
    let expected = u8::from_str_radix(trailer, 16)
        .map_err(|_| ParseError::MalformedChecksum(trailer.to_string()))?;
    let actual = checksum(payload.as_bytes());
    if expected != actual {
        return Err(ParseError::ChecksumMismatch { expected, actual });
    }

    let fields: Vec<&str> = payload.split(',').collect();
    let address = fields[0];
    if address.len() != 5 || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ParseError::BadAddress(address.to_string()));
    }
    let (talker, sentence_type) = address.split_at(2);
    let data = &fields[1..];

    let body = match sentence_type {
        "GLL" => decode_gll(data)?,
        "GGA" => decode_gga(data)?,
        "RMC" => decode_rmc(data)?,
        "DPT" => decode_dpt(data)?,
        "VLW" => decode_vlw(data)?,
        "MWV" => decode_mwv(data)?,
        "MDA" => decode_mda(data)?,
        "ZDA" => decode_zda(data)?,
        _ => return Err(ParseError::Unsupported(address.to_string())),
    };

    Ok(DecodedSentence {
        talker: talker.to_string(),
        sentence_type: sentence_type.to_string(),
        body,
    })
}

/// Fields are positional and receivers routinely drop trailing ones, so a
/// missing index reads as empty.
fn field<'a>(data: &[&'a str], index: usize) -> &'a str {
    data.get(index).copied().unwrap_or("")
}

/// An empty field is the NMEA convention for "no data": it decodes to `None`,
/// never to zero.
fn opt_num<T: FromStr>(data: &[&str], index: usize, name: &'static str) -> Result<Option<T>, ParseError> {
    let raw = field(data, index);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(|_| ParseError::InvalidField {
        name,
        value: raw.to_string(),
    })
}

/// `hhmmss[.sss]` time of day
fn opt_time(data: &[&str], index: usize, name: &'static str) -> Result<Option<NaiveTime>, ParseError> {
    let raw = field(data, index);
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H%M%S%.f")
        .map(Some)
        .map_err(|_| ParseError::InvalidField {
            name,
            value: raw.to_string(),
        })
}

/// `[d]ddmm.mmm` coordinate plus hemisphere field, as signed decimal degrees.
/// South and West are negative.
fn opt_coord(
    data: &[&str],
    value_index: usize,
    hemi_index: usize,
    name: &'static str,
) -> Result<Option<f64>, ParseError> {
    let raw = field(data, value_index);
    if raw.is_empty() {
        return Ok(None);
    }
    let minutes_start = raw.find('.').unwrap_or(raw.len());
    if minutes_start < 3 {
        return Err(ParseError::InvalidField {
            name,
            value: raw.to_string(),
        });
    }
    let (degrees, minutes) = raw.split_at(minutes_start - 2);
    let degrees: f64 = degrees.parse().map_err(|_| ParseError::InvalidField {
        name,
        value: raw.to_string(),
    })?;
    let minutes: f64 = minutes.parse().map_err(|_| ParseError::InvalidField {
        name,
        value: raw.to_string(),
    })?;
    let value = degrees + minutes / 60.0;
    match field(data, hemi_index) {
        "N" | "E" | "" => Ok(Some(value)),
        "S" | "W" => Ok(Some(-value)),
        other => Err(ParseError::InvalidField {
            name,
            value: other.to_string(),
        }),
    }
}

/// `A` = valid, anything else (including absent) = void
fn status_flag(data: &[&str], index: usize) -> bool {
    field(data, index) == "A"
}

fn decode_gll(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Gll(GllFields {
        latitude: opt_coord(data, 0, 1, "latitude")?,
        longitude: opt_coord(data, 2, 3, "longitude")?,
        fix_time: opt_time(data, 4, "fix_time")?,
        valid: status_flag(data, 5),
    }))
}

fn decode_gga(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Gga(GgaFields {
        fix_time: opt_time(data, 0, "fix_time")?,
        latitude: opt_coord(data, 1, 2, "latitude")?,
        longitude: opt_coord(data, 3, 4, "longitude")?,
        fix_quality: opt_num(data, 5, "fix_quality")?,
        satellites: opt_num(data, 6, "satellites")?,
        altitude_m: opt_num(data, 8, "altitude_m")?,
    }))
}

fn decode_rmc(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Rmc(RmcFields {
        fix_time: opt_time(data, 0, "fix_time")?,
        valid: status_flag(data, 1),
        latitude: opt_coord(data, 2, 3, "latitude")?,
        longitude: opt_coord(data, 4, 5, "longitude")?,
        speed_over_ground_kn: opt_num(data, 6, "speed_over_ground_kn")?,
        course_over_ground_deg: opt_num(data, 7, "course_over_ground_deg")?,
    }))
}

fn decode_dpt(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Dpt(DptFields {
        depth_m: opt_num(data, 0, "depth_m")?,
        offset_m: opt_num(data, 1, "offset_m")?,
    }))
}

fn decode_vlw(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Vlw(VlwFields {
        total_nm: opt_num(data, 0, "total_nm")?,
        trip_nm: opt_num(data, 2, "trip_nm")?,
    }))
}

fn decode_mwv(data: &[&str]) -> Result<SentenceBody, ParseError> {
    let reference = match field(data, 1) {
        "T" => WindReference::True,
        "R" | "" => WindReference::Relative,
        other => {
            return Err(ParseError::InvalidField {
                name: "wind_reference",
                value: other.to_string(),
            })
        }
    };
    let speed_unit = match field(data, 3) {
        "N" | "" => SpeedUnit::Knots,
        "M" => SpeedUnit::MetersPerSecond,
        "K" => SpeedUnit::KilometersPerHour,
        other => {
            return Err(ParseError::InvalidField {
                name: "speed_unit",
                value: other.to_string(),
            })
        }
    };
    Ok(SentenceBody::Mwv(MwvFields {
        angle_deg: opt_num(data, 0, "angle_deg")?,
        reference,
        speed: opt_num(data, 2, "speed")?,
        speed_unit,
        valid: status_flag(data, 4),
    }))
}

fn decode_mda(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Mda(MdaFields {
        pressure_bar: opt_num(data, 2, "pressure_bar")?,
        air_temp_c: opt_num(data, 4, "air_temp_c")?,
        water_temp_c: opt_num(data, 6, "water_temp_c")?,
        wind_dir_true_deg: opt_num(data, 12, "wind_dir_true_deg")?,
        wind_speed_kn: opt_num(data, 16, "wind_speed_kn")?,
    }))
}

fn decode_zda(data: &[&str]) -> Result<SentenceBody, ParseError> {
    Ok(SentenceBody::Zda(ZdaFields {
        fix_time: opt_time(data, 0, "fix_time")?,
        day: opt_num(data, 1, "day")?,
        month: opt_num(data, 2, "month")?,
        year: opt_num(data, 3, "year")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GLL: &str = "$GPGLL,4916.45,N,12311.12,W,225444,A,A*5C";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    #[test]
    fn gll_decodes_position() {
        let sentence = decode(GLL).unwrap();
        assert_eq!(sentence.talker, "GP");
        assert_eq!(sentence.sentence_type, "GLL");
        assert_eq!(sentence.source(), "GPGLL");
        let SentenceBody::Gll(fields) = &sentence.body else {
            panic!("expected GLL body");
        };
        assert!((fields.latitude.unwrap() - 49.274_166_7).abs() < 1e-6);
        assert!((fields.longitude.unwrap() - -123.185_333_3).abs() < 1e-6);
        assert!(fields.valid);
        assert_eq!(
            fields.fix_time.unwrap(),
            NaiveTime::from_hms_opt(22, 54, 44).unwrap()
        );
    }

    #[test]
    fn gga_decodes_fix() {
        let SentenceBody::Gga(fields) = decode(GGA).unwrap().body else {
            panic!("expected GGA body");
        };
        assert!((fields.latitude.unwrap() - 48.117_3).abs() < 1e-4);
        assert!((fields.longitude.unwrap() - 11.516_666_7).abs() < 1e-6);
        assert_eq!(fields.fix_quality, Some(1));
        assert_eq!(fields.satellites, Some(8));
        assert_eq!(fields.altitude_m, Some(545.4));
    }

    #[test]
    fn rmc_decodes_velocity() {
        let SentenceBody::Rmc(fields) = decode(RMC).unwrap().body else {
            panic!("expected RMC body");
        };
        assert!(fields.valid);
        assert_eq!(fields.speed_over_ground_kn, Some(22.4));
        assert_eq!(fields.course_over_ground_deg, Some(84.4));
    }

    #[test]
    fn crlf_terminator_is_accepted() {
        assert!(decode("$SDDPT,2.4,0.3*52\r\n").is_ok());
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let err = decode("$GPGLL,4916.45,N,12311.12,W,225444,A,A*5D").unwrap_err();
        assert_eq!(
            err,
            ParseError::ChecksumMismatch {
                expected: 0x5D,
                actual: 0x5C
            }
        );
    }

    #[test]
    fn structural_errors_are_distinguished() {
        assert_eq!(
            decode("GPGLL,4916.45,N*00").unwrap_err(),
            ParseError::MissingDelimiter
        );
        assert_eq!(
            decode("$GPGLL,4916.45,N").unwrap_err(),
            ParseError::MissingChecksum
        );
        assert!(matches!(
            decode("$GPGLL,4916.45,N*5").unwrap_err(),
            ParseError::MalformedChecksum(_)
        ));
    }

    #[test]
    fn unsupported_type_is_not_a_crash() {
        let err = decode("$GPXTE,A,A,0.67,L,N*6F").unwrap_err();
        assert_eq!(err, ParseError::Unsupported("GPXTE".to_string()));
    }

    #[test]
    fn empty_numeric_fields_decode_as_absent() {
        let SentenceBody::Dpt(fields) = decode("$SDDPT,,*57").unwrap().body else {
            panic!("expected DPT body");
        };
        assert_eq!(fields.depth_m, None);
        assert_eq!(fields.offset_m, None);

        let SentenceBody::Dpt(fields) = decode("$SDDPT,7.8,*76").unwrap().body else {
            panic!("expected DPT body");
        };
        assert_eq!(fields.depth_m, Some(7.8));
        assert_eq!(fields.offset_m, None);
    }

    #[test]
    fn decode_is_idempotent() {
        assert_eq!(decode(GLL).unwrap(), decode(GLL).unwrap());
        assert_eq!(decode(GGA).unwrap(), decode(GGA).unwrap());
    }

    #[test]
    fn vlw_reads_total_and_trip() {
        let SentenceBody::Vlw(fields) = decode("$VWVLW,2513.3,N,0.0,N*7A").unwrap().body else {
            panic!("expected VLW body");
        };
        assert_eq!(fields.total_nm, Some(2513.3));
        assert_eq!(fields.trip_nm, Some(0.0));
    }

    #[test]
    fn mwv_reads_reference_and_units() {
        let SentenceBody::Mwv(fields) = decode("$WIMWV,045.0,T,12.5,N,A*12").unwrap().body else {
            panic!("expected MWV body");
        };
        assert_eq!(fields.reference, WindReference::True);
        assert_eq!(fields.speed_unit, SpeedUnit::Knots);
        assert_eq!(fields.angle_deg, Some(45.0));
        assert!(fields.valid);

        let SentenceBody::Mwv(fields) = decode("$WIMWV,214.8,R,0.1,N,A*2D").unwrap().body else {
            panic!("expected MWV body");
        };
        assert_eq!(fields.reference, WindReference::Relative);
    }

    #[test]
    fn mda_reads_true_wind() {
        let line = "$WIMDA,29.92,I,1.0130,B,25.5,C,,,,,,,045.0,T,,M,12.5,N,6.4,M*30";
        let SentenceBody::Mda(fields) = decode(line).unwrap().body else {
            panic!("expected MDA body");
        };
        assert_eq!(fields.pressure_bar, Some(1.013));
        assert_eq!(fields.air_temp_c, Some(25.5));
        assert_eq!(fields.water_temp_c, None);
        assert_eq!(fields.wind_dir_true_deg, Some(45.0));
        assert_eq!(fields.wind_speed_kn, Some(12.5));
    }

    #[test]
    fn zda_reads_date_components() {
        let SentenceBody::Zda(fields) =
            decode("$GPZDA,160012.71,11,03,2004,-1,00*7D").unwrap().body
        else {
            panic!("expected ZDA body");
        };
        assert_eq!(fields.day, Some(11));
        assert_eq!(fields.month, Some(3));
        assert_eq!(fields.year, Some(2004));
    }

    #[test]
    fn speed_unit_conversions() {
        assert!((SpeedUnit::MetersPerSecond.to_knots(1.0) - 1.943_844_5).abs() < 1e-6);
        assert!((SpeedUnit::KilometersPerHour.to_knots(1.852) - 1.0).abs() < 1e-9);
        assert_eq!(SpeedUnit::Knots.to_knots(7.5), 7.5);
    }

    #[test]
    fn checksum_of_known_payload() {
        // Published reference sentence with trailer 47
        assert_eq!(
            checksum("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,".as_bytes()),
            0x47
        );
    }

    proptest! {
        // Flipping any single character in the checksum-covered span must
        // make decoding fail; the pristine line decodes (see unit tests).
        #[test]
        fn corrupting_any_covered_character_fails(
            index in 1usize..1000,
            replacement in proptest::char::range('!', '~'),
        ) {
            let star = GLL.find('*').unwrap();
            let index = 1 + index % (star - 1);
            let original = GLL.as_bytes()[index] as char;
            prop_assume!(replacement != original);

            let mut corrupted: Vec<char> = GLL.chars().collect();
            corrupted[index] = replacement;
            let corrupted: String = corrupted.into_iter().collect();

            prop_assert!(decode(&corrupted).is_err());
        }
    }
}
