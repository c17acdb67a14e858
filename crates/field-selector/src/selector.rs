//! Sentence-to-Row Mapping

use chrono::{DateTime, Utc};
use nmea_protocol::{DecodedSentence, SentenceBody, WindReference};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One selected telemetry row.
///
/// The timestamp is the UTC wall-clock receipt time and is always present;
/// every measurement column is nullable. A record with no measurement set is
/// never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRecord {
    pub timestamp: DateTime<Utc>,
    /// Talker+type address of the contributing sentence, e.g. "GPGLL"
    pub source: String,
    /// Decimal degrees, south negative
    pub latitude: Option<f64>,
    /// Decimal degrees, west negative
    pub longitude: Option<f64>,
    pub water_depth_m: Option<f64>,
    /// Cumulative log distance, nautical miles
    pub water_distance_nm: Option<f64>,
    /// True wind speed, knots
    pub wind_speed_kn: Option<f64>,
    /// True wind direction, degrees
    pub wind_angle_deg: Option<f64>,
}

impl SelectedRecord {
    fn empty(timestamp: DateTime<Utc>, source: String) -> Self {
        Self {
            timestamp,
            source,
            latitude: None,
            longitude: None,
            water_depth_m: None,
            water_distance_nm: None,
            wind_speed_kn: None,
            wind_angle_deg: None,
        }
    }

    /// True when at least one measurement column is set
    pub fn has_measurement(&self) -> bool {
        self.latitude.is_some()
            || self.longitude.is_some()
            || self.water_depth_m.is_some()
            || self.water_distance_nm.is_some()
            || self.wind_speed_kn.is_some()
            || self.wind_angle_deg.is_some()
    }
}

/// Stateless mapping from sentence variants to tracked columns
#[derive(Debug, Clone, Default)]
pub struct FieldSelector;

impl FieldSelector {
    pub fn new() -> Self {
        Self
    }

    /// Select at the current wall-clock time.
    pub fn select(&self, sentence: &DecodedSentence) -> Option<SelectedRecord> {
        self.select_at(sentence, Utc::now())
    }

    /// Select with an explicit timestamp.
    ///
    /// Returns `None` when the sentence carries no tracked column, its status
    /// flag marks the data void, or every tracked field is absent. None of
    /// those are errors.
    pub fn select_at(
        &self,
        sentence: &DecodedSentence,
        timestamp: DateTime<Utc>,
    ) -> Option<SelectedRecord> {
        let mut record = SelectedRecord::empty(timestamp, sentence.source());
        match &sentence.body {
            SentenceBody::Gll(fields) => {
                if !fields.valid {
                    debug!(source = %record.source, "skipping void position fix");
                    return None;
                }
                record.latitude = fields.latitude;
                record.longitude = fields.longitude;
            }
            SentenceBody::Rmc(fields) => {
                if !fields.valid {
                    debug!(source = %record.source, "skipping void position fix");
                    return None;
                }
                record.latitude = fields.latitude;
                record.longitude = fields.longitude;
            }
            SentenceBody::Gga(fields) => {
                if fields.fix_quality.unwrap_or(0) == 0 {
                    debug!(source = %record.source, "skipping fix without quality");
                    return None;
                }
                record.latitude = fields.latitude;
                record.longitude = fields.longitude;
            }
            SentenceBody::Dpt(fields) => {
                // Waterline-referenced when the installation reports an offset
                record.water_depth_m = fields
                    .depth_m
                    .map(|depth| depth + fields.offset_m.unwrap_or(0.0));
            }
            SentenceBody::Vlw(fields) => {
                record.water_distance_nm = fields.total_nm;
            }
            SentenceBody::Mwv(fields) => {
                // Only true-referenced wind feeds the wind columns
                if !fields.valid || fields.reference != WindReference::True {
                    return None;
                }
                record.wind_speed_kn = fields.speed.map(|s| fields.speed_unit.to_knots(s));
                record.wind_angle_deg = fields.angle_deg;
            }
            SentenceBody::Mda(fields) => {
                record.wind_speed_kn = fields.wind_speed_kn;
                record.wind_angle_deg = fields.wind_dir_true_deg;
            }
            // Time-only sentence, no tracked column
            SentenceBody::Zda(_) => return None,
        }
        record.has_measurement().then_some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmea_protocol::decode;

    fn select(line: &str) -> Option<SelectedRecord> {
        FieldSelector::new().select_at(&decode(line).unwrap(), Utc::now())
    }

    #[test]
    fn gll_contributes_position_only() {
        let record = select("$GPGLL,4916.45,N,12311.12,W,225444,A,A*5C").unwrap();
        assert_eq!(record.source, "GPGLL");
        assert!(record.latitude.unwrap() > 49.0);
        assert!(record.longitude.unwrap() < 0.0);
        assert_eq!(record.water_depth_m, None);
        assert_eq!(record.wind_speed_kn, None);
        assert_eq!(record.wind_angle_deg, None);
        assert_eq!(record.water_distance_nm, None);
    }

    #[test]
    fn void_fix_yields_no_record() {
        assert_eq!(select("$GPGLL,4916.45,N,12311.12,W,225444,V,A*4B"), None);
    }

    #[test]
    fn depth_includes_transducer_offset() {
        let record = select("$SDDPT,2.4,0.3*52").unwrap();
        assert!((record.water_depth_m.unwrap() - 2.7).abs() < 1e-9);

        let record = select("$SDDPT,7.8,*76").unwrap();
        assert_eq!(record.water_depth_m, Some(7.8));
    }

    #[test]
    fn all_absent_measurements_yield_no_record() {
        // Depth field empty: nothing worth a row
        assert_eq!(select("$SDDPT,,*57"), None);
        assert_eq!(select("$VWVLW,,N,,N*4C"), None);
    }

    #[test]
    fn vlw_contributes_cumulative_distance() {
        let record = select("$VWVLW,2513.3,N,0.0,N*7A").unwrap();
        assert_eq!(record.water_distance_nm, Some(2513.3));
        assert_eq!(record.latitude, None);
    }

    #[test]
    fn relative_wind_is_not_tracked() {
        assert_eq!(select("$WIMWV,214.8,R,0.1,N,A*2D"), None);
    }

    #[test]
    fn true_wind_contributes_speed_and_angle() {
        let record = select("$WIMWV,045.0,T,12.5,N,A*12").unwrap();
        assert_eq!(record.wind_speed_kn, Some(12.5));
        assert_eq!(record.wind_angle_deg, Some(45.0));
    }

    #[test]
    fn mda_contributes_true_wind() {
        let record =
            select("$WIMDA,29.92,I,1.0130,B,25.5,C,,,,,,,045.0,T,,M,12.5,N,6.4,M*30").unwrap();
        assert_eq!(record.source, "WIMDA");
        assert_eq!(record.wind_speed_kn, Some(12.5));
        assert_eq!(record.wind_angle_deg, Some(45.0));
    }

    #[test]
    fn time_only_sentence_is_skipped() {
        assert_eq!(select("$GPZDA,160012.71,11,03,2004,-1,00*7D"), None);
    }

    #[test]
    fn timestamp_is_the_injected_receipt_time() {
        let at = Utc::now();
        let sentence = decode("$SDDPT,2.4,0.3*52").unwrap();
        let record = FieldSelector::new().select_at(&sentence, at).unwrap();
        assert_eq!(record.timestamp, at);
    }
}
