//! Monthly day-type profiles.
//!
//! The survey also publishes, per segment, average hourly loads by month and
//! day type. We normalize them by each end-use's floor area so segments of
//! different size can be compared, and keep only end-uses the segment actually
//! has (floor area > 0).

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::EndUse;

/// Day-type code used by the monthly survey export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayType {
    Weekday,
    Saturday,
    Sunday,
    Holiday,
}

impl DayType {
    /// `10..=13` map to weekday, Saturday, Sunday, holiday; other codes are
    /// summary rows and have no day type.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            10 => Some(DayType::Weekday),
            11 => Some(DayType::Saturday),
            12 => Some(DayType::Sunday),
            13 => Some(DayType::Holiday),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayType::Weekday => "WEEKDAY",
            DayType::Saturday => "SATURDAY",
            DayType::Sunday => "SUNDAY",
            DayType::Holiday => "HOLIDAY",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the monthly export: average load per end-use for one
/// (month, day type, hour).
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRecord {
    pub month: u32,
    pub day_type: DayType,
    /// Hour ending, 1..=24.
    pub hour: u32,
    /// Indexed like [`EndUse::ALL`].
    pub loads: [f64; 13],
}

/// Normalized profile table for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    /// Active end-uses, in survey order.
    pub columns: Vec<EndUse>,
    pub rows: Vec<ProfileRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub month: u32,
    pub day_type: DayType,
    /// Hour beginning, 0..=23.
    pub hour: u32,
    /// Load per unit floor area, one per active column.
    pub values: Vec<f64>,
}

/// Divide every active end-use's load by its floor area.
///
/// End-uses absent from `floor_area` or with a non-positive area are dropped.
/// Rows keep their input order.
pub fn build_profile_table(records: &[MonthlyRecord], floor_area: &BTreeMap<EndUse, f64>) -> ProfileTable {
    let active: Vec<(usize, EndUse, f64)> = EndUse::ALL
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            floor_area
                .get(e)
                .copied()
                .filter(|&area| area > 0.0)
                .map(|area| (i, *e, area))
        })
        .collect();

    let rows = records
        .iter()
        .map(|r| ProfileRow {
            month: r.month,
            day_type: r.day_type,
            hour: r.hour.saturating_sub(1),
            values: active.iter().map(|&(i, _, area)| r.loads[i] / area).collect(),
        })
        .collect();

    ProfileTable {
        columns: active.iter().map(|&(_, e, _)| e).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_type_codes_map_to_labels() {
        assert_eq!(DayType::from_code(10), Some(DayType::Weekday));
        assert_eq!(DayType::from_code(13).map(DayType::label), Some("HOLIDAY"));
        assert_eq!(DayType::from_code(14), None);
        assert_eq!(DayType::from_code(1), None);
    }

    #[test]
    fn loads_are_divided_by_floor_area_and_inactive_end_uses_dropped() {
        let mut loads = [0.0; 13];
        loads[0] = 50.0; // Heating
        loads[1] = 30.0; // Cooling
        loads[7] = 12.0; // IntLight
        let records = vec![MonthlyRecord {
            month: 3,
            day_type: DayType::Saturday,
            hour: 1,
            loads,
        }];
        let floor_area = BTreeMap::from([
            (EndUse::Heating, 100.0),
            (EndUse::Cooling, 0.0),
            (EndUse::IntLight, 40.0),
        ]);

        let table = build_profile_table(&records, &floor_area);
        assert_eq!(table.columns, vec![EndUse::Heating, EndUse::IntLight]);
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!((row.month, row.day_type, row.hour), (3, DayType::Saturday, 0));
        assert_eq!(row.values, vec![0.5, 0.3]);
    }
}
