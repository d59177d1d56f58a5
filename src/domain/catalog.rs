//! End-use canonicalization and temperature-sensitivity tables.
//!
//! The survey spells some categories inconsistently between sheets
//! (`OffEquip` vs `OfficeEquip`, `Cook` vs `Cooking`, ...). The catalog maps raw
//! labels onto [`EndUse`] and records which categories get heating and/or
//! cooling degree columns. It is built once and shared read-only.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::EndUse;

/// Which temperature columns a category carries in its design matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sensitivity {
    pub heating: bool,
    pub cooling: bool,
}

/// Immutable lookup tables used by the design matrix builder.
#[derive(Debug, Clone)]
pub struct EndUseCatalog {
    labels: HashMap<String, EndUse>,
    holidays: BTreeSet<NaiveDate>,
}

impl EndUseCatalog {
    /// Canonical names plus the known survey misspellings.
    pub fn standard() -> Self {
        let mut labels: HashMap<String, EndUse> = EndUse::ALL
            .iter()
            .map(|&e| (e.name().to_string(), e))
            .collect();
        for (alias, end_use) in [
            ("OffEquip", EndUse::OfficeEquip),
            ("Cook", EndUse::Cooking),
            ("Cool", EndUse::Cooling),
            ("Heat", EndUse::Heating),
            ("HotWater", EndUse::WaterHeat),
        ] {
            labels.insert(alias.to_string(), end_use);
        }
        Self {
            labels,
            holidays: BTreeSet::new(),
        }
    }

    /// Treat the given dates as weekend day-types.
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Map a raw survey label onto its category.
    pub fn resolve(&self, label: &str) -> Option<EndUse> {
        self.labels.get(label.trim()).copied()
    }

    pub fn sensitivity(&self, end_use: EndUse) -> Sensitivity {
        match end_use {
            EndUse::Heating => Sensitivity {
                heating: true,
                cooling: false,
            },
            EndUse::Cooling => Sensitivity {
                heating: false,
                cooling: true,
            },
            EndUse::Vent => Sensitivity {
                heating: true,
                cooling: true,
            },
            _ => Sensitivity::default(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

impl Default for EndUseCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_survey_spellings_are_remapped() {
        let catalog = EndUseCatalog::standard();
        assert_eq!(catalog.resolve("Cook"), Some(EndUse::Cooking));
        assert_eq!(catalog.resolve("OffEquip"), Some(EndUse::OfficeEquip));
        assert_eq!(catalog.resolve("HotWater"), Some(EndUse::WaterHeat));
        assert_eq!(catalog.resolve("Refrig"), Some(EndUse::Refrig));
        assert_eq!(catalog.resolve("Lasers"), None);
    }

    #[test]
    fn only_hvac_categories_are_temperature_sensitive() {
        let catalog = EndUseCatalog::standard();
        assert_eq!(
            catalog.sensitivity(EndUse::Vent),
            Sensitivity {
                heating: true,
                cooling: true
            }
        );
        assert!(catalog.sensitivity(EndUse::Heating).heating);
        assert!(!catalog.sensitivity(EndUse::Heating).cooling);
        assert!(catalog.sensitivity(EndUse::Cooling).cooling);
        for e in [EndUse::WaterHeat, EndUse::IntLight, EndUse::AirComp] {
            assert_eq!(catalog.sensitivity(e), Sensitivity::default());
        }
    }
}
