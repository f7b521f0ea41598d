//! Flat pricing: nightly rate times nights, plus fixed fees.

use serde::{Deserialize, Serialize};

use crate::config::RentalUnit;
use crate::interval::DateInterval;
use crate::reservation::PartyComposition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub nights: u32,
    pub nightly_rate: u64,
    pub lodging: u64,
    pub cleaning_fee: u64,
    pub pet_fee: u64,
    pub total: u64,
}

pub fn quote(unit: &RentalUnit, interval: &DateInterval, party: &PartyComposition) -> Quote {
    let nights = interval.nights();
    let lodging = unit.nightly_rate * u64::from(nights);
    let pet_fee = if party.pets > 0 { unit.pet_fee } else { 0 };

    Quote {
        nights,
        nightly_rate: unit.nightly_rate,
        lodging,
        cleaning_fee: unit.cleaning_fee,
        pet_fee,
        total: lodging + unit.cleaning_fee + pet_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, interval};

    #[test]
    fn totals_nights_and_fees() {
        let config = config();
        let unit = config.unit("refugio-intimo").unwrap();
        let party = PartyComposition {
            adults: 2,
            children: 0,
            pets: 0,
        };

        let q = quote(unit, &interval("2025-03-10", "2025-03-13"), &party);
        assert_eq!(q.nights, 3);
        assert_eq!(q.lodging, 195_000);
        assert_eq!(q.pet_fee, 0);
        assert_eq!(q.total, 210_000);
    }

    #[test]
    fn pet_fee_is_flat_per_stay() {
        let config = config();
        let unit = config.unit("refugio-intimo").unwrap();
        let one = PartyComposition { adults: 1, children: 0, pets: 1 };
        let three = PartyComposition { adults: 1, children: 0, pets: 3 };
        let range = interval("2025-03-10", "2025-03-11");

        assert_eq!(quote(unit, &range, &one).pet_fee, 10_000);
        assert_eq!(quote(unit, &range, &one).total, quote(unit, &range, &three).total);
    }
}
