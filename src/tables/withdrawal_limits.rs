//! Legislated RRIF/LIF withdrawal limits by attained age

/// RRIF (and LIF) minimum withdrawal factors by attained age
#[derive(Debug, Clone, PartialEq)]
pub struct RrifMinimumTable {
    /// Minimum rates by age, ascending, starting at the first age a minimum applies
    rates: Vec<(u32, f64)>,
    /// Age from which `flat_rate` applies
    flat_rate_age: u32,
    flat_rate: f64,
}

impl Default for RrifMinimumTable {
    fn default() -> Self {
        Self {
            rates: vec![
                (71, 0.0528),
                (72, 0.0540),
                (73, 0.0553),
                (74, 0.0567),
                (75, 0.0582),
                (76, 0.0598),
                (77, 0.0617),
                (78, 0.0636),
                (79, 0.0658),
                (80, 0.0682),
                (81, 0.0708),
                (82, 0.0738),
                (83, 0.0771),
                (84, 0.0808),
                (85, 0.0851),
                (86, 0.0899),
                (87, 0.0955),
                (88, 0.1021),
                (89, 0.1099),
                (90, 0.1192),
                (91, 0.1306),
                (92, 0.1449),
                (93, 0.1634),
                (94, 0.1879),
            ],
            flat_rate_age: 95,
            flat_rate: 0.20,
        }
    }
}

impl RrifMinimumTable {
    /// Create from loaded CSV rows; the last row is taken as the flat ceiling rate
    pub fn from_loaded(rates: &[(u32, f64)]) -> Self {
        let mut rates = rates.to_vec();
        rates.sort_by_key(|(age, _)| *age);
        let (flat_rate_age, flat_rate) = match rates.pop() {
            Some(last) => last,
            None => return Self::default(),
        };
        Self { rates, flat_rate_age, flat_rate }
    }

    /// First age at which a minimum withdrawal is required
    pub fn start_age(&self) -> u32 {
        self.rates.first().map(|(age, _)| *age).unwrap_or(self.flat_rate_age)
    }

    /// Minimum withdrawal rate at `age`; 0 before the start age
    pub fn get_rate(&self, age: u32) -> f64 {
        if age < self.start_age() {
            return 0.0;
        }
        if age >= self.flat_rate_age {
            return self.flat_rate;
        }
        self.rates
            .iter()
            .find(|(a, _)| *a == age)
            .map(|(_, r)| *r)
            .unwrap_or(self.flat_rate)
    }

    /// Minimum withdrawal for an opening balance at `age`
    pub fn minimum_withdrawal(&self, opening_balance: f64, age: u32) -> f64 {
        (opening_balance * self.get_rate(age)).max(0.0)
    }

    pub fn rows(&self) -> Vec<(u32, f64)> {
        let mut rows = self.rates.clone();
        rows.push((self.flat_rate_age, self.flat_rate));
        rows
    }
}

/// LIF maximum withdrawal factors by attained age
#[derive(Debug, Clone, PartialEq)]
pub struct LifMaximumTable {
    /// Maximum factors by age, ascending
    rates: Vec<(u32, f64)>,
    /// Factor used once age passes the end of the table
    cap_rate: f64,
}

impl Default for LifMaximumTable {
    fn default() -> Self {
        Self {
            rates: vec![
                (55, 0.0651),
                (56, 0.0657),
                (57, 0.0663),
                (58, 0.0670),
                (59, 0.0677),
                (60, 0.0685),
                (61, 0.0694),
                (62, 0.0704),
                (63, 0.0714),
                (64, 0.0726),
                (65, 0.0738),
                (66, 0.0752),
                (67, 0.0767),
                (68, 0.0783),
                (69, 0.0802),
                (70, 0.0822),
                (71, 0.0845),
                (72, 0.0871),
                (73, 0.0900),
                (74, 0.0934),
                (75, 0.0971),
                (76, 0.1015),
                (77, 0.1066),
                (78, 0.1125),
                (79, 0.1196),
                (80, 0.1282),
                (81, 0.1387),
                (82, 0.1519),
                (83, 0.1690),
                (84, 0.1919),
                (85, 0.2240),
                (86, 0.2723),
                (87, 0.3529),
                (88, 0.5146),
                (89, 1.0),
                (90, 1.0),
            ],
            cap_rate: 1.0,
        }
    }
}

impl LifMaximumTable {
    /// Create from loaded CSV rows; the oldest row's factor becomes the cap
    pub fn from_loaded(rates: &[(u32, f64)]) -> Self {
        let mut rates = rates.to_vec();
        rates.sort_by_key(|(age, _)| *age);
        match rates.last() {
            Some(&(_, cap_rate)) => Self { rates, cap_rate },
            None => Self::default(),
        }
    }

    /// Maximum withdrawal factor at `age`. Below the table the LIF is locked (0).
    pub fn get_factor(&self, age: u32) -> f64 {
        let Some(&(first_age, _)) = self.rates.first() else {
            return 0.0;
        };
        if age < first_age {
            return 0.0;
        }
        self.rates
            .iter()
            .find(|(a, _)| *a == age)
            .map(|(_, r)| *r)
            .unwrap_or(self.cap_rate)
    }

    /// Maximum withdrawal for an opening balance at `age`
    pub fn maximum_withdrawal(&self, opening_balance: f64, age: u32) -> f64 {
        (opening_balance * self.get_factor(age)).max(0.0)
    }

    pub fn rows(&self) -> &[(u32, f64)] {
        &self.rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrif_minimum_rates() {
        let rrif = RrifMinimumTable::default();

        // No minimum before 71
        assert_eq!(rrif.get_rate(65), 0.0);
        assert_eq!(rrif.get_rate(70), 0.0);

        assert!((rrif.get_rate(71) - 0.0528).abs() < 1e-12);
        assert!((rrif.get_rate(80) - 0.0682).abs() < 1e-12);
        assert!((rrif.get_rate(94) - 0.1879).abs() < 1e-12);

        // Flat ceiling from 95
        assert_eq!(rrif.get_rate(95), 0.20);
        assert_eq!(rrif.get_rate(110), 0.20);

        assert!((rrif.minimum_withdrawal(100_000.0, 71) - 5_280.0).abs() < 1e-9);
    }

    #[test]
    fn test_lif_maximum_factors() {
        let lif = LifMaximumTable::default();

        // Locked in below 55
        assert_eq!(lif.get_factor(50), 0.0);
        assert!((lif.get_factor(55) - 0.0651).abs() < 1e-12);
        assert!((lif.get_factor(71) - 0.0845).abs() < 1e-12);

        // Capped beyond 90
        assert_eq!(lif.get_factor(91), 1.0);
        assert_eq!(lif.get_factor(105), 1.0);
    }

    #[test]
    fn test_lif_maximum_exceeds_rrif_minimum() {
        let rrif = RrifMinimumTable::default();
        let lif = LifMaximumTable::default();

        for age in 71..=100 {
            assert!(lif.get_factor(age) >= rrif.get_rate(age), "age {}", age);
        }
    }

    #[test]
    fn test_from_loaded_roundtrips_rows() {
        let rrif = RrifMinimumTable::default();
        let reloaded = RrifMinimumTable::from_loaded(&rrif.rows());
        assert_eq!(rrif, reloaded);

        let lif = LifMaximumTable::default();
        assert_eq!(LifMaximumTable::from_loaded(lif.rows()), lif);
    }
}
