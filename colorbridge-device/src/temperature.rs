//! Thermistor conversion and probe filtering

/// Raw reading at 0 °C
pub const RAW_OFFSET: f64 = 5500.0;

/// Raw units per degree
pub const RAW_PER_DEGREE: f64 = 100.0;

/// Lowest plausible reading; anything below is a sensor fault
pub const MIN_CELSIUS: f64 = -50.0;

/// Highest plausible reading; anything above is a sensor fault
pub const MAX_CELSIUS: f64 = 350.0;

/// Probes taken by an instantaneous read
pub const PROBE_COUNT: usize = 10;

/// Attempts allowed before an instantaneous read is abandoned
pub const MAX_PROBE_ATTEMPTS: usize = PROBE_COUNT * 2;

/// Convert a raw reading to °C, `None` outside the plausible range
pub fn calc_temperature(raw: u32) -> Option<f64> {
    let celsius = (raw as f64 - RAW_OFFSET) / RAW_PER_DEGREE;
    (MIN_CELSIUS..=MAX_CELSIUS)
        .contains(&celsius)
        .then_some(celsius)
}

/// Median of the probes, taking the element at index `len / 2` after sorting
///
/// For an even count this is the upper of the two middle values.
pub fn median(probes: &[f64]) -> Option<f64> {
    if probes.is_empty() {
        return None;
    }
    let mut sorted = probes.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[sorted.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_temperature() {
        assert_eq!(calc_temperature(5500), Some(0.0));
        assert_eq!(calc_temperature(8500), Some(30.0));
        assert_eq!(calc_temperature(500), Some(-50.0));
        assert_eq!(calc_temperature(40500), Some(350.0));
    }

    #[test]
    fn test_calc_temperature_out_of_range() {
        assert_eq!(calc_temperature(40501), None);
        assert_eq!(calc_temperature(499), None);
        assert_eq!(calc_temperature(0), None);
        assert_eq!(calc_temperature(u16::MAX as u32), None);
    }

    #[test]
    fn test_median_even_takes_upper_middle() {
        let probes = [5.0, 1.0, 3.0, 2.0, 4.0, 6.0, 9.0, 8.0, 7.0, 10.0];
        assert_eq!(median(&probes), Some(6.0));
    }

    #[test]
    fn test_median_odd_and_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }
}
