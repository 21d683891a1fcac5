use crate::sim::{SimTime, TimeSpec};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn unit_constructors_scale_to_nanoseconds_and_saturate() {
    assert_eq!(SimTime::from_millis(250), SimTime(250_000_000));
    assert_eq!(SimTime::from_secs(2), SimTime::from_millis(2_000));
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_parses_units_and_decimals() {
    assert_eq!(SimTime::parse("15"), Some(SimTime(15)));
    assert_eq!(SimTime::parse("3us"), Some(SimTime::from_micros(3)));
    assert_eq!(SimTime::parse("2ms"), Some(SimTime::from_millis(2)));
    assert_eq!(SimTime::parse("1.5s"), Some(SimTime(1_500_000_000)));
    assert_eq!(SimTime::parse(" 10 s "), Some(SimTime::from_secs(10)));
    assert_eq!(SimTime::parse("ms"), None);
    assert_eq!(SimTime::parse("5 minutes"), None);
}

#[test]
fn time_spec_parses_fixed_range_and_random() {
    assert_eq!(TimeSpec::parse("1s"), Some(TimeSpec::Fixed(SimTime::from_secs(1))));
    assert_eq!(
        TimeSpec::parse("1ms..3ms"),
        Some(TimeSpec::Range {
            min: SimTime::from_millis(1),
            max: SimTime::from_millis(3)
        })
    );
    assert_eq!(TimeSpec::parse("random"), Some(TimeSpec::Random));
    assert_eq!(TimeSpec::parse("3ms..1ms"), None);
}

#[test]
fn random_time_stays_inside_the_horizon() {
    let mut rng = StdRng::seed_from_u64(42);
    let horizon = SimTime::from_millis(10);
    for _ in 0..100 {
        let t = TimeSpec::Random.sample(&mut rng, horizon);
        assert!(t < horizon);
    }
    assert_eq!(TimeSpec::Random.sample(&mut rng, SimTime::ZERO), SimTime::ZERO);
}
