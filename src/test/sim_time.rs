use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_millis(3).as_nanos(), 3_000_000);
}

#[test]
fn sim_time_conversions_and_addition_saturate() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime(u64::MAX) + SimTime(1), SimTime(u64::MAX));
    assert_eq!(SimTime::from_micros(2) + SimTime(5), SimTime(2_005));
}

#[test]
fn sim_time_orders_and_prints_nanoseconds() {
    assert!(SimTime::ZERO < SimTime::from_micros(1));
    assert_eq!(SimTime::default(), SimTime::ZERO);
    assert_eq!(SimTime::from_micros(7).to_string(), "7000ns");
}
