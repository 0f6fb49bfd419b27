use shardwatch::{AlertDecision, SensorReading, ThresholdAggregator};

#[test]
fn readings_below_threshold_never_alert() {
    let mut aggregator = ThresholdAggregator::default();
    for _ in 0..6 {
        let decision = aggregator.observe(&SensorReading::new("A12345", 30));
        assert_eq!(decision, AlertDecision::NoAlert);
    }
    assert_eq!(aggregator.breach_count("A12345"), 0);
    assert_eq!(aggregator.tracked_sensors(), 0);
}

#[test]
fn threshold_is_strict() {
    let mut aggregator = ThresholdAggregator::default();
    aggregator.observe(&SensorReading::new("A12345", 50));
    assert_eq!(aggregator.breach_count("A12345"), 0);
    aggregator.observe(&SensorReading::new("A12345", 51));
    assert_eq!(aggregator.breach_count("A12345"), 1);
}

#[test]
fn alert_fires_after_sixth_breach_and_refires() {
    let mut aggregator = ThresholdAggregator::default();
    let reading = SensorReading::new("A12345", 55);
    for expected in 1..=5 {
        assert_eq!(aggregator.observe(&reading), AlertDecision::NoAlert);
        assert_eq!(aggregator.breach_count("A12345"), expected);
    }
    assert_eq!(aggregator.observe(&reading), AlertDecision::Alert);
    assert_eq!(aggregator.breach_count("A12345"), 6);
    // Not just the first crossing: every further breach re-fires.
    assert_eq!(aggregator.observe(&reading), AlertDecision::Alert);
    assert_eq!(aggregator.observe(&reading), AlertDecision::Alert);
    assert_eq!(aggregator.breach_count("A12345"), 8);
}

#[test]
fn non_breaching_reading_leaves_counter_unchanged() {
    let mut aggregator = ThresholdAggregator::new(50, 5);
    for _ in 0..4 {
        aggregator.observe(&SensorReading::new("A12345", 60));
    }
    aggregator.observe(&SensorReading::new("A12345", 20));
    assert_eq!(aggregator.breach_count("A12345"), 4);
    // The counter climbs again from where it stopped.
    aggregator.observe(&SensorReading::new("A12345", 60));
    assert_eq!(aggregator.breach_count("A12345"), 5);
}

#[test]
fn counters_are_per_sensor() {
    let mut aggregator = ThresholdAggregator::new(50, 2);
    for _ in 0..3 {
        aggregator.observe(&SensorReading::new("A12345", 90));
    }
    assert_eq!(aggregator.observe(&SensorReading::new("Z09876", 90)), AlertDecision::NoAlert);
    assert_eq!(aggregator.breach_count("A12345"), 3);
    assert_eq!(aggregator.breach_count("Z09876"), 1);
    assert_eq!(aggregator.tracked_sensors(), 2);
}

#[test]
fn custom_alert_after_is_honored() {
    let mut aggregator = ThresholdAggregator::new(0, 1);
    let reading = SensorReading::new("S", 1);
    assert_eq!(aggregator.observe(&reading), AlertDecision::NoAlert);
    assert_eq!(aggregator.observe(&reading), AlertDecision::Alert);
}
