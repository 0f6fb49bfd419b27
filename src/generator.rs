use crate::codec::{encode, SensorReading};
use crate::processor::StreamRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sensor ids alternated by the generator, matching the historical fixture
/// fleet.
pub const SENSOR_IDS: [&str; 2] = ["A12345", "Z09876"];

/// Reading counters inside `(HOT_WINDOW_START, HOT_WINDOW_END)` with an even
/// counter produce elevated temperatures.
pub const HOT_WINDOW_START: u64 = 100;
pub const HOT_WINDOW_END: u64 = 150;

/// Deterministic sensor reading source for the demo harness and tests.
///
/// Temperatures are drawn as a 0..10 jitter on a 30-degree baseline; inside
/// the hot window the baseline rises to 50, so the even-numbered sensor
/// accumulates breaches there.
#[derive(Debug)]
pub struct ReadingGenerator {
    rng: StdRng,
    counter: u64,
}

impl ReadingGenerator {
    /// Creates a generator with a fixed seed so runs are reproducible.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            counter: 0,
        }
    }

    /// Number of readings produced so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Produces the next reading, alternating sensors per counter parity.
    pub fn next_reading(&mut self) -> SensorReading {
        let counter = self.counter;
        self.counter += 1;
        let sensor_id = SENSOR_IDS[(counter % 2) as usize];
        let jitter: i64 = self.rng.gen_range(0..10);
        let hot = counter > HOT_WINDOW_START && counter < HOT_WINDOW_END && counter % 2 == 0;
        let temperature = if hot { jitter + 50 } else { jitter + 30 };
        SensorReading::new(sensor_id, temperature)
    }

    /// Encodes the next `len` readings as stream records starting at
    /// `start_sequence`.
    pub fn batch(&mut self, start_sequence: u64, len: usize) -> Vec<StreamRecord> {
        (0..len)
            .map(|offset| {
                let reading = self.next_reading();
                StreamRecord::new(start_sequence + offset as u64, encode(&reading))
            })
            .collect()
    }
}
