use thiserror::Error;

/// ASCII separator between the sensor id and the temperature field.
const FIELD_SEPARATOR: char = ':';

/// Decoded form of a record payload: one temperature sample from one sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    pub sensor_id: String,
    pub temperature: i64,
}

impl SensorReading {
    pub fn new(sensor_id: impl Into<String>, temperature: i64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            temperature,
        }
    }
}

/// Error surfaced when a record payload does not match the wire format.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("payload is missing the `:` separator")]
    MissingSeparator,
    #[error("payload has {0} fields, expected sensor id and temperature")]
    TooManyFields(usize),
    #[error("temperature field {0:?} is not a base-10 integer")]
    InvalidTemperature(String),
}

/// Decodes a `<sensor_id>:<temperature>` payload.
///
/// Exactly one separator is required. An empty sensor id is accepted as a
/// degenerate but valid key; the temperature must parse as a signed base-10
/// integer.
pub fn decode(payload: &[u8]) -> Result<SensorReading, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    match fields.as_slice() {
        [_] => Err(DecodeError::MissingSeparator),
        [sensor_id, temperature] => {
            let temperature = temperature
                .parse::<i64>()
                .map_err(|_| DecodeError::InvalidTemperature(temperature.to_string()))?;
            Ok(SensorReading::new(*sensor_id, temperature))
        }
        extra => Err(DecodeError::TooManyFields(extra.len())),
    }
}

/// Encodes a reading into the wire format. Exact inverse of [`decode`] for any
/// reading whose sensor id contains no separator.
pub fn encode(reading: &SensorReading) -> Vec<u8> {
    format!(
        "{}{}{}",
        reading.sensor_id, FIELD_SEPARATOR, reading.temperature
    )
    .into_bytes()
}
