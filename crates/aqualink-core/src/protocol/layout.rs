use crate::sensor::SensorKind;

pub const FIELD_SEPARATOR: char = ',';
pub const PAIR_SEPARATOR: char = ':';

pub const CSV_MIN_FIELDS: usize = 3;
pub const CSV_FIELD_ORDER: [SensorKind; CSV_MIN_FIELDS] = [
    SensorKind::Ph,
    SensorKind::Temperature,
    SensorKind::Turbidity,
];

/// Uppercase keys of the key-value dialect.
pub const KEY_TABLE: [(&str, SensorKind); 4] = [
    ("PH", SensorKind::Ph),
    ("TEMP", SensorKind::Temperature),
    ("TURB", SensorKind::Turbidity),
    ("TDS", SensorKind::Tds),
];

pub const DECIMAL_POINT: char = '.';

pub const DEFAULT_TERMINATOR: &str = "\n";
pub const DEFAULT_MAX_FRAME_LEN: usize = 256;
