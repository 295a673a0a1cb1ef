use crate::metadata::SensorKind;

/// Logical ingest channel, one per physical quantity.
///
/// Channel labels are the second segment of the MQTT topic
/// (`{source_id}/{channel}`). Unknown labels are dropped upstream without
/// error, so parsing returns `Option` rather than a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Pressure,
    Temperature,
    Battery,
    SignalStrength,
    Location,
    ResetLog,
    BurstEvent,
    AcousticBurst,
    AcousticSummary,
}

impl Channel {
    pub const ALL: [Channel; 9] = [
        Channel::Pressure,
        Channel::Temperature,
        Channel::Battery,
        Channel::SignalStrength,
        Channel::Location,
        Channel::ResetLog,
        Channel::BurstEvent,
        Channel::AcousticBurst,
        Channel::AcousticSummary,
    ];

    pub fn parse(label: &str) -> Option<Channel> {
        match label {
            "pressure" => Some(Channel::Pressure),
            "temperature" => Some(Channel::Temperature),
            "battery" => Some(Channel::Battery),
            "signal-strength" => Some(Channel::SignalStrength),
            "location" => Some(Channel::Location),
            "reset-log" => Some(Channel::ResetLog),
            "burst-event" => Some(Channel::BurstEvent),
            "acoustic-burst" => Some(Channel::AcousticBurst),
            "acoustic-summary" => Some(Channel::AcousticSummary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Pressure => "pressure",
            Channel::Temperature => "temperature",
            Channel::Battery => "battery",
            Channel::SignalStrength => "signal-strength",
            Channel::Location => "location",
            Channel::ResetLog => "reset-log",
            Channel::BurstEvent => "burst-event",
            Channel::AcousticBurst => "acoustic-burst",
            Channel::AcousticSummary => "acoustic-summary",
        }
    }

    /// Sensor kind measured on this channel, if it carries measurements.
    pub fn sensor_kind(&self) -> Option<SensorKind> {
        match self {
            Channel::Pressure | Channel::BurstEvent => Some(SensorKind::Pressure),
            Channel::Temperature => Some(SensorKind::Temperature),
            Channel::Battery => Some(SensorKind::Battery),
            Channel::SignalStrength => Some(SensorKind::SignalStrength),
            Channel::AcousticBurst | Channel::AcousticSummary => Some(SensorKind::Acoustic),
            Channel::Location | Channel::ResetLog => None,
        }
    }
}
