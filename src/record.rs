use crate::error;

/// Canonical date format accepted by the index.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical time format accepted by the index (24-hour, minute precision).
pub const TIME_FORMAT: &str = "%H:%M";

/// One of the five measured energy channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    SelfConsumption,
    Export,
    Import,
    Load,
    Production,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::SelfConsumption,
        Channel::Export,
        Channel::Import,
        Channel::Load,
        Channel::Production,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::SelfConsumption => "self-consumption",
            Channel::Export => "export",
            Channel::Import => "import",
            Channel::Load => "load",
            Channel::Production => "production",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts English names as well as the Polish names used by inverter exports
/// (`autokonsumpcja`, `eksport`, `import`, `pobor`, `produkcja`).
impl std::str::FromStr for Channel {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "self-consumption" | "self_consumption" | "selfconsumption" | "autokonsumpcja" => {
                Ok(Channel::SelfConsumption)
            }
            "export" | "eksport" => Ok(Channel::Export),
            "import" => Ok(Channel::Import),
            "load" | "pobor" | "pobór" => Ok(Channel::Load),
            "production" | "produkcja" => Ok(Channel::Production),
            _ => Err(error::Error::UnknownChannel(s.to_string())),
        }
    }
}

/// A single measurement point: date, time and the five channel readings in watts.
///
/// Date and time are typed, so a record that exists always has a valid bucket.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub date: chrono::NaiveDate,
    pub time: chrono::NaiveTime,
    pub self_consumption: f64,
    pub export: f64,
    pub import: f64,
    pub load: f64,
    pub production: f64,
}

impl Record {
    pub fn new(
        date: chrono::NaiveDate,
        time: chrono::NaiveTime,
        self_consumption: f64,
        export: f64,
        import: f64,
        load: f64,
        production: f64,
    ) -> Self {
        Record {
            date,
            time,
            self_consumption,
            export,
            import,
            load,
            production,
        }
    }

    /// Builds a record from canonical `YYYY-MM-DD` / `HH:MM` strings.
    ///
    /// # Arguments
    /// * `date` - Date string, e.g. "2023-01-01".
    /// * `time` - Time string, e.g. "12:30".
    /// * `values` - Channel readings in `Channel::ALL` order.
    ///
    /// # Errors
    /// * `InvalidDate` / `InvalidTime` if either string does not match the canonical format.
    pub fn parse(date: &str, time: &str, values: [f64; 5]) -> error::Result<Self> {
        let date = parse_date(date)?;
        let time = parse_time(time)?;
        let [self_consumption, export, import, load, production] = values;
        Ok(Record::new(date, time, self_consumption, export, import, load, production))
    }

    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::SelfConsumption => self.self_consumption,
            Channel::Export => self.export,
            Channel::Import => self.import,
            Channel::Load => self.load,
            Channel::Production => self.production,
        }
    }

    pub fn values(&self) -> ChannelValues {
        ChannelValues {
            self_consumption: self.self_consumption,
            export: self.export,
            import: self.import,
            load: self.load,
            production: self.production,
        }
    }

    pub fn timestamp(&self) -> chrono::NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}, self-consumption: {:.2}, export: {:.2}, import: {:.2}, load: {:.2}, production: {:.2}",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT),
            self.self_consumption,
            self.export,
            self.import,
            self.load,
            self.production,
        )
    }
}

/// One value per channel, produced by the all-channel aggregations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelValues {
    pub self_consumption: f64,
    pub export: f64,
    pub import: f64,
    pub load: f64,
    pub production: f64,
}

impl ChannelValues {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::SelfConsumption => self.self_consumption,
            Channel::Export => self.export,
            Channel::Import => self.import,
            Channel::Load => self.load,
            Channel::Production => self.production,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Channel) -> f64) -> Self {
        ChannelValues {
            self_consumption: f(Channel::SelfConsumption),
            export: f(Channel::Export),
            import: f(Channel::Import),
            load: f(Channel::Load),
            production: f(Channel::Production),
        }
    }

    pub fn zip_with(&self, other: &ChannelValues, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        ChannelValues::from_fn(|c| f(self.get(c), other.get(c)))
    }
}

impl std::ops::Add for ChannelValues {
    type Output = ChannelValues;

    fn add(self, rhs: ChannelValues) -> ChannelValues {
        self.zip_with(&rhs, |a, b| a + b)
    }
}

pub fn parse_date(s: &str) -> error::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| error::Error::InvalidDate(s.to_string()))
}

pub fn parse_time(s: &str) -> error::Result<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|_| error::Error::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_date_and_time() {
        let r = Record::parse("2023-01-01", "12:30", [100.0, 50.0, 30.0, 120.0, 80.0]).unwrap();
        assert_eq!(r.date, chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(r.time, chrono::NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert_eq!(r.value(Channel::SelfConsumption), 100.0);
        assert_eq!(r.value(Channel::Export), 50.0);
        assert_eq!(r.value(Channel::Import), 30.0);
        assert_eq!(r.value(Channel::Load), 120.0);
        assert_eq!(r.value(Channel::Production), 80.0);
    }

    #[test]
    fn rejects_malformed_date_and_time() {
        assert!(matches!(
            Record::parse("01.01.2023", "12:30", [0.0; 5]),
            Err(error::Error::InvalidDate(_))
        ));
        assert!(matches!(
            Record::parse("2023-02-30", "12:30", [0.0; 5]),
            Err(error::Error::InvalidDate(_))
        ));
        assert!(matches!(
            Record::parse("2023-01-01", "24:10", [0.0; 5]),
            Err(error::Error::InvalidTime(_))
        ));
        assert!(matches!(
            Record::parse("2023-01-01", "noon", [0.0; 5]),
            Err(error::Error::InvalidTime(_))
        ));
    }

    #[test]
    fn channel_accepts_english_and_polish_names() {
        assert_eq!("autokonsumpcja".parse::<Channel>().unwrap(), Channel::SelfConsumption);
        assert_eq!("Self-Consumption".parse::<Channel>().unwrap(), Channel::SelfConsumption);
        assert_eq!("eksport".parse::<Channel>().unwrap(), Channel::Export);
        assert_eq!("pobor".parse::<Channel>().unwrap(), Channel::Load);
        assert_eq!("POBÓR".parse::<Channel>().unwrap(), Channel::Load);
        assert_eq!("PRODUKCJA".parse::<Channel>().unwrap(), Channel::Production);
        assert!("voltage".parse::<Channel>().is_err());
    }

    #[test]
    fn display_uses_canonical_formats() {
        let r = Record::parse("2023-01-01", "06:05", [1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(r.to_string().starts_with("2023-01-01 06:05, self-consumption: 1.00"));
    }
}
