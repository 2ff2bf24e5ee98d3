use std::fmt;

/// The category table: each instrument and the sound it makes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Piano,
    Trumpet,
    Flute,
    Violin,
    Drum,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Piano,
        Instrument::Trumpet,
        Instrument::Flute,
        Instrument::Violin,
        Instrument::Drum,
    ];

    pub fn sound(self) -> &'static str {
        match self {
            Instrument::Piano => "ti-ta-ti",
            Instrument::Trumpet => "pouet",
            Instrument::Flute => "trulu",
            Instrument::Violin => "gzi-gzi",
            Instrument::Drum => "boum-boum",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Trumpet => "trumpet",
            Instrument::Flute => "flute",
            Instrument::Violin => "violin",
            Instrument::Drum => "drum",
        }
    }

    /// Resolve a wire sound token. Exact match only.
    pub fn from_sound(sound: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.sound() == sound)
    }

    /// Case-insensitive lookup by category name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_table() {
        assert_eq!(Instrument::from_sound("ti-ta-ti"), Some(Instrument::Piano));
        assert_eq!(Instrument::from_sound("pouet"), Some(Instrument::Trumpet));
        assert_eq!(Instrument::from_sound("trulu"), Some(Instrument::Flute));
        assert_eq!(Instrument::from_sound("gzi-gzi"), Some(Instrument::Violin));
        assert_eq!(Instrument::from_sound("boum-boum"), Some(Instrument::Drum));
        assert_eq!(Instrument::from_sound("POUET"), None);
        assert_eq!(Instrument::from_sound("kazoo"), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Instrument::from_name("Violin"), Some(Instrument::Violin));
        assert_eq!(Instrument::from_name(" drum "), Some(Instrument::Drum));
        assert_eq!(Instrument::from_name("kazoo"), None);
    }

    #[test]
    fn test_sound_name_roundtrip_is_total() {
        for i in Instrument::ALL {
            assert_eq!(Instrument::from_sound(i.sound()), Some(i));
            assert_eq!(Instrument::from_name(i.name()), Some(i));
            assert_eq!(i.to_string(), i.name());
        }
    }
}
