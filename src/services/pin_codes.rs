//! Reader for the decoder's `PIN=function` code file

use std::path::Path;

use tracing::{debug, info, warn};

use crate::protocols::dtmf::DtmfSequence;
use crate::Result;

/// Longest PIN the decoder stores.
pub const MAX_PIN_LENGTH: usize = 16;

/// Entries beyond this are ignored by the decoder.
pub const MAX_PINS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinEntry {
    pub pin: DtmfSequence,
    pub function: String,
}

/// PINs configured on the decoder, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinDirectory {
    entries: Vec<PinEntry>,
}

impl PinDirectory {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let directory = Self::parse(&contents);
        info!("Loaded {} PIN codes from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// Parse code file text. Malformed lines are skipped the way the decoder
    /// skips them.
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();

        for (line_num, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l)) {
            if entries.len() >= MAX_PINS {
                warn!("PIN limit of {} reached, ignoring the rest of the file", MAX_PINS);
                break;
            }

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some((pin, function)) = line.split_once('=') else {
                warn!("Invalid line {}: missing '='", line_num);
                continue;
            };
            let pin = pin.trim();
            let function = function.trim();

            if pin.is_empty() || function.is_empty() {
                warn!("Invalid line {}: empty PIN or function", line_num);
                continue;
            }
            if pin.chars().count() > MAX_PIN_LENGTH {
                warn!("Line {}: PIN too long (max {})", line_num, MAX_PIN_LENGTH);
                continue;
            }

            match pin.parse::<DtmfSequence>() {
                Ok(pin) => {
                    debug!("Loaded PIN: {} -> {}", pin, function);
                    entries.push(PinEntry {
                        pin,
                        function: function.to_string(),
                    });
                }
                Err(e) => warn!("Line {}: {}", line_num, e),
            }
        }

        Self { entries }
    }

    /// Function bound to `pin`, first entry wins.
    pub fn lookup(&self, pin: &DtmfSequence) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| &entry.pin == pin)
            .map(|entry| entry.function.as_str())
    }

    pub fn entries(&self) -> &[PinEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(s: &str) -> DtmfSequence {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_code_file() {
        let directory = PinDirectory::parse(
            "; PIN codes\n\
             1234=open_door\n\
             \n\
             \x20 5678 = unlock_garage \r\n\
             ;C23D=commented_example\n\
             *A1B=special_code\n",
        );

        assert_eq!(directory.len(), 3);
        assert_eq!(directory.lookup(&pin("1234")), Some("open_door"));
        assert_eq!(directory.lookup(&pin("5678")), Some("unlock_garage"));
        assert_eq!(directory.lookup(&pin("*A1B")), Some("special_code"));
        assert_eq!(directory.lookup(&pin("C23D")), None);
    }

    #[test]
    fn test_skips_malformed_lines() {
        let directory = PinDirectory::parse(
            "no_equals_here\n=orphan\n1111=\n12345678901234567=too_long\n12E4=bad_digit\n42=answer\n",
        );

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.entries()[0].function, "answer");
    }

    #[test]
    fn test_first_entry_wins() {
        let directory = PinDirectory::parse("99=first\n99=second\n");
        assert_eq!(directory.lookup(&pin("99")), Some("first"));
    }

    #[test]
    fn test_entry_limit() {
        let text: String = (0..150).map(|i| format!("{}=f{}\n", 1000 + i, i)).collect();
        let directory = PinDirectory::parse(&text);
        assert_eq!(directory.len(), MAX_PINS);
    }
}
