//! Access modes for registered signals.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// What peers may do with a registered signal.
    ///
    /// Modes combine with bitwise OR and parse from the compact letter
    /// form, e.g. `"re"` for a readable emitter.
    ///
    /// # Example
    /// ```
    /// use pacer::signal::Access;
    /// let mode = Access::parse("re").unwrap();
    /// assert_eq!(mode, Access::READ | Access::EMIT);
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Access: u8 {
        /// Peers may read the current value (`r`).
        const READ = 0b0000_0001;
        /// Peers may write the value (`w`).
        const WRITE = 0b0000_0010;
        /// The owner may emit the value to subscribers (`e`).
        const EMIT = 0b0000_0100;
        /// The signal may receive emitted values (`s`).
        const SIGNAL = 0b0000_1000;
    }
}

const LETTERS: [(char, Access); 4] = [
    ('r', Access::READ),
    ('w', Access::WRITE),
    ('e', Access::EMIT),
    ('s', Access::SIGNAL),
];

impl Access {
    /// Parse the letter form. Returns `None` on an unknown letter.
    pub fn parse(mode: &str) -> Option<Self> {
        mode.chars().try_fold(Self::empty(), |acc, c| {
            LETTERS
                .iter()
                .find(|(letter, _)| *letter == c)
                .map(|(_, flag)| acc | *flag)
        })
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, flag) in LETTERS {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Access::parse("re"), Some(Access::READ | Access::EMIT));
        assert_eq!(Access::parse("rs"), Some(Access::READ | Access::SIGNAL));
        assert_eq!(Access::parse(""), Some(Access::empty()));
        assert_eq!(Access::parse("rx"), None);
    }

    #[test]
    fn test_display_is_canonical() {
        let mode = Access::parse("ewr").unwrap();
        assert_eq!(mode.to_string(), "rwe");
    }
}
