// Padmap Key Codes
// Raw keyboard codes (Linux input-event-codes.h numbering) and their names

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Raw code of a physical keyboard key.
///
/// Newtype around the evdev key number so raw codes cannot be confused with
/// pad indices or control values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct KeyCode(pub u16);

const KEY_NAMES: &[(u16, &str)] = &[
    (1, "ESC"),
    (2, "1"),
    (3, "2"),
    (4, "3"),
    (5, "4"),
    (6, "5"),
    (7, "6"),
    (8, "7"),
    (9, "8"),
    (10, "9"),
    (11, "0"),
    (12, "MINUS"),
    (13, "EQUAL"),
    (14, "BACKSPACE"),
    (15, "TAB"),
    (16, "Q"),
    (17, "W"),
    (18, "E"),
    (19, "R"),
    (20, "T"),
    (21, "Y"),
    (22, "U"),
    (23, "I"),
    (24, "O"),
    (25, "P"),
    (26, "LEFT_BRACE"),
    (27, "RIGHT_BRACE"),
    (28, "ENTER"),
    (29, "LEFT_CTRL"),
    (30, "A"),
    (31, "S"),
    (32, "D"),
    (33, "F"),
    (34, "G"),
    (35, "H"),
    (36, "J"),
    (37, "K"),
    (38, "L"),
    (39, "SEMICOLON"),
    (40, "APOSTROPHE"),
    (41, "GRAVE"),
    (42, "LEFT_SHIFT"),
    (43, "BACKSLASH"),
    (44, "Z"),
    (45, "X"),
    (46, "C"),
    (47, "V"),
    (48, "B"),
    (49, "N"),
    (50, "M"),
    (51, "COMMA"),
    (52, "DOT"),
    (53, "SLASH"),
    (54, "RIGHT_SHIFT"),
    (55, "KPASTERISK"),
    (56, "LEFT_ALT"),
    (57, "SPACE"),
    (58, "CAPSLOCK"),
    (59, "F1"),
    (60, "F2"),
    (61, "F3"),
    (62, "F4"),
    (63, "F5"),
    (64, "F6"),
    (65, "F7"),
    (66, "F8"),
    (67, "F9"),
    (68, "F10"),
    (69, "NUMLOCK"),
    (70, "SCROLLLOCK"),
    (71, "KP7"),
    (72, "KP8"),
    (73, "KP9"),
    (74, "KPMINUS"),
    (75, "KP4"),
    (76, "KP5"),
    (77, "KP6"),
    (78, "KPPLUS"),
    (79, "KP1"),
    (80, "KP2"),
    (81, "KP3"),
    (82, "KP0"),
    (83, "KPDOT"),
    (87, "F11"),
    (88, "F12"),
    (96, "KPENTER"),
    (97, "RIGHT_CTRL"),
    (98, "KPSLASH"),
    (100, "RIGHT_ALT"),
    (102, "HOME"),
    (103, "UP"),
    (104, "PAGE_UP"),
    (105, "LEFT"),
    (106, "RIGHT"),
    (107, "END"),
    (108, "DOWN"),
    (109, "PAGE_DOWN"),
    (110, "INSERT"),
    (111, "DELETE"),
    (119, "PAUSE"),
    (125, "LEFT_META"),
    (126, "RIGHT_META"),
];

fn names_by_code() -> &'static HashMap<u16, &'static str> {
    static BY_CODE: OnceLock<HashMap<u16, &'static str>> = OnceLock::new();
    BY_CODE.get_or_init(|| KEY_NAMES.iter().copied().collect())
}

fn codes_by_name() -> &'static HashMap<&'static str, u16> {
    static BY_NAME: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    BY_NAME.get_or_init(|| KEY_NAMES.iter().map(|(code, name)| (*name, *code)).collect())
}

impl KeyCode {
    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Display name, or "UNKNOWN" for codes outside the name table
    pub fn name(self) -> &'static str {
        names_by_code().get(&self.0).copied().unwrap_or("UNKNOWN")
    }

    /// Resolve a key by name.
    ///
    /// Accepts the table names case-insensitively, an optional `KEY_`
    /// prefix, and plain decimal codes (`"30"`).
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if let Some(code) = codes_by_name().get(upper.as_str()) {
            return Some(KeyCode(*code));
        }
        if let Some(stripped) = upper.strip_prefix("KEY_") {
            if let Some(code) = codes_by_name().get(stripped) {
                return Some(KeyCode(*code));
            }
        }
        upper.parse::<u16>().ok().map(KeyCode)
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        KeyCode(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match names_by_code().get(&self.0) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "KEY({})", self.0),
        }
    }
}

impl FromStr for KeyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyCode::from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(KeyCode::from_name("A"), Some(KeyCode(30)));
        assert_eq!(KeyCode::from_name("space"), Some(KeyCode(57)));
        assert_eq!(KeyCode::from_name("KEY_ESC"), Some(KeyCode(1)));
        assert_eq!(KeyCode::from_name("42"), Some(KeyCode(42)));
        assert_eq!(KeyCode::from_name("NOT_A_KEY"), None);
    }

    #[test]
    fn test_digit_names_are_keys_not_codes() {
        // "1" is the top-row key, not raw code 1 (ESC)
        assert_eq!(KeyCode::from_name("1"), Some(KeyCode(2)));
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyCode(17).to_string(), "W");
        assert_eq!(KeyCode(500).to_string(), "KEY(500)");
        assert_eq!(KeyCode(500).name(), "UNKNOWN");
    }
}
