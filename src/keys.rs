//! Named-key definitions for trusted keyboard injection, US layout.

use crate::cdp::input::modifiers;

/// Everything `Input.dispatchKeyEvent` needs for one named key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    /// DOM key value, e.g. `Enter`.
    pub key: String,
    /// DOM code value, e.g. `KeyA`.
    pub code: String,
    /// Windows virtual key code.
    pub key_code: i64,
    /// Text the key produces, when it produces any.
    pub text: Option<String>,
}

/// Looks up a key by name. Named keys are matched case-insensitively; a
/// single character stands for itself.
pub fn lookup(name: &str) -> Option<KeyDefinition> {
    let named = |key: &str, code: &str, key_code: i64, text: Option<&str>| {
        Some(KeyDefinition {
            key: key.to_string(),
            code: code.to_string(),
            key_code,
            text: text.map(str::to_string),
        })
    };

    match name.to_ascii_lowercase().as_str() {
        "enter" | "return" => named("Enter", "Enter", 13, Some("\r")),
        "tab" => named("Tab", "Tab", 9, None),
        "escape" | "esc" => named("Escape", "Escape", 27, None),
        "backspace" => named("Backspace", "Backspace", 8, None),
        "delete" | "del" => named("Delete", "Delete", 46, None),
        "space" => named(" ", "Space", 32, Some(" ")),
        "arrowup" | "up" => named("ArrowUp", "ArrowUp", 38, None),
        "arrowdown" | "down" => named("ArrowDown", "ArrowDown", 40, None),
        "arrowleft" | "left" => named("ArrowLeft", "ArrowLeft", 37, None),
        "arrowright" | "right" => named("ArrowRight", "ArrowRight", 39, None),
        "home" => named("Home", "Home", 36, None),
        "end" => named("End", "End", 35, None),
        "pageup" => named("PageUp", "PageUp", 33, None),
        "pagedown" => named("PageDown", "PageDown", 34, None),
        "f1" => named("F1", "F1", 112, None),
        "f2" => named("F2", "F2", 113, None),
        "f3" => named("F3", "F3", 114, None),
        "f4" => named("F4", "F4", 115, None),
        "f5" => named("F5", "F5", 116, None),
        "f6" => named("F6", "F6", 117, None),
        "f7" => named("F7", "F7", 118, None),
        "f8" => named("F8", "F8", 119, None),
        "f9" => named("F9", "F9", 120, None),
        "f10" => named("F10", "F10", 121, None),
        "f11" => named("F11", "F11", 122, None),
        "f12" => named("F12", "F12", 123, None),
        _ => {
            let mut chars = name.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            Some(char_definition(c))
        }
    }
}

fn char_definition(c: char) -> KeyDefinition {
    let code = match c {
        'a'..='z' => format!("Key{}", c.to_ascii_uppercase()),
        'A'..='Z' => format!("Key{c}"),
        '0'..='9' => format!("Digit{c}"),
        _ => String::new(),
    };
    let key_code = match c {
        'a'..='z' => c.to_ascii_uppercase() as i64,
        'A'..='Z' | '0'..='9' => c as i64,
        _ => 0,
    };
    KeyDefinition {
        key: c.to_string(),
        code,
        key_code,
        text: Some(c.to_string()),
    }
}

/// Parses modifier names into the `Input` domain bit field.
pub fn parse_modifiers(names: &[String]) -> Option<i64> {
    let mut bits = 0;
    for name in names {
        bits |= match name.to_ascii_lowercase().as_str() {
            "alt" | "option" => modifiers::ALT,
            "ctrl" | "control" => modifiers::CTRL,
            "meta" | "cmd" | "command" => modifiers::META,
            "shift" => modifiers::SHIFT,
            _ => return None,
        };
    }
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_are_case_insensitive() {
        let enter = lookup("ENTER").unwrap();
        assert_eq!(enter.key, "Enter");
        assert_eq!(enter.key_code, 13);
        assert_eq!(enter.text.as_deref(), Some("\r"));
        assert_eq!(lookup("PageDown").unwrap().key_code, 34);
    }

    #[test]
    fn single_characters_stand_for_themselves() {
        let a = lookup("a").unwrap();
        assert_eq!(a.code, "KeyA");
        assert_eq!(a.key_code, 65);
        assert_eq!(a.text.as_deref(), Some("a"));
        let five = lookup("5").unwrap();
        assert_eq!(five.code, "Digit5");
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(lookup("NotAKey").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn modifier_bits_combine() {
        let bits = parse_modifiers(&["ctrl".to_string(), "Shift".to_string()]).unwrap();
        assert_eq!(bits, modifiers::CTRL | modifiers::SHIFT);
        assert!(parse_modifiers(&["hyper".to_string()]).is_none());
        assert_eq!(parse_modifiers(&[]).unwrap(), 0);
    }
}
