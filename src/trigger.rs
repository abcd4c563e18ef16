//! Addressing detection: `nick: question` or `nick, question`.

/// Outcome of checking one message for the addressing convention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriggerResult {
    /// Present only when the message was addressed to us.
    pub payload: Option<String>,
}

impl TriggerResult {
    pub fn is_addressed(&self) -> bool {
        self.payload.is_some()
    }

    fn ignored() -> Self {
        Self { payload: None }
    }

    fn addressed(payload: &str) -> Self {
        Self {
            payload: Some(payload.trim().to_string()),
        }
    }
}

/// Check whether `text` starts with `own_name` (case-insensitive) followed
/// immediately by `:` or `,`. The payload is the remainder, trimmed, and is
/// otherwise taken verbatim.
pub fn detect(own_name: &str, text: &str) -> TriggerResult {
    if own_name.is_empty() {
        return TriggerResult::ignored();
    }

    let mut rest = text.chars();
    for expected in own_name.chars() {
        match rest.next() {
            Some(actual) if same_letter(actual, expected) => {}
            _ => return TriggerResult::ignored(),
        }
    }

    match rest.as_str().strip_prefix([':', ',']) {
        Some(payload) => TriggerResult::addressed(payload),
        None => TriggerResult::ignored(),
    }
}

fn same_letter(left: char, right: char) -> bool {
    left == right || left.to_lowercase().eq(right.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_and_comma_both_address() {
        for separator in [":", ","] {
            let text = format!("relaybot42{separator}  what is rust? ");
            let result = detect("relaybot42", &text);
            assert!(result.is_addressed());
            assert_eq!(result.payload.as_deref(), Some("what is rust?"));
        }
    }

    const NAMES: &[&str] = &["relaybot42", "RelayBot42", "bot", "b", "Ünïcødé07", "日本bot", "a-b_c[]"];

    const TEXTS: &[&str] = &[
        "",
        "hello",
        "  padded on both sides  ",
        "\tTabbed\t",
        "colons: inside, and commas",
        ":leading colon",
        ", leading comma",
        "nested bot: still payload",
        "¿qué tal? 日本語",
        "multi\nline text",
    ];

    /// Flip the case of every other character so matching has to ignore it.
    fn mixed_case(name: &str) -> String {
        name.chars()
            .enumerate()
            .flat_map(|(index, c)| {
                if index % 2 == 0 {
                    c.to_uppercase().collect::<Vec<_>>()
                } else {
                    c.to_lowercase().collect::<Vec<_>>()
                }
            })
            .collect()
    }

    #[test]
    fn every_name_and_text_combination_is_addressed() {
        for name in NAMES {
            for text in TEXTS {
                for separator in [": ", ", ", ":", ","] {
                    for spelled in [name.to_string(), mixed_case(name)] {
                        let message = format!("{spelled}{separator}{text}");
                        let result = detect(name, &message);
                        assert_eq!(
                            result.payload.as_deref(),
                            Some(text.trim()),
                            "name {name:?}, message {message:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn every_prefixed_combination_is_ignored() {
        for name in NAMES {
            for text in TEXTS {
                for separator in [": ", ", "] {
                    for prefix in ["x", " ", "@", "日"] {
                        let message = format!("{prefix}{name}{separator}{text}");
                        assert!(
                            !detect(name, &message).is_addressed(),
                            "name {name:?}, message {message:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn matching_ignores_case() {
        let result = detect("RelayBot42", "relaybot42: hello");
        assert_eq!(result.payload.as_deref(), Some("hello"));
    }

    #[test]
    fn name_must_be_at_start() {
        assert!(!detect("relaybot42", "xrelaybot42: hello").is_addressed());
        assert!(!detect("relaybot42", "hey relaybot42: hello").is_addressed());
    }

    #[test]
    fn separator_must_follow_name_directly() {
        assert!(!detect("relaybot42", "relaybot42 hello").is_addressed());
        assert!(!detect("relaybot42", "relaybot42 : hello").is_addressed());
        assert!(!detect("relaybot", "relaybot42: hello").is_addressed());
        assert!(!detect("relaybot42", "relaybot42").is_addressed());
    }

    #[test]
    fn payload_is_taken_verbatim_after_separator() {
        let result = detect("bot", "bot:other: nested, text");
        assert_eq!(result.payload.as_deref(), Some("other: nested, text"));
    }

    #[test]
    fn empty_payload_is_still_addressed() {
        let result = detect("bot", "bot:   ");
        assert!(result.is_addressed());
        assert_eq!(result.payload.as_deref(), Some(""));
    }

    #[test]
    fn short_and_empty_inputs_are_ignored() {
        assert!(!detect("bot", "").is_addressed());
        assert!(!detect("bot", "bo").is_addressed());
        assert!(!detect("", ": hello").is_addressed());
    }

    #[test]
    fn multibyte_text_after_name_does_not_panic() {
        let result = detect("bot", "bot, ¿qué tal? 日本");
        assert_eq!(result.payload.as_deref(), Some("¿qué tal? 日本"));
        assert!(!detect("bøt", "bot: hi").is_addressed());
    }
}
