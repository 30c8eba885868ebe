use std::{cmp::Ordering, fmt};

/// One segment of a column name: a maximal run of ASCII digits or of anything else.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyToken {
    /// Digit run with leading zeros stripped, so that length-then-lexicographic
    /// comparison equals numeric comparison for runs of any size.
    Number(String),
    /// Non-digit run, uppercased.
    Text(String),
}

impl KeyToken {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Self::Number("0".to_string())
        } else {
            Self::Number(trimmed.to_string())
        }
    }

    fn text(run: &str) -> Self {
        Self::Text(run.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Number(digits) => digits,
            Self::Text(text) => text,
        }
    }
}

impl Ord for KeyToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            // Mixed kinds at one position: compare the stringified tokens.
            _ => self.as_str().cmp(other.as_str()),
        }
    }
}

impl PartialOrd for KeyToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional token sequence of a name; compares lexicographically.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct AlphanumericKey(Vec<KeyToken>);

impl AlphanumericKey {
    pub fn tokens(&self) -> &[KeyToken] {
        &self.0
    }
}

/// Splits `name` into alternating digit / non-digit runs.
///
/// `"D10"` becomes `[Text("D"), Number("10")]`, which places it after `"D9"`.
pub fn alphanumeric_key(name: &str) -> AlphanumericKey {
    let mut tokens = Vec::new();
    let mut run_start = 0;
    let mut run_is_digit: Option<bool> = None;

    for (offset, ch) in name.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match run_is_digit {
            Some(current) if current != is_digit => {
                tokens.push(make_token(&name[run_start..offset], current));
                run_start = offset;
            }
            _ => {}
        }
        run_is_digit = Some(is_digit);
    }
    if let Some(current) = run_is_digit {
        tokens.push(make_token(&name[run_start..], current));
    }

    AlphanumericKey(tokens)
}

fn make_token(run: &str, is_digit: bool) -> KeyToken {
    if is_digit {
        KeyToken::number(run)
    } else {
        KeyToken::text(run)
    }
}

pub fn compare_columns(a: &str, b: &str) -> Ordering {
    alphanumeric_key(a).cmp(&alphanumeric_key(b))
}

/// Stable sort of column names by their alphanumeric key.
pub fn sort_columns<S: AsRef<str>>(names: &[S], descending: bool) -> Vec<String> {
    let mut keyed: Vec<(AlphanumericKey, &str)> = names
        .iter()
        .map(|name| (alphanumeric_key(name.as_ref()), name.as_ref()))
        .collect();
    if descending {
        keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
    } else {
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    }
    keyed.into_iter().map(|(_, name)| name.to_string()).collect()
}
