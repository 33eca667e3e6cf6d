//! Mailbox addresses from `From:`/`To:`/`Cc:`/`Delivered-To:` (RFC 5322 §3.4).

use std::fmt;

/// One parsed address.
///
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailAddress {
    pub display_name: String,
    pub address: String,
}

impl EmailAddress {
    /// Parse a single, already-decoded address.
    ///
    /// Anything that does not look like `name <addr>` is kept verbatim as
    /// the address.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self {
                    display_name: unquote(&trimmed[..open]),
                    address: trimmed[open + 1..close].trim().to_string(),
                };
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Parse an address list.
    ///
    /// Commas inside quotes or angle brackets do not split, and group
    /// syntax (`team: a@x.com, b@x.com;`) is flattened into its members.
    /// Empty entries such as `undisclosed-recipients:;` are dropped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;
        let mut escaped = false;

        let mut flush = |current: &mut String| {
            let addr = Self::parse(current);
            if !addr.address.is_empty() {
                results.push(addr);
            }
            current.clear();
        };

        for ch in raw.chars() {
            if escaped {
                current.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' if in_quotes => {
                    escaped = true;
                    current.push(ch);
                }
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                // "group-name:" opens a group; the name itself is not an address
                ':' if !in_quotes && !in_angle => current.clear(),
                ',' | ';' if !in_quotes && !in_angle => flush(&mut current),
                _ => current.push(ch),
            }
        }
        flush(&mut current);

        results
    }
}

/// Strip surrounding double quotes, undo `\"` escapes, and trim.
fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").trim().to_string(),
        None => trimmed.to_string(),
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}
