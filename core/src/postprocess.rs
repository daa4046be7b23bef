//! Answer clean-up before display and storage.

/// Trim `answer` and end it with sentence punctuation.
///
/// A non-empty answer not already ending in `.`, `!` or `?` gets a period.
/// Applying it twice changes nothing.
pub fn normalize(answer: &str) -> String {
    let trimmed = answer.trim();
    if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
        return trimmed.to_string();
    }
    format!("{trimmed}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("already punctuated."), "already punctuated.");
        assert_eq!(normalize(" needs a period "), "needs a period.");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("Really?"), "Really?");
    }

    #[test]
    fn test_idempotent() {
        for answer in ["x", " Update now ", "Done!", "", "1) Patch 2) Reboot"] {
            let once = normalize(answer);
            assert_eq!(normalize(&once), once);
        }
    }
}
