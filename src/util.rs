//! Shared utility helpers.

/// Case-insensitive starts_with check without allocating.
#[inline]
pub fn starts_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

/// Convert an identifier to snake_case. Acronym runs stay together
/// (`UserID` becomes `user_id`, `XMLPayload` becomes `xml_payload`).
pub fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if c.is_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let prev_breaks = prev
                .map(|p| p.is_lowercase() || p.is_ascii_digit())
                .unwrap_or(false);
            let next_breaks = chars
                .get(i + 1)
                .map(|n| n.is_lowercase())
                .unwrap_or(false);
            if prev.is_some() && prev != Some('_') && (prev_breaks || next_breaks) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
