/// Matching key for a source string: case, whitespace runs, mnemonic
/// ampersands and trailing ellipses do not distinguish two UI strings.
pub fn normalize(text: &str) -> String {
    let mut s = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            if chars.peek() == Some(&'&') {
                chars.next();
                s.push('&');
            }
            continue;
        }
        s.push(c);
    }

    let mut s = s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");

    for suffix in ["...", "…"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.trim_end().to_string();
        }
    }

    s
}
