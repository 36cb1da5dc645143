use sha2::{Digest, Sha256};

const MAX_STEM_LEN: usize = 80;

/// File-system safe stem for a post: the sanitized slug, or
/// `post-{short hash of title}` when nothing usable is left of it.
pub fn entry_stem(slug: &str, title: &str) -> String {
    sanitize_slug(slug).unwrap_or_else(|| format!("post-{}", short_hash(title)))
}

fn sanitize_slug(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return None;
    }

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.len() > MAX_STEM_LEN {
        let mut cut = MAX_STEM_LEN;
        while !compacted.is_char_boundary(cut) {
            cut -= 1;
        }
        compacted.truncate(cut);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    Some(compacted)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}
