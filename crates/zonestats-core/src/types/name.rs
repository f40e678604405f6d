//! Hostname canonicalization.
//!
//! Every name that crosses a crate boundary is lower-case and fully
//! qualified (trailing dot), so string equality is name equality.

/// Canonical form of a domain name: lower-case with a trailing dot.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut canonical = trimmed.to_ascii_lowercase();
    if !canonical.ends_with('.') {
        canonical.push('.');
    }
    canonical
}

/// Whether `host` is `origin` itself or a strict subdomain of it.
///
/// Both arguments are canonicalized first. The root zone contains every name.
#[must_use]
pub fn is_in_bailiwick(host: &str, origin: &str) -> bool {
    let host = canonical_name(host);
    let origin = canonical_name(origin);

    if origin == "." || host == origin {
        return true;
    }

    host.strip_suffix(origin.as_str())
        .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
}
