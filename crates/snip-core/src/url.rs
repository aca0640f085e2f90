/// Scheme prepended to URLs that arrive without one.
pub const DEFAULT_SCHEME: &str = "https://";

const ACCEPTED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Normalizes a URL so that it always carries an `http://` or `https://` scheme.
///
/// The check is a case-sensitive prefix match; anything else gets
/// [`DEFAULT_SCHEME`] prepended. No other validation is performed.
pub fn normalize_url(url: &str) -> String {
    if ACCEPTED_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        url.to_owned()
    } else {
        format!("{DEFAULT_SCHEME}{url}")
    }
}
