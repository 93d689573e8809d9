/// Splits a listing body into lines.
///
/// The body is trimmed first, so an empty or whitespace-only listing gives no
/// lines; each line loses its trailing `\r`.
pub fn split_listing(body: &str) -> Vec<String> {
    let body = body.trim();
    if body.is_empty() {
        return Vec::new();
    }
    body.split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}
