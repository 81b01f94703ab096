use std::path::Path;

use url::Url;

/// Keep `url` only if it carries the `verifier` query parameter Canvas needs
/// to serve file content; otherwise return the empty sentinel.
pub fn usable_download_url(url: &str) -> String {
    let has_verifier = Url::parse(url)
        .map(|parsed| parsed.query_pairs().any(|(key, _)| key == "verifier"))
        .unwrap_or(false);

    if has_verifier {
        url.to_string()
    } else {
        String::new()
    }
}

/// A small HTML page that redirects the browser to `url`.
pub fn redirect_document(url: &str) -> String {
    format!(
        "<html>\n    <head>\n        <meta http-equiv=\"refresh\" content=\"0; url={}\" />\n    </head>\n</html>\n",
        escape_attribute(url)
    )
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Whether the extension of `file_name` appears in `excluded`, entries
/// being accepted with or without the leading dot.
pub fn is_format_excluded(file_name: &str, excluded: &[String]) -> bool {
    let Some(ext) = Path::new(file_name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    excluded
        .iter()
        .any(|format| format.trim_start_matches('.').to_lowercase() == ext)
}
