use url::Url;

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Remove every occurrence of a query parameter, keeping the rest of the URL verbatim
///
/// Returns the input unchanged when it is not a valid absolute URL.
pub fn remove_query_param(url: &str, name: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };

    let query = match parsed.query() {
        Some(query) => query.to_string(),
        None => return parsed.to_string(),
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(name))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.set_query(Some(&kept.join("&")));
    }

    parsed.to_string()
}

/// Shorten text for log output
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();

    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
