//! Number and markup formatting shared by the views

/// Format a number with a fixed count of decimals
pub fn format_number(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Format an optional number, rendering "-" when absent
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format_number(v, decimals),
        None => "-".to_string(),
    }
}

/// Escape text before placing it inside HTML markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
