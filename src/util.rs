//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Round to two decimals (percentages and rates).
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

/// `part / whole * 100`, rounded, 0 when `whole` is 0.
pub fn percent(part: f64, whole: f64) -> f64 {
  if whole <= 0.0 { 0.0 } else { round2(part / whole * 100.0) }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
  if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 }
}

/// Human formatting for scores: `18` rather than `18.0`, `17.5` kept as is.
pub fn fmt_score(x: f64) -> String {
  if x.fract() == 0.0 { format!("{:.0}", x) } else { format!("{}", x) }
}

/// Escape text interpolated into HTML email bodies.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

/// Loose email shape check: one `@` with something on both sides and a dot in the domain.
pub fn looks_like_email(s: &str) -> bool {
  let s = s.trim();
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        && !s.chars().any(char::is_whitespace)
    }
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_all_keys() {
    assert_eq!(fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]), "x and y and x");
  }

  #[test]
  fn percent_handles_zero_whole() {
    assert_eq!(percent(3.0, 0.0), 0.0);
    assert_eq!(percent(1.0, 3.0), 33.33);
  }

  #[test]
  fn scores_format_without_trailing_zero() {
    assert_eq!(fmt_score(18.0), "18");
    assert_eq!(fmt_score(17.5), "17.5");
  }

  #[test]
  fn email_shape() {
    assert!(looks_like_email("parent@example.com"));
    assert!(!looks_like_email("parent@"));
    assert!(!looks_like_email("no-at.example.com"));
    assert!(!looks_like_email("a b@example.com"));
  }

  #[test]
  fn html_is_escaped() {
    assert_eq!(escape_html("<b>Tom & \"Jerry\"</b>"), "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;");
  }
}
