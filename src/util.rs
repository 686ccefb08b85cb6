//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// No nested or conditional logic; unknown placeholders are left as-is.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings (model prompts and responses).
/// Cuts on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// First and last `n` characters of `s`. Both are the whole string when it is short.
pub fn head_tail(s: &str, n: usize) -> (String, String) {
  let count = s.chars().count();
  let head: String = s.chars().take(n).collect();
  let tail: String = s.chars().skip(count.saturating_sub(n)).collect();
  (head, tail)
}
