//! Model output cleanup before JSON parsing.
//!
//! Models are told not to wrap their answer in markdown, and some still do.

/// Strip surrounding whitespace, a leading ```` ```json ```` (or bare ```` ``` ````)
/// fence, a trailing ```` ``` ```` fence, and whitespace just inside the outer braces.
///
/// Total and idempotent: the steps repeat until nothing changes, and every step
/// only removes characters.
pub fn normalize(raw: &str) -> String {
  let mut current = raw.trim().to_string();
  loop {
    let next = normalize_once(&current);
    if next == current {
      return current;
    }
    current = next;
  }
}

fn normalize_once(s: &str) -> String {
  let mut t = s.trim();
  if let Some(rest) = strip_prefix_ignore_case(t, "```json") {
    t = rest;
  } else if let Some(rest) = t.strip_prefix("```") {
    t = rest;
  }
  if let Some(rest) = t.strip_suffix("```") {
    t = rest;
  }
  let t = t.trim();

  if t.len() >= 2 && t.starts_with('{') && t.ends_with('}') {
    let inner = &t[1..t.len() - 1];
    let trimmed = inner.trim();
    if trimmed.len() != inner.len() {
      return format!("{{{trimmed}}}");
    }
  }
  t.to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
  let head = s.get(..prefix.len())?;
  head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
