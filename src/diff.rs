use std::collections::HashSet;

/// Returns the items of `a` that do not appear in `b`.
///
/// Order and duplicates of `a` are preserved.
pub fn diff(a: &[String], b: &[String]) -> Vec<String> {
    let present: HashSet<&str> = b.iter().map(String::as_str).collect();
    a.iter()
        .filter(|item| !present.contains(item.as_str()))
        .cloned()
        .collect()
}
