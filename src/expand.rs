//! Process-id substitution for command words.

/// Marker replaced by the interpreter's own process id.
pub const PID_MARKER: &str = "$$";

/// Replace every `$$` in `word` with `pid`.
///
/// The scan is a single left-to-right pass with greedy leftmost matching, so
/// `$$$` becomes the pid followed by a literal `$`. A lone `$` is copied as-is.
pub fn expand_pid(word: &str, pid: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut rest = word;
    while let Some(at) = rest.find(PID_MARKER) {
        out.push_str(&rest[..at]);
        out.push_str(pid);
        rest = &rest[at + PID_MARKER.len()..];
    }
    out.push_str(rest);
    out
}
