//! `$$` expansion applied to every value token before it is stored.

use std::borrow::Cow;

const PID_MARKER: &str = "$$";

/// Replace every non-overlapping `$$` in `token` with the decimal `pid`.
///
/// The scan runs left to right and resumes right after each match, so `$$$$`
/// expands twice and `$$$` expands once followed by a literal `$`. A token
/// without a marker is returned borrowed.
pub fn expand(token: &str, pid: u32) -> Cow<'_, str> {
    if !token.contains(PID_MARKER) {
        return Cow::Borrowed(token);
    }
    let pid = pid.to_string();
    let mut out = String::with_capacity(token.len() + pid.len());
    let mut rest = token;
    while let Some(at) = rest.find(PID_MARKER) {
        out.push_str(&rest[..at]);
        out.push_str(&pid);
        rest = &rest[at + PID_MARKER.len()..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}
