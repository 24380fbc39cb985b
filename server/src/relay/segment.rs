//! Message Segmentation
//!
//! Splits a reply into chunks whose UTF-8 length fits the platform's
//! per-message limit. Boundaries fall on line breaks where possible and on
//! character boundaries otherwise.

/// Split `text` into segments of at most `max_bytes` UTF-8 bytes each.
///
/// Lines are packed greedily; the `\n` joining two lines inside a segment
/// counts towards the budget and the `\n` at a segment boundary is dropped.
/// A line longer than the budget is split character by character and its
/// tail stays open so following lines can join it. A character is never
/// split; one that is wider than the entire budget gets a segment of its own.
/// Empty segments are never produced.
pub fn segment(text: &str, max_bytes: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut open = false;

    for line in text.split('\n') {
        let needed = if open {
            current.len() + 1 + line.len()
        } else {
            line.len()
        };

        if needed <= max_bytes {
            if open {
                current.push('\n');
            }
            current.push_str(line);
            open = true;
            continue;
        }

        if open {
            flush(&mut segments, &mut current);
        }
        open = true;

        if line.len() <= max_bytes {
            current.push_str(line);
            continue;
        }

        for ch in line.chars() {
            if !current.is_empty() && current.len() + ch.len_utf8() > max_bytes {
                flush(&mut segments, &mut current);
            }
            current.push(ch);
        }
    }

    flush(&mut segments, &mut current);
    segments
}

fn flush(segments: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        segments.push(std::mem::take(current));
    }
}

/// Prefix each segment with an `[i/n]` marker line when there is more than one.
///
/// The marker is not part of the segment budget; callers reserve headroom for it.
pub fn with_markers(segments: Vec<String>) -> Vec<String> {
    let total = segments.len();
    if total <= 1 {
        return segments;
    }
    segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| format!("[{}/{total}]\n{segment}", i + 1))
        .collect()
}
