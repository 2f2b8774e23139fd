// src/version.rs

//! Package version comparison
//!
//! Versions follow the pacman `[epoch:]pkgver[-pkgrel]` scheme. Comparison is
//! segment-wise: runs of digits compare numerically, runs of letters compare
//! lexically, and a numeric segment always beats an alphabetic one.

use std::cmp::Ordering;

/// Compare two full version strings (`epoch:version-release`)
pub fn compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (epoch_a, ver_a, rel_a) = split_evr(a);
    let (epoch_b, ver_b, rel_b) = split_evr(b);

    compare_segments(epoch_a, epoch_b)
        .then_with(|| compare_segments(ver_a, ver_b))
        .then_with(|| match (rel_a, rel_b) {
            (Some(ra), Some(rb)) => compare_segments(ra, rb),
            // A missing release never decides the comparison
            _ => Ordering::Equal,
        })
}

/// Split a version into epoch, version and optional release
///
/// The epoch defaults to "0" when absent or empty. The release is whatever
/// follows the last `-`.
fn split_evr(evr: &str) -> (&str, &str, Option<&str>) {
    let digits = evr.bytes().take_while(u8::is_ascii_digit).count();

    let (epoch, rest) = if evr.as_bytes().get(digits) == Some(&b':') {
        let epoch = &evr[..digits];
        (if epoch.is_empty() { "0" } else { epoch }, &evr[digits + 1..])
    } else {
        ("0", evr)
    };

    match rest.rfind('-') {
        Some(pos) => (epoch, &rest[..pos], Some(&rest[pos + 1..])),
        None => (epoch, rest, None),
    }
}

/// Compare two version fragments segment by segment
fn compare_segments(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < one.len() && j < two.len() {
        let sep_start_i = i;
        let sep_start_j = j;
        while i < one.len() && !one[i].is_ascii_alphanumeric() {
            i += 1;
        }
        while j < two.len() && !two[j].is_ascii_alphanumeric() {
            j += 1;
        }

        if i >= one.len() || j >= two.len() {
            break;
        }

        // Differing separator runs decide the comparison
        let sep_i = i - sep_start_i;
        let sep_j = j - sep_start_j;
        if sep_i != sep_j {
            return sep_i.cmp(&sep_j);
        }

        let numeric = one[i].is_ascii_digit();
        let end_i = segment_end(one, i, numeric);
        let end_j = segment_end(two, j, numeric);

        // Segment types differ: numeric is newer than alpha
        if end_j == j {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut seg_i = &one[i..end_i];
        let mut seg_j = &two[j..end_j];

        if numeric {
            seg_i = trim_leading_zeros(seg_i);
            seg_j = trim_leading_zeros(seg_j);

            match seg_i.len().cmp(&seg_j.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }

        match seg_i.cmp(seg_j) {
            Ordering::Equal => {}
            other => return other,
        }

        i = end_i;
        j = end_j;
    }

    let rest_i = &one[i..];
    let rest_j = &two[j..];

    if rest_i.is_empty() && rest_j.is_empty() {
        return Ordering::Equal;
    }

    // A trailing alpha segment never beats an empty string:
    // "1.0a" < "1.0", but "1.0.1" > "1.0"
    let first_i = rest_i.first().copied();
    let first_j = rest_j.first().copied();
    let a_empty_b_not_alpha = rest_i.is_empty() && !first_j.is_some_and(|c| c.is_ascii_alphabetic());
    let a_alpha = first_i.is_some_and(|c| c.is_ascii_alphabetic());

    if a_empty_b_not_alpha || a_alpha {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn segment_end(bytes: &[u8], start: usize, numeric: bool) -> usize {
    let mut end = start;
    while end < bytes.len()
        && if numeric {
            bytes[end].is_ascii_digit()
        } else {
            bytes[end].is_ascii_alphabetic()
        }
    {
        end += 1;
    }
    end
}

fn trim_leading_zeros(segment: &[u8]) -> &[u8] {
    let zeros = segment.iter().take_while(|&&c| c == b'0').count();
    &segment[zeros..]
}
