use std::cmp::Ordering;

/// Allocates the next `PREFIX###` id: one more than the highest numeric
/// suffix already used with `prefix`. Ids with other prefixes or
/// non-numeric suffixes are ignored.
pub fn next_sequential_id<'a, I>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!("{}{:03}", prefix, highest + 1)
}

/// Orders ids by prefix, then by numeric suffix, so `REQ999` sorts before
/// `REQ1000`. Ids without a numeric suffix follow those with one; exact text
/// breaks ties.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    fn split(id: &str) -> (&str, Option<u64>) {
        let at = id.find(|c: char| c.is_ascii_digit()).unwrap_or(id.len());
        let (prefix, suffix) = id.split_at(at);
        (prefix, suffix.parse().ok())
    }

    let (prefix_a, n_a) = split(a);
    let (prefix_b, n_b) = split(b);
    prefix_a
        .cmp(prefix_b)
        .then_with(|| match (n_a, n_b) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}

pub const REQUEST_PREFIX: &str = "REQ";
pub const RECEIVE_PREFIX: &str = "REC";
pub const PROCESS_PREFIX: &str = "STE";
pub const ISSUE_PREFIX: &str = "ISS";
pub const KIT_PREFIX: &str = "KIT";
pub const STOCK_PREFIX: &str = "STK";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_is_001() {
        assert_eq!(next_sequential_id("REQ", std::iter::empty()), "REQ001");
    }

    #[test]
    fn uses_highest_suffix_not_count() {
        // REQ002 was removed; count + 1 would reuse REQ003
        let ids = ["REQ001", "REQ003"];
        assert_eq!(next_sequential_id("REQ", ids.iter().copied()), "REQ004");
    }

    #[test]
    fn ignores_foreign_and_malformed_ids() {
        let ids = ["KIT009", "REQabc", "REQ002", "legacy"];
        assert_eq!(next_sequential_id("REQ", ids.iter().copied()), "REQ003");
    }

    #[test]
    fn grows_past_three_digits() {
        let ids = ["STE999"];
        assert_eq!(next_sequential_id("STE", ids.iter().copied()), "STE1000");
    }

    #[test]
    fn numeric_suffixes_sort_as_numbers() {
        let mut ids = vec!["REQ1000", "REQ010", "legacy", "REQ999", "KIT002", "REQ002"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["KIT002", "REQ002", "REQ010", "REQ999", "REQ1000", "legacy"]);
    }
}
