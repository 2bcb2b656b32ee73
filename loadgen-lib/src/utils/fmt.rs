use num_format::{Locale, ToFormattedString as _};

/// Group the digits of `n` by thousands, e.g. `10000` as `10,000`.
#[inline]
pub fn thousands(n: u64) -> String {
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        for (n, expected) in [
            (0, "0"),
            (999, "999"),
            (1_000, "1,000"),
            (10_000, "10,000"),
            (1_234_567, "1,234,567"),
        ] {
            assert_eq!(thousands(n), expected, "{n}");
        }
    }
}
