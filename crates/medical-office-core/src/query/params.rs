//! Query-string encoding.

/// Split `a=1&b=two` into decoded pairs. A leading `?` is ignored; keys
/// without `=` get an empty value.
pub fn parse_pairs(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap_or_default()
}

/// Join pairs into an `application/x-www-form-urlencoded` string, in order.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_encode_pairs() {
        let query = encode_pairs(&[
            pair("sortField", "Visits/Yr"),
            pair("sortField", "Appt. Reason"),
            pair("SearchString", "O'Neil & Co"),
        ]);
        assert_eq!(
            query,
            "sortField=Visits%2FYr&sortField=Appt.+Reason&SearchString=O%27Neil+%26+Co"
        );
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs("?SearchString=fred+f&DoctorID=2&flag&sortField=Visits%2FYr");
        assert_eq!(
            pairs,
            vec![
                pair("SearchString", "fred f"),
                pair("DoctorID", "2"),
                pair("flag", ""),
                pair("sortField", "Visits/Yr"),
            ]
        );
    }

    #[test]
    fn test_parse_keeps_malformed_escapes() {
        assert_eq!(parse_pairs("q=100%"), vec![pair("q", "100%")]);
        assert_eq!(parse_pairs("q=caf%C3%A9"), vec![pair("q", "café")]);
        assert!(parse_pairs("").is_empty());
    }

    #[test]
    fn test_round_trip_through_url() {
        let pairs = vec![pair("SearchString", "Flint stone"), pair("Coverage", "OHIP")];
        assert_eq!(parse_pairs(&encode_pairs(&pairs)), pairs);
    }
}
