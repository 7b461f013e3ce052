use std::collections::BTreeMap;

/// Supported-pair reference data: pair symbol → feed stream symbol.
///
/// Loaded once at startup from the embedded table; pairs not listed here are
/// rejected before any alert is written.
#[derive(Debug, Clone)]
pub struct PairTable {
    by_pair: BTreeMap<String, String>,
    by_stream: BTreeMap<String, String>,
}

const PAIRS_JSON: &str = include_str!("pairs.json");

impl PairTable {
    pub fn load() -> Self {
        let by_pair: BTreeMap<String, String> =
            serde_json::from_str(PAIRS_JSON).expect("embedded pair table is valid JSON");
        Self::from_map(by_pair)
    }

    pub fn from_map(by_pair: BTreeMap<String, String>) -> Self {
        let by_stream = by_pair
            .iter()
            .map(|(pair, stream)| (stream.clone(), pair.clone()))
            .collect();
        PairTable { by_pair, by_stream }
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.by_pair.contains_key(pair)
    }

    pub fn stream_symbol(&self, pair: &str) -> Option<&str> {
        self.by_pair.get(pair).map(String::as_str)
    }

    pub fn pair_for_stream(&self, stream_symbol: &str) -> Option<&str> {
        self.by_stream.get(stream_symbol).map(String::as_str)
    }

    /// Pair symbols, optionally filtered by a case-insensitive substring.
    pub fn list(&self, filter: Option<&str>) -> Vec<String> {
        let needle = filter.map(str::to_uppercase);
        self.by_pair
            .keys()
            .filter(|pair| match &needle {
                Some(n) => pair.contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_loads_and_maps_both_ways() {
        let pairs = PairTable::load();
        assert!(pairs.contains("BTCUSD"));
        assert!(!pairs.contains("BTCUSDT"));
        assert_eq!(pairs.stream_symbol("BTCUSD"), Some("BTCUSDT"));
        assert_eq!(pairs.pair_for_stream("BTCUSDT"), Some("BTCUSD"));
    }

    #[test]
    fn list_filters_by_substring() {
        let pairs = PairTable::load();
        let eur = pairs.list(Some("eur"));
        assert!(eur.contains(&"BTCEUR".to_string()));
        assert!(eur.iter().all(|p| p.contains("EUR")));
        assert!(!pairs.list(None).is_empty());
    }
}
