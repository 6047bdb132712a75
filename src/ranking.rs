use crate::schema::DimensionalBucket;
use serde::{Deserialize, Serialize};

/// A ranked dimension: the summary slice and the full drill-down list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RankedDimension {
    pub top: Vec<DimensionalBucket>,
    pub all: Vec<DimensionalBucket>,
}

impl RankedDimension {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Expects `ranked` already in rank order; ties were resolved upstream by
/// first-seen order, so the cut at `n` is deterministic.
pub fn select_top(ranked: Vec<DimensionalBucket>, n: usize) -> RankedDimension {
    let top = ranked.iter().take(n).cloned().collect();
    RankedDimension { top, all: ranked }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(key: &str, count: usize) -> DimensionalBucket {
        DimensionalBucket {
            key: key.to_string(),
            label: key.to_string(),
            count,
            revenue: 0.0,
            percentage: 0.0,
        }
    }

    #[test]
    fn test_top_slice_keeps_order() {
        let ranked: Vec<_> = ["a", "b", "c", "d", "e", "f", "g"]
            .iter()
            .map(|k| bucket(k, 1))
            .collect();
        let result = select_top(ranked, 5);

        assert_eq!(result.all.len(), 7);
        let keys: Vec<&str> = result.top.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_short_list_is_returned_whole() {
        let result = select_top(vec![bucket("only", 2)], 5);
        assert_eq!(result.top, result.all);
        assert!(!result.is_empty());
        assert!(select_top(Vec::new(), 5).is_empty());
    }
}
