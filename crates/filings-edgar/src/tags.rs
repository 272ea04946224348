//! XBRL tag aliases for the canonical metrics.

use filings_core::MetricName;

/// Returns the `us-gaap` tags reported for a metric, in precedence order.
///
/// Companies use different tags for the same concept. The first tag present in a
/// payload is used; later aliases are never merged in.
#[must_use]
pub const fn aliases(name: MetricName) -> &'static [&'static str] {
    match name {
        MetricName::Revenue => &[
            "Revenue",
            "Revenues",
            "SalesRevenueNet",
            "SalesRevenueGoodsNet",
        ],
        MetricName::NetIncome => &["NetIncomeLoss", "ProfitLoss"],
        MetricName::TotalAssets => &["Assets"],
        MetricName::TotalLiabilities => &["Liabilities"],
        MetricName::OperatingIncome => &["OperatingIncomeLoss"],
        MetricName::Eps => &["EarningsPerShareBasic", "EarningsPerShareDiluted"],
        MetricName::CashAndEquivalents => &["CashAndCashEquivalentsAtCarryingValue"],
        MetricName::Goodwill => &["Goodwill"],
        MetricName::RetainedEarnings => &["RetainedEarningsAccumulatedDeficit"],
        MetricName::StockholdersEquity => &["StockholdersEquity"],
    }
}

/// Finds the canonical metric a tag is an alias of.
#[must_use]
pub fn metric_for_tag(tag: &str) -> Option<MetricName> {
    MetricName::ALL
        .into_iter()
        .find(|name| aliases(*name).iter().any(|alias| *alias == tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_metric_has_aliases() {
        for name in MetricName::ALL {
            assert!(!aliases(name).is_empty(), "no aliases for {name}");
        }
    }

    #[test]
    fn test_revenue_precedence() {
        assert_eq!(
            aliases(MetricName::Revenue),
            &["Revenue", "Revenues", "SalesRevenueNet", "SalesRevenueGoodsNet"]
        );
    }

    #[test]
    fn test_metric_for_tag() {
        assert_eq!(metric_for_tag("ProfitLoss"), Some(MetricName::NetIncome));
        assert_eq!(
            metric_for_tag("EarningsPerShareDiluted"),
            Some(MetricName::Eps)
        );
        assert_eq!(metric_for_tag("AccountsPayableCurrent"), None);
    }
}
