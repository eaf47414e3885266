//! Locale-driven shop defaults.

/// Maps a locale tag to the store currency.
///
/// Only four locales are mapped; any other locale leaves the currency at
/// the e-commerce plugin's default.
pub fn currency_for_locale(locale: &str) -> Option<&'static str> {
    match locale {
        "en_US" => Some("USD"),
        "zh_TW" => Some("TWD"),
        "zh_CN" => Some("CNY"),
        "zh_HK" => Some("HKD"),
        _ => None,
    }
}

/// Display titles for the built-in payment gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayLabels {
    pub bacs: &'static str,
    pub cod: &'static str,
    pub paypal: &'static str,
}

impl GatewayLabels {
    /// Title for a built-in gateway id.
    pub fn title(&self, gateway: &str) -> Option<&'static str> {
        match gateway {
            "bacs" => Some(self.bacs),
            "cod" => Some(self.cod),
            "paypal" => Some(self.paypal),
            _ => None,
        }
    }
}

const EN_LABELS: GatewayLabels = GatewayLabels {
    bacs: "Direct bank transfer",
    cod: "Cash on delivery",
    paypal: "PayPal",
};

/// Localized gateway titles, with English for unmapped locales.
pub fn gateway_labels(locale: &str) -> GatewayLabels {
    match locale {
        "zh_TW" => GatewayLabels {
            bacs: "銀行轉帳",
            cod: "貨到付款",
            paypal: "PayPal 付款",
        },
        "zh_CN" => GatewayLabels {
            bacs: "银行转账",
            cod: "货到付款",
            paypal: "PayPal 支付",
        },
        "zh_HK" => GatewayLabels {
            bacs: "銀行轉賬",
            cod: "貨到付款",
            paypal: "PayPal 付款",
        },
        _ => EN_LABELS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_mapping() {
        assert_eq!(currency_for_locale("en_US"), Some("USD"));
        assert_eq!(currency_for_locale("zh_TW"), Some("TWD"));
        assert_eq!(currency_for_locale("zh_CN"), Some("CNY"));
        assert_eq!(currency_for_locale("zh_HK"), Some("HKD"));
    }

    #[test]
    fn test_currency_unmapped_locales() {
        assert_eq!(currency_for_locale("fr_FR"), None);
        assert_eq!(currency_for_locale("en_GB"), None);
        assert_eq!(currency_for_locale("zh"), None);
        assert_eq!(currency_for_locale(""), None);
    }

    #[test]
    fn test_gateway_labels_localized() {
        assert_eq!(gateway_labels("zh_TW").cod, "貨到付款");
        assert_eq!(gateway_labels("zh_CN").bacs, "银行转账");
        assert_eq!(gateway_labels("en_US"), EN_LABELS);
    }

    #[test]
    fn test_every_builtin_gateway_has_a_title() {
        use crate::services::gateways::BUILTIN_GATEWAYS;

        let labels = gateway_labels("zh_HK");
        for id in BUILTIN_GATEWAYS {
            assert!(labels.title(id).is_some(), "{} has no title", id);
        }
        assert_eq!(labels.title("paypal"), Some("PayPal 付款"));
        assert_eq!(labels.title("stripe"), None);
    }

    #[test]
    fn test_gateway_labels_fallback_english() {
        assert_eq!(gateway_labels("de_DE"), EN_LABELS);
    }
}
