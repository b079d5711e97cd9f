use quarry_core::error::AppError;
use quarry_core::models::{ExtractedFields, FieldSpec};
use quarry_core::traits::FieldExtractor;
use scraper::{Html, Selector};

/// Field extractor that interprets locators as CSS selectors.
///
/// Each field takes the whitespace-trimmed text of the first matching
/// element, which may be empty. No match leaves the field absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorExtractor;

impl SelectorExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Check that every locator in `fields` (and `ready_locator`) parses as a
    /// CSS selector, so bad configuration fails at startup instead of
    /// silently producing empty columns.
    pub fn validate(fields: &FieldSpec, ready_locator: &str) -> Result<(), AppError> {
        for (name, locator) in fields.iter() {
            parse_selector(locator)
                .map_err(|e| AppError::ConfigError(format!("field '{name}': {e}")))?;
        }
        parse_selector(ready_locator)
            .map_err(|e| AppError::ConfigError(format!("ready_locator: {e}")))?;
        Ok(())
    }
}

impl FieldExtractor for SelectorExtractor {
    fn extract(&self, document: &str, fields: &FieldSpec) -> ExtractedFields {
        let html = Html::parse_document(document);

        fields
            .iter()
            .map(|(name, locator)| {
                let value = match parse_selector(locator) {
                    Ok(selector) => html
                        .select(&selector)
                        .next()
                        .map(|element| element.text().collect::<String>().trim().to_string()),
                    Err(e) => {
                        tracing::warn!(field = %name, error = %e, "Skipping field with invalid selector");
                        None
                    }
                };
                (name.to_string(), value)
            })
            .collect()
    }
}

/// Whether `locator` matches at least one element of `document`.
pub(crate) fn matches(document: &str, locator: &str) -> Result<bool, AppError> {
    let selector = parse_selector(locator).map_err(AppError::ConfigError)?;
    let html = Html::parse_document(document);
    Ok(html.select(&selector).next().is_some())
}

fn parse_selector(locator: &str) -> Result<Selector, String> {
    Selector::parse(locator).map_err(|e| format!("invalid CSS selector '{locator}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"
        <html>
          <head><title>  Desk Lamp | Shop </title></head>
          <body>
            <h1 id="productTitle">
                Desk Lamp
            </h1>
            <span class="a-price-whole">24</span>
            <span class="a-price-whole">99</span>
            <span id="acrCustomerReviewText">1,204 ratings</span>
            <div class="empty">   </div>
          </body>
        </html>"#;

    fn spec(entries: &[(&str, &str)]) -> FieldSpec {
        FieldSpec::new(entries.iter().copied()).unwrap()
    }

    #[test]
    fn test_extracts_trimmed_text() {
        let fields = spec(&[
            ("title", "title"),
            ("name", "#productTitle"),
            ("reviews", "#acrCustomerReviewText"),
        ]);
        let extracted = SelectorExtractor.extract(PRODUCT, &fields);

        assert_eq!(
            extracted,
            vec![
                ("title".to_string(), Some("Desk Lamp | Shop".to_string())),
                ("name".to_string(), Some("Desk Lamp".to_string())),
                ("reviews".to_string(), Some("1,204 ratings".to_string())),
            ]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let extracted = SelectorExtractor.extract(PRODUCT, &spec(&[("price", ".a-price-whole")]));
        assert_eq!(extracted[0].1.as_deref(), Some("24"));
    }

    #[test]
    fn test_missing_field_is_absent() {
        let extracted = SelectorExtractor.extract(PRODUCT, &spec(&[("stock", "#availability")]));
        assert_eq!(extracted[0], ("stock".to_string(), None));
    }

    #[test]
    fn test_whitespace_only_match_is_empty_not_absent() {
        let extracted = SelectorExtractor.extract(
            r#"<span class="badge">  </span>"#,
            &spec(&[("badge", ".badge"), ("empty", ".empty")]),
        );
        assert_eq!(extracted[0], ("badge".to_string(), Some(String::new())));
        assert_eq!(extracted[1], ("empty".to_string(), None));

        let extracted = SelectorExtractor.extract(PRODUCT, &spec(&[("empty", ".empty")]));
        assert_eq!(extracted[0].1.as_deref(), Some(""));
    }

    #[test]
    fn test_invalid_selector_is_absent_not_fatal() {
        let extracted = SelectorExtractor.extract(PRODUCT, &spec(&[("bad", "h1[")]));
        assert_eq!(extracted, vec![("bad".to_string(), None)]);
    }

    #[test]
    fn test_validate_rejects_bad_selectors() {
        assert!(SelectorExtractor::validate(&spec(&[("title", "h1")]), "h1").is_ok());

        let err = SelectorExtractor::validate(&spec(&[("title", "h1[")]), "h1").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("title"));

        assert!(SelectorExtractor::validate(&spec(&[("title", "h1")]), ">>").is_err());
    }

    #[test]
    fn test_matches() {
        assert!(matches(PRODUCT, "#productTitle").unwrap());
        assert!(!matches(PRODUCT, "#missing").unwrap());
        assert!(matches(PRODUCT, "((").is_err());
    }
}
