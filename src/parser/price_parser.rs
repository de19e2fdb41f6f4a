// Price extraction from static listing HTML
use scraper::{Html, Selector};

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("invalid selector '{0}': {1}")]
    InvalidSelector(String, String),
}

pub struct PriceParser {
    selector: Selector,
}

impl PriceParser {
    pub fn new(selector: &str) -> Result<Self, ParserError> {
        let selector = Selector::parse(selector)
            .map_err(|e| ParserError::InvalidSelector(selector.to_string(), e.to_string()))?;
        Ok(Self { selector })
    }

    /// Text of the first non-blank element matching the selector.
    pub fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .map(|node| node.text().collect::<String>())
            .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <table>
            <tr><td><span class="prco-valign-middle-helper">   </span></td></tr>
            <tr><td><span class="prco-valign-middle-helper">
                zł&nbsp;1,234
            </span></td></tr>
            <tr><td><span class="prco-valign-middle-helper">zł 999</span></td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn first_non_blank_match_wins() {
        let parser = PriceParser::new("span.prco-valign-middle-helper").unwrap();
        assert_eq!(parser.extract(PAGE).as_deref(), Some("zł 1,234"));
    }

    #[test]
    fn missing_element_yields_none() {
        let parser = PriceParser::new("div.price").unwrap();
        assert_eq!(parser.extract(PAGE), None);
    }

    #[test]
    fn bad_selector_is_an_error() {
        assert!(matches!(PriceParser::new("span[[["), Err(ParserError::InvalidSelector(..))));
    }
}
