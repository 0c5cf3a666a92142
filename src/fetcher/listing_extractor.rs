use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::models::RawListing;

/// One way of pulling a raw field value out of a product card.
///
/// Strategies are independent; a field is resolved by trying its strategies in
/// order and keeping the first value that also survives the field's parser.
pub enum FieldStrategy {
    /// Text of the first element matching the selector
    SelectorText(Selector),
    /// Attribute of the first element matching the selector
    SelectorAttr(Selector, &'static str),
    /// First capture group of a pattern over the card's visible text
    TextPattern(Regex),
    /// Whole match of a pattern over the card's markup
    HtmlPattern(Regex),
}

/// Pre-rendered views of a card, computed once and shared by all strategies
struct Card<'a> {
    element: ElementRef<'a>,
    text: String,
    html: String,
}

impl FieldStrategy {
    fn apply(&self, card: &Card) -> Option<String> {
        match self {
            FieldStrategy::SelectorText(selector) => card
                .element
                .select(selector)
                .next()
                .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string()),
            FieldStrategy::SelectorAttr(selector, attr) => card
                .element
                .select(selector)
                .find_map(|el| el.value().attr(attr))
                .map(|value| value.trim().to_string()),
            FieldStrategy::TextPattern(pattern) => pattern
                .captures(&card.text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
            FieldStrategy::HtmlPattern(pattern) => {
                pattern.find(&card.html).map(|m| m.as_str().to_string())
            }
        }
    }
}

/// Turns rendered search-result HTML into listing records
pub struct ListingExtractor {
    card_selectors: Vec<(String, Selector)>,
    name: Vec<FieldStrategy>,
    price: Vec<FieldStrategy>,
    rating: Vec<FieldStrategy>,
    reviews: Vec<FieldStrategy>,
    name_noise: Vec<String>,
    number_pattern: Regex,
    count_pattern: Regex,
    source: String,
}

impl ListingExtractor {
    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        let selectors = &config.selectors;

        let card_selectors = selectors
            .card_selectors
            .iter()
            .map(|s| Ok((s.clone(), parse_selector(s)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut name = vec![FieldStrategy::SelectorAttr(parse_selector("img[alt]")?, "alt")];
        name.extend(text_strategies(&selectors.name_selectors)?);

        let mut price = text_strategies(&selectors.price_selectors)?;
        price.push(FieldStrategy::HtmlPattern(Regex::new(r"₹\s*[\d,]+")?));

        // A decimal directly tied to "Ratings" so screen sizes like 15.6 never match
        let mut rating = text_strategies(&selectors.rating_selectors)?;
        rating.push(FieldStrategy::TextPattern(Regex::new(
            r"(\d\.\d)\s*,\s*[\d,]+\s*Ratings",
        )?));
        rating.push(FieldStrategy::TextPattern(Regex::new(
            r"(\d\.\d)\s*[\d,]*\s*Ratings",
        )?));

        let mut reviews = text_strategies(&selectors.reviews_selectors)?;
        reviews.push(FieldStrategy::TextPattern(Regex::new(r"(\d[\d,]*)\s*Reviews")?));

        Ok(Self {
            card_selectors,
            name,
            price,
            rating,
            reviews,
            name_noise: selectors.name_noise.clone(),
            number_pattern: Regex::new(r"(\d+(?:\.\d+)?)")?,
            count_pattern: Regex::new(r"(\d[\d,]*)")?,
            source: config.site.name.clone(),
        })
    }

    /// Extract every usable listing from one result page
    pub fn extract_listings(&self, html: &str, query: &str, page: u32) -> Vec<RawListing> {
        let document = Html::parse_document(html);

        // Use the first card selector that matches anything
        let cards: Vec<ElementRef> = self
            .card_selectors
            .iter()
            .map(|(raw, selector)| (raw, document.select(selector).collect::<Vec<_>>()))
            .find(|(_, elements)| !elements.is_empty())
            .map(|(raw, elements)| {
                info!("Using card selector '{}' found {} elements", raw, elements.len());
                elements
            })
            .unwrap_or_default();

        info!("Found {} product containers on page {}", cards.len(), page);

        cards
            .into_iter()
            .filter_map(|element| self.extract_card(element, query, page))
            .collect()
    }

    fn extract_card(&self, element: ElementRef, query: &str, page: u32) -> Option<RawListing> {
        let card = Card {
            element,
            text: element.text().collect::<Vec<_>>().join(" "),
            html: element.html(),
        };

        let Some(product_name) = resolve(&self.name, &card, |raw| self.clean_name(raw)) else {
            debug!("Skipping card without a product name");
            return None;
        };

        let Some(price) = resolve(&self.price, &card, parse_price) else {
            warn!("Skipping product (no price found in text): {}", truncate(&product_name, 60));
            return None;
        };

        let rating = resolve(&self.rating, &card, |raw| self.parse_rating(raw));
        let reviews_count = resolve(&self.reviews, &card, |raw| self.parse_count(raw));

        Some(RawListing {
            product_name,
            price: Some(price),
            rating,
            reviews_count,
            source: self.source.clone(),
            query: query.to_string(),
            page,
        })
    }

    fn clean_name(&self, raw: &str) -> Option<String> {
        let mut name = raw.to_string();
        for noise in &self.name_noise {
            name = name.replace(noise.as_str(), "");
        }
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        (!name.is_empty()).then_some(name)
    }

    fn parse_rating(&self, raw: &str) -> Option<f64> {
        self.number_pattern
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|rating| (0.0..=5.0).contains(rating))
    }

    fn parse_count(&self, raw: &str) -> Option<i64> {
        self.count_pattern
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse::<i64>().ok())
    }
}

/// Keep digits only: "₹54,990" becomes 54990
pub fn parse_price(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}

fn resolve<T>(
    strategies: &[FieldStrategy],
    card: &Card,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    strategies
        .iter()
        .find_map(|strategy| strategy.apply(card).and_then(|raw| parse(&raw)))
}

fn text_strategies(selectors: &[String]) -> Result<Vec<FieldStrategy>> {
    selectors
        .iter()
        .map(|s| Ok(FieldStrategy::SelectorText(parse_selector(s)?)))
        .collect()
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| anyhow!("Invalid selector '{}': {:?}", raw, e))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
