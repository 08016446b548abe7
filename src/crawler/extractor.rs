//! Listing extraction from results pages
//!
//! Extraction is a pure function of the page body: given the HTML, the URL
//! it was served from and a compiled rule set, it returns the listings found
//! and the pagination links to follow. It never fails; a selector that
//! matches nothing yields empty fields or no links.

use crate::config::ExtractionRules;
use crate::record::Record;
use crate::url::resolve_link;
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extraction rules with every selector parsed
#[derive(Debug, Clone)]
pub struct CompiledRules {
    row: Selector,
    info: Selector,
    title: Selector,
    credentials: Selector,
    verified: Selector,
    statement: Selector,
    link: Selector,
    features: Selector,
    accepting: Selector,
    contact: Selector,
    phone: Selector,
    location: Selector,
    pagination: Selector,
    pagination_link: Selector,
}

impl CompiledRules {
    /// Parses every selector in the rule set
    ///
    /// # Returns
    ///
    /// * `Ok(CompiledRules)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - The first selector that did not
    pub fn compile(rules: &ExtractionRules) -> ConfigResult<Self> {
        Ok(Self {
            row: parse_selector(&rules.row)?,
            info: parse_selector(&rules.info)?,
            title: parse_selector(&rules.title)?,
            credentials: parse_selector(&rules.credentials)?,
            verified: parse_selector(&rules.verified)?,
            statement: parse_selector(&rules.statement)?,
            link: parse_selector(&rules.link)?,
            features: parse_selector(&rules.features)?,
            accepting: parse_selector(&rules.accepting)?,
            contact: parse_selector(&rules.contact)?,
            phone: parse_selector(&rules.phone)?,
            location: parse_selector(&rules.location)?,
            pagination: parse_selector(&rules.pagination)?,
            pagination_link: parse_selector(&rules.pagination_link)?,
        })
    }
}

fn parse_selector(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Everything pulled out of one results page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Listings in document order, each with a non-empty title
    pub records: Vec<Record>,

    /// Absolute pagination targets in document order
    pub next_links: Vec<Url>,

    /// Rows dropped because no title could be extracted
    pub discarded_rows: usize,
}

/// Extracts listings and pagination links from a results page
///
/// # Field Rules
///
/// | Field | Region | Selector |
/// |-------|--------|----------|
/// | title, credentials, verified, statement | `info` | per field |
/// | link | `info` | `href` of the first `link` match |
/// | accepting_appointments | `features` | `accepting` |
/// | phone | `contact` | `phone` |
/// | location | whole row | `location` |
///
/// A field's value is the text of all its matches with whitespace runs
/// collapsed. A missing region or field yields an empty string.
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - URL the page was served from, for resolving relative hrefs
/// * `rules` - Compiled selectors
///
/// # Example
///
/// ```
/// use psych::config::ExtractionRules;
/// use psych::crawler::{extract, CompiledRules};
/// use url::Url;
///
/// let html = r#"
///   <div class="results-row">
///     <div class="results-row-info"><a href="/profile/1"><span class="profile-title">Jane Smith</span></a></div>
///   </div>"#;
/// let rules = CompiledRules::compile(&ExtractionRules::default()).unwrap();
/// let page = Url::parse("https://www.psychologytoday.com/us/therapists/98101").unwrap();
///
/// let extraction = extract(html, &page, &rules);
/// assert_eq!(extraction.records[0].title, "Jane Smith");
/// assert_eq!(extraction.records[0].link, "https://www.psychologytoday.com/profile/1");
/// assert!(extraction.next_links.is_empty());
/// ```
pub fn extract(html: &str, page_url: &Url, rules: &CompiledRules) -> Extraction {
    let document = Html::parse_document(html);
    let mut extraction = Extraction::default();

    for row in document.select(&rules.row) {
        let record = extract_row(row, page_url, rules);
        if record.title.is_empty() {
            extraction.discarded_rows += 1;
            continue;
        }
        extraction.records.push(record);
    }

    if extraction.discarded_rows > 0 {
        tracing::debug!(
            "Discarded {} untitled rows on {}",
            extraction.discarded_rows,
            page_url
        );
    }

    for container in document.select(&rules.pagination) {
        for anchor in container.select(&rules.pagination_link) {
            if let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, page_url))
            {
                extraction.next_links.push(url);
            }
        }
    }

    extraction
}

fn extract_row(row: ElementRef<'_>, page_url: &Url, rules: &CompiledRules) -> Record {
    let info: Vec<ElementRef<'_>> = row.select(&rules.info).collect();
    let features: Vec<ElementRef<'_>> = row.select(&rules.features).collect();
    let contact: Vec<ElementRef<'_>> = row.select(&rules.contact).collect();

    let link = info
        .iter()
        .flat_map(|region| region.select(&rules.link))
        .find_map(|anchor| anchor.value().attr("href"))
        .and_then(|href| resolve_link(href, page_url))
        .map(|url| url.to_string())
        .unwrap_or_default();

    Record {
        title: region_text(&info, &rules.title),
        credentials: region_text(&info, &rules.credentials),
        verified: region_text(&info, &rules.verified),
        statement: region_text(&info, &rules.statement),
        phone: region_text(&contact, &rules.phone),
        location: region_text(&[row], &rules.location),
        link,
        accepting_appointments: region_text(&features, &rules.accepting),
    }
}

/// Text of every `selector` match inside `regions`, whitespace collapsed
fn region_text(regions: &[ElementRef<'_>], selector: &Selector) -> String {
    let text: String = regions
        .iter()
        .flat_map(|region| region.select(selector))
        .flat_map(|element| element.text())
        .collect();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
