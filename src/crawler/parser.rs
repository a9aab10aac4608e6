//! Record extraction from fetched listing pages
//!
//! Each listing type carries its own selector table and required-field
//! policy:
//!
//! | Listing | Listings selector | Required |
//! |---------|-------------------|----------|
//! | `Domains` | `div.box a` | city text, `href` |
//! | `JobLinks` | `div.content p.row` | `a.hdrlnk[href]` when the row has a map tag |
//! | `JobDetail` | whole document | `span#titletextonly`, `div#map[data-latitude][data-longitude]` |
//!
//! A record with a missing required field is never yielded; the caller sees an
//! [`ExtractError::MissingData`] in its place.

use crate::records::{DomainListing, JobDetail, JobLink, Record};
use crate::{ExtractError, ExtractResult};
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use url::Url;

/// Company column for job details; listing pages carry no reliable employer field
pub const PLACEHOLDER_COMPANY: &str = "A Company That's Hiring";

/// The closed set of listing types the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    /// Regional sites on the sites index
    Domains,

    /// Job rows on a paginated search result page
    JobLinks,

    /// A single job listing page
    JobDetail,
}

impl ListingKind {
    /// Header row written at the top of every batch of this kind
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Self::Domains => &["City", "Domain"],
            Self::JobLinks => &["Listing URL"],
            Self::JobDetail => &["Title", "Company", "Latitude", "Longitude"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domains => "domains",
            Self::JobLinks => "job_links",
            Self::JobDetail => "job_detail",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compiled selectors for one listing type
#[derive(Debug)]
enum RuleSet {
    Domains {
        anchor: Selector,
    },
    JobLinks {
        row: Selector,
        map_tag: Selector,
        link: Selector,
    },
    JobDetail {
        title: Selector,
        map: Selector,
    },
}

fn selector(css: &str) -> ExtractResult<Selector> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

impl RuleSet {
    fn compile(kind: ListingKind) -> ExtractResult<Self> {
        Ok(match kind {
            ListingKind::Domains => Self::Domains {
                anchor: selector("div.box a")?,
            },
            ListingKind::JobLinks => Self::JobLinks {
                row: selector("div.content p.row")?,
                map_tag: selector("span.maptag")?,
                link: selector("a.hdrlnk")?,
            },
            ListingKind::JobDetail => Self::JobDetail {
                title: selector("span#titletextonly")?,
                map: selector("div#map")?,
            },
        })
    }

    /// Elements that count as listings for pagination purposes
    fn listings<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Self::Domains { anchor } => document.select(anchor).collect(),
            Self::JobLinks { row, .. } => document.select(row).collect(),
            Self::JobDetail { .. } => vec![document.root_element()],
        }
    }

    /// Turns one listing element into a record
    ///
    /// `Ok(None)` means the listing is legitimately not a record (a job row
    /// without a map tag), as opposed to a listing that is missing data.
    fn extract_one(&self, element: ElementRef<'_>, base: &Url) -> ExtractResult<Option<Record>> {
        match self {
            Self::Domains { .. } => {
                let city = element.text().collect::<String>().trim().to_string();
                if city.is_empty() {
                    return Err(missing("city", base));
                }
                let href = element
                    .value()
                    .attr("href")
                    .ok_or_else(|| missing("domain link", base))?;
                let url = resolve(href, base)?;
                Ok(Some(DomainListing { city, url }.into()))
            }

            Self::JobLinks { map_tag, link, .. } => {
                if element.select(map_tag).next().is_none() {
                    return Ok(None);
                }
                let href = element
                    .select(link)
                    .next()
                    .and_then(|anchor| anchor.value().attr("href"))
                    .ok_or_else(|| missing("listing link", base))?;
                let url = resolve(href, base)?;
                Ok(Some(JobLink { url }.into()))
            }

            Self::JobDetail { title, map } => {
                let title = element
                    .select(title)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_string())
                    .filter(|text| !text.is_empty())
                    .ok_or_else(|| missing("title", base))?;

                let map = element
                    .select(map)
                    .next()
                    .ok_or_else(|| missing("map coordinates", base))?;
                let latitude = coordinate(map, "data-latitude", "latitude", base)?;
                let longitude = coordinate(map, "data-longitude", "longitude", base)?;

                Ok(Some(
                    JobDetail {
                        title,
                        company: PLACEHOLDER_COMPANY.to_string(),
                        latitude,
                        longitude,
                    }
                    .into(),
                ))
            }
        }
    }
}

fn missing(field: &'static str, base: &Url) -> ExtractError {
    ExtractError::MissingData {
        field,
        context: base.to_string(),
    }
}

fn resolve(href: &str, base: &Url) -> ExtractResult<String> {
    let href = href.trim();
    base.join(href)
        .map(|url| url.to_string())
        .map_err(|source| ExtractError::InvalidLink {
            href: href.to_string(),
            source,
        })
}

fn coordinate(
    map: ElementRef<'_>,
    attr: &str,
    field: &'static str,
    base: &Url,
) -> ExtractResult<f64> {
    let raw = map.value().attr(attr).ok_or_else(|| missing(field, base))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ExtractError::Malformed {
            field,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Extracts records of one listing type from parsed documents
#[derive(Debug)]
pub struct Extractor {
    kind: ListingKind,
    rules: RuleSet,
}

impl Extractor {
    /// Compiles the selector table for `kind`
    pub fn new(kind: ListingKind) -> ExtractResult<Self> {
        Ok(Self {
            kind,
            rules: RuleSet::compile(kind)?,
        })
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    /// Starts a lazy extraction pass over `document`
    ///
    /// Relative links are resolved against `base`. The returned iterator is
    /// consumed once; listings are only turned into records as it is driven.
    ///
    /// # Example
    ///
    /// ```
    /// use scraper::Html;
    /// use sumi_trawl::crawler::{Extractor, ListingKind};
    /// use url::Url;
    ///
    /// let html = r#"<div class="box"><a href="//auburn.craigslist.org/">auburn</a></div>"#;
    /// let document = Html::parse_document(html);
    /// let base = Url::parse("http://www.craigslist.org/about/sites").unwrap();
    /// let extractor = Extractor::new(ListingKind::Domains).unwrap();
    ///
    /// let extraction = extractor.extract(&document, &base);
    /// assert_eq!(extraction.listing_count(), 1);
    /// assert_eq!(extraction.filter_map(Result::ok).count(), 1);
    /// ```
    pub fn extract<'a>(&'a self, document: &'a Html, base: &'a Url) -> Extraction<'a> {
        let listings = self.rules.listings(document);
        Extraction {
            listing_count: listings.len(),
            listings: listings.into_iter(),
            rules: &self.rules,
            base,
        }
    }
}

/// One-shot iterator over the records of a single document
pub struct Extraction<'a> {
    listing_count: usize,
    listings: std::vec::IntoIter<ElementRef<'a>>,
    rules: &'a RuleSet,
    base: &'a Url,
}

impl Extraction<'_> {
    /// Number of listings the page carried, including ones that yield no record
    pub fn listing_count(&self) -> usize {
        self.listing_count
    }
}

impl Iterator for Extraction<'_> {
    type Item = ExtractResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let element = self.listings.next()?;
            match self.rules.extract_one(element, self.base) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
