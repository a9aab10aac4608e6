//! Structured records produced by extraction
//!
//! Every record type serializes to one CSV row whose column names match the
//! header written at the top of each batch, so batches can be read back with
//! the same types.

use serde::{Deserialize, Serialize};

/// A regional site found on the sites index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainListing {
    #[serde(rename = "City")]
    pub city: String,

    #[serde(rename = "Domain")]
    pub url: String,
}

/// A link to a single job listing that carries map coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLink {
    #[serde(rename = "Listing URL")]
    pub url: String,
}

/// Details scraped from a single job listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Company")]
    pub company: String,

    #[serde(rename = "Latitude")]
    pub latitude: f64,

    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

/// One extracted record, tagged by the listing type that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Domain(DomainListing),
    JobLink(JobLink),
    JobDetail(JobDetail),
}

impl Record {
    /// Writes this record as one data row
    pub fn write_row<W: std::io::Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        match self {
            Self::Domain(listing) => writer.serialize(listing),
            Self::JobLink(link) => writer.serialize(link),
            Self::JobDetail(detail) => writer.serialize(detail),
        }
    }
}

impl From<DomainListing> for Record {
    fn from(listing: DomainListing) -> Self {
        Self::Domain(listing)
    }
}

impl From<JobLink> for Record {
    fn from(link: JobLink) -> Self {
        Self::JobLink(link)
    }
}

impl From<JobDetail> for Record {
    fn from(detail: JobDetail) -> Self {
        Self::JobDetail(detail)
    }
}
