//! Static publisher knowledge injected into the Collection builder.
//!
//! [`Publisher::default`] holds the UKCP18 values; a JSON file with the same
//! fields can replace them.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    stac::{Link, Provider, ProviderRole},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publisher {
    pub collection_id: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub license: String,
    pub providers: Vec<Provider>,
    /// License and documentation links, in output order.
    pub links: Vec<Link>,
    pub citation: String,
    pub bbox: [f64; 4],
    /// Inclusive temporal interval as RFC 3339 timestamps.
    pub temporal_interval: [String; 2],
    /// Summary size cap; must be large enough for both vocabularies.
    pub summary_maxcount: usize,
    /// EPSG code of the horizontal grid.
    pub reference_system: u32,
}

impl Publisher {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn temporal_end(&self) -> &str {
        &self.temporal_interval[1]
    }
}

impl Default for Publisher {
    fn default() -> Self {
        const PDF: &str = "application/pdf";
        const HTML: &str = "text/html";
        const GUIDANCE: &str =
            "https://www.metoffice.gov.uk/binaries/content/assets/metofficegovuk/pdf/research/ukcp";

        Self {
            collection_id: "ukcp-18".to_string(),
            title: "UKCP18 Global Climate Model Projections for the entire globe".to_string(),
            description: "Global climate model runs from 1900-2100 produced by the Met Office \
                          for UK Climate Projections 2018 (UKCP18) using the HadGEM3 climate model."
                .to_string(),
            keywords: ["UKCP18", "UK Met Office", "Climate"]
                .map(String::from)
                .to_vec(),
            license: "proprietary".to_string(),
            providers: vec![
                Provider {
                    name: "Met Office Hadley Centre".to_string(),
                    roles: vec![ProviderRole::Producer],
                    url: Some(
                        "https://www.metoffice.gov.uk/weather/climate/met-office-hadley-centre/index"
                            .to_string(),
                    ),
                },
                Provider {
                    name: "The CEDA Archive".to_string(),
                    roles: vec![ProviderRole::Host],
                    url: Some("https://archive.ceda.ac.uk/".to_string()),
                },
            ],
            links: vec![
                Link::new(
                    "license",
                    "https://www.nationalarchives.gov.uk/doc/open-government-licence/version/3/",
                )
                .with_title("Open Government License")
                .with_type(HTML),
                Link::new(
                    "documentation",
                    &format!("{GUIDANCE}/ukcp18-guidance-data-availability-access-and-formats.pdf"),
                )
                .with_title("UKCP18 Guidance: Data availability, access and formats")
                .with_type(PDF),
                Link::new(
                    "documentation",
                    &format!("{GUIDANCE}/ukcp18-guidance---caveats-and-limitations.pdf"),
                )
                .with_title("UKCP18 Guidance: Caveats and limitations")
                .with_type(PDF),
                Link::new(
                    "documentation",
                    "https://www.metoffice.gov.uk/research/approach/collaboration/ukcp/guidance-science-reports",
                )
                .with_title("UKCP18 Science Reports")
                .with_type(HTML),
                Link::new(
                    "documentation",
                    "https://catalogue.ceda.ac.uk/uuid/97bc0c622a24489aa105f5b8a8efa3f0",
                )
                .with_title("CEDA Archive dataset")
                .with_type(HTML),
            ],
            citation: "Met Office Hadley Centre (2018): UKCP18 Global Climate Model Projections \
                       for the entire globe. Centre for Environmental Data Analysis, date of \
                       citation. http://catalogue.ceda.ac.uk/uuid/f1a2fc3c120f400396a92f5de84d596a"
                .to_string(),
            bbox: [-180.0, -90.0, 180.0, 90.0],
            temporal_interval: [
                "1899-12-01T00:00:00Z".to_string(),
                "2100-12-31T00:00:00Z".to_string(),
            ],
            summary_maxcount: 50,
            reference_system: 4326,
        }
    }
}
