//! Catalog datasets and their downloadable resources.

use serde::{Deserialize, Serialize};

/// One catalog entry, carried verbatim from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDataset {
    pub id: String,
    pub title: String,
    pub description: Option<String>,

    /// Publisher identities (organization title, holder, author...).
    #[serde(default)]
    pub publishers: Vec<String>,

    /// Organization identifier (slug), when the catalog classifies by it.
    pub organization: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl CatalogDataset {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publishers.push(publisher.into());
        self
    }

    pub fn with_organization(mut self, slug: impl Into<String>) -> Self {
        self.organization = Some(slug.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Title, description and publisher names, lowercased, for text matching.
    pub fn metadata_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str()];
        if let Some(description) = &self.description {
            parts.push(description);
        }
        parts.extend(self.publishers.iter().map(String::as_str));
        if let Some(org) = &self.organization {
            parts.push(org);
        }
        parts.join(" ").to_lowercase()
    }

    /// True if at least one resource is JSON or delimited text.
    pub fn has_structured_resource(&self) -> bool {
        self.resources
            .iter()
            .any(|r| r.format().is_structured())
    }
}

impl From<ckan_client::Package> for CatalogDataset {
    fn from(package: ckan_client::Package) -> Self {
        let mut publishers = Vec::new();
        if let Some(org) = &package.organization {
            if let Some(title) = &org.title {
                publishers.push(title.clone());
            }
        }
        for name in [
            &package.holder_name,
            &package.publisher_name,
            &package.author,
            &package.maintainer,
        ]
        .into_iter()
        .flatten()
        {
            if !name.trim().is_empty() && !publishers.contains(name) {
                publishers.push(name.clone());
            }
        }

        Self {
            id: if package.id.is_empty() {
                package.name.clone()
            } else {
                package.id
            },
            title: package.title,
            description: package.notes.filter(|n| !n.trim().is_empty()),
            publishers,
            organization: package
                .organization
                .map(|o| o.name)
                .filter(|n| !n.is_empty()),
            tags: package
                .tags
                .into_iter()
                .map(|t| t.display_name.unwrap_or(t.name))
                .collect(),
            groups: package
                .groups
                .into_iter()
                .map(|g| g.title.or(g.display_name).unwrap_or(g.name))
                .collect(),
            resources: package
                .resources
                .into_iter()
                .filter(|r| !r.url.trim().is_empty())
                .map(|r| Resource {
                    url: r.url,
                    format: r.format.filter(|f| !f.trim().is_empty()),
                    mimetype: r.mimetype.filter(|m| !m.trim().is_empty()),
                    name: r.name,
                })
                .collect(),
        }
    }
}

/// One downloadable link attached to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub format: Option<String>,
    pub mimetype: Option<String>,
    pub name: Option<String>,
}

impl Resource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            mimetype: None,
            name: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declared format, then mimetype, then URL extension.
    pub fn format(&self) -> ResourceFormat {
        if let Some(format) = self.format.as_deref().and_then(ResourceFormat::from_declared) {
            return format;
        }
        if let Some(format) = self.mimetype.as_deref().and_then(ResourceFormat::from_mimetype) {
            return format;
        }
        ResourceFormat::from_url(&self.url)
    }

    /// Host part of the URL, lowercased.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }
}

/// How machine-readable a resource is likely to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFormat {
    /// Record-oriented JSON.
    Json,
    /// CSV, TSV and similar.
    Delimited,
    Other,
}

impl ResourceFormat {
    /// Higher ranks are tried first; zero is never attempted.
    pub fn rank(self) -> u8 {
        match self {
            ResourceFormat::Json => 2,
            ResourceFormat::Delimited => 1,
            ResourceFormat::Other => 0,
        }
    }

    pub fn is_structured(self) -> bool {
        self.rank() > 0
    }

    fn from_declared(declared: &str) -> Option<Self> {
        // "text/csv; charset=utf-8" declares text/csv
        let essence = declared.split(';').next().unwrap_or_default();
        let d = essence.trim().trim_start_matches('.').to_lowercase();
        match d.as_str() {
            "json" | "geojson" | "application/json" => Some(ResourceFormat::Json),
            "csv" | "tsv" | "text/csv" | "text/tab-separated-values" => {
                Some(ResourceFormat::Delimited)
            }
            "" => None,
            _ => Some(ResourceFormat::Other),
        }
    }

    fn from_mimetype(mimetype: &str) -> Option<Self> {
        let m = mimetype.to_lowercase();
        if m.contains("json") {
            Some(ResourceFormat::Json)
        } else if m.contains("csv") || m.contains("tab-separated") {
            Some(ResourceFormat::Delimited)
        } else {
            None
        }
    }

    fn from_url(raw: &str) -> Self {
        let path = url::Url::parse(raw)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| raw.to_lowercase());
        if path.ends_with(".json") || path.ends_with(".geojson") {
            ResourceFormat::Json
        } else if path.ends_with(".csv") || path.ends_with(".tsv") {
            ResourceFormat::Delimited
        } else {
            ResourceFormat::Other
        }
    }
}
