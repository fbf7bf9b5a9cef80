use serde::{Deserialize, Serialize};

/// Query parameters for `package_search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageSearchParams {
    /// Solr free-text query.
    pub q: String,
    pub rows: u32,
    /// Solr filter query (facet filters), e.g. `organization:istat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl PackageSearchParams {
    pub fn new(q: impl Into<String>, rows: u32) -> Self {
        Self {
            q: q.into(),
            rows,
            ..Default::default()
        }
    }

    pub fn with_fq(mut self, fq: impl Into<String>) -> Self {
        self.fq = Some(fq.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// Envelope returned by every CKAN action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionError {
    pub message: Option<String>,
    #[serde(rename = "__type")]
    pub error_type: Option<String>,
}

impl ActionError {
    pub fn describe(&self) -> String {
        match (&self.error_type, &self.message) {
            (Some(t), Some(m)) => format!("{}: {}", t, m),
            (None, Some(m)) => m.clone(),
            (Some(t), None) => t.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Result payload of `package_search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageSearchResult {
    pub count: u64,
    #[serde(default)]
    pub results: Vec<Package>,
}

/// A CKAN dataset ("package").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub notes: Option<String>,
    pub author: Option<String>,
    pub maintainer: Option<String>,
    /// DCAT-AP_IT rights holder, exposed by dati.gov.it harvesters.
    pub holder_name: Option<String>,
    pub publisher_name: Option<String>,
    pub organization: Option<Organization>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub resources: Vec<PackageResource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub name: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,
    pub title: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageResource {
    #[serde(default)]
    pub url: String,
    pub format: Option<String>,
    pub mimetype: Option<String>,
    pub name: Option<String>,
}
