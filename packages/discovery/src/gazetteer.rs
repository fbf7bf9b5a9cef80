//! Gazetteer: known municipalities, their administrative hierarchy and the
//! publishers and hosts that are authoritative for them.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::query::Geography;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub name: String,
    pub province: String,
    pub region: String,

    /// Other spellings found in questions ("Milan").
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Publisher display names used by the municipal catalog.
    #[serde(default)]
    pub publishers: Vec<String>,

    /// Catalog organization slugs.
    #[serde(default)]
    pub organizations: Vec<String>,

    /// Hosts serving the municipality's own open data.
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl Municipality {
    fn new(name: &str, province: &str, region: &str) -> Self {
        Self {
            name: name.to_string(),
            province: province.to_string(),
            region: region.to_string(),
            aliases: Vec::new(),
            publishers: Vec::new(),
            organizations: Vec::new(),
            hosts: Vec::new(),
        }
    }

    fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    fn publisher(mut self, publisher: &str, organization: &str) -> Self {
        self.publishers.push(publisher.to_string());
        self.organizations.push(organization.to_string());
        self
    }

    fn hosts(mut self, hosts: &[&str]) -> Self {
        self.hosts = hosts.iter().map(|s| s.to_string()).collect();
        self
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Full geography for this municipality.
    pub fn geography(&self) -> Geography {
        Geography::city(&self.name)
            .with_province(&self.province)
            .with_region(&self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gazetteer {
    pub municipalities: Vec<Municipality>,

    #[serde(default)]
    pub regions: Vec<String>,
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::italian_default()
    }
}

impl Gazetteer {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Major Italian municipalities and all twenty regions.
    pub fn italian_default() -> Self {
        Self {
            municipalities: vec![
                Municipality::new("Milano", "Milano", "Lombardia")
                    .aliases(&["Milan"])
                    .publisher("Comune di Milano", "comune-di-milano")
                    .hosts(&["dati.comune.milano.it"]),
                Municipality::new("Roma", "Roma", "Lazio")
                    .aliases(&["Rome"])
                    .publisher("Roma Capitale", "roma-capitale")
                    .hosts(&["dati.comune.roma.it"]),
                Municipality::new("Torino", "Torino", "Piemonte")
                    .aliases(&["Turin"])
                    .publisher("Città di Torino", "comune-di-torino")
                    .hosts(&["aperto.comune.torino.it"]),
                Municipality::new("Napoli", "Napoli", "Campania")
                    .aliases(&["Naples"])
                    .publisher("Comune di Napoli", "comune-di-napoli")
                    .hosts(&["www.comune.napoli.it"]),
                Municipality::new("Bologna", "Bologna", "Emilia-Romagna")
                    .publisher("Comune di Bologna", "comune-di-bologna")
                    .hosts(&["opendata.comune.bologna.it"]),
                Municipality::new("Firenze", "Firenze", "Toscana")
                    .aliases(&["Florence"])
                    .publisher("Comune di Firenze", "comune-di-firenze")
                    .hosts(&["opendata.comune.fi.it"]),
                Municipality::new("Genova", "Genova", "Liguria")
                    .aliases(&["Genoa"])
                    .publisher("Comune di Genova", "comune-di-genova")
                    .hosts(&["dati.comune.genova.it"]),
                Municipality::new("Palermo", "Palermo", "Sicilia")
                    .publisher("Comune di Palermo", "comune-di-palermo")
                    .hosts(&["opendata.comune.palermo.it"]),
                Municipality::new("Bari", "Bari", "Puglia")
                    .publisher("Comune di Bari", "comune-di-bari")
                    .hosts(&["opendata.comune.bari.it"]),
                Municipality::new("Venezia", "Venezia", "Veneto")
                    .aliases(&["Venice"])
                    .publisher("Comune di Venezia", "comune-di-venezia")
                    .hosts(&["dati.venezia.it"]),
                Municipality::new("Verona", "Verona", "Veneto")
                    .publisher("Comune di Verona", "comune-di-verona"),
                Municipality::new("Catania", "Catania", "Sicilia")
                    .publisher("Comune di Catania", "comune-di-catania"),
            ],
            regions: [
                "Abruzzo",
                "Basilicata",
                "Calabria",
                "Campania",
                "Emilia-Romagna",
                "Friuli-Venezia Giulia",
                "Lazio",
                "Liguria",
                "Lombardia",
                "Marche",
                "Molise",
                "Piemonte",
                "Puglia",
                "Sardegna",
                "Sicilia",
                "Toscana",
                "Trentino-Alto Adige",
                "Umbria",
                "Valle d'Aosta",
                "Veneto",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    /// Look a municipality up by name or alias, case-insensitively.
    pub fn municipality(&self, name: &str) -> Option<&Municipality> {
        let name = name.trim();
        self.municipalities
            .iter()
            .find(|m| m.names().any(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Canonical region spelling, case-insensitively.
    pub fn region(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.regions
            .iter()
            .find(|r| r.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Whether `host` serves open data for the place named by `token`.
    pub fn is_authoritative_host(&self, token: &str, host: &str) -> bool {
        self.municipality(token).is_some_and(|m| {
            m.hosts
                .iter()
                .any(|h| host == h || host.ends_with(&format!(".{}", h)))
        })
    }

    /// Compile word-boundary matchers for every name in the gazetteer.
    pub fn matcher(&self) -> GazetteerMatcher {
        GazetteerMatcher::new(self)
    }
}

/// Precompiled word-boundary regexes over a gazetteer.
#[derive(Debug, Clone)]
pub struct GazetteerMatcher {
    cities: Option<Regex>,
    regions: Option<Regex>,
}

impl GazetteerMatcher {
    fn new(gazetteer: &Gazetteer) -> Self {
        let city_names: Vec<&str> = gazetteer
            .municipalities
            .iter()
            .flat_map(|m| m.names())
            .collect();
        let region_names: Vec<&str> = gazetteer.regions.iter().map(String::as_str).collect();
        Self {
            cities: alternation(&city_names),
            regions: alternation(&region_names),
        }
    }

    /// First municipality named in `text`, by position.
    pub fn find_city<'g>(&self, gazetteer: &'g Gazetteer, text: &str) -> Option<&'g Municipality> {
        let found = self.cities.as_ref()?.find(text)?;
        gazetteer.municipality(found.as_str())
    }

    /// First region named in `text`, by position.
    pub fn find_region<'g>(&self, gazetteer: &'g Gazetteer, text: &str) -> Option<&'g str> {
        let found = self.regions.as_ref()?.find(text)?;
        gazetteer.region(found.as_str())
    }
}

/// `(?i)\b(?:a|b|c)\b`, longest names first so "Reggio Emilia" beats "Reggio".
fn alternation(names: &[&str]) -> Option<Regex> {
    if names.is_empty() {
        return None;
    }
    let mut sorted: Vec<&str> = names.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let pattern = format!(
        r"(?i)\b(?:{})\b",
        sorted
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|")
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to compile gazetteer pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_city_word_boundary() {
        let gazetteer = Gazetteer::italian_default();
        let matcher = gazetteer.matcher();

        let milano = matcher
            .find_city(&gazetteer, "Confronta i reati a Milano negli ultimi 5 anni")
            .unwrap();
        assert_eq!(milano.region, "Lombardia");

        assert!(matcher.find_city(&gazetteer, "Export verso la Romania").is_none());
        assert_eq!(
            matcher.find_city(&gazetteer, "crime in milan").unwrap().name,
            "Milano"
        );
    }

    #[test]
    fn test_find_region() {
        let gazetteer = Gazetteer::italian_default();
        let matcher = gazetteer.matcher();
        assert_eq!(
            matcher.find_region(&gazetteer, "rifiuti in toscana"),
            Some("Toscana")
        );
    }

    #[test]
    fn test_authoritative_host() {
        let gazetteer = Gazetteer::italian_default();
        assert!(gazetteer.is_authoritative_host("Milano", "dati.comune.milano.it"));
        assert!(gazetteer.is_authoritative_host("milano", "www.dati.comune.milano.it"));
        assert!(!gazetteer.is_authoritative_host("Roma", "dati.comune.milano.it"));
        assert!(!gazetteer.is_authoritative_host("Atlantide", "example.org"));
    }

    #[test]
    fn test_municipality_geography() {
        let gazetteer = Gazetteer::italian_default();
        let geo = gazetteer.municipality("ROMA").unwrap().geography();
        assert_eq!(geo.city.as_deref(), Some("Roma"));
        assert_eq!(geo.region.as_deref(), Some("Lazio"));
        assert_eq!(geo.nation, "Italia");
    }
}
