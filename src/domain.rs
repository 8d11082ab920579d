use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::XeroError;

pub const UP_REGULATED: &str = "Up-regulated";
pub const DOWN_REGULATED: &str = "Down-regulated";

/// How the free-text input of a gene search is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMethod {
    GeneId,
    ArabidopsisLocus,
    ArabidopsisCommonName,
    GoId,
    GoName,
    EnzymeCode,
    EnzymeName,
}

impl SearchMethod {
    pub const ALL: [SearchMethod; 7] = [
        SearchMethod::GeneId,
        SearchMethod::ArabidopsisLocus,
        SearchMethod::ArabidopsisCommonName,
        SearchMethod::GoId,
        SearchMethod::GoName,
        SearchMethod::EnzymeCode,
        SearchMethod::EnzymeName,
    ];

    /// Key used by the browser forms for this method.
    pub fn key(&self) -> &'static str {
        match self {
            SearchMethod::GeneId => "Gene_ID",
            SearchMethod::ArabidopsisLocus => "Arab_loci",
            SearchMethod::ArabidopsisCommonName => "Arab_common_name",
            SearchMethod::GoId => "GO_id",
            SearchMethod::GoName => "GO_name",
            SearchMethod::EnzymeCode => "EC_code",
            SearchMethod::EnzymeName => "EC_name",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchMethod::GeneId => "Xerophyta GeneID",
            SearchMethod::ArabidopsisLocus => "Arabidopsis homologue locus",
            SearchMethod::ArabidopsisCommonName => "Arabidopsis homologue common name",
            SearchMethod::GoId => "Genes with GO id",
            SearchMethod::GoName => "Genes with GO name",
            SearchMethod::EnzymeCode => "Genes with Enzyme Code",
            SearchMethod::EnzymeName => "Genes with Enzyme Name",
        }
    }

    /// Whether a token only has to appear inside a stored value to match.
    pub fn is_substring_match(&self) -> bool {
        !matches!(self, SearchMethod::GeneId | SearchMethod::ArabidopsisLocus)
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for SearchMethod {
    type Err = XeroError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let normalized = trimmed.to_ascii_lowercase().replace('_', "-");
        SearchMethod::ALL
            .into_iter()
            .find(|method| {
                method.key().eq_ignore_ascii_case(trimmed)
                    || method.label().eq_ignore_ascii_case(trimmed)
                    || method
                        .to_possible_value()
                        .map(|v| v.get_name() == normalized)
                        .unwrap_or(false)
            })
            .ok_or_else(|| XeroError::InvalidSearchMethod(value.to_string()))
    }
}

/// Optional restriction of a search to one species.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpeciesFilter {
    #[default]
    Any,
    Named(String),
}

impl SpeciesFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("Any") | Some("(Any)") => SpeciesFilter::Any,
            Some(name) => SpeciesFilter::Named(name.to_string()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SpeciesFilter::Any => None,
            SpeciesFilter::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for SpeciesFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeciesFilter::Any => write!(f, "(Any)"),
            SpeciesFilter::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Differential-expression restriction applied to expression retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DegFilter {
    #[default]
    ShowAll,
    ShowDeg,
    ShowUp,
    ShowDown,
}

impl DegFilter {
    pub const ALL: [DegFilter; 4] = [
        DegFilter::ShowAll,
        DegFilter::ShowDeg,
        DegFilter::ShowUp,
        DegFilter::ShowDown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DegFilter::ShowAll => "Show all genes",
            DegFilter::ShowDeg => "Show all differentially expressed genes",
            DegFilter::ShowUp => "Show only up-regulated genes",
            DegFilter::ShowDown => "Show only down-regulated genes",
        }
    }

    /// Direction label a DE row must carry, if the filter asks for one.
    pub fn direction(&self) -> Option<&'static str> {
        match self {
            DegFilter::ShowUp => Some(UP_REGULATED),
            DegFilter::ShowDown => Some(DOWN_REGULATED),
            DegFilter::ShowAll | DegFilter::ShowDeg => None,
        }
    }
}

impl fmt::Display for DegFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for DegFilter {
    type Err = XeroError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let normalized = trimmed.to_ascii_lowercase().replace('_', "-");
        DegFilter::ALL
            .into_iter()
            .find(|filter| {
                filter.label().eq_ignore_ascii_case(trimmed)
                    || filter
                        .to_possible_value()
                        .map(|v| v.get_name() == normalized)
                        .unwrap_or(false)
            })
            .ok_or_else(|| XeroError::InvalidDegFilter(value.to_string()))
    }
}

/// Direction of a regulator -> target edge in the GRN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegulationDirection {
    Activation,
    Repression,
    Unknown,
}

impl RegulationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegulationDirection::Activation => "Activation",
            RegulationDirection::Repression => "Repression",
            RegulationDirection::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RegulationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegulationDirection {
    type Err = XeroError;

    // Stored values are case-sensitive; only surrounding whitespace is tolerated.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Activation" => Ok(RegulationDirection::Activation),
            "Repression" => Ok(RegulationDirection::Repression),
            "Unknown" => Ok(RegulationDirection::Unknown),
            _ => Err(XeroError::InvalidDirection(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn search_method_parses_form_keys_and_cli_names() {
        assert_eq!("Gene_ID".parse::<SearchMethod>().unwrap(), SearchMethod::GeneId);
        assert_eq!("GO_id".parse::<SearchMethod>().unwrap(), SearchMethod::GoId);
        assert_eq!(
            "arabidopsis-common-name".parse::<SearchMethod>().unwrap(),
            SearchMethod::ArabidopsisCommonName
        );
        assert_eq!(
            "enzyme_code".parse::<SearchMethod>().unwrap(),
            SearchMethod::EnzymeCode
        );
        assert_eq!(SearchMethod::EnzymeName.to_string(), "EC_name");
    }

    #[test]
    fn search_method_rejects_unknown() {
        let err = "Interpro".parse::<SearchMethod>().unwrap_err();
        assert_matches!(err, XeroError::InvalidSearchMethod(_));
    }

    #[test]
    fn species_filter_any_variants() {
        assert_eq!(SpeciesFilter::parse(None), SpeciesFilter::Any);
        assert_eq!(SpeciesFilter::parse(Some("Any")), SpeciesFilter::Any);
        assert_eq!(SpeciesFilter::parse(Some("(Any)")), SpeciesFilter::Any);
        assert_eq!(SpeciesFilter::parse(Some("  ")), SpeciesFilter::Any);
        assert_eq!(
            SpeciesFilter::parse(Some("X. elegans")).name(),
            Some("X. elegans")
        );
    }

    #[test]
    fn deg_filter_labels_round_trip() {
        for filter in DegFilter::ALL {
            assert_eq!(filter.label().parse::<DegFilter>().unwrap(), filter);
        }
        assert_eq!("show-up".parse::<DegFilter>().unwrap(), DegFilter::ShowUp);
        assert_eq!(DegFilter::ShowDown.direction(), Some(DOWN_REGULATED));
    }

    #[test]
    fn direction_is_case_sensitive() {
        assert_eq!(
            " Repression ".parse::<RegulationDirection>().unwrap(),
            RegulationDirection::Repression
        );
        let err = "activation".parse::<RegulationDirection>().unwrap_err();
        assert_matches!(err, XeroError::InvalidDirection(_));
    }
}
