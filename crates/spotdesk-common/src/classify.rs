//! Report classification policy.
//!
//! # Purpose
//! Decides whether a generic report row is presented as an incident (acute
//! emergency) or a complaint (municipal/utility service issue), and which
//! complaint bucket it falls into.
//!
//! # Key invariants
//! - Classification is deterministic for a given policy and input text.
//! - Category text is tested before subcategory text; within each, the
//!   incident list is tested before the complaint list.
//! - Outage rules only look at subcategory text and run after term matching.
//! - Anything unmatched is an incident so acute cases are never dropped.
//!
//! # Notes
//! The term lists and outage rules form an explicit policy table. The built-in
//! table can be replaced wholesale from YAML via [`ClassificationPolicy::from_yaml`].
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Incident,
    Complaint,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Incident => "incident",
            ReportKind::Complaint => "complaint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintBucket {
    Infrastructure,
    Road,
    Electric,
    Sanitation,
}

const INCIDENT_TERMS: &[&str] = &[
    // road traffic
    "road_traffic",
    "vehicle_collision",
    "single_vehicle",
    "pedestrian_struck",
    "motorcycle",
    "pileup",
    // life-threatening roadway hazards
    "sinkhole",
    "oil_spill",
    "signal_outage",
    // fire / explosion
    "fire_explosion",
    "building_fire",
    "vehicle_fire",
    "electrical_fire",
    "gas_leak",
    "cylinder_blast",
    // structures
    "building_infra",
    "collapse",
    "partial_collapse",
    "falling_facade",
    "elevator_failure",
    "scaffold_collapse",
    // rail and public transport
    "rail_public_transport",
    "train_collision",
    "derailment",
    "metro_incident",
    "bus_crash",
    // dangerous utility failures
    "gas_emergency",
    "major_power_outage",
    // weather
    "flash_flood",
    "heavy_rain",
    "coastal_surge",
    "rockslide",
    "sandstorm",
    "khamaseen",
    // medical
    "medical_emergency",
    "cardiac",
    "respiratory",
    "injury_no_collision",
    "mci",
    // industrial
    "occupational_industrial",
    "factory_accident",
    "chemical_spill",
    "construction_injury",
    // public safety
    "public_safety_crime",
    "violence_nearby",
    "robbery_in_progress",
    "suspicious_package",
    // marine
    "marine_waterway",
    "boat_incident",
    "drowning_risk",
    "port_hazard",
];

const COMPLAINT_TERMS: &[&str] = &[
    "roadway_hazard",
    "pothole",
    "debris",
    "streetlight_outage",
    "streetlight",
    "lamp_out",
    "power_outage",
    "water_cut",
    "telecom_outage",
    "internet_outage",
    "sanitation",
    "garbage",
    "waste",
    "sewage",
    "trash",
    "cleaning",
];

/// A regex over subcategory wording that forces a kind when term matching fails.
#[derive(Debug, Clone)]
pub struct OutageRule {
    pub pattern: Regex,
    pub kind: ReportKind,
}

impl OutageRule {
    pub fn new(pattern: &str, kind: ReportKind) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|err| Error::InvalidPattern(err.to_string()))?;
        Ok(Self { pattern, kind })
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    pub incident_terms: Vec<String>,
    pub complaint_terms: Vec<String>,
    pub outage_rules: Vec<OutageRule>,
    pub default_kind: ReportKind,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    incident_terms: Vec<String>,
    complaint_terms: Vec<String>,
    #[serde(default)]
    outage_rules: Vec<OutageRuleFile>,
    #[serde(default)]
    default_kind: Option<ReportKind>,
}

#[derive(Debug, Deserialize)]
struct OutageRuleFile {
    pattern: String,
    kind: ReportKind,
}

static DEFAULT_POLICY: LazyLock<ClassificationPolicy> = LazyLock::new(ClassificationPolicy::builtin);

impl Default for ClassificationPolicy {
    fn default() -> Self {
        DEFAULT_POLICY.clone()
    }
}

impl ClassificationPolicy {
    fn builtin() -> Self {
        let outage_rules = vec![
            OutageRule {
                pattern: Regex::new(r"major\s+power\s+outage|hospital").expect("valid regex"),
                kind: ReportKind::Incident,
            },
            OutageRule {
                pattern: Regex::new(r"power\s+outage").expect("valid regex"),
                kind: ReportKind::Complaint,
            },
        ];
        Self {
            incident_terms: INCIDENT_TERMS.iter().map(|t| t.to_string()).collect(),
            complaint_terms: COMPLAINT_TERMS.iter().map(|t| t.to_string()).collect(),
            outage_rules,
            default_kind: ReportKind::Incident,
        }
    }

    /// Load a replacement policy table from YAML.
    ///
    /// Terms are lower-cased on load so matching stays case-insensitive.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let file: PolicyFile =
            serde_yaml::from_str(contents).map_err(|err| Error::Policy(err.to_string()))?;
        if file.incident_terms.is_empty() && file.complaint_terms.is_empty() {
            return Err(Error::Policy("policy has no terms".to_string()));
        }
        let outage_rules = file
            .outage_rules
            .iter()
            .map(|rule| OutageRule::new(&rule.pattern, rule.kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            incident_terms: lowercase_all(file.incident_terms),
            complaint_terms: lowercase_all(file.complaint_terms),
            outage_rules,
            default_kind: file.default_kind.unwrap_or(ReportKind::Incident),
        })
    }

    pub fn classify(&self, category: Option<&str>, subcategory: Option<&str>) -> ReportKind {
        let key = category.unwrap_or_default().to_lowercase();
        let sub = subcategory.unwrap_or_default().to_lowercase();

        if let Some(kind) = self.match_terms(&key) {
            return kind;
        }
        if let Some(kind) = self.match_terms(&sub) {
            return kind;
        }
        for rule in &self.outage_rules {
            if rule.pattern.is_match(&sub) {
                return rule.kind;
            }
        }
        self.default_kind
    }

    fn match_terms(&self, source: &str) -> Option<ReportKind> {
        if source.is_empty() {
            return None;
        }
        if any_match(source, &self.incident_terms) {
            return Some(ReportKind::Incident);
        }
        if any_match(source, &self.complaint_terms) {
            return Some(ReportKind::Complaint);
        }
        None
    }
}

fn any_match(source: &str, terms: &[String]) -> bool {
    terms.iter().any(|term| source.contains(term.as_str()))
}

fn lowercase_all(terms: Vec<String>) -> Vec<String> {
    terms.into_iter().map(|term| term.to_lowercase()).collect()
}

/// Classify with the built-in policy.
pub fn classify(category: Option<&str>, subcategory: Option<&str>) -> ReportKind {
    DEFAULT_POLICY.classify(category, subcategory)
}

static ROAD_CATEGORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"road|street|traffic|roadway_hazard|pothole|debris|hazard").expect("valid regex")
});
static ROAD_SUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pothole|debris|hazard").expect("valid regex"));
static ELECTRIC_CATEGORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"electric|power|grid|light|lamp|streetlight|utilities?|water|telecom")
        .expect("valid regex")
});
static ELECTRIC_SUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"power_outage|streetlight|lamp|water_cut|telecom_outage|internet")
        .expect("valid regex")
});
static SANITATION_CATEGORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sanit|garbage|waste|sewage|trash|clean").expect("valid regex")
});
static SANITATION_SUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"garbage|waste|trash|sewage").expect("valid regex"));

/// Bucket a complaint for UI colouring; utilities share the electric bucket.
pub fn complaint_bucket(category: Option<&str>, subcategory: Option<&str>) -> ComplaintBucket {
    let cat = category.unwrap_or_default().to_lowercase();
    let sub = subcategory.unwrap_or_default().to_lowercase();
    if ROAD_CATEGORY.is_match(&cat) || ROAD_SUB.is_match(&sub) {
        return ComplaintBucket::Road;
    }
    if ELECTRIC_CATEGORY.is_match(&cat) || ELECTRIC_SUB.is_match(&sub) {
        return ComplaintBucket::Electric;
    }
    if SANITATION_CATEGORY.is_match(&cat) || SANITATION_SUB.is_match(&sub) {
        return ComplaintBucket::Sanitation;
    }
    ComplaintBucket::Infrastructure
}
