//! Term lists and topic definitions used by the lexical heuristics.
//!
//! All terms are matched as whole words or whole phrases against lowercased
//! Unicode word tokens, so `"trial"` matches "Trial," but not "trialled".

use serde::{Deserialize, Serialize};

/// Vocabulary driving classification, relaxation and query expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermLists {
    /// Fields unrelated to the medical domain. A hit rejects the record
    /// unless an `on_domain_context` term is also present.
    pub off_domain: Vec<String>,
    /// Clinical context vocabulary that overrides an off-domain hit.
    /// A term listed here and in `off_domain` only ever counts as context.
    pub on_domain_context: Vec<String>,
    /// Vocabulary counted towards inclusion points.
    pub on_domain: Vec<String>,
    /// Journals and venues that earn the venue bonus.
    pub known_venues: Vec<String>,
    /// Instrument names and other keyword-overlap false positives that keep
    /// a record out of the strict level.
    pub hard_exclusions: Vec<String>,
    /// Broad domain words admitting records at the broadened-pool level.
    pub generic_domain: Vec<String>,
    /// Never returned, even as a last resort.
    pub blacklist: Vec<String>,
    /// Query words dropped when extracting keywords.
    pub stopwords: Vec<String>,
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

impl Default for TermLists {
    fn default() -> Self {
        Self {
            off_domain: owned(&[
                "graphene",
                "transistor",
                "semiconductor",
                "astrophysics",
                "cosmology",
                "quantum computing",
                "blockchain",
                "cryptocurrency",
                "macroeconomics",
                "civil engineering",
                "geology",
                "petroleum",
                "linguistics",
                "philosophy",
                "psychology",
                "sociology",
                "marketing",
                "supply chain",
                "robotics",
                "agriculture",
            ]),
            on_domain_context: owned(&[
                "patient",
                "patients",
                "clinical",
                "treatment",
                "therapy",
                "disease",
                "diagnosis",
                "hospital",
                "mortality",
                "morbidity",
                "symptoms",
                "medical",
                "medicine",
                "healthcare",
                "health care",
                "biomarker",
                "pharmacological",
                "drug",
            ]),
            on_domain: owned(&[
                "patient",
                "patients",
                "clinical",
                "treatment",
                "therapy",
                "therapeutic",
                "disease",
                "diagnosis",
                "prognosis",
                "mortality",
                "morbidity",
                "randomized",
                "randomised",
                "trial",
                "placebo",
                "cohort",
                "efficacy",
                "safety",
                "adverse",
                "outcomes",
                "incidence",
                "prevalence",
                "risk",
                "dose",
                "drug",
                "medication",
                "hospital",
                "symptoms",
                "syndrome",
                "chronic",
                "acute",
                "infection",
                "cancer",
                "tumor",
                "tumour",
                "surgery",
                "surgical",
                "meta-analysis",
                "systematic review",
                "epidemiology",
                "pathophysiology",
                "biomarker",
            ]),
            known_venues: owned(&[
                "new england journal of medicine",
                "n engl j med",
                "lancet",
                "jama",
                "bmj",
                "nature medicine",
                "annals of internal medicine",
                "cochrane database of systematic reviews",
                "circulation",
                "journal of clinical oncology",
                "plos medicine",
                "diabetes care",
                "european heart journal",
            ]),
            hard_exclusions: owned(&[
                "mass spectrometer",
                "spectrometer calibration",
                "electron microscope",
                "particle accelerator",
                "telescope",
                "seismometer",
                "oscilloscope",
                "veterinary",
            ]),
            generic_domain: owned(&[
                "health",
                "medical",
                "medicine",
                "clinical",
                "patient",
                "patients",
                "disease",
                "therapy",
                "treatment",
                "care",
                "hospital",
                "drug",
            ]),
            blacklist: owned(&[
                "transistor",
                "semiconductor",
                "integrated circuit",
                "lithium battery",
                "solar cell",
                "wind turbine",
                "automotive",
            ]),
            stopwords: owned(&[
                "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for",
                "from", "how", "in", "into", "is", "it", "of", "on", "or", "than", "that",
                "the", "their", "there", "these", "this", "to", "vs", "versus", "what",
                "when", "which", "who", "why", "with", "without",
            ]),
        }
    }
}

/// A therapeutic area detected from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Stable tag reported as a domain tag.
    pub tag: String,
    /// Query terms that activate this topic.
    pub triggers: Vec<String>,
    /// Synonyms appended to boolean queries and rewarded by the classifier.
    pub synonyms: Vec<String>,
    /// MeSH-style index terms for providers that understand them.
    pub mesh_terms: Vec<String>,
}

impl TopicConfig {
    fn new(tag: &str, triggers: &[&str], synonyms: &[&str], mesh_terms: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            triggers: owned(triggers),
            synonyms: owned(synonyms),
            mesh_terms: owned(mesh_terms),
        }
    }
}

/// Built-in therapeutic areas.
pub fn default_topics() -> Vec<TopicConfig> {
    vec![
        TopicConfig::new(
            "cardiology",
            &["heart", "cardiac", "cardiovascular", "myocardial", "hypertension", "statin", "statins", "stroke", "atrial"],
            &["myocardial infarction", "heart failure", "coronary artery disease", "atrial fibrillation", "hypertension"],
            &["Cardiovascular Diseases", "Myocardial Infarction", "Heart Failure"],
        ),
        TopicConfig::new(
            "oncology",
            &["cancer", "tumor", "tumour", "oncology", "carcinoma", "chemotherapy", "lymphoma", "leukemia", "metastatic"],
            &["neoplasm", "carcinoma", "malignancy", "chemotherapy", "immunotherapy"],
            &["Neoplasms", "Antineoplastic Agents"],
        ),
        TopicConfig::new(
            "endocrinology",
            &["diabetes", "diabetic", "insulin", "glycemic", "obesity", "thyroid", "metformin"],
            &["type 2 diabetes", "glycemic control", "hba1c", "insulin resistance", "obesity"],
            &["Diabetes Mellitus", "Insulin", "Obesity"],
        ),
        TopicConfig::new(
            "neurology",
            &["alzheimer", "dementia", "parkinson", "epilepsy", "migraine", "neurological", "seizure", "multiple sclerosis"],
            &["neurodegeneration", "cognitive decline", "dementia", "seizures"],
            &["Nervous System Diseases", "Dementia"],
        ),
        TopicConfig::new(
            "psychiatry",
            &["depression", "depressive", "anxiety", "schizophrenia", "bipolar", "ptsd", "mental", "antidepressant"],
            &["major depressive disorder", "anxiety disorders", "mental health", "psychotherapy", "antidepressants"],
            &["Mental Disorders", "Depressive Disorder", "Antidepressive Agents"],
        ),
        TopicConfig::new(
            "infectious_disease",
            &["infection", "infectious", "covid", "sars", "virus", "viral", "bacterial", "antibiotic", "hiv", "vaccine", "sepsis"],
            &["antimicrobial", "vaccination", "viral infection", "bacterial infection", "sepsis"],
            &["Communicable Diseases", "Anti-Bacterial Agents", "Vaccines"],
        ),
        TopicConfig::new(
            "respiratory",
            &["asthma", "copd", "pulmonary", "lung", "respiratory", "pneumonia"],
            &["chronic obstructive pulmonary disease", "asthma", "lung function", "pneumonia"],
            &["Respiratory Tract Diseases", "Asthma"],
        ),
        TopicConfig::new(
            "pharmacovigilance",
            &["adverse", "safety", "toxicity", "recall", "side", "overdose", "interaction"],
            &["adverse drug reaction", "drug safety", "adverse event", "drug interaction"],
            &["Drug-Related Side Effects and Adverse Reactions", "Product Surveillance, Postmarketing"],
        ),
    ]
}
