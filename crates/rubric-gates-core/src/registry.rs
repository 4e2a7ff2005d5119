//! Catalogue of the clinical datasets the benchmark harness knows about.

use serde::Serialize;

/// Static description of a supported dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// PhysioNet landing page or other canonical source.
    pub source: &'static str,
    pub version: &'static str,
    /// Requires PhysioNet credentialed access.
    pub credentialed: bool,
    pub license: &'static str,
    pub citation: &'static str,
    pub tables: &'static [&'static str],
    /// Adapter that turns raw tables into artifacts.
    pub adapter: &'static str,
    pub expected_size_gb: Option<f64>,
    pub physionet_project: Option<&'static str>,
}

const PHYSIONET_CREDENTIALED: &str = "PhysioNet Credentialed Health Data License 1.5.0";

static DATASETS: &[DatasetInfo] = &[
    DatasetInfo {
        id: "mimic_iv",
        name: "MIMIC-IV",
        description: "Critical care database from Beth Israel Deaconess Medical Center (2008-2019)",
        source: "https://physionet.org/content/mimiciv/",
        version: "2.2",
        credentialed: true,
        license: PHYSIONET_CREDENTIALED,
        citation: "Johnson, A., Bulgarelli, L., Pollard, T., Horng, S., Celi, L. A., & Mark, R. (2023). MIMIC-IV (version 2.2). PhysioNet.",
        tables: &[
            "patients",
            "admissions",
            "icustays",
            "chartevents",
            "labevents",
            "prescriptions",
            "diagnoses_icd",
        ],
        adapter: "adapters::mimic_iv",
        expected_size_gb: Some(7.0),
        physionet_project: Some("mimiciv/2.2"),
    },
    DatasetInfo {
        id: "eicu",
        name: "eICU-CRD",
        description: "Multi-center critical care database from Philips eICU program (2014-2015)",
        source: "https://physionet.org/content/eicu-crd/",
        version: "2.0",
        credentialed: true,
        license: PHYSIONET_CREDENTIALED,
        citation: "Pollard, T. J., Johnson, A. E. W., Raffa, J. D., Celi, L. A., Mark, R. G., & Badawi, O. (2018). The eICU Collaborative Research Database (version 2.0). PhysioNet.",
        tables: &[
            "patient",
            "admissiondx",
            "apacheapsvar",
            "apachepatientresult",
            "diagnosis",
            "lab",
            "medication",
            "vitalperiodic",
        ],
        adapter: "adapters::eicu",
        expected_size_gb: Some(3.5),
        physionet_project: Some("eicu-crd/2.0"),
    },
    DatasetInfo {
        id: "amsterdamumcdb",
        name: "AmsterdamUMCdb",
        description: "Critical care database from Amsterdam University Medical Centers (2003-2016)",
        source: "https://physionet.org/content/amsterdamumcdb/",
        version: "1.0.2",
        credentialed: true,
        license: "Open Data Commons Open Database License v1.0",
        citation: "Thoral, P. J., et al. (2021). Sharing ICU Patient Data Responsibly. Critical Care Medicine.",
        tables: &[
            "admissions",
            "drugitems",
            "freetextitems",
            "listitems",
            "numericitems",
            "procedureorderitems",
        ],
        adapter: "adapters::amsterdamumcdb",
        expected_size_gb: Some(1.2),
        physionet_project: Some("amsterdamumcdb/1.0.2"),
    },
    DatasetInfo {
        id: "hirid",
        name: "HiRID",
        description: "High time resolution ICU dataset from Bern University Hospital (2008-2016)",
        source: "https://physionet.org/content/hirid/",
        version: "1.1.1",
        credentialed: true,
        license: PHYSIONET_CREDENTIALED,
        citation: "Hyland, S. L., et al. (2020). Early prediction of circulatory failure in the intensive care unit using machine learning. Nature Medicine.",
        tables: &["general_table", "observation_tables", "pharma_records"],
        adapter: "adapters::hirid",
        expected_size_gb: Some(35.0),
        physionet_project: Some("hirid/1.1.1"),
    },
    DatasetInfo {
        id: "mimic_iii",
        name: "MIMIC-III",
        description: "Critical care database from Beth Israel Deaconess Medical Center (2001-2012)",
        source: "https://physionet.org/content/mimiciii/",
        version: "1.4",
        credentialed: true,
        license: PHYSIONET_CREDENTIALED,
        citation: "Johnson, A. E. W., et al. (2016). MIMIC-III, a freely accessible critical care database. Scientific Data.",
        tables: &[
            "patients",
            "admissions",
            "icustays",
            "chartevents",
            "labevents",
            "prescriptions",
            "diagnoses_icd",
        ],
        adapter: "adapters::mimic_iii",
        expected_size_gb: Some(6.0),
        physionet_project: Some("mimiciii/1.4"),
    },
];

/// Look up a dataset by id.
pub fn get(id: &str) -> Option<&'static DatasetInfo> {
    DATASETS.iter().find(|d| d.id == id)
}

/// All datasets in registration order.
pub fn list() -> &'static [DatasetInfo] {
    DATASETS
}
