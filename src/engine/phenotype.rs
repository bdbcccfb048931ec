//! Diplotype → phenotype resolution.
//!
//! The table is keyed by canonical gene symbols and canonical diplotypes
//! (`*<allele>/*<allele>[xN]`). Both the table keys and caller input go
//! through the same normalization, so `cyp2d6`, `CYP2D6*4/*1` and `*1/*4`
//! all land on the same entry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::data::PHENOTYPES;
use super::ReferenceError;
use crate::models::enums::Phenotype;

static ALLELE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*?(\d+)([A-Z]*?)(?:X(N|\d+))?$").expect("allele pattern is valid")
});

/// Immutable gene → diplotype → phenotype mapping.
#[derive(Debug, Clone, Default)]
pub struct PhenotypeTable {
    genes: HashMap<String, HashMap<String, Phenotype>>,
}

impl PhenotypeTable {
    /// Build a table from raw (possibly non-canonical) keys.
    ///
    /// Two raw keys that normalize to the same gene and diplotype are
    /// rejected, whatever phenotypes they carry.
    pub fn from_map(raw: HashMap<String, HashMap<String, Phenotype>>) -> Result<Self, ReferenceError> {
        let mut table = Self::default();
        for (gene, diplotypes) in raw {
            for (diplotype, phenotype) in diplotypes {
                table.insert(&gene, &diplotype, phenotype)?;
            }
        }
        Ok(table)
    }

    /// Built-in CPIC / PharmVar table.
    pub fn cpic_default() -> Self {
        let mut table = Self::default();
        for (gene, rows) in PHENOTYPES {
            for (diplotype, phenotype) in *rows {
                if let Err(e) = table.insert(gene, diplotype, *phenotype) {
                    tracing::warn!(error = %e, "Skipping built-in phenotype row");
                }
            }
        }
        table
    }

    fn insert(&mut self, gene: &str, diplotype: &str, phenotype: Phenotype) -> Result<(), ReferenceError> {
        let gene_key = normalize_gene(gene);
        let diplotype_key = normalize_diplotype(&gene_key, diplotype);
        match self.genes.entry(gene_key.clone()).or_default().entry(diplotype_key) {
            Entry::Occupied(existing) => Err(ReferenceError::DuplicateDiplotype {
                gene: gene_key,
                diplotype: existing.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(phenotype);
                Ok(())
            }
        }
    }

    /// Load from a JSON file shaped `{"GENE": {"*1/*2": "Intermediate Metabolizer"}}`.
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReferenceError::ReferenceDataLoad(path.display().to_string(), e.to_string())
        })?;
        let raw: HashMap<String, HashMap<String, String>> = serde_json::from_str(&json)
            .map_err(|e| ReferenceError::ReferenceDataParse(file_name(path), e.to_string()))?;

        let mut parsed = HashMap::with_capacity(raw.len());
        for (gene, diplotypes) in raw {
            let mut entry = HashMap::with_capacity(diplotypes.len());
            for (diplotype, label) in diplotypes {
                entry.insert(diplotype, label.parse::<Phenotype>()?);
            }
            parsed.insert(gene, entry);
        }
        Self::from_map(parsed)
    }

    /// Resolve a phenotype. Never fails: anything not in the table is
    /// `Indeterminate`.
    pub fn resolve(&self, gene: &str, diplotype: &str) -> Phenotype {
        let gene_key = normalize_gene(gene);
        self.genes
            .get(&gene_key)
            .and_then(|diplotypes| diplotypes.get(&normalize_diplotype(&gene_key, diplotype)))
            .copied()
            .unwrap_or(Phenotype::Indeterminate)
    }

    pub fn contains_gene(&self, gene: &str) -> bool {
        self.genes.contains_key(&normalize_gene(gene))
    }

    /// Gene symbols, sorted.
    pub fn genes(&self) -> Vec<&str> {
        let mut genes: Vec<&str> = self.genes.keys().map(String::as_str).collect();
        genes.sort_unstable();
        genes
    }

    pub fn len(&self) -> usize {
        self.genes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Canonical gene symbol: trimmed, upper-case.
pub fn normalize_gene(gene: &str) -> String {
    gene.trim().to_uppercase()
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Allele {
    number: u32,
    suffix: String,
    duplicated: bool,
}

impl Allele {
    fn parse(raw: &str, gene: &str) -> Option<Self> {
        let upper = raw.to_uppercase();
        let stripped = if gene.is_empty() {
            upper.as_str()
        } else {
            upper.strip_prefix(gene).unwrap_or(&upper)
        };
        let caps = ALLELE_PATTERN.captures(stripped)?;
        Some(Self {
            number: caps.get(1)?.as_str().parse().ok()?,
            suffix: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            duplicated: caps.get(3).is_some(),
        })
    }

    fn render(&self) -> String {
        let dup = if self.duplicated { "xN" } else { "" };
        format!("*{}{}{}", self.number, self.suffix, dup)
    }
}

/// Canonical diplotype `*<allele>/*<allele>[xN]`.
///
/// Removes whitespace and any gene prefix, restores missing `*`, upper-cases
/// allele suffixes, folds copy-number notation to `xN`, and orders the two
/// alleles. Input that does not parse as two star alleles is returned
/// trimmed but otherwise untouched.
pub fn normalize_diplotype(gene: &str, diplotype: &str) -> String {
    let compact: String = diplotype.chars().filter(|c| !c.is_whitespace()).collect();
    let gene = normalize_gene(gene);

    let parts: Vec<&str> = compact.split('/').collect();
    if parts.len() != 2 {
        return diplotype.trim().to_string();
    }

    match (Allele::parse(parts[0], &gene), Allele::parse(parts[1], &gene)) {
        (Some(a), Some(b)) => {
            let (first, second) = if a <= b { (a, b) } else { (b, a) };
            format!("{}/{}", first.render(), second.render())
        }
        _ => diplotype.trim().to_string(),
    }
}
