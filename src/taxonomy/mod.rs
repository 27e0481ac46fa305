//! The fixed taxonomy of 483 deficiency categories.
//!
//! Both the classifier (prompt construction, response validation) and the
//! report generator (chart ordering) consume this single definition. The
//! label strings are part of the output file format and must not change
//! between runs that are meant to be comparable.

use std::fmt;

/// A deficiency category cited on an FDA Form 483.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ProceduresNotFollowed,
    InadequateInvestigation,
    DataIntegrity,
    DeficientCleaning,
    InadequateEquipment,
    LackOfValidation,
    InadequateTesting,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::ProceduresNotFollowed,
        Category::InadequateInvestigation,
        Category::DataIntegrity,
        Category::DeficientCleaning,
        Category::InadequateEquipment,
        Category::LackOfValidation,
        Category::InadequateTesting,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::ProceduresNotFollowed => "Procedures Not in Writing / Not Followed",
            Category::InadequateInvestigation => {
                "Inadequate Investigation of Discrepancies (CAPA)"
            }
            Category::DataIntegrity => "Data Integrity and Record-Keeping",
            Category::DeficientCleaning => "Deficient Cleaning, Sanitizing, and Maintenance",
            Category::InadequateEquipment => "Inadequate Equipment and Facilities",
            Category::LackOfValidation => "Lack of Process or Equipment Validation",
            Category::InadequateTesting => "Inadequate Testing and Quality Control",
        }
    }

    /// One-line analyst description, embedded verbatim in the prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Category::ProceduresNotFollowed => {
                "SOPs are missing, inadequate, or not being followed by staff."
            }
            Category::InadequateInvestigation => {
                "Failures, deviations, or out-of-spec results are not properly investigated; \
                 Corrective and Preventive Actions (CAPA) are deficient."
            }
            Category::DataIntegrity => {
                "Records are not accurate, complete, or secure. Includes issues with master \
                 production and control records."
            }
            Category::DeficientCleaning => {
                "Equipment and facilities are not properly cleaned or maintained, posing \
                 contamination risks."
            }
            Category::InadequateEquipment => {
                "The design, size, location, or maintenance of equipment or the facility \
                 itself is deficient."
            }
            Category::LackOfValidation => {
                "Manufacturing processes or equipment have not been validated to ensure \
                 consistent product quality."
            }
            Category::InadequateTesting => {
                "Insufficient or inadequate testing of raw materials or finished products."
            }
        }
    }

    /// Resolves a label back to its category, ignoring case and surrounding
    /// whitespace. Unknown labels return `None`; they are never coerced into
    /// a taxonomy member.
    pub fn from_label(label: &str) -> Option<Category> {
        let trimmed = label.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed))
    }

    fn index(&self) -> usize {
        Category::ALL
            .iter()
            .position(|c| c == self)
            .expect("category missing from ALL")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Multi-label assignment over the fixed taxonomy. An observation may cite
/// several deficiency categories at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySet {
    flags: [bool; Category::ALL.len()],
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category) {
        self.flags[category.index()] = true;
    }

    pub fn contains(&self, category: Category) -> bool {
        self.flags[category.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.flags.iter().all(|f| !f)
    }

    pub fn len(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    /// Categories in canonical taxonomy order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .iter()
            .copied()
            .filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}
