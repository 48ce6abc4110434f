use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category – which count column the "selected category" plot uses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Speeding,
    Alcohol,
    Distracted,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Speeding, Category::Alcohol, Category::Distracted];

    /// Dataset column holding this category's counts.
    pub fn column(self) -> &'static str {
        match self {
            Category::Speeding => "speeding",
            Category::Alcohol => "alcohol",
            Category::Distracted => "distracted",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Speeding => "Speeding",
            Category::Alcohol => "Alcohol",
            Category::Distracted => "Distracted",
        };
        write!(f, "{label}")
    }
}

// ---------------------------------------------------------------------------
// FilterSelection – the user's current display parameters
// ---------------------------------------------------------------------------

/// Current values of the sidebar widgets.
///
/// `population` is an inclusive `(min, max)`; `None` means the full extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    pub category: Category,
    pub population: Option<(f64, f64)>,
    pub speeding_only: bool,
    pub alcohol_only: bool,
}

impl FilterSelection {
    /// True when no row would be removed on account of the toggles.
    pub fn no_flags(&self) -> bool {
        !self.speeding_only && !self.alcohol_only
    }
}

// Bit-level hashing so the selection can key the recomputation memo.
impl Hash for FilterSelection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category.hash(state);
        self.population
            .map(|(lo, hi)| (lo.to_bits(), hi.to_bits()))
            .hash(state);
        self.speeding_only.hash(state);
        self.alcohol_only.hash(state);
    }
}
