//! Button-to-sheet mapping.

/// Callback data of the button that invalidates the cache
pub const REFRESH_ACTION: &str = "refresh";

/// A menu entry bound to one sheet of the workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Callback data carried by the button
    pub id: String,
    /// Button caption
    pub label: String,
    /// Sheet name in the workbook, also used as the display name
    pub sheet: String,
}

impl Section {
    /// Creates a section entry.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sheet: sheet.into(),
        }
    }
}

/// Immutable mapping from button identifiers to sheet names, in menu order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMap {
    sections: Vec<Section>,
}

impl SectionMap {
    /// Creates a map from an ordered list of sections.
    #[must_use]
    pub const fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Sheet name for a button identifier.
    #[must_use]
    pub fn sheet_for(&self, id: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.id == id)
            .map(|section| section.sheet.as_str())
    }

    /// Sections in menu order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if no sections are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Default for SectionMap {
    fn default() -> Self {
        Self::new(vec![
            Section::new("raw_powerrise", "✅ Сырьё POWERRISE", "Сырьё Powerrise"),
            Section::new("raw_nutropro", "✅ Сырьё NUTROPRO", "Сырьё NUTROPRO"),
            Section::new("ready_powerrise", "✅ Готовая POWERRISE", "Готовая Powerrise"),
            Section::new("ready_nutropro", "✅ Готовая NUTROPRO", "Готовая NUTROPRO"),
        ])
    }
}
