/// Narrows which courses a list or count targets.
///
/// The same filter value must be handed to both `count` and `list` for one
/// request so the total and the page agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilter {
    /// Case-insensitive substring of the course name. Empty means no filter.
    pub name: String,
}

impl CourseFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// `LIKE` pattern for the name filter, lower-cased and escaped with `\`,
    /// or `None` when the filter is empty.
    pub fn name_pattern(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut pattern = String::with_capacity(self.name.len() + 2);
        pattern.push('%');
        for ch in self.name.to_lowercase().chars() {
            if matches!(ch, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');
        Some(pattern)
    }
}
