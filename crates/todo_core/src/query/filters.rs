//! Validated pagination and sort parameters.
//!
//! # Responsibility
//! - Validate page, page size and sort key against fixed bounds and an
//!   allow-list.
//! - Derive the ORDER BY column/direction and LIMIT/OFFSET values.
//!
//! # Invariants
//! - A `Filters` value always satisfies the page bounds and its allow-list:
//!   it comes from `Filters::new` or from the fixed `todo_defaults`, which
//!   `Filters::new` accepts unchanged.
//! - `sort_column()` never returns a value outside the allow-list.

use crate::validator::{permitted_value, ValidationErrors};

pub const PAGE_MAX: i64 = 1000;
pub const PAGE_SIZE_MAX: i64 = 100;
pub const DESCENDING_MARKER: char = '-';

/// Sortable todo fields, ascending and descending.
pub const TODO_SORT_SAFELIST: &[&str] = &[
    "id",
    "title",
    "description",
    "completed",
    "-id",
    "-title",
    "-description",
    "-completed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Page/page-size/sort parameters that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    page: u32,
    page_size: u32,
    sort: String,
    sort_safelist: Vec<String>,
}

impl Filters {
    /// Validates raw parameters against the page bounds and `sort_safelist`.
    ///
    /// # Errors
    /// Returns messages keyed by `page`, `page_size` and/or `sort`.
    pub fn new(
        page: i64,
        page_size: i64,
        sort: impl Into<String>,
        sort_safelist: &[&str],
    ) -> Result<Self, ValidationErrors> {
        let sort = sort.into();
        let mut errors = ValidationErrors::new();

        errors.check(page > 0, "page", "must be greater than zero");
        errors.check(page <= PAGE_MAX, "page", "must be a maximum of 1000");
        errors.check(page_size > 0, "page_size", "must be greater than zero");
        errors.check(
            page_size <= PAGE_SIZE_MAX,
            "page_size",
            "must be a maximum of 100",
        );
        errors.check(
            permitted_value(&sort.as_str(), sort_safelist),
            "sort",
            "invalid sort value",
        );

        if !errors.is_empty() {
            return Err(errors);
        }

        // Bounds were checked above, so the narrowing casts are lossless.
        Ok(Self {
            page: page as u32,
            page_size: page_size as u32,
            sort,
            sort_safelist: sort_safelist.iter().map(|value| value.to_string()).collect(),
        })
    }

    /// Defaults used by the list endpoint: first page, ten rows, sorted by id.
    ///
    /// Equal to `Filters::new(1, 10, "id", TODO_SORT_SAFELIST)`.
    pub fn todo_defaults() -> Self {
        Self {
            page: 1,
            page_size: 10,
            sort: "id".to_string(),
            sort_safelist: TODO_SORT_SAFELIST
                .iter()
                .map(|value| value.to_string())
                .collect(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> &str {
        &self.sort
    }

    /// Column name for ORDER BY, with the descending marker stripped.
    ///
    /// # Panics
    /// Panics if the sort key is not in the allow-list. Construction through
    /// [`Filters::new`] makes this unreachable.
    pub fn sort_column(&self) -> &str {
        if self.sort_safelist.iter().any(|safe| *safe == self.sort) {
            return self
                .sort
                .strip_prefix(DESCENDING_MARKER)
                .unwrap_or(&self.sort);
        }
        panic!("unsafe sort parameter: {}", self.sort);
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with(DESCENDING_MARKER) {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }
}

impl Default for Filters {
    fn default() -> Self {
        Self::todo_defaults()
    }
}
