use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Split a client sort key such as `-title` into column and direction.
    /// The key must already be a member of the caller's safelist.
    pub fn parse(sort: &str, safelist: &[&str]) -> Result<FilterOrderInfo, FilterError> {
        if !safelist.contains(&sort) {
            return Err(FilterError::UnsafeSort(sort.to_string()));
        }

        let (column, sort) = match sort.strip_prefix('-') {
            Some(column) => (column, SortDirection::Desc),
            None => (sort, SortDirection::Asc),
        };
        Self::validate_column(column)?;

        Ok(FilterOrderInfo { column: column.to_string(), sort })
    }

    /// `ORDER BY "col" DIR, "tiebreak" ASC`. The tie-breaker keeps paging stable
    /// when the sort column holds duplicates.
    pub fn generate(infos: &[FilterOrderInfo], tiebreak: &str) -> Result<String, FilterError> {
        Self::validate_column(tiebreak)?;

        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        if !infos.iter().any(|i| i.column == tiebreak) {
            parts.push(format!("\"{}\" ASC", tiebreak));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        let mut chars = column.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidColumn(column.to_string()))
        }
    }
}
