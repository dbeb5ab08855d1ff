// ============================================================
// ROW NORMALIZER
// ============================================================
// Raw sheet rows -> candidate entities, per the taxonomy's column schema

use crate::application::use_cases::slug::derive_slug;
use crate::domain::{CandidateEntity, Flavor, Row};

/// Column positions for one flavor. Name is always required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name_column: usize,
    pub icon_column: Option<usize>,
    pub subcategories_column: Option<usize>,
}

impl ColumnSchema {
    pub fn for_flavor(flavor: Flavor) -> Self {
        match flavor {
            Flavor::Hierarchical => Self {
                name_column: 0,
                icon_column: Some(1),
                subcategories_column: Some(2),
            },
            Flavor::Flat => Self {
                name_column: 0,
                icon_column: None,
                subcategories_column: None,
            },
        }
    }

    /// Rightmost column this schema reads.
    pub fn width(&self) -> usize {
        [
            Some(self.name_column),
            self.icon_column,
            self.subcategories_column,
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Header rows are recognised by their first cell mentioning "name".
pub fn is_header_row(row: &Row) -> bool {
    row.cell(0)
        .map(|cell| cell.to_lowercase().contains("name"))
        .unwrap_or(false)
}

/// Splits a comma-separated subcategory cell. Blank pieces are dropped.
pub fn split_subcategories(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn normalize_rows(rows: &[Row], schema: &ColumnSchema) -> Vec<CandidateEntity> {
    let data_rows = match rows.first() {
        Some(first) if is_header_row(first) => &rows[1..],
        _ => rows,
    };

    data_rows
        .iter()
        .filter_map(|row| normalize_row(row, schema))
        .collect()
}

/// Rows blank across the schema's columns are spreadsheet noise and vanish.
/// A row with content in those columns but no name is kept so reconciliation
/// can report it.
fn normalize_row(row: &Row, schema: &ColumnSchema) -> Option<CandidateEntity> {
    let name = row.trimmed(schema.name_column).unwrap_or_default().to_string();
    let icon = schema
        .icon_column
        .and_then(|column| row.trimmed(column))
        .map(str::to_string);
    let subcategories = schema
        .subcategories_column
        .and_then(|column| row.cell(column))
        .map(split_subcategories)
        .unwrap_or_default();

    if name.is_empty() && row.is_blank_within(schema.width()) {
        tracing::debug!(row = row.number, "Dropping blank row");
        return None;
    }

    let slug = derive_slug(&name);
    Some(CandidateEntity {
        row: row.number,
        name,
        icon,
        subcategories,
        slug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchical() -> ColumnSchema {
        ColumnSchema::for_flavor(Flavor::Hierarchical)
    }

    #[test]
    fn test_header_row_is_skipped() {
        let rows = vec![
            Row::from_texts(1, &["Category Name", "Icon", "Subcategories"]),
            Row::from_texts(2, &["Design", "Palette", "UI, UX"]),
        ];
        let candidates = normalize_rows(&rows, &hierarchical());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Design");
        assert_eq!(candidates[0].row, 2);
    }

    #[test]
    fn test_no_header_keeps_first_row() {
        let rows = vec![
            Row::from_texts(1, &["Design"]),
            Row::from_texts(2, &["Engineering"]),
        ];
        let candidates = normalize_rows(&rows, &ColumnSchema::for_flavor(Flavor::Flat));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].slug, "design");
    }

    #[test]
    fn test_cells_are_trimmed_and_split() {
        let rows = vec![Row::from_texts(1, &["  Development ", " Code ", "Frontend, , Backend ,"])];
        let candidate = &normalize_rows(&rows, &hierarchical())[0];
        assert_eq!(candidate.name, "Development");
        assert_eq!(candidate.icon.as_deref(), Some("Code"));
        assert_eq!(candidate.subcategories, vec!["Frontend", "Backend"]);
        assert_eq!(candidate.slug, "development");
    }

    #[test]
    fn test_blank_icon_is_absent() {
        let rows = vec![Row::from_texts(1, &["Development", "  ", "Backend"])];
        let candidate = &normalize_rows(&rows, &hierarchical())[0];
        assert_eq!(candidate.icon, None);
    }

    #[test]
    fn test_blank_rows_dropped_but_nameless_content_kept() {
        let rows = vec![
            Row::from_texts(2, &["Design"]),
            Row::from_texts(3, &["", "", ""]),
            Row::from_texts(4, &["", "Code", ""]),
            Row::new(5, vec![]),
        ];
        let candidates = normalize_rows(&rows, &hierarchical());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].row, 4);
        assert!(candidates[1].name.is_empty());
    }

    #[test]
    fn test_flat_schema_ignores_extra_columns() {
        let rows = vec![Row::from_texts(1, &["Rust", "Code", "Systems, Web"])];
        let candidate = &normalize_rows(&rows, &ColumnSchema::for_flavor(Flavor::Flat))[0];
        assert_eq!(candidate.icon, None);
        assert!(candidate.subcategories.is_empty());
    }

    #[test]
    fn test_nameless_row_with_only_ignored_columns_is_dropped() {
        let rows = vec![
            Row::from_texts(2, &["Rust"]),
            Row::from_texts(3, &["", "note in ignored column"]),
            Row::from_texts(4, &["Go"]),
        ];
        let candidates = normalize_rows(&rows, &ColumnSchema::for_flavor(Flavor::Flat));
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Go"]);

        let rows = vec![Row::from_texts(5, &["", "", "", "margin note"])];
        assert!(normalize_rows(&rows, &hierarchical()).is_empty());
    }

    #[test]
    fn test_duplicates_are_not_collapsed() {
        let rows = vec![Row::from_texts(1, &["Design"]), Row::from_texts(2, &["design"])];
        assert_eq!(normalize_rows(&rows, &hierarchical()).len(), 2);
    }

    #[test]
    fn test_schema_width() {
        assert_eq!(hierarchical().width(), 3);
        assert_eq!(ColumnSchema::for_flavor(Flavor::Flat).width(), 1);
    }
}
