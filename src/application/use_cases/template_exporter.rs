use crate::domain::{Flavor, Row, Taxon};

pub const HIERARCHICAL_HEADERS: [&str; 3] = ["Name", "Icon", "Subcategories"];
pub const FLAT_HEADERS: [&str; 1] = ["Name"];

/// Joined with what `split_subcategories` splits on, so re-import is lossless.
pub const SUBCATEGORY_SEPARATOR: &str = ", ";

pub fn headers(flavor: Flavor) -> &'static [&'static str] {
    match flavor {
        Flavor::Hierarchical => &HIERARCHICAL_HEADERS,
        Flavor::Flat => &FLAT_HEADERS,
    }
}

/// Renders taxa into the import schema: header row first, then one row per
/// taxon in the order given.
pub fn export_rows(flavor: Flavor, taxa: &[Taxon]) -> Vec<Row> {
    let mut rows = Vec::with_capacity(taxa.len() + 1);
    rows.push(Row::from_texts(1, headers(flavor)));

    for (index, taxon) in taxa.iter().enumerate() {
        let number = index + 2;
        let row = match flavor {
            Flavor::Hierarchical => {
                let subcategories = taxon.subcategories.join(SUBCATEGORY_SEPARATOR);
                Row::from_texts(
                    number,
                    &[
                        taxon.name.as_str(),
                        taxon.effective_icon().key(),
                        subcategories.as_str(),
                    ],
                )
            }
            Flavor::Flat => Row::from_texts(number, &[taxon.name.as_str()]),
        };
        rows.push(row);
    }
    rows
}
