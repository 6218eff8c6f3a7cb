use chrono::Local;

use crate::models::DraftLineItem;

/// Produces a fresh human-readable receipt number from the wall clock,
/// e.g. `R-20260214-093015`. Second resolution means two calls within
/// the same second can collide; the ledger's UNIQUE constraint is the
/// backstop and the caller regenerates.
pub fn next_receipt_number() -> String {
    format!("R-{}", Local::now().format("%Y%m%d-%H%M%S"))
}

/// Reassigns item numbers as a dense 1..N sequence over the rows that
/// carry a description, in display order. Rows without a description
/// lose any number they had. Run after every edit that adds, removes
/// or blanks a description so the numbering never shows gaps.
pub fn renumber_items(items: &mut [DraftLineItem]) {
    let mut next = 1u32;
    for item in items.iter_mut() {
        if item.description.trim().is_empty() {
            item.item_number.clear();
        } else {
            item.item_number = next.to_string();
            next += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(description: &str) -> DraftLineItem {
        DraftLineItem {
            description: description.to_string(),
            ..DraftLineItem::default()
        }
    }

    #[test]
    fn receipt_number_has_timestamp_shape() {
        let number = next_receipt_number();
        assert_eq!(number.len(), "R-YYYYMMDD-HHMMSS".len());
        assert!(number.starts_with("R-"));
        assert!(number[2..10].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(&number[10..11], "-");
        assert!(number[11..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn numbers_only_rows_with_descriptions() {
        let mut items = vec![row("Consultation"), row(""), row("Vaccine"), row("  "), row("Dressing")];
        renumber_items(&mut items);

        let numbers: Vec<&str> = items.iter().map(|i| i.item_number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "", "2", "", "3"]);
    }

    #[test]
    fn renumbering_is_idempotent() {
        let mut items = vec![row("Consultation"), row(""), row("Vaccine")];
        renumber_items(&mut items);
        let first: Vec<String> = items.iter().map(|i| i.item_number.clone()).collect();

        renumber_items(&mut items);
        let second: Vec<String> = items.iter().map(|i| i.item_number.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn blanking_a_description_compacts_the_sequence() {
        let mut items = vec![row("Consultation"), row("Vaccine"), row("Dressing")];
        renumber_items(&mut items);
        assert_eq!(items[2].item_number, "3");

        items[1].description.clear();
        renumber_items(&mut items);
        assert_eq!(items[0].item_number, "1");
        assert_eq!(items[1].item_number, "");
        assert_eq!(items[2].item_number, "2");
    }
}
