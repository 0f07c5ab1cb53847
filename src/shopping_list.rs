//! Shopping list export: sums the ingredients of every recipe in a user's
//! cart into one line per ingredient.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use log::debug;
use sqlx::{Pool, Postgres};

use crate::{
    actions::list_cart_line_items,
    constants::SHOPPING_LIST_FOOTER,
    jwt::SessionData,
    schema::{CartLineItem, Id},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListEntry {
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingList {
    pub date: NaiveDate,
    /// Ordered by ingredient id.
    pub entries: Vec<ShoppingListEntry>,
}

impl ShoppingList {
    /// Groups line items by ingredient id, never by name, and sums amounts.
    pub fn aggregate(items: impl IntoIterator<Item = CartLineItem>, date: NaiveDate) -> Self {
        let mut grouped: BTreeMap<Id, ShoppingListEntry> = BTreeMap::new();

        for item in items {
            grouped
                .entry(item.ingredient_id)
                .or_insert_with(|| ShoppingListEntry {
                    ingredient_id: item.ingredient_id,
                    name: item.name,
                    measurement_unit: item.measurement_unit,
                    amount: 0,
                })
                .amount += i64::from(item.amount);
        }

        Self {
            date,
            entries: grouped.into_values().collect(),
        }
    }

    pub fn header(&self) -> String {
        format!("Shopping list for {}", self.date)
    }

    pub fn footer(&self) -> String {
        format!("{SHOPPING_LIST_FOOTER} {}", self.date.year())
    }

    pub fn render(&self) -> String {
        let mut s = self.header();
        s += "\n\n";

        for entry in &self.entries {
            s += &format!(
                "{} - {}{}\n",
                entry.name, entry.amount, entry.measurement_unit
            );
        }

        s += "\n";
        s += &self.footer();
        s += "\n";
        s
    }
}

/// Builds today's shopping list for the caller.
pub async fn build_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, potion::Error> {
    let items = list_cart_line_items(session.user_id, pool).await?;
    debug!(
        "Aggregating {} line items for user {}",
        items.len(),
        session.user_id
    );

    Ok(ShoppingList::aggregate(items, Local::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(ingredient_id: Id, name: &str, unit: &str, amount: i32) -> CartLineItem {
        CartLineItem {
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn sums_amounts_across_recipes() {
        // Recipe A: flour, sugar. Recipe B: flour, egg.
        let items = vec![
            item(1, "Flour", "g", 200),
            item(2, "Sugar", "g", 50),
            item(1, "Flour", "g", 100),
            item(3, "Egg", "pcs", 2),
        ];

        let list = ShoppingList::aggregate(items, date());

        assert_eq!(
            list.render(),
            "Shopping list for 2024-03-09\n\nFlour - 300g\nSugar - 50g\nEgg - 2pcs\n\nfoodgram 2024\n"
        );
    }

    #[test]
    fn orders_by_ingredient_id_not_input_order() {
        let items = vec![
            item(9, "Zucchini", "pcs", 1),
            item(4, "Apple", "pcs", 3),
            item(7, "Milk", "ml", 250),
        ];

        let ids: Vec<Id> = ShoppingList::aggregate(items, date())
            .entries
            .iter()
            .map(|entry| entry.ingredient_id)
            .collect();

        assert_eq!(ids, vec![4, 7, 9]);
    }

    #[test]
    fn same_name_different_ingredient_stays_separate() {
        let items = vec![item(1, "Salt", "g", 5), item(2, "Salt", "tsp", 1)];

        let list = ShoppingList::aggregate(items, date());

        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.entries[0].amount, 5);
        assert_eq!(list.entries[1].amount, 1);
    }

    #[test]
    fn empty_cart_has_only_header_and_footer() {
        let list = ShoppingList::aggregate(vec![], date());

        let rendered = list.render();
        let lines: Vec<&str> = rendered
            .lines()
            .filter(|line| !line.is_empty())
            .collect();

        assert_eq!(lines, vec!["Shopping list for 2024-03-09", "foodgram 2024"]);
    }

    #[test]
    fn sums_do_not_overflow_i32() {
        let items = vec![item(1, "Rice", "g", i32::MAX), item(1, "Rice", "g", 1)];

        let list = ShoppingList::aggregate(items, date());

        assert_eq!(list.entries[0].amount, i64::from(i32::MAX) + 1);
    }
}
