use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use menuseed_core::catalog::Stored;
use menuseed_core::models::{Category, MenuDocument};

/// Ask a yes/no question on stderr. Anything other than `y`/`yes` is a no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_menu_table(items: &[Stored<MenuDocument>], categories: &[Stored<Category>]) {
    #[derive(Tabled)]
    struct MenuRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Rating")]
        rating: String,
        #[tabled(rename = "Cal")]
        calories: i64,
        #[tabled(rename = "Protein")]
        protein: i64,
    }

    let rows: Vec<MenuRow> = items
        .iter()
        .map(|m| MenuRow {
            id: truncate(&m.id, 12),
            name: truncate(&m.record.name, 30),
            category: categories
                .iter()
                .find(|c| c.id == m.record.categories)
                .map_or_else(|| "-".to_string(), |c| c.record.name.clone()),
            price: format!("{:.2}", m.record.price),
            rating: format!("{:.1}", m.record.rating),
            calories: m.record.calories,
            protein: m.record.protein,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_category_table(categories: &[Stored<Category>]) {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            id: truncate(&c.id, 12),
            name: c.record.name.clone(),
            description: truncate(&c.record.description, 50),
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
