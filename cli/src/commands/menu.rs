use anyhow::Result;

use menuseed_core::catalog::{list_categories, list_menu};

use super::Stores;
use super::helpers::{print_category_table, print_json, print_menu_table};
use crate::config::Config;

pub(crate) async fn cmd_menu(
    config: &Config,
    stores: &Stores,
    category: Option<&str>,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let collections = &config.backend.collections;
    let items = list_menu(stores.documents(), collections, category, search).await?;

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No menu items found.");
        return Ok(());
    }
    let categories = list_categories(stores.documents(), collections).await?;
    print_menu_table(&items, &categories);
    Ok(())
}

pub(crate) async fn cmd_categories(config: &Config, stores: &Stores, json: bool) -> Result<()> {
    let categories = list_categories(stores.documents(), &config.backend.collections).await?;

    if json {
        return print_json(&categories);
    }
    if categories.is_empty() {
        println!("No categories found. Run `menuseed seed` first.");
        return Ok(());
    }
    print_category_table(&categories);
    Ok(())
}
