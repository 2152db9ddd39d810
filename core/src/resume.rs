use std::collections::HashSet;

use tracing::info;

use crate::failures::FailureLog;
use crate::models::Named;

/// Items chosen for this run.
#[derive(Debug)]
pub struct Selection<'a, T> {
    pub items: Vec<&'a T>,
    /// True when narrowed to a previous run's failures.
    pub resumed: bool,
}

/// Narrow `dataset` to the names in `previous`, keeping dataset order.
///
/// Falls back to the whole dataset when nothing in `previous` matches.
pub fn narrow<'a, T: Named>(dataset: &'a [T], previous: &[String]) -> Selection<'a, T> {
    let wanted: HashSet<&str> = previous.iter().map(String::as_str).collect();
    let items: Vec<&T> = dataset
        .iter()
        .filter(|item| wanted.contains(item.name()))
        .collect();

    if items.is_empty() {
        Selection {
            items: dataset.iter().collect(),
            resumed: false,
        }
    } else {
        Selection {
            items,
            resumed: true,
        }
    }
}

/// Pick the items to process, preferring the persisted failure record.
pub fn select_items<'a, T: Named>(dataset: &'a [T], log: &FailureLog) -> Selection<'a, T> {
    let previous = log.load();
    let selection = narrow(dataset, &previous);
    if selection.resumed {
        info!(
            count = selection.items.len(),
            recorded = previous.len(),
            "resuming from previous failures"
        );
    } else if !previous.is_empty() {
        info!("recorded failures no longer match the dataset, processing everything");
    }
    selection
}
