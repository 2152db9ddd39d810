use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

use menuseed_core::backend::Backend;
use menuseed_core::dataset::Dataset;
use menuseed_core::importer::{Importer, SeedOptions, SeedReport};

use super::Stores;
use super::helpers::print_json;
use crate::config::Config;
use crate::fetch::HttpFetcher;

const SAMPLE_DATASET: &str = include_str!("../../data/menu.json");

macro_rules! sample_image {
    ($name:literal) => {
        ($name, include_bytes!(concat!("../../data/images/", $name)).as_slice())
    };
}

/// Images the sample menu references, by path relative to the menu file.
const SAMPLE_IMAGES: &[(&str, &[u8])] = &[
    sample_image!("classic-cheeseburger.png"),
    sample_image!("smoky-bacon-burger.png"),
    sample_image!("margherita-pizza.png"),
    sample_image!("pepperoni-pizza.png"),
    sample_image!("chicken-caesar-wrap.png"),
    sample_image!("falafel-wrap.png"),
    sample_image!("teriyaki-salmon-bowl.png"),
    sample_image!("burrito-bowl.png"),
];

pub(crate) struct SeedArgs {
    pub dataset: Option<PathBuf>,
    pub concurrency: usize,
    pub retries: u32,
    pub json: bool,
}

/// The dataset at `path`, or the bundled sample unpacked into `sample_dir`.
pub(crate) async fn load_dataset(path: Option<&Path>, sample_dir: &Path) -> Result<Dataset> {
    if let Some(p) = path {
        return Dataset::load(p);
    }

    let images = sample_dir.join("images");
    tokio::fs::create_dir_all(&images)
        .await
        .with_context(|| format!("Failed to create directory: {}", images.display()))?;
    for (name, bytes) in SAMPLE_IMAGES {
        let dest = images.join(name);
        tokio::fs::write(&dest, *bytes)
            .await
            .with_context(|| format!("Failed to write sample image: {}", dest.display()))?;
    }

    let mut dataset = Dataset::from_json(SAMPLE_DATASET).context("Invalid bundled dataset")?;
    dataset.resolve_image_paths(sample_dir);
    Ok(dataset)
}

pub(crate) async fn cmd_seed(config: &Config, stores: &Stores, args: SeedArgs) -> Result<()> {
    let dataset = load_dataset(args.dataset.as_deref(), &config.sample_dir()).await?;
    for item in dataset.orphaned_items() {
        warn!(item = %item.name, category = %item.category_name, "category not in dataset");
    }

    let mut options = SeedOptions::new(&config.backend.bucket_id, config.image_scratch_dir());
    options.collections = config.backend.collections.clone();
    options.concurrency = args.concurrency;
    options.max_retries = args.retries;

    let failures = config.failure_log();
    let fetcher = HttpFetcher::new()?;
    let backend = Backend {
        documents: stores.documents(),
        objects: stores.objects(),
        fetcher: &fetcher,
    };

    let report = Importer::new(backend, &options, &failures)
        .run(&dataset)
        .await?;

    if args.json {
        print_json(&report)?;
    } else {
        print!("{}", render_report(&report));
    }

    if !report.is_complete() {
        bail!(
            "{} of {} menu item(s) failed",
            report.failed.len(),
            report.selected
        );
    }
    Ok(())
}

fn render_report(report: &SeedReport) -> String {
    let mut out = String::new();
    if report.resumed {
        let _ = writeln!(
            out,
            "Resumed: retrying {} of {} menu items that failed last run.",
            report.selected, report.total
        );
    }
    let _ = writeln!(
        out,
        "{} ({} imported, {} already present, {} customization links)",
        report.summary_line(),
        report.imported,
        report.already_present,
        report.links_created
    );

    if report.is_complete() {
        let _ = writeln!(out, "All menu items seeded. Resume state cleared.");
    } else {
        let _ = writeln!(out, "Failed:");
        for name in &report.failed {
            let _ = writeln!(out, "  - {name}");
        }
        if report.failure_log_saved {
            let _ = writeln!(out, "Run `menuseed seed` again to retry only these items.");
        } else {
            let _ = writeln!(
                out,
                "Could not record the failures; the next run will process every item."
            );
        }
    }
    out
}
