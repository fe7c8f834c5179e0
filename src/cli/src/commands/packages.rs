//! Package catalogue commands.
//!
//! Browsing works without a session; creating, updating and deleting
//! packages needs an agent or admin login.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use voyage_core::api::types::{PackageDraft, PackageUpdate, TravelPackage};
use voyage_core::gate::{ActionIntent, IntentToken};
use voyage_core::VoyageClient;

use crate::output::{self, format_price, OutputFormat};

#[derive(Subcommand)]
pub enum PackageCommands {
    /// List packages
    List {
        /// Only titles or descriptions containing this text
        #[arg(short, long)]
        search: Option<String>,

        /// Upper price bound
        #[arg(long)]
        max_price: Option<f64>,

        /// Maximum number of results
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show one package
    Show {
        /// Package ID
        package_id: i64,
    },

    /// Create a package
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Length in days
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        price: f64,
        /// Departure city or included services
        #[arg(long, default_value = "")]
        include_service: String,
        #[arg(long)]
        highlights: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },

    /// Update fields of a package
    Update {
        /// Package ID
        package_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        include_service: Option<String>,
        #[arg(long)]
        highlights: Option<String>,
    },

    /// Delete a package
    Delete {
        /// Package ID
        package_id: i64,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct PackageRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Days")]
    duration: u32,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Includes")]
    include_service: String,
}

impl From<&TravelPackage> for PackageRow {
    fn from(pkg: &TravelPackage) -> Self {
        Self {
            id: pkg.package_id,
            title: output::truncate(&pkg.title, 40),
            duration: pkg.duration,
            price: format_price(pkg.price),
            include_service: output::truncate(&pkg.include_service, 30),
        }
    }
}

pub async fn execute(cmd: PackageCommands, voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let packages = voyage.api().packages();

    match cmd {
        PackageCommands::List {
            search,
            max_price,
            limit,
        } => {
            let all = packages.fetch_all().await?;
            let selected = filter_packages(all, search.as_deref(), max_price, limit);
            print_packages(&selected, format)?;
        }

        PackageCommands::Show { package_id } => {
            let pkg = packages.fetch_by_id(package_id).await?;
            if !format.is_table() {
                return output::print_item(&pkg, format);
            }

            output::print_header(&pkg.title);
            output::print_detail("ID", &pkg.package_id.to_string());
            output::print_detail("Duration", &format!("{} days", pkg.duration));
            output::print_detail("Price", &format_price(pkg.price));
            if !pkg.include_service.is_empty() {
                output::print_detail("Includes", &pkg.include_service);
            }
            if let Some(highlights) = &pkg.highlights {
                output::print_detail("Highlights", highlights);
            }
            output::print_detail(
                "Itinerary",
                &format!(
                    "{} flights, {} hotels, {} sightseeing stops",
                    pkg.flights.len(),
                    pkg.hotels.len(),
                    pkg.sightseeing_list.len()
                ),
            );
            if !pkg.description.is_empty() {
                println!();
                println!("{}", pkg.description);
            }
            println!();
            if let Ok(link) = IntentToken::new(ActionIntent::book(pkg.package_id)).to_location() {
                output::print_info(&format!(
                    "Book with `voyage book {}` (link: {})",
                    pkg.package_id, link
                ));
            }
        }

        PackageCommands::Create {
            title,
            description,
            duration,
            price,
            include_service,
            highlights,
            image,
        } => {
            let draft = PackageDraft {
                title,
                description,
                duration,
                price,
                include_service,
                highlights,
                image,
                ..Default::default()
            };
            let created = packages.create(&draft).await?;
            if format.is_table() {
                output::print_success(&format!(
                    "Created package #{} '{}'",
                    created.package_id, created.title
                ));
            } else {
                output::print_item(&created, format)?;
            }
        }

        PackageCommands::Update {
            package_id,
            title,
            description,
            duration,
            price,
            include_service,
            highlights,
        } => {
            let update = PackageUpdate {
                title,
                description,
                duration,
                price,
                include_service,
                highlights,
            };
            if update == PackageUpdate::default() {
                anyhow::bail!("Nothing to update; pass at least one field");
            }
            let updated = packages.update(package_id, &update).await?;
            if format.is_table() {
                output::print_success(&format!("Updated package #{}", updated.package_id));
            } else {
                output::print_item(&updated, format)?;
            }
        }

        PackageCommands::Delete { package_id, force } => {
            if !force {
                output::print_info(&format!(
                    "This will delete package {}. Use --force to confirm.",
                    package_id
                ));
                return Ok(());
            }
            packages.delete(package_id).await?;
            output::print_success(&format!("Deleted package #{}", package_id));
        }
    }

    Ok(())
}

/// Package table, or the raw records for JSON/YAML.
pub(crate) fn print_packages(items: &[TravelPackage], format: OutputFormat) -> Result<()> {
    if format.is_table() {
        let rows: Vec<PackageRow> = items.iter().map(PackageRow::from).collect();
        output::print_list(&rows, format)
    } else {
        output::print_item(items, format)
    }
}

fn filter_packages(
    packages: Vec<TravelPackage>,
    search: Option<&str>,
    max_price: Option<f64>,
    limit: usize,
) -> Vec<TravelPackage> {
    let needle = search.map(str::to_lowercase);
    packages
        .into_iter()
        .filter(|pkg| max_price.map_or(true, |max| pkg.price <= max))
        .filter(|pkg| {
            needle.as_ref().map_or(true, |needle| {
                pkg.title.to_lowercase().contains(needle)
                    || pkg.description.to_lowercase().contains(needle)
            })
        })
        .take(limit)
        .collect()
}
