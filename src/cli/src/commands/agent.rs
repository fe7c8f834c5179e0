//! Travel-agent commands.
//!
//! Manage the agent's own packages, move bookings through their statuses
//! and answer customer inquiries. Every call needs an agent login.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use voyage_core::api::types::{AgentPackageUpdate, NewAgentPackage};
use voyage_core::VoyageClient;

use super::dashboard::{rows, AgentBookingRow, AgentPackageRow, InquiryRow};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Manage your packages
    #[command(subcommand)]
    Package(PackageCommands),

    /// Manage bookings of your packages
    #[command(subcommand)]
    Booking(BookingCommands),

    /// Customer inquiries
    #[command(subcommand)]
    Inquiry(InquiryCommands),
}

#[derive(Subcommand)]
pub enum PackageCommands {
    /// List your packages
    List,

    /// Add a package
    Add {
        /// Package name
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<f64>,
    },

    /// Rename a package or change its status
    Update {
        /// Package ID
        package_id: i64,
        #[arg(long)]
        name: Option<String>,
        /// New status (e.g. Active, Inactive)
        #[arg(long)]
        status: Option<String>,
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

#[derive(Subcommand)]
pub enum BookingCommands {
    /// List bookings of your packages
    List,

    /// Set the status of a booking
    Status {
        /// Booking ID
        booking_id: i64,
        status: BookingStatus,
    },
}

#[derive(Subcommand)]
pub enum InquiryCommands {
    /// List open inquiries
    List,

    /// Answer an inquiry
    Respond {
        /// Inquiry ID
        inquiry_id: i64,
        /// Reply text
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Status label as the agent API spells it.
    fn as_api_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: AgentCommands, voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    match cmd {
        AgentCommands::Package(cmd) => execute_package(cmd, voyage, format).await,
        AgentCommands::Booking(cmd) => execute_booking(cmd, voyage, format).await,
        AgentCommands::Inquiry(cmd) => execute_inquiry(cmd, voyage, format).await,
    }
}

async fn execute_package(
    cmd: PackageCommands,
    voyage: &VoyageClient,
    format: OutputFormat,
) -> Result<()> {
    let agent = voyage.api().agent();

    match cmd {
        PackageCommands::List => {
            let packages = agent.packages().await?;
            if format.is_table() {
                output::print_list(&rows::<_, AgentPackageRow>(&packages), format)?;
            } else {
                output::print_item(&packages, format)?;
            }
        }

        PackageCommands::Add {
            name,
            description,
            price,
        } => {
            let created = agent
                .create_package(&NewAgentPackage {
                    name,
                    description,
                    price,
                })
                .await?;
            if format.is_table() {
                output::print_success(&format!(
                    "Added package #{} '{}' ({})",
                    created.id, created.name, created.status
                ));
            } else {
                output::print_item(&created, format)?;
            }
        }

        PackageCommands::Update {
            package_id,
            name,
            status,
        } => {
            let update = AgentPackageUpdate { name, status };
            if update == AgentPackageUpdate::default() {
                anyhow::bail!("Nothing to update; pass --name or --status");
            }
            let updated = agent.update_package(package_id, &update).await?;
            if format.is_table() {
                output::print_success(&format!(
                    "Updated package #{} '{}' ({})",
                    updated.id, updated.name, updated.status
                ));
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
            agent.delete_package(package_id).await?;
            output::print_success(&format!("Deleted package #{}", package_id));
        }
    }

    Ok(())
}

async fn execute_booking(
    cmd: BookingCommands,
    voyage: &VoyageClient,
    format: OutputFormat,
) -> Result<()> {
    let agent = voyage.api().agent();

    match cmd {
        BookingCommands::List => {
            let bookings = agent.bookings().await?;
            if format.is_table() {
                output::print_list(&rows::<_, AgentBookingRow>(&bookings), format)?;
            } else {
                output::print_item(&bookings, format)?;
            }
        }

        BookingCommands::Status { booking_id, status } => {
            agent
                .update_booking_status(booking_id, status.as_api_str())
                .await?;
            output::print_success(&format!(
                "Booking #{} is now {}",
                booking_id,
                status.as_api_str()
            ));
        }
    }

    Ok(())
}

async fn execute_inquiry(
    cmd: InquiryCommands,
    voyage: &VoyageClient,
    format: OutputFormat,
) -> Result<()> {
    let agent = voyage.api().agent();

    match cmd {
        InquiryCommands::List => {
            let inquiries = agent.inquiries().await?;
            if format.is_table() {
                output::print_list(&rows::<_, InquiryRow>(&inquiries), format)?;
            } else {
                output::print_item(&inquiries, format)?;
            }
        }

        InquiryCommands::Respond {
            inquiry_id,
            message,
        } => {
            agent.respond_to_inquiry(inquiry_id, &message).await?;
            output::print_success(&format!("Replied to inquiry #{}", inquiry_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_labels() {
        assert_eq!(BookingStatus::Confirmed.as_api_str(), "Confirmed");
        assert_eq!(
            BookingStatus::from_str("cancelled", true).unwrap(),
            BookingStatus::Cancelled
        );
    }
}
