//! Dashboard commands.
//!
//! Each dashboard loads all of its sections concurrently. Sections whose
//! endpoint failed show placeholder data and a warning banner; Ctrl-C
//! abandons a load in progress.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tabled::Tabled;
use voyage_core::aggregate::ViewScope;
use voyage_core::api::types::{
    AdminBooking, AgentBooking, AgentPackage, AgentSummary, CustomerBooking, CustomerInquiry,
    SystemActivity, UserSummary,
};
use voyage_core::dashboard::{AdminDashboard, AgentDashboard, CustomerDashboard};
use voyage_core::VoyageClient;

use super::packages;
use crate::output::{self, format_price, OutputFormat};

#[derive(Subcommand)]
pub enum DashboardCommands {
    /// Catalogue and your bookings
    Customer(ViewArgs),
    /// Travel-agent overview
    Agent(ViewArgs),
    /// Platform administration overview
    Admin(ViewArgs),
}

#[derive(Args)]
pub struct ViewArgs {
    /// Reload every N seconds until interrupted
    #[arg(long, value_name = "SECONDS")]
    refresh: Option<u64>,
}

impl DashboardCommands {
    fn refresh(&self) -> Option<Duration> {
        let args = match self {
            Self::Customer(args) | Self::Agent(args) | Self::Admin(args) => args,
        };
        args.refresh.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

// ── Rows ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct AgentPackageRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Bookings")]
    bookings: u32,
}

impl From<&AgentPackage> for AgentPackageRow {
    fn from(p: &AgentPackage) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            status: p.status.clone(),
            bookings: p.bookings,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct AgentBookingRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&AgentBooking> for AgentBookingRow {
    fn from(b: &AgentBooking) -> Self {
        Self {
            id: b.id,
            customer: b.customer.clone(),
            package: b.package.clone(),
            date: b.date.clone(),
            status: b.status.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct InquiryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Received")]
    time: String,
}

impl From<&CustomerInquiry> for InquiryRow {
    fn from(i: &CustomerInquiry) -> Self {
        Self {
            id: i.id,
            customer: i.customer.clone(),
            message: output::truncate(&i.message, 50),
            time: i.time.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&UserSummary> for UserRow {
    fn from(u: &UserSummary) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role.clone(),
            status: u.status.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct AgentRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&AgentSummary> for AgentRow {
    fn from(a: &AgentSummary) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            email: a.email.clone(),
            status: a.status.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct AdminBookingRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&AdminBooking> for AdminBookingRow {
    fn from(b: &AdminBooking) -> Self {
        Self {
            id: b.id,
            user: b.user.clone(),
            package: b.package.clone(),
            date: b.date.clone(),
            status: b.status.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct ActivityRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "When")]
    time: String,
}

impl From<&SystemActivity> for ActivityRow {
    fn from(a: &SystemActivity) -> Self {
        Self {
            id: a.id,
            action: a.action.clone(),
            time: a.time.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct CustomerBookingRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl From<&CustomerBooking> for CustomerBookingRow {
    fn from(b: &CustomerBooking) -> Self {
        Self {
            id: b.id,
            package: b.package.clone(),
            date: b.date.clone(),
            status: b.status.clone(),
            amount: b.amount.map(format_price).unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub(crate) fn rows<S, R>(items: &[S]) -> Vec<R>
where
    R: for<'a> From<&'a S>,
{
    items.iter().map(R::from).collect()
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: DashboardCommands, voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let loader = voyage.dashboards();
    let refresh = cmd.refresh();

    let view = ViewScope::new();
    let interrupt = {
        let view = view.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                view.close();
            }
        })
    };

    let result = match cmd {
        DashboardCommands::Customer(_) => {
            run_view(&view, refresh, || loader.customer_in(&view), |d| {
                render_customer(d, format)
            })
            .await
        }
        DashboardCommands::Agent(_) => {
            run_view(&view, refresh, || loader.agent_in(&view), |d| render_agent(d, format)).await
        }
        DashboardCommands::Admin(_) => {
            run_view(&view, refresh, || loader.admin_in(&view), |d| render_admin(d, format)).await
        }
    };

    interrupt.abort();
    result
}

/// Load and render a snapshot, repeating on `refresh` until the view closes.
async fn run_view<T, L, Fut, R>(
    view: &ViewScope,
    refresh: Option<Duration>,
    mut load: L,
    render: R,
) -> Result<()>
where
    L: FnMut() -> Fut,
    Fut: Future<Output = voyage_core::Result<Option<T>>>,
    R: Fn(&T) -> Result<()>,
{
    loop {
        match load().await? {
            Some(snapshot) => render(&snapshot)?,
            None => {
                output::print_info("Interrupted");
                return Ok(());
            }
        }

        let Some(every) = refresh else {
            return Ok(());
        };
        tokio::select! {
            _ = view.closed() => return Ok(()),
            _ = tokio::time::sleep(every) => {}
        }
    }
}

fn banner(text: Option<String>) {
    if let Some(text) = text {
        output::print_warning(&text);
    }
}

fn render_customer(dash: &CustomerDashboard, format: OutputFormat) -> Result<()> {
    if !format.is_table() {
        return output::print_item(dash, format);
    }
    banner(dash.banner());

    match &dash.user {
        Some(user) => output::print_header(&format!("Welcome, {}", user.full_name)),
        None => output::print_header("Welcome"),
    }

    output::print_header("Packages");
    packages::print_packages(&dash.packages, format)?;

    output::print_header("My bookings");
    if dash.user.is_none() {
        output::print_info("Log in to see your bookings");
        return Ok(());
    }
    output::print_list(&rows::<_, CustomerBookingRow>(&dash.bookings), format)
}

fn render_agent(dash: &AgentDashboard, format: OutputFormat) -> Result<()> {
    if !format.is_table() {
        return output::print_item(dash, format);
    }
    banner(dash.banner());

    output::print_header("Agent overview");
    output::print_detail("Packages managed", &dash.stats.packages_managed.to_string());
    output::print_detail("Bookings", &dash.stats.bookings.to_string());
    output::print_detail("Earnings", &format_price(dash.stats.earnings));

    output::print_header("Packages");
    output::print_list(&rows::<_, AgentPackageRow>(&dash.packages), format)?;

    output::print_header("Recent bookings");
    output::print_list(&rows::<_, AgentBookingRow>(&dash.bookings), format)?;

    output::print_header("Customer inquiries");
    output::print_list(&rows::<_, InquiryRow>(&dash.inquiries), format)
}

fn render_admin(dash: &AdminDashboard, format: OutputFormat) -> Result<()> {
    if !format.is_table() {
        return output::print_item(dash, format);
    }
    banner(dash.banner());

    output::print_header("Platform overview");
    output::print_detail("Users", &dash.stats.total_users.to_string());
    output::print_detail("Agents", &dash.stats.total_agents.to_string());
    output::print_detail("Bookings", &dash.stats.total_bookings.to_string());
    output::print_detail("Revenue", &format_price(dash.stats.total_revenue));

    output::print_header("Users");
    output::print_list(&rows::<_, UserRow>(&dash.users), format)?;

    output::print_header("Agents");
    output::print_list(&rows::<_, AgentRow>(&dash.agents), format)?;

    output::print_header("Bookings");
    output::print_list(&rows::<_, AdminBookingRow>(&dash.bookings), format)?;

    output::print_header("Recent activity");
    output::print_list(&rows::<_, ActivityRow>(&dash.activity), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_booking_row_without_amount() {
        let booking = CustomerBooking {
            id: 9,
            package_id: Some(77),
            package: "Kerala Backwaters".into(),
            date: "2026-11-02".into(),
            status: "Confirmed".into(),
            amount: None,
        };
        let row = CustomerBookingRow::from(&booking);
        assert_eq!(row.amount, "-");
        assert_eq!(row.package, "Kerala Backwaters");
    }

    #[test]
    fn test_inquiry_row_truncates_message() {
        let inquiry = CustomerInquiry {
            id: 1,
            customer: "Rohit Verma".into(),
            message: "x".repeat(120),
            time: "2h ago".into(),
        };
        let row = InquiryRow::from(&inquiry);
        assert_eq!(row.message.chars().count(), 50);
    }

    #[test]
    fn test_refresh_zero_means_once() {
        let cmd = DashboardCommands::Agent(ViewArgs { refresh: Some(0) });
        assert!(cmd.refresh().is_none());
        let cmd = DashboardCommands::Admin(ViewArgs { refresh: Some(5) });
        assert_eq!(cmd.refresh(), Some(Duration::from_secs(5)));
    }
}
