//! Placeholder data shown when a dashboard section cannot be fetched.

use crate::api::types::{
    AdminStats, AgentBooking, AgentPackage, AgentStats, CustomerInquiry,
};

pub fn agent_stats() -> AgentStats {
    AgentStats {
        packages_managed: 12,
        bookings: 48,
        earnings: 210_000.0,
    }
}

pub fn agent_packages() -> Vec<AgentPackage> {
    vec![
        AgentPackage {
            id: 1,
            name: "Goa Beach Escape".into(),
            status: "Active".into(),
            bookings: 18,
        },
        AgentPackage {
            id: 2,
            name: "Shimla Hills".into(),
            status: "Active".into(),
            bookings: 12,
        },
    ]
}

pub fn agent_bookings() -> Vec<AgentBooking> {
    vec![
        AgentBooking {
            id: 201,
            customer: "Ayush Sharma".into(),
            package: "Goa Beach Escape".into(),
            date: "2024-07-10".into(),
            status: "Confirmed".into(),
        },
        AgentBooking {
            id: 202,
            customer: "Priya Singh".into(),
            package: "Shimla Hills".into(),
            date: "2024-07-09".into(),
            status: "Pending".into(),
        },
    ]
}

pub fn customer_inquiries() -> Vec<CustomerInquiry> {
    vec![
        CustomerInquiry {
            id: 1,
            customer: "Rohit Verma".into(),
            message: "Can I get a discount?".into(),
            time: "5 min ago".into(),
        },
        CustomerInquiry {
            id: 2,
            customer: "Neha Patel".into(),
            message: "Is breakfast included?".into(),
            time: "20 min ago".into(),
        },
    ]
}

/// Admin figures are never invented; an unreachable admin API shows zeros.
pub fn admin_stats() -> AdminStats {
    AdminStats::default()
}
