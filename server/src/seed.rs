//! Demo records for a fresh install or the memory store.

use chrono::{Duration, NaiveDate, Utc};
use products_crm::{
    ActivityKind, LeadStatus, NewAccount, NewActivity, NewContact, NewDeal, NewLead, RecordStore,
    StoreResult,
};
use tracing::info;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub contacts: usize,
    pub accounts: usize,
    pub leads: usize,
    pub deals: usize,
    pub activities: usize,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

struct DemoContact {
    name: &'static str,
    email: &'static str,
    company: &'static str,
    title: &'static str,
}

const CONTACTS: [DemoContact; 3] = [
    DemoContact {
        name: "Ada Lovelace",
        email: "ada@acme.test",
        company: "ACME, Inc.",
        title: "CTO",
    },
    DemoContact {
        name: "Grace Hopper",
        email: "grace@globex.test",
        company: "Globex",
        title: "VP Engineering",
    },
    DemoContact {
        name: "Alan Turing",
        email: "alan@initech.test",
        company: "Initech",
        title: "Head of Research",
    },
];

/// (title, contact index, value in cents, stage, probability)
const DEALS: [(&str, usize, i64, &str, u8); 6] = [
    ("ACME Pilot", 0, 1_200_000, "Lead", 20),
    ("ACME Rollout", 0, 4_500_000, "Proposal", 50),
    ("Globex Renewal", 1, 2_000_000, "Qualified", 40),
    ("Globex Analytics", 1, 800_000, "Negotiation", 75),
    ("Initech Support", 2, 300_000, "Closed Won", 100),
    ("Initech Migration", 2, 950_000, "Closed Lost", 0),
];

/// Inserts the demo data unless the store already holds deals.
pub async fn seed_demo(store: &dyn RecordStore) -> StoreResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    if !store.list_deals().await?.is_empty() {
        info!("store already has deals; skipping demo seed");
        return Ok(summary);
    }

    let mut contact_ids = Vec::with_capacity(CONTACTS.len());
    for demo in &CONTACTS {
        let contact = store
            .create_contact(NewContact {
                name: demo.name.into(),
                email: demo.email.into(),
                company: Some(demo.company.into()),
                title: Some(demo.title.into()),
                ..NewContact::default()
            })
            .await?;
        contact_ids.push(contact.id);
        summary.contacts += 1;

        store
            .create_account(NewAccount {
                name: demo.company.into(),
                email: format!("hello@{}", domain(demo.email)),
                phone: None,
                tags: vec!["demo".into()],
            })
            .await?;
        summary.accounts += 1;
    }

    for (name, email, status) in [
        ("Charles Babbage", "charles@engines.test", LeadStatus::New),
        ("Katherine Johnson", "katherine@orbit.test", LeadStatus::Contacted),
        ("Hedy Lamarr", "hedy@spread.test", LeadStatus::Qualified),
    ] {
        store
            .create_lead(NewLead {
                name: name.into(),
                email: email.into(),
                status: Some(status),
                ..NewLead::default()
            })
            .await?;
        summary.leads += 1;
    }

    let close_base = NaiveDate::from_ymd_opt(2026, 12, 15);
    for (title, contact, value, stage, probability) in DEALS {
        let deal = store
            .create_deal(NewDeal {
                probability: Some(probability),
                expected_close_date: close_base,
                ..NewDeal::new(title, contact_ids[contact], value).in_stage(stage)
            })
            .await?;
        summary.deals += 1;

        store
            .create_activity(NewActivity {
                kind: Some(if summary.deals % 2 == 0 {
                    ActivityKind::Meeting
                } else {
                    ActivityKind::Call
                }),
                contact_id: deal.contact_id,
                deal_id: Some(deal.id),
                subject: format!("Kickoff for {title}"),
                description: None,
                timestamp: Some(Utc::now() - Duration::hours(summary.deals as i64)),
                created_by: None,
            })
            .await?;
        summary.activities += 1;
    }

    info!(?summary, "demo data seeded");
    Ok(summary)
}

fn domain(email: &str) -> &str {
    email.split_once('@').map_or(email, |(_, domain)| domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use products_crm::MemoryStore;

    #[tokio::test]
    async fn seeds_once() {
        let store = MemoryStore::new();
        let first = seed_demo(&store).await.unwrap();
        assert_eq!(first.deals, DEALS.len());
        assert_eq!(first.contacts, 3);
        assert!(seed_demo(&store).await.unwrap().is_empty());

        let closed = store
            .list_deals()
            .await
            .unwrap()
            .into_iter()
            .filter(|deal| deal.closed_at.is_some())
            .count();
        assert_eq!(closed, 2);
    }
}
