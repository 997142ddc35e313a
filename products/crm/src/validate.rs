//! Boundary checks for form input. Each failing field maps to one message,
//! keyed by the field name the client sends.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{
    AccountPatch, ActivityPatch, ContactPatch, DealPatch, LeadPatch, MAX_DEAL_VALUE, NewAccount,
    NewActivity, NewContact, NewDeal, NewLead,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.fields.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// First message wins per field.
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// `local@domain.tld` with no whitespace: one `@`, and somewhere in the
/// domain a dot with at least one character on each side. Extra dots are
/// accepted, so `a@b..c` and `a@b.c.` pass.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .match_indices('.')
        .any(|(at, _)| at > 0 && at + 1 < domain.len())
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(errors: &mut ValidationErrors, field: &'static str, value: &str, message: &str) {
    if blank(value) {
        errors.add(field, message);
    }
}

fn require_email(errors: &mut ValidationErrors, email: &str) {
    if blank(email) {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email.trim()) {
        errors.add("email", "Invalid email format");
    }
}

fn check_probability(errors: &mut ValidationErrors, probability: Option<u8>) {
    if probability.is_some_and(|p| p > 100) {
        errors.add("probability", "Probability must be between 0 and 100");
    }
}

fn check_value(errors: &mut ValidationErrors, value: i64) {
    if value <= 0 || value > MAX_DEAL_VALUE {
        errors.add("value", "Valid deal value is required");
    }
}

impl Validate for NewContact {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "name", &self.name, "Name is required");
        require_email(&mut errors, &self.email);
        require(
            &mut errors,
            "company",
            self.company.as_deref().unwrap_or_default(),
            "Company is required",
        );
        errors.into_result()
    }
}

impl Validate for ContactPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name {
            require(&mut errors, "name", name, "Name is required");
        }
        if let Some(email) = &self.email {
            require_email(&mut errors, email);
        }
        if let Some(company) = &self.company {
            require(&mut errors, "company", company, "Company is required");
        }
        errors.into_result()
    }
}

impl Validate for NewAccount {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "name", &self.name, "Name is required");
        require_email(&mut errors, &self.email);
        errors.into_result()
    }
}

impl Validate for AccountPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name {
            require(&mut errors, "name", name, "Name is required");
        }
        if let Some(email) = &self.email {
            require_email(&mut errors, email);
        }
        errors.into_result()
    }
}

impl Validate for NewLead {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "name", &self.name, "Name is required");
        require_email(&mut errors, &self.email);
        errors.into_result()
    }
}

impl Validate for LeadPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name {
            require(&mut errors, "name", name, "Name is required");
        }
        if let Some(email) = &self.email {
            require_email(&mut errors, email);
        }
        errors.into_result()
    }
}

impl Validate for NewDeal {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "title", &self.title, "Deal title is required");
        check_value(&mut errors, self.value);
        check_probability(&mut errors, self.probability);
        if self.expected_close_date.is_none() {
            errors.add("expectedCloseDate", "Expected close date is required");
        }
        errors.into_result()
    }
}

impl Validate for DealPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(title) = &self.title {
            require(&mut errors, "title", title, "Deal title is required");
        }
        if let Some(value) = self.value {
            check_value(&mut errors, value);
        }
        check_probability(&mut errors, self.probability);
        errors.into_result()
    }
}

impl Validate for NewActivity {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "subject", &self.subject, "Subject is required");
        errors.into_result()
    }
}

impl Validate for ActivityPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(subject) = &self.subject {
            require(&mut errors, "subject", subject, "Subject is required");
        }
        errors.into_result()
    }
}
