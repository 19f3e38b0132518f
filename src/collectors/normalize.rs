use serde_json::Number;

use crate::collectors::{RawListing, RawSalary};
use crate::models::vacancy::Vacancy;

pub const EXPERIENCE_NOT_IMPORTANT: &str = "Опыт работы не важен";
pub const NO_KEY_SKILLS: &str = "No key skills or requirements provided";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("listing is missing required field '{0}'")]
    Missing(&'static str),

    #[error("listing is malformed: {0}")]
    Malformed(String),
}

/// Parse one search item. A wrongly typed field rejects only this item.
pub fn parse_listing(item: serde_json::Value) -> Result<RawListing, FieldError> {
    serde_json::from_value(item).map_err(|e| FieldError::Malformed(e.to_string()))
}

/// Map a raw listing plus its flattened detail skills into a [`Vacancy`].
pub fn normalize(raw: &RawListing, key_skills: &str, currency: &str) -> Result<Vacancy, FieldError> {
    let id = required(raw.id.as_deref(), "id")?;
    let title = required(raw.name.as_deref(), "name")?;
    let location = required(
        raw.area.as_ref().and_then(|a| a.name.as_deref()),
        "area.name",
    )?;
    let company = required(
        raw.employer.as_ref().and_then(|e| e.name.as_deref()),
        "employer.name",
    )?;
    let url = required(raw.alternate_url.as_deref(), "alternate_url")?;

    let experience = raw
        .experience
        .as_ref()
        .and_then(|e| e.name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or(EXPERIENCE_NOT_IMPORTANT);

    let key_skills = if !key_skills.is_empty() {
        key_skills
    } else {
        raw.snippet
            .as_ref()
            .and_then(|s| s.requirement.as_deref())
            .filter(|req| !req.is_empty())
            .unwrap_or(NO_KEY_SKILLS)
    };

    Ok(Vacancy {
        id: id.to_string(),
        title: title.to_string(),
        key_skills: key_skills.to_string(),
        experience: experience.to_string(),
        salary: format_salary(raw.salary.as_ref(), currency),
        location: location.to_string(),
        company: company.to_string(),
        url: url.to_string(),
    })
}

/// Render a salary in the domestic currency; anything else renders as "".
pub fn format_salary(salary: Option<&RawSalary>, currency: &str) -> String {
    let Some(salary) = salary else {
        return String::new();
    };
    if salary.currency.as_deref() != Some(currency) {
        return String::new();
    }

    match (bound(&salary.from), bound(&salary.to)) {
        (Some(from), Some(to)) => format!("{from} - {to} {currency}"),
        (Some(from), None) => format!("от {from} {currency}"),
        (None, Some(to)) => format!("до {to} {currency}"),
        (None, None) => String::new(),
    }
}

// Zero means "not specified" upstream.
fn bound(n: &Option<Number>) -> Option<&Number> {
    n.as_ref().filter(|n| n.as_f64() != Some(0.0))
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, FieldError> {
    value.ok_or(FieldError::Missing(field))
}
