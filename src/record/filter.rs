use crate::record::Record;
use serde::{Deserialize, Serialize};

/// A string predicate on one record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Field equals the value exactly
    Equals(String),
    /// Field starts with the value
    Prefix(String),
    /// Field contains the value anywhere
    Contains(String),
}

impl Predicate {
    pub fn equals(value: impl Into<String>) -> Self {
        Self::Equals(value.into())
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self::Prefix(value.into())
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    /// Evaluates the predicate against a field value (case-sensitive)
    pub fn matches(&self, field: &str) -> bool {
        match self {
            Self::Equals(v) => field == v,
            Self::Prefix(v) => field.starts_with(v.as_str()),
            Self::Contains(v) => field.contains(v.as_str()),
        }
    }
}

/// Filter over stored records
///
/// Every predicate is optional and independently engaged; an empty filter
/// matches everything. `limit` and `offset` page through the (title-ordered)
/// result set.
///
/// # Example
///
/// ```
/// use psych::record::{Predicate, RecordFilter};
///
/// let filter = RecordFilter::new()
///     .title(Predicate::contains("Smith"))
///     .accepting(true)
///     .limit(20);
/// assert!(!filter.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordFilter {
    pub title: Option<Predicate>,
    pub credentials: Option<Predicate>,
    pub verified: Option<Predicate>,
    pub statement: Option<Predicate>,
    pub phone: Option<Predicate>,
    pub location: Option<Predicate>,
    pub link: Option<Predicate>,
    /// `true` keeps listings with an "accepting" label, `false` those without
    pub accepting_appointments: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, predicate: Predicate) -> Self {
        self.title = Some(predicate);
        self
    }

    pub fn credentials(mut self, predicate: Predicate) -> Self {
        self.credentials = Some(predicate);
        self
    }

    pub fn verified(mut self, predicate: Predicate) -> Self {
        self.verified = Some(predicate);
        self
    }

    pub fn statement(mut self, predicate: Predicate) -> Self {
        self.statement = Some(predicate);
        self
    }

    pub fn phone(mut self, predicate: Predicate) -> Self {
        self.phone = Some(predicate);
        self
    }

    pub fn location(mut self, predicate: Predicate) -> Self {
        self.location = Some(predicate);
        self
    }

    pub fn link(mut self, predicate: Predicate) -> Self {
        self.link = Some(predicate);
        self
    }

    pub fn accepting(mut self, accepting: bool) -> Self {
        self.accepting_appointments = Some(accepting);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if no predicate and no paging is engaged
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Engaged string predicates paired with the column they apply to
    pub fn predicates(&self) -> Vec<(&'static str, &Predicate)> {
        [
            ("title", &self.title),
            ("credentials", &self.credentials),
            ("verified", &self.verified),
            ("statement", &self.statement),
            ("phone", &self.phone),
            ("location", &self.location),
            ("link", &self.link),
        ]
        .into_iter()
        .filter_map(|(column, predicate)| predicate.as_ref().map(|p| (column, p)))
        .collect()
    }

    /// Evaluates the predicates (not paging) against an in-memory record
    pub fn matches(&self, record: &Record) -> bool {
        let field_ok = self.predicates().into_iter().all(|(column, predicate)| {
            let value = match column {
                "title" => &record.title,
                "credentials" => &record.credentials,
                "verified" => &record.verified,
                "statement" => &record.statement,
                "phone" => &record.phone,
                "location" => &record.location,
                _ => &record.link,
            };
            predicate.matches(value)
        });

        let accepting_ok = self
            .accepting_appointments
            .map_or(true, |wanted| record.is_accepting() == wanted);

        field_ok && accepting_ok
    }
}
