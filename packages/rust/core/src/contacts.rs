//! Contact entries built from the flat `{role}_*` attribute namespace.
//!
//! Each role maps to one [`Contact`]. Which attribute feeds which field
//! depends on whether `{role}_type` names a person or an institution; the
//! mapping lives in the [`COMMON_FIELDS`], [`PERSON_FIELDS`] and
//! [`INSTITUTION_FIELDS`] tables rather than in ad-hoc string building.

use erddap_iso_shared::{AttributeTable, Contact, Role};
use tracing::debug;

use crate::lookup::global;

/// Type assumed when `{role}_type` is absent.
pub const DEFAULT_CONTACT_TYPE: &str = "person";

/// Destination field within a [`Contact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    OrganizationName,
    OrganizationUrl,
    OrganizationAddress,
    OrganizationCity,
    OrganizationCountry,
    OrganizationEmail,
    OrganizationPhone,
    IndividualName,
    IndividualPosition,
    IndividualEmail,
}

impl ContactField {
    fn slot<'c>(&self, contact: &'c mut Contact) -> &'c mut Option<String> {
        let org = &mut contact.organization;
        let ind = &mut contact.individual;
        match self {
            Self::OrganizationName => &mut org.name,
            Self::OrganizationUrl => &mut org.url,
            Self::OrganizationAddress => &mut org.address,
            Self::OrganizationCity => &mut org.city,
            Self::OrganizationCountry => &mut org.country,
            Self::OrganizationEmail => &mut org.email,
            Self::OrganizationPhone => &mut org.phone,
            Self::IndividualName => &mut ind.name,
            Self::IndividualPosition => &mut ind.position,
            Self::IndividualEmail => &mut ind.email,
        }
    }
}

/// `(target field, attribute suffix)`: the attribute read is `{role}_{suffix}`.
pub type FieldMapping = (ContactField, &'static str);

/// Populated for every role regardless of type.
pub const COMMON_FIELDS: &[FieldMapping] = &[
    (ContactField::OrganizationUrl, "url"),
    (ContactField::OrganizationAddress, "address"),
    (ContactField::OrganizationCity, "city"),
    (ContactField::OrganizationCountry, "country"),
    (ContactField::OrganizationPhone, "phone"),
    (ContactField::IndividualPosition, "position"),
];

/// The role is a person; the organization is their institution.
pub const PERSON_FIELDS: &[FieldMapping] = &[
    (ContactField::IndividualName, "name"),
    (ContactField::IndividualEmail, "email"),
    (ContactField::OrganizationName, "institution"),
];

/// The role is an institution; the individual is its named person.
pub const INSTITUTION_FIELDS: &[FieldMapping] = &[
    (ContactField::OrganizationName, "name"),
    (ContactField::OrganizationEmail, "email"),
    (ContactField::IndividualName, "person_name"),
    (ContactField::IndividualEmail, "person_email"),
];

/// How `{role}_type` classifies the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Person,
    Institution,
    /// A type string naming neither; only the common fields apply.
    Other,
}

impl ContactKind {
    /// Classify an ACDD `*_type` value (`person`, `position`, `institution`, `group`).
    pub fn classify(type_value: &str) -> Self {
        let lowered = type_value.to_lowercase();
        if lowered.contains("person") || lowered.contains("position") {
            Self::Person
        } else if lowered.contains("institution") || lowered.contains("group") {
            Self::Institution
        } else {
            Self::Other
        }
    }

    /// Type-specific mappings applied after [`COMMON_FIELDS`].
    pub fn fields(&self) -> &'static [FieldMapping] {
        match self {
            Self::Person => PERSON_FIELDS,
            Self::Institution => INSTITUTION_FIELDS,
            Self::Other => &[],
        }
    }
}

/// Build one contact per role, in the given order.
///
/// Every role yields an entry even when nothing resolved; empty fields
/// mean "no information".
pub fn build_contacts(table: &AttributeTable, roles: &[Role]) -> Vec<Contact> {
    roles.iter().map(|role| build_contact(table, *role)).collect()
}

/// Build the contact for a single role.
pub fn build_contact(table: &AttributeTable, role: Role) -> Contact {
    let prefix = role.as_str();
    let type_value = global(table, &format!("{prefix}_type")).unwrap_or(DEFAULT_CONTACT_TYPE);
    let kind = ContactKind::classify(type_value);

    debug!(%role, contact_type = type_value, ?kind, "building contact");

    let mut contact = Contact::default();
    contact.roles.insert(role);

    for (field, suffix) in COMMON_FIELDS.iter().chain(kind.fields()) {
        *field.slot(&mut contact) = global(table, &format!("{prefix}_{suffix}")).map(String::from);
    }

    contact
}

#[cfg(test)]
mod tests {
    use super::*;
    use erddap_iso_shared::AttributeRow;

    #[test]
    fn absent_type_defaults_to_person() {
        let table = AttributeTable::new(vec![
            AttributeRow::global("creator_name", "Jane Doe"),
            AttributeRow::global("creator_email", "jane@example.org"),
            AttributeRow::global("creator_institution", "Ocean Lab"),
            AttributeRow::global("creator_url", "https://lab.example.org"),
        ]);

        let contact = build_contact(&table, Role::Creator);
        assert_eq!(contact.individual.name.as_deref(), Some("Jane Doe"));
        assert_eq!(contact.individual.email.as_deref(), Some("jane@example.org"));
        assert_eq!(contact.organization.name.as_deref(), Some("Ocean Lab"));
        assert_eq!(contact.organization.url.as_deref(), Some("https://lab.example.org"));
        assert_eq!(contact.organization.email, None);
        assert!(contact.roles.contains(&Role::Creator));
    }

    #[test]
    fn institution_type_swaps_sources() {
        let table = AttributeTable::new(vec![
            AttributeRow::global("publisher_type", "institution"),
            AttributeRow::global("publisher_name", "Data Centre"),
            AttributeRow::global("publisher_email", "info@centre.example"),
            AttributeRow::global("publisher_person_name", "John Smith"),
            AttributeRow::global("publisher_person_email", "john@centre.example"),
            AttributeRow::global("publisher_position", "Data Manager"),
            AttributeRow::global("publisher_institution", "ignored"),
        ]);

        let contact = build_contact(&table, Role::Publisher);
        assert_eq!(contact.organization.name.as_deref(), Some("Data Centre"));
        assert_eq!(contact.organization.email.as_deref(), Some("info@centre.example"));
        assert_eq!(contact.individual.name.as_deref(), Some("John Smith"));
        assert_eq!(contact.individual.email.as_deref(), Some("john@centre.example"));
        assert_eq!(contact.individual.position.as_deref(), Some("Data Manager"));
    }

    #[test]
    fn group_and_position_types() {
        assert_eq!(ContactKind::classify("group"), ContactKind::Institution);
        assert_eq!(ContactKind::classify("position"), ContactKind::Person);
        assert_eq!(ContactKind::classify("Person"), ContactKind::Person);
        assert_eq!(ContactKind::classify("vessel"), ContactKind::Other);
    }

    #[test]
    fn unknown_type_keeps_common_fields_only() {
        let table = AttributeTable::new(vec![
            AttributeRow::global("contributor_type", "vessel"),
            AttributeRow::global("contributor_name", "RV Example"),
            AttributeRow::global("contributor_country", "Canada"),
        ]);

        let contact = build_contact(&table, Role::Contributor);
        assert_eq!(contact.individual.name, None);
        assert_eq!(contact.organization.name, None);
        assert_eq!(contact.organization.country.as_deref(), Some("Canada"));
    }

    #[test]
    fn one_entry_per_role_even_when_empty() {
        let contacts = build_contacts(&AttributeTable::default(), &Role::ALL);
        assert_eq!(contacts.len(), 3);
        let roles: Vec<Role> = contacts
            .iter()
            .flat_map(|c| c.roles.iter().copied())
            .collect();
        assert_eq!(roles, Role::ALL.to_vec());
        assert!(contacts.iter().all(|c| c.individual.name.is_none()));
    }
}
