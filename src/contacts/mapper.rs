//! Row-to-entity materialization.
//!
//! Shared-table rows carry a mimetype discriminator that says which entity
//! the row's generic data columns encode; dedicated tables (phones, emails,
//! postal addresses) skip the discriminator.

use serde_json::Value;

use crate::contacts::model::{
    Address, Contact, Email, ImAccount, Note, Organization, Phone, Relationship, Website,
};
use crate::contacts::Row;
use crate::contract::{
    contacts, data, email, im, mimetypes, note, organization, phone, postal, relation,
    structured_name, website,
};
use crate::query::{columns, ColumnMapping, EntityKind, Field, Literal};

pub fn str_of(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn i64_of(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// The row column identifying the owning contact.
pub fn id_of(row: &Row, aggregate: bool) -> Option<String> {
    if aggregate {
        str_of(row, contacts::LOOKUP_KEY).or_else(|| str_of(row, data::CONTACT_ID))
    } else {
        str_of(row, data::CONTACT_ID).or_else(|| str_of(row, contacts::LOOKUP_KEY))
    }
}

/// A contact shell carrying only row-level identity; detail rows fill the
/// rest.
pub fn contact_shell(id: String, aggregate: bool, row: &Row) -> Contact {
    Contact {
        id,
        is_aggregate: aggregate,
        display_name: str_of(row, data::DISPLAY_NAME),
        ..Contact::default()
    }
}

fn phone_kind_label(code: i64) -> String {
    columns::resolve(EntityKind::Phone, Field::PhoneType)
        .and_then(|m| m.from_queryable)
        .and_then(|f| f(&Literal::Int(code)))
        .and_then(|l| match l {
            Literal::String(s) => Some(s),
            _ => None,
        })
        .unwrap_or_else(|| "other".to_string())
}

pub fn phone_of(row: &Row) -> Option<Phone> {
    Some(Phone {
        number: str_of(row, phone::NUMBER)?,
        kind: phone_kind_label(i64_of(row, phone::TYPE).unwrap_or(0)),
        label: str_of(row, phone::LABEL),
    })
}

pub fn email_of(row: &Row) -> Option<Email> {
    Some(Email { address: str_of(row, email::ADDRESS)?, label: str_of(row, email::LABEL) })
}

pub fn address_of(row: &Row) -> Option<Address> {
    let address = Address {
        street_address: str_of(row, postal::STREET).or_else(|| str_of(row, postal::POBOX)),
        city: str_of(row, postal::CITY),
        region: str_of(row, postal::REGION),
        country: str_of(row, postal::COUNTRY),
        postal_code: str_of(row, postal::POSTCODE),
    };
    (address != Address::default()).then_some(address)
}

pub fn organization_of(row: &Row) -> Option<Organization> {
    Some(Organization {
        name: str_of(row, organization::COMPANY)?,
        contact_title: str_of(row, organization::TITLE),
    })
}

/// Merge one shared-table detail row into its owning contact, dispatching on
/// the row's discriminator.
pub fn fill_from_data(contact: &mut Contact, row: &Row) {
    let Some(mime) = str_of(row, data::MIMETYPE) else { return };
    match mime.as_str() {
        mimetypes::STRUCTURED_NAME => {
            contact.prefix = str_of(row, structured_name::PREFIX);
            contact.first_name = str_of(row, structured_name::GIVEN_NAME);
            contact.middle_name = str_of(row, structured_name::MIDDLE_NAME);
            contact.last_name = str_of(row, structured_name::FAMILY_NAME);
            contact.suffix = str_of(row, structured_name::SUFFIX);
        }
        mimetypes::PHONE => contact.phones.extend(phone_of(row)),
        mimetypes::EMAIL => contact.emails.extend(email_of(row)),
        mimetypes::POSTAL => contact.addresses.extend(address_of(row)),
        mimetypes::ORGANIZATION => contact.organizations.extend(organization_of(row)),
        mimetypes::NOTE => {
            contact.notes.extend(str_of(row, note::CONTENTS).map(|contents| Note { contents }))
        }
        mimetypes::RELATION => contact
            .relationships
            .extend(str_of(row, relation::NAME).map(|name| Relationship { name })),
        mimetypes::WEBSITE => contact
            .websites
            .extend(str_of(row, website::URL).map(|address| Website { address })),
        mimetypes::IM => contact
            .im_accounts
            .extend(str_of(row, im::ACCOUNT).map(|account| ImAccount { account })),
        _ => {}
    }
}

/// Materialize a dedicated-table row as a standalone entity value.
pub fn entity_value(kind: EntityKind, row: &Row) -> Option<Value> {
    let value = match kind {
        EntityKind::Phone => serde_json::to_value(phone_of(row)?),
        EntityKind::Email => serde_json::to_value(email_of(row)?),
        EntityKind::Address => serde_json::to_value(address_of(row)?),
        EntityKind::Organization => serde_json::to_value(organization_of(row)?),
        EntityKind::Note => {
            serde_json::to_value(Note { contents: str_of(row, note::CONTENTS)? })
        }
        EntityKind::Relationship => {
            serde_json::to_value(Relationship { name: str_of(row, relation::NAME)? })
        }
        EntityKind::Website => {
            serde_json::to_value(Website { address: str_of(row, website::URL)? })
        }
        EntityKind::ImAccount => {
            serde_json::to_value(ImAccount { account: str_of(row, im::ACCOUNT)? })
        }
        EntityKind::Contact => return None,
    };
    value.ok()
}

/// Extract a projected column, preferring the first non-null backing column
/// and running the mapping's reverse transform when it has one.
pub fn projected_value(mapping: &ColumnMapping, row: &Row) -> Value {
    let raw = mapping
        .columns
        .iter()
        .filter_map(|col| row.get(*col))
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null);

    let Some(transform) = mapping.from_queryable else { return raw };
    let literal = match &raw {
        Value::String(s) => Literal::String(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Literal::Int(i),
            None => return raw,
        },
        Value::Bool(b) => Literal::Bool(*b),
        _ => return raw,
    };
    transform(&literal).map(|l| l.to_value()).unwrap_or(raw)
}
