use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::contract::{email, im, note, organization, phone, postal, relation, structured_name, website, contacts};
use crate::query::{EntityKind, Field, Literal};

/// Native value kind of a mapped member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
    /// A nested one-to-many collection of the given entity kind; has no
    /// directly backing column.
    Collection(EntityKind),
}

type Transform = fn(&Literal) -> Option<Literal>;

/// Mapping from one entity member to the native column(s) holding it.
///
/// `columns` is empty for virtual members (nested collections). Multi-column
/// mappings are structurally permitted but a comparison or sort over one
/// fails with `NotSupported`; comparisons are single-column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub columns: &'static [&'static str],
    pub value: ValueKind,
    /// Reduces a host-side value to a queryable native literal.
    pub to_queryable: Option<Transform>,
    /// The reverse direction, used when materializing projected columns.
    pub from_queryable: Option<Transform>,
}

fn phone_type_to_native(l: &Literal) -> Option<Literal> {
    match l {
        Literal::String(s) => match s.as_str() {
            "home" => Some(Literal::Int(1)),
            "mobile" => Some(Literal::Int(2)),
            "work" => Some(Literal::Int(3)),
            "other" => Some(Literal::Int(7)),
            _ => None,
        },
        Literal::Int(i) => Some(Literal::Int(*i)),
        _ => None,
    }
}

fn phone_type_from_native(l: &Literal) -> Option<Literal> {
    let name = |code: i64| match code {
        1 => "home",
        2 => "mobile",
        3 => "work",
        _ => "other",
    };
    match l {
        Literal::Int(i) => Some(Literal::String(name(*i).to_string())),
        Literal::String(s) => s.parse::<i64>().ok().map(|i| Literal::String(name(i).to_string())),
        _ => None,
    }
}

macro_rules! single {
    ($col:expr, $kind:expr) => {
        ColumnMapping { columns: &[$col], value: $kind, to_queryable: None, from_queryable: None }
    };
}

macro_rules! collection {
    ($entity:expr) => {
        ColumnMapping {
            columns: &[],
            value: ValueKind::Collection($entity),
            to_queryable: None,
            from_queryable: None,
        }
    };
}

/// Load-time-built member-to-column table, replacing runtime member
/// reflection with a closed {entity, field} key.
static COLUMN_MAP: Lazy<HashMap<(EntityKind, Field), ColumnMapping>> = Lazy::new(|| {
    use EntityKind::*;
    use Field::*;
    use ValueKind::*;

    let mut m = HashMap::new();

    // Contact
    m.insert((Contact, DisplayName), single!(contacts::DISPLAY_NAME, Str));
    m.insert((Contact, Prefix), single!(structured_name::PREFIX, Str));
    m.insert((Contact, FirstName), single!(structured_name::GIVEN_NAME, Str));
    m.insert((Contact, MiddleName), single!(structured_name::MIDDLE_NAME, Str));
    m.insert((Contact, LastName), single!(structured_name::FAMILY_NAME, Str));
    m.insert((Contact, Suffix), single!(structured_name::SUFFIX, Str));
    m.insert((Contact, Phones), collection!(Phone));
    m.insert((Contact, Emails), collection!(Email));
    m.insert((Contact, Addresses), collection!(Address));
    m.insert((Contact, Notes), collection!(Note));
    m.insert((Contact, Relationships), collection!(Relationship));
    m.insert((Contact, ImAccounts), collection!(EntityKind::ImAccount));
    m.insert((Contact, Websites), collection!(Website));
    m.insert((Contact, Organizations), collection!(Organization));

    // Phone
    m.insert((Phone, PhoneNumber), single!(phone::NUMBER, Str));
    m.insert(
        (Phone, PhoneType),
        ColumnMapping {
            columns: &[phone::TYPE],
            value: Int,
            to_queryable: Some(phone_type_to_native),
            from_queryable: Some(phone_type_from_native),
        },
    );

    // Email
    m.insert((Email, EmailAddress), single!(email::ADDRESS, Str));

    // Address; the street member spans two native columns and therefore only
    // supports projection, never comparison.
    m.insert(
        (Address, StreetAddress),
        ColumnMapping {
            columns: &[postal::STREET, postal::POBOX],
            value: Str,
            to_queryable: None,
            from_queryable: None,
        },
    );
    m.insert((Address, City), single!(postal::CITY, Str));
    m.insert((Address, Region), single!(postal::REGION, Str));
    m.insert((Address, Country), single!(postal::COUNTRY, Str));
    m.insert((Address, PostalCode), single!(postal::POSTCODE, Str));

    // Relationship
    m.insert((Relationship, RelationshipName), single!(relation::NAME, Str));

    // InstantMessaging
    m.insert((EntityKind::ImAccount, Field::ImAccount), single!(im::ACCOUNT, Str));

    // Website
    m.insert((Website, WebsiteUrl), single!(website::URL, Str));

    // Organization
    m.insert((Organization, OrganizationName), single!(organization::COMPANY, Str));
    m.insert((Organization, OrganizationTitle), single!(organization::TITLE, Str));

    // Note
    m.insert((Note, NoteContents), single!(note::CONTENTS, Str));

    m
});

/// Resolve the column mapping for one member, `None` when the member does not
/// belong to the entity or is unmapped. Pure and freely shareable.
pub fn resolve(entity: EntityKind, field: Field) -> Option<&'static ColumnMapping> {
    COLUMN_MAP.get(&(entity, field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_name_members_resolve_to_single_columns() {
        let m = resolve(EntityKind::Contact, Field::FirstName).expect("mapped");
        assert_eq!(m.columns, &[structured_name::GIVEN_NAME]);
        assert_eq!(m.value, ValueKind::Str);
    }

    #[test]
    fn collection_members_are_virtual() {
        let m = resolve(EntityKind::Contact, Field::Phones).expect("mapped");
        assert!(m.columns.is_empty());
        assert_eq!(m.value, ValueKind::Collection(EntityKind::Phone));
    }

    #[test]
    fn im_members_resolve_on_both_sides_of_the_relation() {
        let coll = resolve(EntityKind::Contact, Field::ImAccounts).expect("mapped");
        assert_eq!(coll.value, ValueKind::Collection(EntityKind::ImAccount));

        let account = resolve(EntityKind::ImAccount, Field::ImAccount).expect("mapped");
        assert_eq!(account.columns, &[im::ACCOUNT]);
        assert_eq!(account.value, ValueKind::Str);
    }

    #[test]
    fn street_address_is_multi_column() {
        let m = resolve(EntityKind::Address, Field::StreetAddress).expect("mapped");
        assert_eq!(m.columns.len(), 2);
    }

    #[test]
    fn mismatched_entity_field_pairs_do_not_resolve() {
        assert!(resolve(EntityKind::Contact, Field::PhoneNumber).is_none());
        assert!(resolve(EntityKind::Phone, Field::DisplayName).is_none());
    }

    #[test]
    fn phone_type_transforms_round() {
        let to = phone_type_to_native(&Literal::from("mobile")).unwrap();
        assert_eq!(to, Literal::Int(2));
        let back = phone_type_from_native(&to).unwrap();
        assert_eq!(back, Literal::from("mobile"));
        assert_eq!(phone_type_to_native(&Literal::Null), None);
    }
}
