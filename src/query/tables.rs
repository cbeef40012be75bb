use crate::contract::{mimetypes, Table};
use crate::query::{EntityKind, Field, MemberRef};

/// Backing table plus optional mimetype discriminator for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFindResult {
    pub table: Table,
    pub mime_type: Option<&'static str>,
}

impl TableFindResult {
    pub fn new(table: Table, mime_type: Option<&'static str>) -> Self {
        Self { table, mime_type }
    }
}

/// Maps member accesses to the native table their backing column lives in.
///
/// Stateless apart from the aggregation preference, which must be threaded
/// consistently through every `find` of one translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableFinder {
    /// Prefer per-account raw records over aggregated ones.
    pub use_raw_contacts: bool,
}

impl TableFinder {
    pub fn new(use_raw_contacts: bool) -> Self {
        Self { use_raw_contacts }
    }

    pub fn default_table(&self) -> Table {
        if self.use_raw_contacts {
            Table::RawContacts
        } else {
            Table::Contacts
        }
    }

    pub fn find(&self, member: &MemberRef) -> Option<TableFindResult> {
        use EntityKind::*;
        use Field::*;

        let data = |mime| Some(TableFindResult::new(Table::Data, Some(mime)));
        let plain = |table| Some(TableFindResult::new(table, None));

        match (member.entity, member.field) {
            (Contact, DisplayName) => plain(self.default_table()),

            (Contact, Prefix | FirstName | MiddleName | LastName | Suffix) => {
                data(mimetypes::STRUCTURED_NAME)
            }
            (Contact, Relationships) => data(mimetypes::RELATION),
            (Contact, Organizations) => data(mimetypes::ORGANIZATION),
            (Contact, Notes) => data(mimetypes::NOTE),
            (Contact, Websites) => data(mimetypes::WEBSITE),
            (Contact, ImAccounts) => data(mimetypes::IM),

            (Contact, Phones) | (Phone, PhoneNumber | PhoneType) => plain(Table::Phones),
            (Contact, Emails) | (Email, EmailAddress) => plain(Table::Emails),
            (Contact, Addresses)
            | (Address, StreetAddress | City | Region | Country | PostalCode) => {
                plain(Table::StructuredPostal)
            }

            (Relationship, RelationshipName) => data(mimetypes::RELATION),
            (EntityKind::ImAccount, Field::ImAccount) => data(mimetypes::IM),
            (Website, WebsiteUrl) => data(mimetypes::WEBSITE),
            (Organization, OrganizationName | OrganizationTitle) => data(mimetypes::ORGANIZATION),
            (Note, NoteContents) => data(mimetypes::NOTE),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_follows_aggregation_preference() {
        assert_eq!(TableFinder::new(false).default_table(), Table::Contacts);
        assert_eq!(TableFinder::new(true).default_table(), Table::RawContacts);
    }

    #[test]
    fn display_name_lives_in_the_default_table() {
        let finder = TableFinder::new(false);
        let r = finder.find(&MemberRef::contact(Field::DisplayName)).unwrap();
        assert_eq!(r.table, Table::Contacts);
        assert_eq!(r.mime_type, None);

        let raw = TableFinder::new(true);
        let r = raw.find(&MemberRef::contact(Field::DisplayName)).unwrap();
        assert_eq!(r.table, Table::RawContacts);
    }

    #[test]
    fn structured_name_parts_are_discriminated_data_rows() {
        let finder = TableFinder::default();
        for field in [Field::Prefix, Field::FirstName, Field::LastName, Field::Suffix] {
            let r = finder.find(&MemberRef::contact(field)).unwrap();
            assert_eq!(r.table, Table::Data);
            assert_eq!(r.mime_type, Some(mimetypes::STRUCTURED_NAME));
        }
    }

    #[test]
    fn nested_entities_use_their_dedicated_tables() {
        let finder = TableFinder::default();
        let phone = finder
            .find(&MemberRef::new(EntityKind::Phone, Field::PhoneNumber))
            .unwrap();
        assert_eq!(phone.table, Table::Phones);
        assert_eq!(phone.mime_type, None);

        let email = finder
            .find(&MemberRef::new(EntityKind::Email, Field::EmailAddress))
            .unwrap();
        assert_eq!(email.table, Table::Emails);
    }

    #[test]
    fn im_account_member_is_a_discriminated_data_row() {
        let finder = TableFinder::default();
        let r = finder
            .find(&MemberRef::new(EntityKind::ImAccount, Field::ImAccount))
            .unwrap();
        assert_eq!(r.table, Table::Data);
        assert_eq!(r.mime_type, Some(mimetypes::IM));
    }

    #[test]
    fn unmapped_members_find_nothing() {
        let finder = TableFinder::default();
        assert_eq!(finder.find(&MemberRef::contact(Field::PhoneNumber)), None);
    }
}
