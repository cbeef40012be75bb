//! Abstract contacts contract: the backing tables, column names and mimetype
//! discriminators the translator emits. Everything that spells a native
//! identifier lives here; the rest of the crate only speaks in these names.

/// A native backing table (content URI) a query can target.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Aggregated contact records.
    Contacts,
    /// Per-account, unaggregated contact records.
    RawContacts,
    /// The shared generic-data table, multiplexed by mimetype.
    Data,
    Phones,
    Emails,
    StructuredPostal,
}

impl Table {
    pub fn uri(self) -> &'static str {
        match self {
            Table::Contacts => "content://com.android.contacts/contacts",
            Table::RawContacts => "content://com.android.contacts/raw_contacts",
            Table::Data => "content://com.android.contacts/data",
            Table::Phones => "content://com.android.contacts/data/phones",
            Table::Emails => "content://com.android.contacts/data/emails",
            Table::StructuredPostal => "content://com.android.contacts/data/postals",
        }
    }

    /// Stable, uniquely-identifying column used to anchor a LIMIT clause when
    /// the caller skipped rows without asking for an explicit order.
    pub fn anchor_column(self) -> &'static str {
        match self {
            Table::Contacts => contacts::LOOKUP_KEY,
            Table::RawContacts => raw_contacts::CONTACT_ID,
            Table::Data | Table::Phones | Table::Emails | Table::StructuredPostal => {
                data::CONTACT_ID
            }
        }
    }

    /// Whether rows in this table carry a mimetype discriminator.
    pub fn is_discriminated(self) -> bool {
        self == Table::Data
    }
}

use std::fmt;

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.uri())
    }
}

pub mod contacts {
    pub const LOOKUP_KEY: &str = "lookup";
    pub const DISPLAY_NAME: &str = "display_name";
}

pub mod raw_contacts {
    pub const CONTACT_ID: &str = "contact_id";
}

/// Columns shared by every row of the generic data table.
pub mod data {
    pub const MIMETYPE: &str = "mimetype";
    pub const CONTACT_ID: &str = "contact_id";
    pub const LOOKUP_KEY: &str = "lookup";
    pub const DISPLAY_NAME: &str = "display_name";
    pub const DATA1: &str = "data1";
}

pub mod phone {
    pub const NUMBER: &str = "data1";
    pub const TYPE: &str = "data2";
    pub const LABEL: &str = "data3";
}

pub mod email {
    pub const ADDRESS: &str = "data1";
    pub const LABEL: &str = "data3";
}

pub mod postal {
    pub const STREET: &str = "data4";
    pub const POBOX: &str = "data5";
    pub const CITY: &str = "data7";
    pub const REGION: &str = "data8";
    pub const POSTCODE: &str = "data9";
    pub const COUNTRY: &str = "data10";
}

pub mod structured_name {
    pub const GIVEN_NAME: &str = "data2";
    pub const FAMILY_NAME: &str = "data3";
    pub const PREFIX: &str = "data4";
    pub const MIDDLE_NAME: &str = "data5";
    pub const SUFFIX: &str = "data6";
}

pub mod organization {
    pub const COMPANY: &str = "data1";
    pub const TITLE: &str = "data4";
}

pub mod note {
    pub const CONTENTS: &str = "data1";
}

pub mod relation {
    pub const NAME: &str = "data1";
}

pub mod website {
    pub const URL: &str = "data1";
}

pub mod im {
    pub const ACCOUNT: &str = "data1";
}

/// Mimetype discriminator values for rows in the generic data table.
pub mod mimetypes {
    pub const STRUCTURED_NAME: &str = "vnd.android.cursor.item/name";
    pub const PHONE: &str = "vnd.android.cursor.item/phone_v2";
    pub const EMAIL: &str = "vnd.android.cursor.item/email_v2";
    pub const POSTAL: &str = "vnd.android.cursor.item/postal-address_v2";
    pub const ORGANIZATION: &str = "vnd.android.cursor.item/organization";
    pub const NOTE: &str = "vnd.android.cursor.item/note";
    pub const RELATION: &str = "vnd.android.cursor.item/relation";
    pub const WEBSITE: &str = "vnd.android.cursor.item/website";
    pub const IM: &str = "vnd.android.cursor.item/im";
}
