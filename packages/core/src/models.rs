//! The portfolio's record types.
//!
//! Address records form a chain: an [`ADDRESS`] sits on a [`STREET`] in a
//! [`CITY`] in a [`REGION`] in a [`COUNTRY`]; the country of an address is
//! only reachable through `street.city.region.country`. Professional history
//! hangs off [`ORGANIZATION`].

use crate::schema::{FieldDescriptor, RecordSchema};

/// Codes accepted by `Region.region_type`: state, region, province.
pub const REGION_TYPES: &[&str] = &["ST", "RE", "PR"];

pub static COUNTRY: RecordSchema = RecordSchema {
    name: "Country",
    table: "country",
    fields: &[FieldDescriptor::required_text("name", 50)],
};

pub static REGION: RecordSchema = RecordSchema {
    name: "Region",
    table: "region",
    fields: &[
        FieldDescriptor::required_text("name", 50),
        FieldDescriptor::required_text("region_type", 2).choices(REGION_TYPES, "ST"),
        FieldDescriptor::required_foreign_key("country", "country"),
    ],
};

pub static CITY: RecordSchema = RecordSchema {
    name: "City",
    table: "city",
    fields: &[
        FieldDescriptor::required_text("name", 50),
        FieldDescriptor::required_foreign_key("region", "region"),
    ],
};

pub static STREET: RecordSchema = RecordSchema {
    name: "Street",
    table: "street",
    fields: &[
        FieldDescriptor::required_text("name", 50),
        FieldDescriptor::required_foreign_key("city", "city"),
    ],
};

pub static ADDRESS: RecordSchema = RecordSchema {
    name: "Address",
    table: "address",
    fields: &[
        FieldDescriptor::required_integer("building_number"),
        FieldDescriptor::required_foreign_key("street", "street"),
    ],
};

pub static ORGANIZATION: RecordSchema = RecordSchema {
    name: "Organization",
    table: "organization",
    fields: &[
        FieldDescriptor::required_text("name", 50),
        FieldDescriptor::text("website_homepage", Some(200)),
        FieldDescriptor::required_foreign_key("hq_address", "address"),
    ],
};

/// A company, with its headquarters kept as free text rather than an address.
pub static COMPANY: RecordSchema = RecordSchema {
    name: "Company",
    table: "company",
    fields: &[
        FieldDescriptor::required_text("name", 50),
        FieldDescriptor::text("company_website", Some(200)),
        FieldDescriptor::text("hq_address", Some(10)),
    ],
};

pub static EMPLOYMENT: RecordSchema = RecordSchema {
    name: "Employment",
    table: "employment",
    fields: &[
        FieldDescriptor::required_text("title", 50),
        FieldDescriptor::required_foreign_key("organization", "organization"),
        FieldDescriptor::text("description", None),
    ],
};

pub static INVOLVEMENT: RecordSchema = RecordSchema {
    name: "Involvement",
    table: "involvement",
    fields: &[
        FieldDescriptor::text("description", None),
        FieldDescriptor::required_foreign_key("organization", "organization"),
    ],
};

pub static PROFESSIONAL_PROJECT: RecordSchema = RecordSchema {
    name: "ProfessionalProject",
    table: "professional_project",
    fields: &[
        FieldDescriptor::required_text("name", 50),
        FieldDescriptor::text("description", None),
        FieldDescriptor::required_foreign_key("employment", "employment"),
        FieldDescriptor::text("github_link", Some(200)),
    ],
};

/// Every record type, each listed after the types it references.
pub static CATALOG: &[&RecordSchema] = &[
    &COUNTRY,
    &REGION,
    &CITY,
    &STREET,
    &ADDRESS,
    &ORGANIZATION,
    &COMPANY,
    &EMPLOYMENT,
    &INVOLVEMENT,
    &PROFESSIONAL_PROJECT,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn catalog_is_in_dependency_order() {
        for (i, schema) in CATALOG.iter().enumerate() {
            for field in schema.fields {
                if let FieldKind::ForeignKey(target) = field.kind {
                    let pos = CATALOG
                        .iter()
                        .position(|s| s.table == target)
                        .unwrap_or_else(|| panic!("{}.{} targets unknown {target}", schema.name, field.name));
                    assert!(pos < i, "{} listed before {target}", schema.name);
                }
            }
        }
    }

    #[test]
    fn no_field_shadows_the_primary_key() {
        for schema in CATALOG {
            assert!(schema.field("pk").is_none());
            assert!(schema.field("id").is_none());
        }
    }
}
