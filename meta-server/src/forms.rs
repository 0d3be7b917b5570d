use serde::Serialize;
use serde_json::{Map, Value};

use meta::{Bool, Float64, Int64, Meta, SchemaBuilder, SchemaError, Text, TextSlice, Time};

#[derive(Debug, Default, Serialize)]
pub struct Address {
    pub street: Text,
    pub city: Text,
    pub zip: Text,
}

impl Meta for Address {
    fn describe(schema: &mut SchemaBuilder<'_, Self>) -> Result<(), SchemaError> {
        schema
            .scalar("street", r#"meta_required:"true" meta_max_runes:"128""#, |a| {
                &mut a.street
            })?
            .scalar("city", r#"meta_required:"true" meta_max_runes:"64""#, |a| {
                &mut a.city
            })?
            .scalar(
                "zip",
                r#"meta_max_bytes:"10" doc:"Postal code" doc_pattern:"^[0-9A-Z -]+$""#,
                |a| &mut a.zip,
            )?;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Signup {
    pub email: Text,
    pub display_name: Text,
    pub age: Int64,
    pub plan: Text,
    pub newsletter: Bool,
    pub budget: Float64,
    pub birthday: Time,
    pub starts_at: Time,
    pub address: Address,
    pub billing: Option<Address>,
    pub tags: TextSlice,
    pub phones: Vec<Text>,
    pub previous_addresses: Vec<Address>,
    pub extras: Map<String, Value>,
}

impl Meta for Signup {
    fn describe(schema: &mut SchemaBuilder<'_, Self>) -> Result<(), SchemaError> {
        schema
            .scalar(
                "Email",
                r#"meta_required:"true" meta_max_bytes:"254" doc:"Contact address""#,
                |s| &mut s.email,
            )?
            .scalar("DisplayName", r#"meta_min_runes:"2" meta_max_runes:"32""#, |s| {
                &mut s.display_name
            })?
            .scalar("Age", r#"meta_min:"13" meta_max:"130""#, |s| &mut s.age)?
            .scalar(
                "Plan",
                r#"meta_in:"free,pro,team" meta_default:"free""#,
                |s| &mut s.plan,
            )?
            .scalar("Newsletter", r#"meta_discard_invalid:"true""#, |s| {
                &mut s.newsletter
            })?
            .scalar("Budget", r#"meta_min:"0" meta_null:"true""#, |s| &mut s.budget)?
            .scalar("Birthday", r#"meta_format:"%Y-%m-%d""#, |s| &mut s.birthday)?
            .scalar("StartsAt", "", |s| &mut s.starts_at)?
            .nested("Address", r#"meta_required:"true""#, |s| &mut s.address)?
            .optional_nested("Billing", "", |s| &mut s.billing)?
            .scalar("Tags", r#"meta_max_length:"5" meta_max_runes:"20""#, |s| {
                &mut s.tags
            })?
            .scalar_slice("Phones", r#"meta_max_length:"3" meta_max_bytes:"20""#, |s| {
                &mut s.phones
            })?
            .struct_slice("PreviousAddresses", r#"meta_max_length:"3""#, |s| {
                &mut s.previous_addresses
            })?
            .catch_all("Extras", "", |s| &mut s.extras)?;
        Ok(())
    }
}

/// A category tree; each node may hold further categories.
#[derive(Debug, Default, Serialize)]
pub struct Category {
    pub name: Text,
    pub slug: Text,
    pub children: Vec<Category>,
}

impl Meta for Category {
    fn describe(schema: &mut SchemaBuilder<'_, Self>) -> Result<(), SchemaError> {
        schema
            .scalar("Name", r#"meta_required:"true" meta_max_runes:"64""#, |c| {
                &mut c.name
            })?
            .scalar("Slug", "", |c| &mut c.slug)?
            .struct_slice("Children", r#"meta_max_length:"50""#, |c| &mut c.children)?;
        Ok(())
    }
}
