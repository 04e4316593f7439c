//! Resource type definitions for Huawei Cloud
//!
//! This module defines:
//! - Resource type definitions (implementing the ResourceType trait)
//! - Attribute schemas, including the wire names used to read attributes
//!   back from API responses

use std::collections::{BTreeMap, HashMap};

use stratus_core::provider::ResourceType;
use stratus_core::resource::Value;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::response::path_search;

pub const SWR_ENTERPRISE_INSTANCE: &str = "swr_enterprise_instance";
pub const SWR_ENTERPRISE_INTERNAL_ENDPOINT: &str = "swr_enterprise_internal_endpoint";
pub const SWR_ENTERPRISE_INSTANCES: &str = "swr_enterprise_instances";

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:ident) => {
        define_resource_type!($name, $type_name, $schema, false);
    };
    ($name:ident, $type_name:expr, $schema:ident, $data_source:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
            fn is_data_source(&self) -> bool {
                $data_source
            }
        }
    };
}

define_resource_type!(
    SwrEnterpriseInstanceType,
    SWR_ENTERPRISE_INSTANCE,
    instance_schema
);
define_resource_type!(
    SwrEnterpriseInternalEndpointType,
    SWR_ENTERPRISE_INTERNAL_ENDPOINT,
    internal_endpoint_schema
);
define_resource_type!(
    SwrEnterpriseInstancesType,
    SWR_ENTERPRISE_INSTANCES,
    instances_data_source_schema,
    true
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(SwrEnterpriseInstanceType),
        Box::new(SwrEnterpriseInternalEndpointType),
        Box::new(SwrEnterpriseInstancesType),
    ]
}

/// Get a resource type by name
pub fn get_resource_type(name: &str) -> Option<Box<dyn ResourceType>> {
    resource_types().into_iter().find(|t| t.name() == name)
}

// =============================================================================
// Schemas
// =============================================================================

fn string(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
}

fn computed_string(name: &str, description: &str) -> AttributeSchema {
    string(name)
        .computed()
        .on_wire()
        .with_description(description)
}

/// Entry of the public network access white list
pub fn white_ip_entry() -> AttributeType {
    AttributeType::Object(BTreeMap::from([
        ("ip".to_string(), types::ip_or_cidr()),
        ("description".to_string(), AttributeType::String),
    ]))
}

pub fn instance_schema() -> ResourceSchema {
    ResourceSchema::new(SWR_ENTERPRISE_INSTANCE)
        .with_description("SWR Enterprise registry instance")
        .attribute(
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .force_new()
                .on_wire(),
        )
        .attribute(string("spec").required().force_new().on_wire())
        .attribute(string("vpc_id").required().force_new().on_wire())
        .attribute(string("subnet_id").required().force_new().on_wire())
        .attribute(
            string("enterprise_project_id")
                .optional()
                .computed()
                .force_new()
                .on_wire(),
        )
        .attribute(
            AttributeSchema::new("obs_encrypt", AttributeType::Bool)
                .optional()
                .force_new()
                .on_wire(),
        )
        .attribute(string("encrypt_type").optional().force_new().on_wire())
        .attribute(
            string("obs_bucket_name")
                .optional()
                .computed()
                .force_new()
                .on_wire(),
        )
        .attribute(string("description").optional().force_new().on_wire())
        .attribute(
            AttributeSchema::new("anonymous_access", AttributeType::Bool)
                .optional()
                .on_wire()
                .with_description("Whether images can be pulled without authentication"),
        )
        .attribute(
            AttributeSchema::new(
                "public_network_access_control_status",
                AttributeType::Enum(vec!["Enable".to_string(), "Disable".to_string()]),
            )
            .optional()
            .computed(),
        )
        .attribute(
            AttributeSchema::new(
                "public_network_access_white_ip_list",
                AttributeType::List(Box::new(white_ip_entry())),
            )
            .optional(),
        )
        .attribute(AttributeSchema::new("tags", types::tags()).optional())
        .attribute(
            AttributeSchema::new("delete_obs", AttributeType::Bool)
                .optional()
                .write_only()
                .with_description("Delete the OBS bucket together with the instance"),
        )
        .attribute(
            AttributeSchema::new("delete_dns", AttributeType::Bool)
                .optional()
                .write_only()
                .with_description("Delete the DNS records together with the instance"),
        )
        .attribute(computed_string("version", "Instance version"))
        .attribute(computed_string("charge_mode", "Charge mode of the instance"))
        .attribute(computed_string("access_address", "Access address"))
        .attribute(computed_string("created_at", "Creation time"))
        .attribute(computed_string("updated_at", "Last update time"))
        .attribute(computed_string("expires_at", "Expiry time"))
        .attribute(computed_string("status", "Instance status"))
        .attribute(
            AttributeSchema::new("user_def_obs", AttributeType::Bool)
                .computed()
                .on_wire(),
        )
        .attribute(computed_string("vpc_name", "VPC name"))
        .attribute(computed_string("vpc_cidr", "VPC CIDR block"))
        .attribute(computed_string("subnet_name", "Subnet name"))
        .attribute(computed_string("subnet_cidr", "Subnet CIDR block"))
}

pub fn internal_endpoint_schema() -> ResourceSchema {
    ResourceSchema::new(SWR_ENTERPRISE_INTERNAL_ENDPOINT)
        .with_description("Private network access endpoint of an SWR Enterprise instance")
        .attribute(string("instance_id").required().force_new())
        .attribute(string("vpc_id").required().force_new().on_wire())
        .attribute(string("subnet_id").required().force_new().on_wire())
        .attribute(computed_string("ip", "Private IP address of the endpoint"))
        .attribute(computed_string("status", "Endpoint status"))
        .attribute(computed_string("vpc_name", "VPC name"))
        .attribute(computed_string("subnet_name", "Subnet name"))
        .attribute(computed_string("created_at", "Creation time"))
}

pub fn instances_data_source_schema() -> ResourceSchema {
    ResourceSchema::new(SWR_ENTERPRISE_INSTANCES)
        .with_description("Lists SWR Enterprise instances")
        .attribute(string("name").optional())
        .attribute(string("status").optional())
        .attribute(
            AttributeSchema::new(
                "instances",
                AttributeType::List(Box::new(AttributeType::Map(Box::new(
                    AttributeType::String,
                )))),
            )
            .computed(),
        )
}

/// Read every attribute with a wire name out of an API response
pub fn attributes_from_response(
    schema: &ResourceSchema,
    body: &serde_json::Value,
) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    for (name, attr) in &schema.attributes {
        if let Some(wire_name) = &attr.wire_name
            && let Some(value) = path_search(wire_name, body).and_then(Value::from_json)
        {
            attributes.insert(name.clone(), value);
        }
    }
    attributes
}
