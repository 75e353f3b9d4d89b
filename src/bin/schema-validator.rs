//! # SCIM Schema Validator
//!
//! A command-line utility for checking extension schema config files and
//! filter expressions against the schema registry before deploying them.
//!
//! ## Usage
//!
//! ### Validate an Extension Config
//!
//! ```bash
//! cargo run --bin schema-validator config/badge-extension.json
//! cargo run --bin schema-validator config/group-extension.json Group
//! ```
//!
//! The optional second argument names the resource type the extension
//! extends (default `User`).
//!
//! ### Parse a Filter
//!
//! ```bash
//! cargo run --bin schema-validator --filter User 'emails[type eq "work"] and active eq true'
//! ```
//!
//! ## Output Examples
//!
//! ### Successful Validation
//!
//! ```text
//! Validating extension config: config/badge-extension.json
//! ✓ Extension loaded: urn:example:scim:schemas:extension:badge:2.0:User
//!
//! Resource Type Summary:
//!   User (/Users)
//!     Schemas: 3
//!       - urn:ietf:params:scim:schemas:core:2.0:User
//!       - urn:ietf:params:scim:schemas:extension:enterprise:2.0:User
//!       - urn:example:scim:schemas:extension:badge:2.0:User
//!     Attributes: 24
//!     Required attributes: userName
//! ```
//!
//! ### Filter Output
//!
//! ```text
//! Parsing filter for User: userName sw "b" and not (active eq false)
//! ✓ Filter is valid (2 comparisons)
//!   urn:ietf:params:scim:schemas:core:2.0:User:userName sw "b" and not (urn:ietf:params:scim:schemas:core:2.0:User:active eq "false")
//! ```
//!
//! The tree is printed with canonical attribute URIs and quoted comparands.
//!
//! ## Exit Codes
//!
//! - `0`: Config or filter is valid
//! - `1`: Validation failed or arguments were wrong

use scim_core::config::ScimCoreConfig;
use scim_core::filter::ExpressionTreeBuilder;
use scim_core::schema::{AttributeSchema, ResourceTypeSchema, SchemaRegistry};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--filter") if args.len() == 4 => parse_filter(&args[2], &args[3]),
        Some(path) if !path.starts_with("--") && args.len() <= 3 => {
            let resource_type = args.get(2).map(String::as_str).unwrap_or("User");
            validate_config(Path::new(path), resource_type);
        }
        _ => {
            print_usage(&args[0]);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <extension-config.json> [ResourceType]", program);
    eprintln!("       {} --filter <ResourceType> <filter>", program);
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} config/badge-extension.json", program);
    eprintln!("  {} --filter User 'userName eq \"bjensen\"'", program);
}

fn validate_config(path: &Path, resource_type: &str) {
    println!("Validating extension config: {}", path.display());

    let config = ScimCoreConfig {
        extension_resource_type: resource_type.to_string(),
        ..ScimCoreConfig::default()
    }
    .with_extension_config(path);

    let registry = match SchemaRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ Extension config is invalid: {}", e);
            process::exit(1);
        }
    };

    match registry.resource_schema(resource_type, &[]) {
        Ok(schema) => {
            if let Some(extension) = schema.extension_schemas().last() {
                println!("✓ Extension loaded: {}", extension);
            }
            println!("\nResource Type Summary:");
            print_resource_type_summary(&schema);
        }
        Err(e) => {
            eprintln!("❌ Failed to build resource type {}: {}", resource_type, e);
            process::exit(1);
        }
    }
}

fn print_resource_type_summary(schema: &ResourceTypeSchema) {
    println!("  {} ({})", schema.name, schema.endpoint);
    println!("    Schemas: {}", schema.schemas.len());
    for uri in &schema.schemas {
        println!("      - {}", uri);
    }

    let mut total = 0;
    let mut required = Vec::new();
    for attribute in &schema.attributes {
        count_attributes(attribute, &mut total, &mut required);
    }
    println!("    Attributes: {}", total);
    if !required.is_empty() {
        println!("    Required attributes: {}", required.join(", "));
    }
}

fn count_attributes(attribute: &AttributeSchema, total: &mut usize, required: &mut Vec<String>) {
    *total += 1;
    if attribute.required {
        required.push(attribute.name.clone());
    }
    for sub in &attribute.sub_attributes {
        count_attributes(sub, total, required);
    }
}

fn parse_filter(resource_type: &str, filter: &str) {
    println!("Parsing filter for {}: {}", resource_type, filter);

    let config = ScimCoreConfig::default();
    let schema = match SchemaRegistry::from_config(&config)
        .map_err(|e| e.to_string())
        .and_then(|registry| {
            registry
                .resource_schema(resource_type, &[])
                .map_err(|e| e.to_string())
        }) {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    match ExpressionTreeBuilder::new(&schema)
        .with_limits(config.filter)
        .build_tree(filter)
    {
        Ok(tree) => {
            println!("✓ Filter is valid ({} comparisons)", tree.leaf_count());
            println!("  {}", tree);
        }
        Err(e) => {
            eprintln!("❌ Invalid filter: {}", e);
            process::exit(1);
        }
    }
}
